//! Clinic-Scout main entry point
//!
//! Command-line front end for the research service: scraping, crawling,
//! search, structured extraction, feed monitoring and medical page review.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use clinic_scout::config::{load_config_with_hash, parse_config, Config};
use clinic_scout::extract::ExtractionType;
use clinic_scout::firecrawl::ScrapeFormat;
use clinic_scout::output::{print_activity, print_health, print_json, write_medical_report};
use clinic_scout::research::{
    CrawlRequest, ExtractRequest, MedicalParseRequest, RssMonitorRequest, ScrapeRequest,
    SearchRequest, TimeRange,
};
use clinic_scout::rss::{parse_feed_date, RssFilters};
use clinic_scout::ResearchService;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Clinic-Scout: research and scraping back end for a clinic website
#[derive(Parser, Debug)]
#[command(name = "clinic-scout")]
#[command(version)]
#[command(about = "Scrape, crawl, search and review content for a clinic site", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when it does not exist)
    #[arg(short, long, value_name = "FILE", default_value = "clinic-scout.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Who the activity log attributes this run to (e.g. an email)
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a single page
    Scrape {
        url: String,
        /// Output formats (markdown, html, rawHtml, links, screenshot)
        #[arg(short, long = "format", value_name = "FORMAT")]
        formats: Vec<String>,
        /// Wait before capturing the page, in milliseconds
        #[arg(long)]
        wait_ms: Option<u64>,
        /// Bypass the cache read
        #[arg(long)]
        no_cache: bool,
    },

    /// Start an asynchronous crawl job
    Crawl {
        url: String,
        #[arg(long, default_value_t = CrawlRequest::DEFAULT_MAX_DEPTH)]
        max_depth: u32,
        #[arg(long, default_value_t = CrawlRequest::DEFAULT_LIMIT)]
        limit: u32,
        /// Path patterns to include
        #[arg(long = "include")]
        include_paths: Vec<String>,
        /// Path patterns to exclude
        #[arg(long = "exclude")]
        exclude_paths: Vec<String>,
    },

    /// Check the status of a crawl job
    CrawlStatus { job_id: String },

    /// Run a web search
    Search {
        query: String,
        #[arg(long)]
        limit: Option<u32>,
        /// day, week, month, year or all
        #[arg(long, default_value = "all")]
        time_range: String,
        /// Scrape every hit inline
        #[arg(long)]
        scrape: bool,
        #[arg(long)]
        lang: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        no_cache: bool,
    },

    /// Extract structured data from one or more pages
    Extract {
        #[arg(required = true)]
        urls: Vec<String>,
        /// Extra instructions appended to the template prompt
        #[arg(long)]
        prompt: Option<String>,
        /// JSON schema merged over the template schema
        #[arg(long)]
        schema_file: Option<PathBuf>,
        /// Force a template (pubmed, clinical_trial, medical_journal, health_organization, generic)
        #[arg(long = "type")]
        extraction_type: Option<String>,
        #[arg(long)]
        no_cache: bool,
    },

    /// Fetch an RSS or Atom feed and filter its items
    Rss {
        feed_url: String,
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        #[arg(long = "author")]
        authors: Vec<String>,
        /// Earliest publish date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        since: Option<String>,
        /// Latest publish date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        until: Option<String>,
        /// Scrape every item's link
        #[arg(long)]
        full_content: bool,
        #[arg(long)]
        max_items: Option<usize>,
    },

    /// Scrape, extract and review a medical page
    Medical {
        url: String,
        #[arg(long = "type")]
        extraction_type: Option<String>,
        #[arg(long)]
        prompt: Option<String>,
        /// Also write a markdown report
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Show API key, cache and rate limit state
    Health {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Remove cached content
    ClearCache {
        /// Remove live entries too, not only expired ones
        #[arg(long)]
        all: bool,
    },

    /// Show recent activity
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(&cli.config)?;
    let service = ResearchService::new(&config).context("Failed to start research service")?;
    service.set_actor(cli.actor.clone());

    run(&service, cli.command).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("clinic_scout=info,warn"),
            1 => EnvFilter::new("clinic_scout=debug,info"),
            2 => EnvFilter::new("clinic_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file, or defaults plus environment overrides when it is absent
fn load_configuration(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        tracing::info!(
            "No configuration at {}, using defaults and environment",
            path.display()
        );
        return parse_config("", |name| std::env::var(name).ok())
            .context("Invalid environment configuration");
    }

    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}

fn parse_formats(raw: &[String]) -> anyhow::Result<Vec<ScrapeFormat>> {
    raw.iter()
        .map(|f| ScrapeFormat::parse(f).with_context(|| format!("Unknown format: {}", f)))
        .collect()
}

fn parse_extraction_type(raw: Option<&str>) -> anyhow::Result<Option<ExtractionType>> {
    raw.map(|t| ExtractionType::parse(t).with_context(|| format!("Unknown extraction type: {}", t)))
        .transpose()
}

fn parse_date_arg(raw: Option<&str>) -> anyhow::Result<Option<chrono::DateTime<chrono::Utc>>> {
    raw.map(|d| parse_feed_date(d).with_context(|| format!("Invalid date: {}", d)))
        .transpose()
}

async fn run(service: &ResearchService, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Scrape {
            url,
            formats,
            wait_ms,
            no_cache,
        } => {
            let mut request = ScrapeRequest::new(url).with_formats(parse_formats(&formats)?);
            request.wait_for_ms = wait_ms;
            request.skip_cache = no_cache;

            let result = service.scrape_url(request).await;
            print_json(&result)?;
            if !result.success {
                bail!("Scrape failed");
            }
        }

        Command::Crawl {
            url,
            max_depth,
            limit,
            include_paths,
            exclude_paths,
        } => {
            let mut request = CrawlRequest::new(url);
            request.max_depth = max_depth;
            request.limit = limit;
            request.include_paths = include_paths;
            request.exclude_paths = exclude_paths;

            let job = service.crawl_website(request).await;
            print_json(&job)?;
            if job.id.is_none() {
                bail!("Crawl did not start");
            }
        }

        Command::CrawlStatus { job_id } => {
            let job = service.check_crawl_status(&job_id).await;
            print_json(&job)?;
        }

        Command::Search {
            query,
            limit,
            time_range,
            scrape,
            lang,
            country,
            no_cache,
        } => {
            let mut request = SearchRequest::new(query);
            request.limit = limit;
            request.time_range = TimeRange::parse(&time_range)
                .with_context(|| format!("Unknown time range: {}", time_range))?;
            request.scrape_results = scrape;
            request.lang = lang;
            request.country = country;
            request.skip_cache = no_cache;

            let response = service.search_web(request).await;
            print_json(&response)?;
            if !response.success {
                bail!("Search failed");
            }
        }

        Command::Extract {
            urls,
            prompt,
            schema_file,
            extraction_type,
            no_cache,
        } => {
            let schema = match schema_file {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    Some(serde_json::from_str(&text).context("Schema file is not valid JSON")?)
                }
                None => None,
            };

            let request = ExtractRequest {
                urls,
                schema,
                prompt,
                extraction_type: parse_extraction_type(extraction_type.as_deref())?,
                skip_cache: no_cache,
            };

            let results = service.extract_content(request).await;
            print_json(&results)?;
            let failed = results.iter().filter(|r| !r.is_success()).count();
            if failed > 0 {
                tracing::warn!("{} of {} extractions failed", failed, results.len());
            }
        }

        Command::Rss {
            feed_url,
            keywords,
            authors,
            since,
            until,
            full_content,
            max_items,
        } => {
            let mut request = RssMonitorRequest::new(feed_url);
            request.filters = RssFilters {
                keywords,
                authors,
                date_from: parse_date_arg(since.as_deref())?,
                date_to: parse_date_arg(until.as_deref())?,
            };
            request.include_full_content = full_content;
            request.max_items = max_items;

            let result = service.monitor_rss_feed(request).await;
            print_json(&result)?;
            if !result.success {
                bail!("Feed check failed");
            }
        }

        Command::Medical {
            url,
            extraction_type,
            prompt,
            report,
        } => {
            let mut request = MedicalParseRequest::new(url);
            request.extraction_type = parse_extraction_type(extraction_type.as_deref())?;
            request.prompt = prompt;

            let result = service.parse_medical_website(request).await;
            print_json(&result)?;

            if let Some(path) = report {
                write_medical_report(&result, &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!("Report written to {}", path.display());
            }
            if !result.success {
                bail!("Medical parse failed");
            }
        }

        Command::Health { json } => {
            let health = service.health_status();
            if json {
                print_json(&health)?;
            } else {
                print_health(&health);
            }
        }

        Command::ClearCache { all } => {
            let removed = if all {
                service.purge_cache()
            } else {
                service.clear_cache()
            };
            println!("Removed {} cache entries", removed);
        }

        Command::History { limit } => {
            print_activity(&service.recent_activity(limit));
        }
    }

    Ok(())
}
