use crate::UrlError;
use url::Url;

/// Click identifiers dropped from cache identifiers, besides every `utm_*` key
const CLICK_IDS: &[&str] = &["fbclid", "gclid", "msclkid", "mc_eid"];

/// Parses a URL that is about to be sent to the provider
///
/// Only absolute `http`/`https` URLs with a host are accepted.
///
/// # Examples
///
/// ```
/// use clinic_scout::url::validate_target_url;
///
/// assert!(validate_target_url("https://clinicaltrials.gov/study/NCT01234567").is_ok());
/// assert!(validate_target_url("mailto:front-desk@clinic.example").is_err());
/// ```
pub fn validate_target_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "{} (expected http or https)",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingDomain),
    }
}

/// Normalizes a URL into the identifier used for cache keys
///
/// Two URLs that reach the same page through a `www.` prefix, a trailing
/// slash, a fragment, tracking parameters or a different query order
/// normalize to the same value. The scheme and path case are kept.
///
/// # Examples
///
/// ```
/// use clinic_scout::url::normalize_url;
///
/// let url = normalize_url("https://WWW.CLINIC.EXAMPLE/services/?utm_source=mail#top").unwrap();
/// assert_eq!(url.as_str(), "https://clinic.example/services");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = validate_target_url(url_str)?;

    if let Some(host) = canonical_host(&url) {
        url.set_host(Some(&host))
            .map_err(|e| UrlError::Malformed(format!("host {}: {}", host, e)))?;
    }

    let path = collapse_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    let retained = retained_query(&url);
    if retained.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(retained.iter());
    }

    Ok(url)
}

fn canonical_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    Some(match host.strip_prefix("www.") {
        Some(bare) => bare.to_string(),
        None => host,
    })
}

/// Drops empty and `.` segments, resolves `..`, strips the trailing slash
fn collapse_path(path: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();

    for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if segment == ".." {
            kept.pop();
        } else {
            kept.push(segment);
        }
    }

    format!("/{}", kept.join("/"))
}

/// Query pairs without tracking keys, sorted by key then value
fn retained_query(url: &Url) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.starts_with("utm_") && !CLICK_IDS.contains(&&**key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    pairs.sort();
    pairs
}
