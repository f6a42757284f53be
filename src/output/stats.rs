//! Terminal rendering of service health and activity
//!
//! This module formats the health snapshot (API key, cache, rate limiter)
//! and the activity log for the CLI.

use crate::cache::ActivityRecord;
use crate::research::HealthStatus;

/// Formats a health snapshot as a plain-text table
pub fn format_health(health: &HealthStatus) -> String {
    let mut out = String::new();

    out.push_str("=== Clinic-Scout Health ===\n\n");
    out.push_str(&format!(
        "Status: {}\n",
        if health.healthy { "healthy" } else { "unhealthy" }
    ));
    out.push_str(&format!(
        "  API key configured: {}\n",
        if health.api_key_configured { "yes" } else { "no" }
    ));
    out.push_str(&format!("  Provider: {}\n\n", health.base_url));

    out.push_str("Cache:\n");
    match &health.cache {
        Some(cache) => {
            out.push_str(&format!(
                "  Enabled: {}\n",
                if cache.enabled { "yes" } else { "no" }
            ));
            out.push_str(&format!("  TTL: {} seconds\n", cache.ttl_seconds));
            out.push_str(&format!("  Live entries: {}\n", cache.live_entries));
        }
        None => out.push_str("  Not configured\n"),
    }
    out.push('\n');

    out.push_str("Rate Limit (used / ceiling):\n");
    let rows = [
        ("Last minute", health.rate_limit.last_minute, health.limits.per_minute),
        ("Last hour", health.rate_limit.last_hour, health.limits.per_hour),
        ("Last day", health.rate_limit.last_day, health.limits.per_day),
    ];
    for (label, used, ceiling) in rows {
        let percentage = if ceiling > 0 {
            (used as f64 / ceiling as f64) * 100.0
        } else {
            0.0
        };
        out.push_str(&format!(
            "  {:<12} {:>6} / {:<6} ({:.1}%)\n",
            label, used, ceiling, percentage
        ));
    }
    out.push_str(&format!(
        "  Burst: {} per second, cooldown {} ms\n",
        health.limits.burst, health.limits.cooldown_ms
    ));

    out
}

/// Prints a health snapshot to stdout
pub fn print_health(health: &HealthStatus) {
    print!("{}", format_health(health));
}

/// Prints activity-log rows, newest first
pub fn print_activity(records: &[ActivityRecord]) {
    if records.is_empty() {
        println!("No recorded activity");
        return;
    }

    println!("=== Recent Activity ({}) ===\n", records.len());
    for record in records {
        println!(
            "{}  {:<14} {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.action_type,
            record.identifiers.join(", ")
        );
        if let Some(actor) = &record.actor {
            println!("    by {}", actor);
        }
        if !record.details.is_null() {
            println!("    {}", record.details);
        }
    }
}
