use crate::config::NetworkConfig;
use anyhow::{Context, Result};
use std::time::Duration;

/// Returns the public IPv4 address reported by the configured endpoint, or
/// the configured fallback literal when anything goes wrong. Network
/// failures are substituted, never propagated.
pub fn public_ipv4(config: &NetworkConfig) -> String {
    match fetch(config) {
        Ok(ip) if !ip.is_empty() => ip,
        Ok(_) => {
            eprintln!("[net] empty response from {}; using fallback", config.endpoint);
            config.fallback.clone()
        }
        Err(err) => {
            eprintln!("[net] IP lookup failed: {err:#}; using fallback");
            config.fallback.clone()
        }
    }
}

fn fetch(config: &NetworkConfig) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .build()
        .context("Building HTTP client")?;
    let body = client
        .get(&config.endpoint)
        .send()
        .with_context(|| format!("GET {}", config.endpoint))?
        .error_for_status()
        .context("Non-success status from IP endpoint")?
        .text()
        .context("Reading IP response body")?;
    Ok(body.trim().to_string())
}
