//! HTTP client construction and single-task fetching
//!
//! A fetch never returns an error to the pipeline: every way it can go wrong
//! is folded into a classified `FetchOutcome` so that retry handling stays in
//! one place.

use crate::config::UserAgentConfig;
use crate::engine::retry::{classify_error, classify_status, OutcomeClass};
use reqwest::Client;
use std::time::{Duration, Instant};
use url::Url;

/// The result of one fetch attempt, already classified
#[derive(Debug)]
pub struct FetchOutcome {
    /// HTTP status, when a response was received at all
    pub status: Option<u16>,
    /// Response body, present only on success
    pub body: Option<String>,
    /// Wall time the attempt took
    pub latency: Duration,
    pub class: OutcomeClass,
    /// Human-readable failure description for logging and failure reports
    pub error: Option<String>,
}

/// Builds the shared HTTP client.
///
/// The per-request deadline is configured here so a hung server cannot hold a
/// worker past `fetch_timeout`; timeouts surface as `Transient` outcomes.
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetch_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(fetch_timeout)
        .connect_timeout(fetch_timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs one fetch attempt against `url`
pub async fn fetch(client: &Client, url: &Url) -> FetchOutcome {
    let started = Instant::now();

    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchOutcome {
                status: e.status().map(|s| s.as_u16()),
                body: None,
                latency: started.elapsed(),
                class: classify_error(&e),
                error: Some(e.to_string()),
            };
        }
    };

    let status = response.status().as_u16();
    let class = classify_status(status);

    if class != OutcomeClass::Success {
        return FetchOutcome {
            status: Some(status),
            body: None,
            latency: started.elapsed(),
            class,
            error: Some(format!("HTTP {}", status)),
        };
    }

    match response.text().await {
        Ok(body) => FetchOutcome {
            status: Some(status),
            body: Some(body),
            latency: started.elapsed(),
            class: OutcomeClass::Success,
            error: None,
        },
        Err(e) => FetchOutcome {
            status: Some(status),
            body: None,
            latency: started.elapsed(),
            // The connection dropped mid-body; same retry budget as any
            // other transport failure.
            class: OutcomeClass::Transient,
            error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_defaults() {
        let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30));
        assert!(client.is_ok());
    }

    #[test]
    fn connect_timeout_never_exceeds_fetch_timeout() {
        // Short overall deadlines must also bound the connect phase; this is
        // only observable through behavior, so just ensure construction works
        // for a sub-10s timeout.
        let client = build_http_client(&UserAgentConfig::default(), Duration::from_millis(200));
        assert!(client.is_ok());
    }
}
