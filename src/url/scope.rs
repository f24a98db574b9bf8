use crate::config::ScopeConfig;
use url::Url;

/// Decides whether a discovered URL is inside the crawl scope.
///
/// Built once from configuration plus the seed hosts: when the config lists no
/// explicit allow patterns, the crawl is restricted to the hosts of its seeds,
/// which keeps an unconfigured run from wandering across the open web.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    allow: Vec<String>,
    deny: Vec<String>,
    max_depth: u32,
}

impl ScopeFilter {
    /// Creates a scope filter from config and the normalized seed URLs
    pub fn new(scope: &ScopeConfig, seeds: &[Url], max_depth: u32) -> Self {
        let allow = if scope.allow.is_empty() {
            seeds
                .iter()
                .filter_map(|u| u.host_str())
                .map(|h| h.to_lowercase())
                .collect()
        } else {
            scope.allow.iter().map(|p| p.to_lowercase()).collect()
        };

        Self {
            allow,
            deny: scope.deny.iter().map(|p| p.to_lowercase()).collect(),
            max_depth,
        }
    }

    /// Returns true when a URL discovered at `depth` may enter the frontier
    pub fn admits(&self, url: &Url, depth: u32) -> bool {
        if depth > self.max_depth {
            return false;
        }

        let host = match url.host_str() {
            Some(h) => h.to_lowercase(),
            None => return false,
        };

        if self.deny.iter().any(|p| matches_pattern(p, &host)) {
            return false;
        }
        self.allow.iter().any(|p| matches_pattern(p, &host))
    }
}

/// Matches a host against a pattern.
///
/// `example.com` matches exactly; `*.example.com` matches the bare domain and
/// any subdomain.
fn matches_pattern(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => host == base || host.ends_with(&format!(".{}", base)),
        None => host == pattern,
    }
}
