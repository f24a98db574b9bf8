use crate::UrlError;
use url::form_urlencoded;
use url::Url;

/// Query parameters that carry tracking state rather than content identity.
/// They are stripped so that otherwise-identical targets deduplicate.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
];

/// Normalizes a URL into its canonical crawl identity.
///
/// Two URLs that normalize to the same value are the same crawl target: the
/// frontier admits at most one active task for them and URL fingerprints
/// collide on purpose.
///
/// Rules applied:
/// - scheme must be http or https; host is required and lowercased
/// - a leading `www.` label is dropped
/// - the fragment is dropped
/// - tracking query parameters are removed, the rest sorted by key
/// - a trailing slash is removed from non-root paths; an empty path becomes `/`
pub fn normalize_url(raw: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::UnsupportedScheme(other.to_string())),
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(e.to_string()))?;

    url.set_fragment(None);

    let canonical_query = canonicalize_query(&url);
    url.set_query(canonical_query.as_deref());

    let path = canonicalize_path(url.path());
    url.set_path(&path);

    Ok(url)
}

/// Removes tracking parameters and sorts the remainder by key.
/// Returns None when no parameters survive.
fn canonicalize_query(url: &Url) -> Option<String> {
    url.query()?;

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if pairs.is_empty() {
        return None;
    }

    pairs.sort();

    // Re-encode through the form serializer: query_pairs() decoded the
    // values, and joining them back raw would turn an encoded delimiter
    // inside a value into a real one.
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in &pairs {
        serializer.append_pair(k, v);
    }
    Some(serializer.finish())
}

fn canonicalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    if path.len() > 1 && path.ends_with('/') {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    }
}
