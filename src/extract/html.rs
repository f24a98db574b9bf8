//! Default HTML extractor
//!
//! Pulls one record per page using configured CSS field selectors and
//! harvests `a[href]` links for frontier discovery. Pages where no field
//! matches yield no record but still yield links.

use crate::config::ExtractConfig;
use crate::extract::{ExtractError, Extraction, Extractor, RecordFields};
use scraper::{Html, Selector};
use url::Url;

/// CSS-selector-driven extractor for HTML documents
pub struct HtmlExtractor {
    fields: Vec<(String, Selector)>,
    link_selector: Selector,
}

impl HtmlExtractor {
    /// Builds an extractor from configured field rules. With no rules
    /// configured, the page `<title>` becomes the single record field so a
    /// bare config still produces useful output.
    pub fn from_config(config: &ExtractConfig) -> Result<Self, ExtractError> {
        let mut fields = Vec::new();

        if config.fields.is_empty() {
            fields.push((
                "title".to_string(),
                Selector::parse("title").map_err(|e| ExtractError(e.to_string()))?,
            ));
        } else {
            for rule in &config.fields {
                let selector = Selector::parse(&rule.selector)
                    .map_err(|e| ExtractError(format!("selector '{}': {}", rule.selector, e)))?;
                fields.push((rule.name.clone(), selector));
            }
        }

        Ok(Self {
            fields,
            link_selector: Selector::parse("a[href]").map_err(|e| ExtractError(e.to_string()))?,
        })
    }

    fn extract_record(&self, document: &Html) -> RecordFields {
        let mut record = RecordFields::new();
        for (name, selector) in &self.fields {
            if let Some(element) = document.select(selector).next() {
                let text = element.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    record.insert(name.clone(), text);
                }
            }
        }
        record
    }

    fn extract_links(&self, document: &Html, source: &Url) -> Vec<String> {
        document
            .select(&self.link_selector)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| resolve_link(href, source))
            .collect()
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self, source: &Url, body: &str) -> Result<Extraction, ExtractError> {
        let document = Html::parse_document(body);

        let record = self.extract_record(&document);
        let links = self.extract_links(&document, source);

        Ok(Extraction {
            records: if record.is_empty() {
                Vec::new()
            } else {
                vec![record]
            },
            links,
        })
    }
}

/// Resolves an href to an absolute http(s) URL, rejecting non-navigational
/// schemes and same-page anchors
fn resolve_link(href: &str, source: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    for scheme in ["javascript:", "mailto:", "tel:", "data:"] {
        if href.starts_with(scheme) {
            return None;
        }
    }

    let absolute = source.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
