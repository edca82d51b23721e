use crate::domain::scraped::PageType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

const LISTING_ROOT: &str = "https://www.doctify.com/uk/";

static LOC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<loc>\s*(https://www\.doctify\.com/uk/[^<\s]+)\s*</loc>").unwrap());

fn dedup(urls: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Listing URLs of `page_type` in a sitemap body. When the body has no
/// matching `<loc>` entries, any bare listing URL in the text is used.
pub fn extract_sitemap_urls(body: &str, page_type: PageType) -> Vec<String> {
    let marker = format!("doctify.com/uk/{}/", page_type.path_segment());

    let from_locs = dedup(
        LOC_PATTERN
            .captures_iter(body)
            .map(|caps| caps[1].replace("&amp;", "&"))
            .filter(|url| url.contains(&marker)),
    );
    if !from_locs.is_empty() {
        return from_locs;
    }

    let bare = format!(
        r#"{}{}/[^"<\s]+"#,
        regex::escape(LISTING_ROOT),
        regex::escape(page_type.path_segment())
    );
    match Regex::new(&bare) {
        Ok(pattern) => dedup(pattern.find_iter(body).map(|m| m.as_str().to_string())),
        Err(_) => Vec::new(),
    }
}

/// Keeps URLs containing `category` (case-insensitive), then applies `limit`.
pub fn select_urls(urls: Vec<String>, category: Option<&str>, limit: Option<usize>) -> Vec<String> {
    let category = category
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty());

    urls.into_iter()
        .filter(|url| {
            category
                .as_deref()
                .map_or(true, |c| url.to_lowercase().contains(c))
        })
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
