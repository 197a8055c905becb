//! Link fields and their previews.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::Serialize;
use tracing::debug;

use corpora_client::HttpCorporaApi;
use corpora_core::{decode_entities, Error, Result};

static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static META: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\s+[^>]*>").unwrap());
static ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)([a-z:_-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Accept absolute http(s) URLs with a host. Returns the trimmed URL as
/// entered.
pub fn validate_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let invalid = || Error::Validation(format!("not a web address: {}", trimmed));
    let url = Url::parse(trimmed).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(trimmed.to_string()),
        _ => Err(invalid()),
    }
}

/// What a link field shows beside the address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkPreview {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

impl LinkPreview {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.thumbnail.is_none()
    }
}

/// Read the page title and Open Graph metadata from `html`.
pub fn parse_preview(url: &str, html: &str) -> LinkPreview {
    let mut preview = LinkPreview {
        url: url.to_string(),
        ..LinkPreview::default()
    };
    for tag in META.find_iter(html) {
        let mut key = None;
        let mut content = None;
        for attr in ATTR.captures_iter(tag.as_str()) {
            let value = attr.get(2).or_else(|| attr.get(3)).map(|m| m.as_str());
            match attr[1].to_ascii_lowercase().as_str() {
                "property" | "name" => key = value.map(str::to_ascii_lowercase),
                "content" => content = value.map(decode_entities),
                _ => {}
            }
        }
        let (Some(key), Some(content)) = (key, content.filter(|c| !c.trim().is_empty())) else {
            continue;
        };
        match key.as_str() {
            "og:title" => preview.title = Some(content),
            "og:description" => preview.description = Some(content),
            "description" if preview.description.is_none() => preview.description = Some(content),
            "og:image" => preview.thumbnail = Some(content),
            _ => {}
        }
    }
    if preview.title.is_none() {
        preview.title = TITLE
            .captures(html)
            .map(|c| decode_entities(c[1].trim()))
            .filter(|t| !t.is_empty());
    }
    preview
}

/// Fetch and parse a preview. Any failure, including a page with nothing
/// to show, yields `None`.
pub async fn fetch_preview(api: &HttpCorporaApi, url: &str) -> Option<LinkPreview> {
    let url = match validate_url(url) {
        Ok(url) => url,
        Err(e) => {
            debug!(url, error = %e, "Link preview skipped");
            return None;
        }
    };
    match api.fetch_external_text(&url).await {
        Ok(html) => Some(parse_preview(&url, &html)).filter(|p| !p.is_empty()),
        Err(e) => {
            debug!(url = %url, error = %e, "Link preview unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert_eq!(
            validate_url(" https://example.org/emma?page=2 ").unwrap(),
            "https://example.org/emma?page=2"
        );
        assert!(validate_url("http://localhost:8000").is_ok());
        assert!(validate_url("ftp://example.org").is_err());
        assert!(validate_url("example.org").is_err());
        assert!(validate_url("https://exa mple.org").is_err());
    }

    #[test]
    fn test_validate_url_accepts_any_host_form() {
        assert!(validate_url("https://[::1]/").is_ok());
        assert!(validate_url("https://reader@example.org/emma").is_ok());
        assert!(validate_url("https://münchen.de").is_ok());
        assert!(validate_url("http://192.168.0.10:8080/iiif").is_ok());
        assert!(validate_url("mailto:reader@example.org").is_err());
    }

    #[test]
    fn test_parse_open_graph() {
        let html = r#"<html><head>
            <title>Fallback</title>
            <meta property="og:title" content="Emma &amp; Harriet">
            <meta name="description" content="Austen&#8217;s novel">
            <meta content='https://example.org/cover.jpg' property='og:image' />
        </head></html>"#;
        let preview = parse_preview("https://example.org", html);
        assert_eq!(preview.title.as_deref(), Some("Emma & Harriet"));
        assert_eq!(preview.description.as_deref(), Some("Austen\u{2019}s novel"));
        assert_eq!(
            preview.thumbnail.as_deref(),
            Some("https://example.org/cover.jpg")
        );
    }

    #[test]
    fn test_title_fallback_and_empty() {
        let preview = parse_preview("https://example.org", "<title>\n Emma \n</title>");
        assert_eq!(preview.title.as_deref(), Some("Emma"));
        assert!(parse_preview("https://example.org", "<p>nothing</p>").is_empty());
    }
}
