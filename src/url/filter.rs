/// Path segment that marks an article link on the default site
pub const DEFAULT_LINK_MARKER: &str = "/news/";

/// Decides whether an href points at a crawlable article
///
/// An href is crawlable when it contains the article-path marker. Absolute and
/// site-relative forms are treated alike; relative hrefs are qualified against
/// the page origin later, before fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFilter {
    marker: String,
}

impl LinkFilter {
    /// Creates a filter for the given path marker
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// The path marker this filter looks for
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Returns true if `href` is a crawlable article link
    pub fn is_crawlable(&self, href: &str) -> bool {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return false;
        }
        href.contains(self.marker.as_str())
    }
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_MARKER)
    }
}

/// Returns true if `href` contains the default `/news/` marker
///
/// # Examples
///
/// ```
/// use news_wave::url::is_crawlable;
///
/// assert!(is_crawlable("https://example.com/news/article"));
/// assert!(is_crawlable("/news/living/378672"));
/// assert!(!is_crawlable("/living/378672"));
/// assert!(!is_crawlable(""));
/// ```
pub fn is_crawlable(href: &str) -> bool {
    LinkFilter::default().is_crawlable(href)
}
