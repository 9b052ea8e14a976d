use crate::UrlError;
use url::Url;

/// Tracking query parameters dropped from article links
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "guccounter", "guce_referrer"];

/// Resolves an href found on `base` into the canonical link used for fetching,
/// the seen-set, and the dedup gate
///
/// # Normalization Steps
///
/// 1. Reject empty and fragment-only hrefs
/// 2. Qualify relative hrefs against the page they were found on
/// 3. Accept only HTTP and HTTPS
/// 4. Remove the fragment
/// 5. Remove tracking query parameters (`utm_*` and a fixed list)
/// 6. Sort remaining query parameters, dropping an empty query string
///
/// # Examples
///
/// ```
/// use news_wave::url::resolve_href;
/// use url::Url;
///
/// let base = Url::parse("https://news.example.com/").unwrap();
/// let link = resolve_href("/news/story-1.html#comments", &base).unwrap();
/// assert_eq!(link.as_str(), "https://news.example.com/news/story-1.html");
/// ```
pub fn resolve_href(href: &str, base: &Url) -> Result<Url, UrlError> {
    let href = href.trim();

    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    if href.starts_with('#') {
        return Err(UrlError::FragmentOnly(href.to_string()));
    }

    let url = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    canonicalize(url)
}

/// Parses an absolute URL string into its canonical form
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(url)
}

fn canonicalize(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
