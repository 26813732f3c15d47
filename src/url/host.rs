use url::Url;

/// Returns the grouping key for a page's site: the lowercase host plus any
/// explicit non-default port
///
/// Pages are grouped by this key in store statistics. `None` only for URLs
/// without a host, which never pass [`normalize_url`](super::normalize_url).
///
/// ```
/// use url::Url;
/// use ripple_search::url::host_key;
///
/// let url = Url::parse("http://Docs.Example.com:8080/a").unwrap();
/// assert_eq!(host_key(&url), Some("docs.example.com:8080".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}
