//! Target URL and request header construction

use crate::contracts::{HttpHeader, Scheme};
use crate::error::{ProbeError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;

/// Join host and port, bracketing IPv6 literals
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Build the probe URL from its parts.
///
/// The path is parsed relative to `scheme://host:port/` and only its path,
/// query and fragment are kept. A path that does not parse is set verbatim
/// (percent-encoded) so the probe is still attempted.
pub fn format_url(scheme: Scheme, host: &str, port: u16, path: &str) -> Result<Url> {
    let base = format!("{}://{}", scheme, join_host_port(host, port));
    let mut url = Url::parse(&base).map_err(|e| ProbeError::invalid_url(base.as_str(), e))?;

    match url.join(path) {
        Ok(parsed) => {
            url.set_path(parsed.path());
            url.set_query(parsed.query());
            url.set_fragment(parsed.fragment());
        }
        Err(_) => url.set_path(path),
    }

    Ok(url)
}

/// Convert a header list into a header map, appending repeated names
pub fn build_headers(headers: &[HttpHeader]) -> std::result::Result<HeaderMap, String> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for header in headers {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|e| format!("invalid header name {:?}: {}", header.name, e))?;
        let value = HeaderValue::from_str(&header.value)
            .map_err(|e| format!("invalid value for header {}: {}", header.name, e))?;
        map.append(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_host_port() {
        assert_eq!(join_host_port("127.0.0.1", 8080), "127.0.0.1:8080");
        assert_eq!(join_host_port("::1", 8080), "[::1]:8080");
        assert_eq!(join_host_port("[::1]", 8080), "[::1]:8080");
        assert_eq!(join_host_port("example.com", 443), "example.com:443");
    }

    #[test]
    fn test_format_url_plain_path() {
        let url = format_url(Scheme::Http, "127.0.0.1", 8080, "/success").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/success");
    }

    #[test]
    fn test_format_url_keeps_query() {
        let url = format_url(Scheme::Https, "10.0.0.1", 8443, "/healthz?verbose=1").unwrap();
        assert_eq!(url.as_str(), "https://10.0.0.1:8443/healthz?verbose=1");
    }

    #[test]
    fn test_format_url_empty_and_relative_paths() {
        let url = format_url(Scheme::Http, "10.0.0.1", 80, "").unwrap();
        assert_eq!(url.path(), "/");

        let url = format_url(Scheme::Http, "10.0.0.1", 8080, "ready").unwrap();
        assert_eq!(url.path(), "/ready");
    }

    #[test]
    fn test_format_url_ipv6_host() {
        let url = format_url(Scheme::Http, "::1", 8080, "/x").unwrap();
        assert_eq!(url.as_str(), "http://[::1]:8080/x");
    }

    #[test]
    fn test_format_url_absolute_path_cannot_change_host() {
        let url = format_url(Scheme::Http, "10.0.0.1", 8080, "http://elsewhere:9999/steal").unwrap();
        assert_eq!(url.host_str(), Some("10.0.0.1"));
        assert_eq!(url.port(), Some(8080));
        assert_eq!(url.path(), "/steal");
    }

    #[test]
    fn test_format_url_malformed_path_is_still_usable() {
        let url = format_url(Scheme::Http, "10.0.0.1", 8080, "/a b/%zz").unwrap();
        assert_eq!(url.host_str(), Some("10.0.0.1"));
        assert!(url.path().starts_with("/a%20b/"));
    }

    #[test]
    fn test_format_url_rejects_empty_host() {
        let err = format_url(Scheme::Http, "", 8080, "/").unwrap_err();
        assert!(matches!(err, ProbeError::InvalidUrl { .. }));
    }

    #[test]
    fn test_build_headers_appends_repeats() {
        let headers = vec![
            HttpHeader::new("X-Custom", "a"),
            HttpHeader::new("X-Custom", "b"),
            HttpHeader::new("Host", "probe.example"),
        ];
        let map = build_headers(&headers).unwrap();
        let values: Vec<_> = map.get_all("x-custom").iter().collect();
        assert_eq!(values.len(), 2);
        assert_eq!(map.get("host").unwrap(), "probe.example");
    }

    #[test]
    fn test_build_headers_rejects_invalid_name() {
        let err = build_headers(&[HttpHeader::new("bad header", "x")]).unwrap_err();
        assert!(err.contains("bad header"));
    }
}
