//! Client address resolution from request headers.

use std::net::IpAddr;

use reqwest::header::HeaderMap;

/// Headers consulted for the client address, most specific first.
pub const CLIENT_IP_HEADERS: [&str; 5] = [
    "client-ip",
    "x-forwarded-for",
    "x-forwarded",
    "forwarded-for",
    "forwarded",
];

/// The client address a request claims, falling back to the peer address.
///
/// Header values are returned as sent; `None` when nothing is known.
pub fn client_ip(headers: &HeaderMap, remote_addr: Option<IpAddr>) -> Option<String> {
    CLIENT_IP_HEADERS
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .map(str::to_string)
        .or_else(|| remote_addr.map(|addr| addr.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::net::Ipv4Addr;

    #[test]
    fn test_prefers_client_ip_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("10.0.0.2"));
        headers.insert("Client-IP", HeaderValue::from_static("10.0.0.1"));

        assert_eq!(client_ip(&headers, None).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_header_order() {
        let mut headers = HeaderMap::new();
        headers.insert("Forwarded", HeaderValue::from_static("for=10.0.0.9"));
        headers.insert("X-Forwarded", HeaderValue::from_static("10.0.0.3"));

        assert_eq!(client_ip(&headers, None).as_deref(), Some("10.0.0.3"));
    }

    #[test]
    fn test_falls_back_to_remote_addr() {
        let remote = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7));
        assert_eq!(
            client_ip(&HeaderMap::new(), Some(remote)).as_deref(),
            Some("192.0.2.7")
        );
    }

    #[test]
    fn test_unknown() {
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }
}
