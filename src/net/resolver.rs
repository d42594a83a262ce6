//! DNS-over-HTTPS resolution for region-blocked API hosts.
//!
//! Some networks poison DNS answers for the platform's API domains. The
//! bypass resolves those domains through public DNS-over-HTTPS endpoints
//! instead of the system resolver. Only a fixed allow-list of hosts is
//! affected; every other name, and every DoH failure, falls back to
//! ordinary system resolution so enabling the bypass can never make a
//! working network worse.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Hosts that are resolved through DoH instead of the system resolver.
pub(crate) const BYPASS_HOSTS: [&str; 4] = [
    "app-api.pixiv.net",
    "public-api.secure.pixiv.net",
    "www.pixiv.net",
    "oauth.secure.pixiv.net",
];

/// All API hosts share edge addresses with this unblocked sister domain,
/// so its A record is what gets queried.
const PROBE_HOST: &str = "www.pixivision.net";

const RESOLVER_URLS: [&str; 5] = [
    "https://cloudflare-dns.com/dns-query",
    "https://1.0.0.1/dns-query",
    "https://1.1.1.1/dns-query",
    "https://[2606:4700:4700::1001]/dns-query",
    "https://[2606:4700:4700::1111]/dns-query",
];

const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON answer envelope of the `application/dns-json` wire format.
#[derive(Debug, Deserialize)]
struct DnsResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DnsAnswer>,
}

#[derive(Debug, Deserialize)]
struct DnsAnswer {
    data: String,
}

/// DNS-over-HTTPS resolver plugged into reqwest via [`Resolve`].
#[derive(Debug, Clone)]
pub struct DohResolver {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    resolver_urls: Vec<String>,
    probe_host: String,
    timeout: Duration,
    // Created on first use and reused for every query afterwards.
    http: OnceCell<reqwest::Client>,
}

impl Default for DohResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DohResolver {
    /// Creates a resolver using the default public DoH endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolvers(RESOLVER_URLS.iter().map(ToString::to_string).collect())
    }

    /// Creates a resolver querying the given DoH endpoints in order.
    #[must_use]
    pub fn with_resolvers(resolver_urls: Vec<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                resolver_urls,
                probe_host: PROBE_HOST.to_string(),
                timeout: QUERY_TIMEOUT,
                http: OnceCell::new(),
            }),
        }
    }

    /// Resolves `host` through DoH when it is on the allow-list.
    ///
    /// Returns `None` for any other host, and for allow-listed hosts when
    /// every resolver fails.
    pub async fn lookup(&self, host: &str) -> Option<IpAddr> {
        if !BYPASS_HOSTS.contains(&host) {
            return None;
        }
        for url in &self.inner.resolver_urls {
            match self.query(url).await {
                Some(ip) => {
                    debug!(host, %ip, resolver = %url, "resolved via DoH");
                    return Some(IpAddr::V4(ip));
                }
                None => {
                    warn!(host, resolver = %url, "DoH resolver failed, trying next");
                }
            }
        }
        None
    }

    /// Queries one DoH endpoint for the probe host's first IPv4 answer.
    async fn query(&self, resolver_url: &str) -> Option<Ipv4Addr> {
        let client = self
            .inner
            .http
            .get_or_try_init(|| async {
                reqwest::Client::builder().timeout(self.inner.timeout).build()
            })
            .await
            .ok()?;
        let response = client
            .get(resolver_url)
            .query(&[
                ("ct", "application/dns-json"),
                ("name", self.inner.probe_host.as_str()),
                ("type", "A"),
                ("do", "false"),
                ("cd", "false"),
            ])
            .header(ACCEPT, "application/dns-json")
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let parsed: DnsResponse = response.json().await.ok()?;
        parsed
            .answer
            .iter()
            .find_map(|answer| answer.data.parse::<Ipv4Addr>().ok())
    }
}

impl Resolve for DohResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            let host = name.as_str().to_string();
            if let Some(ip) = resolver.lookup(&host).await {
                // The hostname stays in the URL, so the Host header and
                // TLS SNI still carry the original name.
                let addrs: Addrs = Box::new(std::iter::once(SocketAddr::new(ip, 0)));
                return Ok(addrs);
            }
            let addrs = tokio::net::lookup_host((host.as_str(), 0))
                .await?
                .collect::<Vec<_>>();
            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn answer_body(records: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "Status": 0,
            "Answer": records
                .iter()
                .map(|data| serde_json::json!({"name": PROBE_HOST, "type": 1, "data": data}))
                .collect::<Vec<_>>(),
        })
    }

    #[tokio::test]
    async fn test_allow_listed_host_uses_doh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dns-query"))
            .and(query_param("name", PROBE_HOST))
            .and(query_param("type", "A"))
            .and(header("accept", "application/dns-json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer_body(&["210.140.139.155"])))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = DohResolver::with_resolvers(vec![format!("{}/dns-query", server.uri())]);
        let ip = resolver.lookup("app-api.pixiv.net").await;
        assert_eq!(ip, Some("210.140.139.155".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_other_hosts_never_query_doh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer_body(&["1.2.3.4"])))
            .expect(0)
            .mount(&server)
            .await;

        let resolver = DohResolver::with_resolvers(vec![format!("{}/dns-query", server.uri())]);
        assert_eq!(resolver.lookup("example.com").await, None);
    }

    #[tokio::test]
    async fn test_non_ipv4_answers_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer_body(&[
                "some-cname.pixivision.net.",
                "2606:4700::1",
                "210.140.139.155",
            ])))
            .mount(&server)
            .await;

        let resolver = DohResolver::with_resolvers(vec![format!("{}/dns-query", server.uri())]);
        let ip = resolver.lookup("www.pixiv.net").await;
        assert_eq!(ip, Some("210.140.139.155".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_failing_resolver_falls_through_to_next() {
        let broken = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&broken)
            .await;
        let working = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer_body(&["210.140.139.155"])))
            .mount(&working)
            .await;

        let resolver = DohResolver::with_resolvers(vec![
            format!("{}/dns-query", broken.uri()),
            format!("{}/dns-query", working.uri()),
        ]);
        let ip = resolver.lookup("oauth.secure.pixiv.net").await;
        assert_eq!(ip, Some("210.140.139.155".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_all_resolvers_failing_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let resolver = DohResolver::with_resolvers(vec![format!("{}/dns-query", server.uri())]);
        assert_eq!(resolver.lookup("app-api.pixiv.net").await, None);
    }

    #[tokio::test]
    async fn test_empty_answer_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer_body(&[])))
            .mount(&server)
            .await;

        let resolver = DohResolver::with_resolvers(vec![format!("{}/dns-query", server.uri())]);
        assert_eq!(resolver.lookup("www.pixiv.net").await, None);
    }
}
