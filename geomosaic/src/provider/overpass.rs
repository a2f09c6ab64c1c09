//! Geodata query service client.
//!
//! Queries are POSTed as a `data=` form field to each configured mirror in
//! order. The first response that parses wins; transport errors, non-2xx
//! statuses and unparseable bodies all fall through to the next mirror.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::http::AsyncHttpClient;
use super::types::FetchError;
use crate::geometry::GeoPoint;

/// Public mirrors, in the order they are tried.
pub const DEFAULT_OVERPASS_ENDPOINTS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://overpass.osm.ch/api/interpreter",
];

/// Parsed `[out:json]` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Coordinate pair as emitted by `out geom`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl From<LatLon> for GeoPoint {
    fn from(p: LatLon) -> Self {
        GeoPoint::new(p.lon, p.lat)
    }
}

/// Relation member with inline geometry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "ref", default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Option<Vec<LatLon>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node {
        id: u64,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Way {
        id: u64,
        #[serde(default)]
        geometry: Option<Vec<LatLon>>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Relation {
        id: u64,
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    #[serde(other)]
    Other,
}

impl Element {
    pub fn id(&self) -> Option<u64> {
        match self {
            Element::Node { id, .. } | Element::Way { id, .. } | Element::Relation { id, .. } => Some(*id),
            Element::Other => None,
        }
    }

    pub fn tags(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Element::Node { tags, .. } | Element::Way { tags, .. } | Element::Relation { tags, .. } => Some(tags),
            Element::Other => None,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags().and_then(|t| t.get(key)).map(String::as_str)
    }
}

/// Client that fails over across geodata mirrors.
#[derive(Clone)]
pub struct OverpassClient<C> {
    http: C,
    endpoints: Vec<String>,
}

impl<C: AsyncHttpClient> OverpassClient<C> {
    pub fn new(http: C, endpoints: Vec<String>) -> Self {
        Self { http, endpoints }
    }

    /// Client using [`DEFAULT_OVERPASS_ENDPOINTS`].
    pub fn with_default_endpoints(http: C) -> Self {
        Self::new(http, DEFAULT_OVERPASS_ENDPOINTS.iter().map(|s| s.to_string()).collect())
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Runs a query, trying each mirror in turn.
    ///
    /// Cancellation is checked before every attempt and raced against the
    /// in-flight request, which is dropped (and so aborted) when the token
    /// fires.
    pub async fn run(
        &self,
        query: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<OverpassResponse, FetchError> {
        let mut last = String::from("no endpoints configured");

        for (attempt, url) in self.endpoints.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let form = [("data", query)];
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                result = self.http.post_form(url, &form, timeout) => result,
            };

            match result {
                Ok(body) => match serde_json::from_slice::<OverpassResponse>(&body) {
                    Ok(response) => {
                        debug!(
                            endpoint = %url,
                            attempt = attempt + 1,
                            elements = response.elements.len(),
                            "Geodata query answered"
                        );
                        return Ok(response);
                    }
                    Err(e) => {
                        warn!(endpoint = %url, error = %e, "Unparseable geodata response, trying next mirror");
                        last = e.to_string();
                    }
                },
                Err(e) => {
                    warn!(endpoint = %url, error = %e, "Geodata mirror failed, trying next");
                    last = e.to_string();
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts: self.endpoints.len(),
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http::tests::MockAsyncHttpClient;
    use crate::provider::ProviderError;

    const SAMPLE: &str = r#"{
        "version": 0.6,
        "elements": [
            {"type": "node", "id": 1, "lat": 55.75, "lon": 37.62, "tags": {"place": "city"}},
            {"type": "way", "id": 2, "geometry": [{"lat": 1.0, "lon": 2.0}, {"lat": 3.0, "lon": 4.0}]},
            {"type": "relation", "id": 3, "tags": {"name": "R"}, "members": [
                {"type": "way", "ref": 2, "role": "outer", "geometry": [{"lat": 1.0, "lon": 2.0}]},
                {"type": "node", "ref": 1, "role": "admin_centre", "lat": 55.75, "lon": 37.62}
            ]},
            {"type": "area", "id": 4}
        ]
    }"#;

    fn endpoints() -> Vec<String> {
        vec!["https://a.example/api".into(), "https://b.example/api".into()]
    }

    #[test]
    fn test_parse_elements() {
        let response: OverpassResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(response.elements.len(), 4);
        assert!(matches!(response.elements[0], Element::Node { id: 1, .. }));
        assert_eq!(response.elements[2].tag("name"), Some("R"));
        assert_eq!(response.elements[3], Element::Other);
        if let Element::Relation { members, .. } = &response.elements[2] {
            assert_eq!(members[0].role, "outer");
            assert_eq!(members[1].geometry, None);
        } else {
            panic!("expected relation");
        }
    }

    #[tokio::test]
    async fn test_failover_to_second_mirror() {
        let mock = MockAsyncHttpClient::new(|url, _| {
            if url.starts_with("https://a.") {
                Err(ProviderError::Status {
                    status: 504,
                    url: url.to_string(),
                })
            } else {
                Ok(SAMPLE.as_bytes().to_vec())
            }
        });
        let client = OverpassClient::new(mock.clone(), endpoints());

        let response = client
            .run("[out:json];node(1);out;", Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.elements.len(), 4);
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].body.as_deref(), Some("data=[out:json];node(1);out;"));
    }

    #[tokio::test]
    async fn test_garbage_body_falls_through() {
        let mock = MockAsyncHttpClient::responding(b"<html>rate limited</html>".to_vec());
        let client = OverpassClient::new(mock.clone(), endpoints());

        let err = client
            .run("q", Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Exhausted { attempts: 2, .. }));
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mock = MockAsyncHttpClient::responding(SAMPLE.as_bytes().to_vec());
        let client = OverpassClient::new(mock.clone(), endpoints());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client.run("q", Duration::from_secs(5), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_request() {
        let mock = MockAsyncHttpClient::responding(SAMPLE.as_bytes().to_vec())
            .with_delay(|_| Duration::from_secs(20));
        let client = OverpassClient::new(mock.clone(), endpoints());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = client.run("q", Duration::from_secs(45), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_no_endpoints() {
        let client = OverpassClient::new(MockAsyncHttpClient::failing(), Vec::new());
        let err = client
            .run("q", Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Exhausted { attempts: 0, .. }));
    }
}
