//! Place search with primary/fallback geocoders.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use super::http::AsyncHttpClient;
use super::types::FetchError;
use crate::feature::{OsmRef, OsmType};
use crate::geometry::GeoPoint;

pub const PHOTON_URL: &str = "https://photon.komoot.io/api/";
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

const PHOTON_LIMIT: &str = "10";
const NOMINATIM_LIMIT: &str = "8";
/// Queries shorter than this (in characters, after trimming) are not sent.
pub const MIN_QUERY_CHARS: usize = 2;

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeCandidate {
    pub name: String,
    pub display_name: String,
    pub location: GeoPoint,
    pub osm: Option<OsmRef>,
}

#[derive(Debug, Deserialize)]
struct PhotonResponse {
    #[serde(default)]
    features: Vec<PhotonFeature>,
}

#[derive(Debug, Deserialize)]
struct PhotonFeature {
    geometry: PhotonGeometry,
    #[serde(default)]
    properties: PhotonProperties,
}

#[derive(Debug, Deserialize)]
struct PhotonGeometry {
    coordinates: GeoPoint,
}

#[derive(Debug, Default, Deserialize)]
struct PhotonProperties {
    osm_id: Option<u64>,
    osm_type: Option<String>,
    name: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    name: Option<String>,
    osm_id: Option<u64>,
    osm_type: Option<String>,
}

fn first_segment(label: &str) -> String {
    label.split(',').next().unwrap_or_default().trim().to_string()
}

impl PhotonFeature {
    fn into_candidate(self) -> GeocodeCandidate {
        let p = self.properties;
        let label = [&p.name, &p.city, &p.state, &p.country]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let kind = match p.osm_type.as_deref() {
            Some("R") => OsmType::Relation,
            Some("W") => OsmType::Way,
            _ => OsmType::Node,
        };

        GeocodeCandidate {
            name: p.name.clone().unwrap_or_else(|| first_segment(&label)),
            display_name: label,
            location: self.geometry.coordinates,
            osm: p.osm_id.map(|id| OsmRef::new(id, kind)),
        }
    }
}

impl NominatimPlace {
    fn into_candidate(self) -> Option<GeocodeCandidate> {
        let lat = self.lat.parse().ok()?;
        let lon = self.lon.parse().ok()?;
        let kind = self.osm_type.as_deref().and_then(|t| t.parse::<OsmType>().ok());

        Some(GeocodeCandidate {
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| first_segment(&self.display_name)),
            display_name: self.display_name,
            location: GeoPoint::new(lon, lat),
            osm: self.osm_id.zip(kind).map(|(id, kind)| OsmRef::new(id, kind)),
        })
    }
}

/// Free-text place search.
///
/// The primary service is tried first; on any failure (transport, status,
/// timeout or malformed body) the fallback is queried instead.
pub struct Geocoder<C> {
    http: C,
    timeout: Duration,
    language: String,
    primary_url: String,
    fallback_url: String,
}

impl<C: AsyncHttpClient> Geocoder<C> {
    pub fn new(http: C, timeout: Duration, language: impl Into<String>) -> Self {
        Self {
            http,
            timeout,
            language: language.into(),
            primary_url: PHOTON_URL.to_string(),
            fallback_url: NOMINATIM_URL.to_string(),
        }
    }

    pub fn with_urls(mut self, primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        self.primary_url = primary.into();
        self.fallback_url = fallback.into();
        self
    }

    /// Searches for places matching `text`.
    ///
    /// Returns an empty list without touching the network for queries
    /// shorter than [`MIN_QUERY_CHARS`].
    pub async fn search(&self, text: &str) -> Result<Vec<GeocodeCandidate>, FetchError> {
        let query = text.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }

        let primary_error = match self.search_primary(query).await {
            Ok(candidates) => {
                debug!(query, results = candidates.len(), "Primary geocoder answered");
                return Ok(candidates);
            }
            Err(e) => {
                warn!(query, error = %e, "Primary geocoder failed, using fallback");
                e
            }
        };

        match self.search_fallback(query).await {
            Ok(candidates) => {
                debug!(query, results = candidates.len(), "Fallback geocoder answered");
                Ok(candidates)
            }
            Err(e) => Err(FetchError::Exhausted {
                attempts: 2,
                last: format!("{}; {}", primary_error, e),
            }),
        }
    }

    async fn search_primary(&self, query: &str) -> Result<Vec<GeocodeCandidate>, String> {
        let url = Url::parse_with_params(
            &self.primary_url,
            &[("q", query), ("limit", PHOTON_LIMIT), ("lang", self.language.as_str())],
        )
        .map_err(|e| e.to_string())?;

        let body = self
            .http
            .get(url.as_str(), self.timeout)
            .await
            .map_err(|e| e.to_string())?;
        let response: PhotonResponse = serde_json::from_slice(&body).map_err(|e| e.to_string())?;

        Ok(response
            .features
            .into_iter()
            .map(PhotonFeature::into_candidate)
            .collect())
    }

    async fn search_fallback(&self, query: &str) -> Result<Vec<GeocodeCandidate>, String> {
        let url = Url::parse_with_params(
            &self.fallback_url,
            &[
                ("q", query),
                ("format", "jsonv2"),
                ("limit", NOMINATIM_LIMIT),
                ("addressdetails", "1"),
                ("accept-language", self.language.as_str()),
            ],
        )
        .map_err(|e| e.to_string())?;

        let body = self
            .http
            .get(url.as_str(), self.timeout)
            .await
            .map_err(|e| e.to_string())?;
        let places: Vec<NominatimPlace> = serde_json::from_slice(&body).map_err(|e| e.to_string())?;

        Ok(places.into_iter().filter_map(NominatimPlace::into_candidate).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http::tests::MockAsyncHttpClient;
    use crate::provider::ProviderError;

    const PHOTON_BODY: &str = r#"{"features": [
        {"type": "Feature",
         "geometry": {"type": "Point", "coordinates": [39.7, 47.23]},
         "properties": {"osm_id": 1285772, "osm_type": "R", "name": "Ростов-на-Дону",
                        "state": "Ростовская область", "country": "Россия"}}
    ]}"#;

    const NOMINATIM_BODY: &str = r#"[
        {"place_id": 1, "osm_type": "relation", "osm_id": 1285772,
         "lat": "47.2224", "lon": "39.7187",
         "display_name": "Ростов-на-Дону, Ростовская область, Россия", "name": ""}
    ]"#;

    fn geocoder(mock: MockAsyncHttpClient) -> Geocoder<MockAsyncHttpClient> {
        Geocoder::new(mock, Duration::from_secs(5), "ru")
    }

    #[tokio::test]
    async fn test_short_query_is_not_sent() {
        let mock = MockAsyncHttpClient::responding(PHOTON_BODY.as_bytes().to_vec());
        let results = geocoder(mock.clone()).search(" р ").await.unwrap();
        assert!(results.is_empty());
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_primary_result_mapping() {
        let mock = MockAsyncHttpClient::responding(PHOTON_BODY.as_bytes().to_vec());
        let results = geocoder(mock.clone()).search("Ростов").await.unwrap();

        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.name, "Ростов-на-Дону");
        assert_eq!(hit.display_name, "Ростов-на-Дону, Ростовская область, Россия");
        assert_eq!(hit.osm, Some(OsmRef::new(1285772, OsmType::Relation)));
        assert_eq!(hit.location, GeoPoint::new(39.7, 47.23));

        let url = &mock.requests()[0].url;
        assert!(url.starts_with(PHOTON_URL));
        assert!(url.contains("limit=10"));
        assert!(url.contains("lang=ru"));
    }

    #[tokio::test]
    async fn test_fallback_on_primary_failure() {
        let mock = MockAsyncHttpClient::new(|url, _| {
            if url.starts_with(PHOTON_URL) {
                Err(ProviderError::Timeout(url.to_string()))
            } else {
                Ok(NOMINATIM_BODY.as_bytes().to_vec())
            }
        });
        let results = geocoder(mock.clone()).search("Ростов").await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Ростов-на-Дону");
        assert_eq!(results[0].location, GeoPoint::new(39.7187, 47.2224));
        assert_eq!(mock.request_count(), 2);
        assert!(mock.requests()[1].url.contains("format=jsonv2"));
    }

    #[tokio::test]
    async fn test_both_fail() {
        let err = geocoder(MockAsyncHttpClient::failing()).search("Ростов").await.unwrap_err();
        assert!(matches!(err, FetchError::Exhausted { attempts: 2, .. }));
    }
}
