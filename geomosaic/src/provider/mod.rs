//! Remote service clients
//!
//! Everything that talks to the network goes through the [`AsyncHttpClient`]
//! trait so that fetch logic can be exercised against scripted responses.
//!
//! - [`OverpassClient`]: geodata queries with mirror failover
//! - [`Geocoder`]: free-text place search with a fallback service
//! - [`TileSource`] / [`MapStyle`]: raster tile URL templates
//!
//! ```ignore
//! use geomosaic::provider::{AsyncReqwestClient, OverpassClient};
//!
//! let http = AsyncReqwestClient::new()?;
//! let overpass = OverpassClient::with_default_endpoints(http);
//! let response = overpass.run(query, timeout, &cancel).await?;
//! ```

mod geocode;
mod http;
mod overpass;
mod tiles;
mod types;

pub use geocode::{GeocodeCandidate, Geocoder, MIN_QUERY_CHARS, NOMINATIM_URL, PHOTON_URL};
pub use http::{AsyncHttpClient, AsyncReqwestClient, BoxFuture, USER_AGENT};
pub use overpass::{Element, LatLon, Member, OverpassClient, OverpassResponse, DEFAULT_OVERPASS_ENDPOINTS};
pub use tiles::{MapStyle, TileSource, OSM_TEMPLATE, STREETS_TEMPLATE};
pub use types::{FetchError, ProviderError};

#[cfg(test)]
pub use http::tests::{MockAsyncHttpClient, MockRequest};
