//! Boundary, road and settlement fetching.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::assemble::assemble_boundary;
use super::query::{boundary_query, enclosing_areas_query, roads_query, settlements_query, AreaSelector};
use crate::feature::{BoundaryFeature, OsmType, RoadFeature};
use crate::geometry::GeoPoint;
use crate::provider::{AsyncHttpClient, Element, FetchError, OverpassClient};
use crate::roads::{dedupe, RawRoadWay, RoadFetchOptions, RoadQueryCache, RoadQuerySignature};

/// Default patience for boundary and settlement queries.
pub const DEFAULT_BOUNDARY_TIMEOUT: Duration = Duration::from_secs(45);
/// Default patience for road queries, which return far more data.
pub const DEFAULT_ROADS_TIMEOUT: Duration = Duration::from_secs(60);

fn admin_level(element: &Element) -> i32 {
    element
        .tag("admin_level")
        .and_then(|v| v.parse().ok())
        .unwrap_or(10)
}

fn road_ways(elements: Vec<Element>) -> Vec<RawRoadWay> {
    elements
        .into_iter()
        .filter_map(|element| match element {
            Element::Way {
                id,
                geometry: Some(geometry),
                tags,
            } => Some(RawRoadWay {
                way_id: Some(id),
                tags,
                points: geometry.into_iter().map(GeoPoint::from).collect(),
            }),
            _ => None,
        })
        .collect()
}

/// Fetches features from the geodata service.
pub struct BoundaryFetcher<C> {
    overpass: OverpassClient<C>,
    boundary_timeout: Duration,
    roads_timeout: Duration,
    road_cache: Option<Arc<RoadQueryCache>>,
}

impl<C: AsyncHttpClient> BoundaryFetcher<C> {
    pub fn new(overpass: OverpassClient<C>) -> Self {
        Self {
            overpass,
            boundary_timeout: DEFAULT_BOUNDARY_TIMEOUT,
            roads_timeout: DEFAULT_ROADS_TIMEOUT,
            road_cache: None,
        }
    }

    pub fn with_timeouts(mut self, boundary: Duration, roads: Duration) -> Self {
        self.boundary_timeout = boundary;
        self.roads_timeout = roads;
        self
    }

    pub fn with_road_cache(mut self, cache: Arc<RoadQueryCache>) -> Self {
        self.road_cache = Some(cache);
        self
    }

    pub fn road_cache(&self) -> Option<&Arc<RoadQueryCache>> {
        self.road_cache.as_ref()
    }

    /// Fetches and assembles a boundary from one or more element ids.
    ///
    /// When the ids resolve to a node, the most local enclosing
    /// administrative relation (highest admin level among 4, 5, 6 and 8) is
    /// used instead. If that lookup finds nothing the node itself is
    /// returned as a point feature.
    pub async fn fetch_by_ids(
        &self,
        ids: &[u64],
        kind: OsmType,
        cancel: &CancellationToken,
    ) -> Result<Option<BoundaryFeature>, FetchError> {
        if ids.is_empty() {
            return Ok(None);
        }

        let response = self
            .overpass
            .run(&boundary_query(ids, kind), self.boundary_timeout, cancel)
            .await?;
        let mut elements = response.elements;

        if let Some(Element::Node { lat, lon, .. }) = elements.first() {
            let at = GeoPoint::new(*lon, *lat);
            match self
                .overpass
                .run(&enclosing_areas_query(at), self.boundary_timeout, cancel)
                .await
            {
                Ok(enclosing) => {
                    if let Some(best) = enclosing.elements.into_iter().max_by_key(admin_level) {
                        debug!(level = admin_level(&best), "Node resolved to enclosing area");
                        elements = vec![best];
                    }
                }
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(e) => warn!(error = %e, "Enclosing area lookup failed, keeping node"),
            }
        }

        let feature = assemble_boundary(&elements, ids);
        match &feature {
            Some(f) => info!(id = f.id(), name = f.name(), "Boundary fetched"),
            None => warn!(?ids, %kind, "No drawable geometry for selection"),
        }
        Ok(feature)
    }

    /// Fetches roads inside each target and merges the results.
    ///
    /// One query is issued per target; all must succeed. Results are cached
    /// under a signature of the target set and class flags.
    pub async fn fetch_roads(
        &self,
        targets: &[BoundaryFeature],
        options: RoadFetchOptions,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<RoadFeature>>, FetchError> {
        if options.is_empty() || targets.is_empty() {
            return Ok(Arc::new(Vec::new()));
        }

        let signature = RoadQuerySignature::new(targets.iter().map(BoundaryFeature::id), options);
        if let Some(cached) = self.road_cache.as_ref().and_then(|c| c.get(&signature)) {
            debug!(key = %signature, roads = cached.len(), "Road query served from cache");
            return Ok(cached);
        }

        let queries: Vec<String> = targets
            .iter()
            .filter_map(AreaSelector::for_boundary)
            .filter_map(|area| roads_query(&area, options))
            .collect();

        let responses = try_join_all(
            queries
                .iter()
                .map(|q| self.overpass.run(q, self.roads_timeout, cancel)),
        )
        .await?;

        let roads = Arc::new(dedupe(responses.into_iter().map(|r| road_ways(r.elements))));
        info!(targets = targets.len(), roads = roads.len(), "Roads fetched");

        if let Some(cache) = &self.road_cache {
            cache.insert(signature, roads.clone());
        }
        Ok(roads)
    }

    /// Fetches city and town boundaries inside each target.
    pub async fn fetch_settlements(
        &self,
        targets: &[BoundaryFeature],
        cancel: &CancellationToken,
    ) -> Result<Vec<BoundaryFeature>, FetchError> {
        let queries: Vec<String> = targets
            .iter()
            .filter_map(AreaSelector::for_boundary)
            .map(|area| settlements_query(&area))
            .collect();

        let responses = try_join_all(
            queries
                .iter()
                .map(|q| self.overpass.run(q, self.boundary_timeout, cancel)),
        )
        .await?;

        let mut seen = HashSet::new();
        let settlements: Vec<BoundaryFeature> = responses
            .into_iter()
            .flat_map(|r| r.elements)
            .filter_map(|element| {
                let id = element.id()?;
                assemble_boundary(std::slice::from_ref(&element), &[id])
            })
            .filter(|f| seen.insert(f.id().to_string()))
            .collect();

        info!(targets = targets.len(), settlements = settlements.len(), "Settlements fetched");
        Ok(settlements)
    }
}
