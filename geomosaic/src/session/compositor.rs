//! The compositing session.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::settings::{ExportSettings, StyleSettings};
use super::slot::{FetchSlot, FetchTicket, SlotMode};
use super::state::{SessionEvent, SessionState};
use super::SessionError;
use crate::boundary::BoundaryFetcher;
use crate::coord::{CoordError, ViewTransform, Viewport};
use crate::export::{default_export_path, write_atomically, ExportError, ExportScene, LayerGroup, SvgDocument};
use crate::feature::{AnnotationLayer, BoundaryFeature, OsmType, RoadFeature};
use crate::mask::{MaskCache, MaskSet};
use crate::mosaic::{MosaicBuilder, MosaicError, MosaicRequest, MosaicStats};
use crate::provider::{AsyncHttpClient, BoxFuture, FetchError, MapStyle};
use crate::render::{
    render_boundaries, render_layer, render_roads, render_settlements, BoundaryStyle, PathPrimitive, RoadStyle,
    SettlementStyle,
};
use crate::roads::{RoadFetchOptions, RoadQuerySignature};

/// A fetch that has been authorized but not yet run.
///
/// The future owns everything it needs, so the session stays free for other
/// calls (including a superseding fetch) while it runs.
pub struct PendingFetch<T> {
    ticket: FetchTicket,
    future: BoxFuture<'static, Result<T, FetchError>>,
}

impl<T> PendingFetch<T> {
    fn new(ticket: FetchTicket, future: impl Future<Output = Result<T, FetchError>> + Send + 'static) -> Self {
        Self {
            ticket,
            future: Box::pin(future),
        }
    }

    pub fn ticket(&self) -> &FetchTicket {
        &self.ticket
    }

    pub async fn run(self) -> Fetched<T> {
        let result = self.future.await;
        Fetched {
            ticket: self.ticket,
            result,
        }
    }
}

/// A completed fetch awaiting application.
#[derive(Debug)]
pub struct Fetched<T> {
    pub ticket: FetchTicket,
    pub result: Result<T, FetchError>,
}

/// What happened to a fetch result handed back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The data replaced the previous state.
    Applied,
    /// The fetch succeeded but found nothing to draw; state is unchanged.
    Empty,
    /// A newer fetch for the same slot was issued; the result was dropped.
    Stale,
    Cancelled,
    /// The fetch failed; previous data is kept.
    Failed(FetchError),
}

/// Everything drawn over the basemap for one view.
#[derive(Debug, Clone)]
pub struct LiveOverlay {
    pub view: ViewTransform,
    pub viewport: Viewport,
    pub masks: Arc<MaskSet>,
    pub regions: Vec<PathPrimitive>,
    pub roads: Vec<PathPrimitive>,
    pub settlements: Vec<PathPrimitive>,
    pub layers: Vec<LayerGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Written {
        path: PathBuf,
        bytes: usize,
        mosaic: Option<MosaicStats>,
    },
    /// Cancelled before anything became visible.
    Cancelled,
}

/// Source data that fully determines a session's output.
#[derive(Debug, Clone, Default)]
pub struct SessionInputs {
    pub regions: Vec<BoundaryFeature>,
    pub settlements: Vec<BoundaryFeature>,
    pub focused_city: Option<BoundaryFeature>,
    pub roads: Vec<RoadFeature>,
    pub layers: Vec<AnnotationLayer>,
    pub style: StyleSettings,
    pub view: Option<ViewTransform>,
}

#[derive(Debug, Clone, Copy)]
enum SlotId {
    Regions,
    Roads,
    Settlements,
    Focus,
}

/// Orchestrates fetching, projection, rendering and export for one map.
///
/// The session owns the selection collections and the current view. Every
/// change to either re-renders the [`LiveOverlay`]; fetches go through
/// superseding slots so that only the newest result for a purpose lands.
pub struct CompositingSession<C> {
    fetcher: Arc<BoundaryFetcher<C>>,
    mosaic: MosaicBuilder<C>,
    view: ViewTransform,
    viewport: Viewport,
    style: StyleSettings,
    export: ExportSettings,
    boundary_style: BoundaryStyle,
    road_style: RoadStyle,
    settlement_style: SettlementStyle,

    regions: Vec<BoundaryFeature>,
    settlements: Vec<BoundaryFeature>,
    focused_city: Option<BoundaryFeature>,
    roads: Arc<Vec<RoadFeature>>,
    layers: Vec<AnnotationLayer>,
    /// Bumped whenever the region set changes.
    region_generation: u64,

    masks: MaskCache,
    overlay: LiveOverlay,
    state: SessionState,

    region_slot: FetchSlot,
    road_slot: FetchSlot,
    settlement_slot: FetchSlot,
    focus_slot: FetchSlot,
}

impl<C: AsyncHttpClient + 'static> CompositingSession<C> {
    pub fn new(
        fetcher: Arc<BoundaryFetcher<C>>,
        mosaic: MosaicBuilder<C>,
        view: ViewTransform,
        viewport: Viewport,
    ) -> Self {
        let root = CancellationToken::new();
        let mut masks = MaskCache::new();
        let overlay = LiveOverlay {
            view,
            viewport,
            masks: masks.get_or_synthesize(&[], 0, &view, viewport),
            regions: Vec::new(),
            roads: Vec::new(),
            settlements: Vec::new(),
            layers: Vec::new(),
        };

        Self {
            fetcher,
            mosaic,
            view,
            viewport,
            style: StyleSettings::default(),
            export: ExportSettings::default(),
            boundary_style: BoundaryStyle::default(),
            road_style: RoadStyle::default(),
            settlement_style: SettlementStyle::default(),
            regions: Vec::new(),
            settlements: Vec::new(),
            focused_city: None,
            roads: Arc::new(Vec::new()),
            layers: Vec::new(),
            region_generation: 0,
            masks,
            overlay,
            state: SessionState::Idle,
            region_slot: FetchSlot::new("regions", SlotMode::All, &root),
            road_slot: FetchSlot::new("roads", SlotMode::Latest, &root),
            settlement_slot: FetchSlot::new("settlements", SlotMode::Latest, &root),
            focus_slot: FetchSlot::new("focus", SlotMode::Latest, &root),
        }
    }

    /// Applies style settings, re-projecting the view if the CRS changes.
    pub fn with_style(mut self, style: StyleSettings) -> Self {
        self.view = self.view.with_crs(style.map_style.crs(), self.viewport);
        self.style = style;
        self.overlay = self.compose(self.view, self.viewport);
        self
    }

    pub fn with_export_settings(mut self, export: ExportSettings) -> Self {
        self.export = export;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn style(&self) -> &StyleSettings {
        &self.style
    }

    pub fn regions(&self) -> &[BoundaryFeature] {
        &self.regions
    }

    pub fn settlements(&self) -> &[BoundaryFeature] {
        &self.settlements
    }

    pub fn focused_city(&self) -> Option<&BoundaryFeature> {
        self.focused_city.as_ref()
    }

    pub fn roads(&self) -> &[RoadFeature] {
        &self.roads
    }

    pub fn layers(&self) -> &[AnnotationLayer] {
        &self.layers
    }

    /// The overlay for the current view and data.
    pub fn live_overlay(&self) -> &LiveOverlay {
        &self.overlay
    }

    fn advance(&mut self, event: SessionEvent) {
        match self.state.transition(event) {
            Ok(next) => {
                trace!(from = %self.state, to = %next, ?event, "Session transition");
                self.state = next;
            }
            Err(e) => debug!(error = %e, "Session event ignored"),
        }
    }

    fn slot(&self, id: SlotId) -> &FetchSlot {
        match id {
            SlotId::Regions => &self.region_slot,
            SlotId::Roads => &self.road_slot,
            SlotId::Settlements => &self.settlement_slot,
            SlotId::Focus => &self.focus_slot,
        }
    }

    /// Checks a fetch result against its slot and records the outcome.
    fn settle<T>(&mut self, id: SlotId, fetched: Fetched<T>, done: SessionEvent) -> Result<T, ApplyOutcome> {
        let Fetched { ticket, result } = fetched;
        if !self.slot(id).is_current(&ticket) {
            debug!(slot = ticket.slot(), generation = ticket.generation(), "Discarding stale fetch result");
            return Err(ApplyOutcome::Stale);
        }

        match result {
            Ok(value) => {
                self.advance(done);
                Ok(value)
            }
            Err(e) if e.is_cancelled() => {
                self.advance(SessionEvent::Cancel);
                Err(ApplyOutcome::Cancelled)
            }
            Err(e) => {
                warn!(slot = ticket.slot(), error = %e, "Fetch failed, keeping previous data");
                self.advance(SessionEvent::Fail);
                Err(ApplyOutcome::Failed(e))
            }
        }
    }

    fn compose(&mut self, view: ViewTransform, viewport: Viewport) -> LiveOverlay {
        let masks = self
            .masks
            .get_or_synthesize(&self.regions, self.region_generation, &view, viewport);

        let show_settlements = self.style.show_settlements || self.focused_city.is_some();
        let settlements = if show_settlements {
            render_settlements(
                &self.settlements,
                self.focused_city.as_ref(),
                &view,
                &self.settlement_style,
            )
        } else {
            Vec::new()
        };

        let layer_style = self.style.layer_style();
        let layers = self
            .layers
            .iter()
            .filter(|l| l.visible)
            .map(|l| LayerGroup {
                id: l.id.clone(),
                primitives: render_layer(l, &view, &layer_style),
            })
            .collect();

        LiveOverlay {
            view,
            viewport,
            masks,
            regions: render_boundaries(&self.regions, &view, &self.boundary_style),
            roads: render_roads(&self.roads, &view, &self.road_style),
            settlements,
            layers,
        }
    }

    /// Runs `Projecting -> Rendering -> LiveOverlayReady` for the current view.
    fn rerender(&mut self, entry: SessionEvent) -> &LiveOverlay {
        self.advance(entry);
        let overlay = self.compose(self.view, self.viewport);
        self.advance(SessionEvent::Projected);
        self.overlay = overlay;
        self.advance(SessionEvent::Rendered { export: false });
        &self.overlay
    }

    /// Moves the view and re-renders without fetching.
    pub fn set_view(&mut self, view: ViewTransform) -> &LiveOverlay {
        self.view = view;
        self.rerender(SessionEvent::ViewChanged)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> &LiveOverlay {
        self.viewport = viewport;
        self.rerender(SessionEvent::ViewChanged)
    }

    /// Switches basemap style, keeping the view centre.
    pub fn set_map_style(&mut self, style: MapStyle) -> &LiveOverlay {
        self.view = self.view.with_crs(style.crs(), self.viewport);
        self.style.map_style = style;
        self.rerender(SessionEvent::ViewChanged)
    }

    pub fn set_dim_background(&mut self, dim: bool) {
        self.style.dim_background = dim;
    }

    pub fn set_show_settlements(&mut self, show: bool) -> &LiveOverlay {
        self.style.show_settlements = show;
        self.rerender(SessionEvent::DataReady)
    }

    /// Frames all selected regions. Returns `false` when there is nothing
    /// to frame.
    pub fn fit_to_regions(&mut self, padding: u32, max_zoom: u8) -> Result<bool, CoordError> {
        let Some(bounds) = self.regions.iter().filter_map(BoundaryFeature::bounds).reduce(|a, b| a.union(b)) else {
            return Ok(false);
        };
        let view = ViewTransform::fit(
            bounds,
            self.viewport,
            padding,
            max_zoom,
            self.view.tile_size(),
            self.view.crs(),
        )?;
        self.set_view(view);
        Ok(true)
    }

    /// Starts fetching a region. Region fetches accumulate rather than
    /// supersede each other.
    pub fn begin_boundary(&mut self, ids: Vec<u64>, kind: OsmType) -> PendingFetch<Option<BoundaryFeature>> {
        let ticket = self.region_slot.begin();
        self.advance(SessionEvent::BeginBoundaryFetch);
        let fetcher = self.fetcher.clone();
        let token = ticket.token().clone();
        PendingFetch::new(ticket, async move { fetcher.fetch_by_ids(&ids, kind, &token).await })
    }

    /// Adds (or replaces, by identity) a fetched region.
    pub fn apply_boundary(&mut self, fetched: Fetched<Option<BoundaryFeature>>) -> ApplyOutcome {
        let feature = match self.settle(SlotId::Regions, fetched, SessionEvent::BoundaryFetched) {
            Ok(feature) => feature,
            Err(outcome) => return outcome,
        };

        let outcome = match feature {
            Some(feature) => {
                info!(id = feature.id(), name = feature.name(), "Region selected");
                match self.regions.iter_mut().find(|r| r.id() == feature.id()) {
                    Some(existing) => *existing = feature,
                    None => self.regions.push(feature),
                }
                self.region_generation += 1;
                ApplyOutcome::Applied
            }
            None => ApplyOutcome::Empty,
        };
        self.rerender(SessionEvent::Stitched);
        outcome
    }

    pub async fn select_boundary(&mut self, ids: Vec<u64>, kind: OsmType) -> ApplyOutcome {
        let fetched = self.begin_boundary(ids, kind).run().await;
        self.apply_boundary(fetched)
    }

    /// Removes a region by identity.
    ///
    /// Roads and settlements belong to the old region set, so both are
    /// dropped along with any fetch in flight; callers re-fetch them for the
    /// remaining regions. Removing the last region also evicts the cached
    /// road query for it.
    pub fn remove_boundary(&mut self, id: &str) -> bool {
        let signature = RoadQuerySignature::new(self.regions.iter().map(BoundaryFeature::id), self.style.roads);
        let before = self.regions.len();
        self.regions.retain(|r| r.id() != id);
        if self.regions.len() == before {
            return false;
        }

        self.region_generation += 1;
        self.road_slot.cancel();
        self.settlement_slot.cancel();
        self.roads = Arc::new(Vec::new());
        self.settlements.clear();
        if self.regions.is_empty() {
            if let Some(cache) = self.fetcher.road_cache() {
                cache.remove(&signature);
            }
        }

        info!(id, remaining = self.regions.len(), "Region removed");
        self.rerender(SessionEvent::DataReady);
        true
    }

    /// Starts fetching roads for the current regions, superseding any road
    /// fetch in flight.
    pub fn begin_roads(&mut self, options: RoadFetchOptions) -> PendingFetch<Arc<Vec<RoadFeature>>> {
        self.style.roads = options;
        let ticket = self.road_slot.begin();
        self.advance(SessionEvent::BeginRoadFetch);
        let fetcher = self.fetcher.clone();
        let targets = self.regions.clone();
        let token = ticket.token().clone();
        PendingFetch::new(ticket, async move { fetcher.fetch_roads(&targets, options, &token).await })
    }

    pub fn apply_roads(&mut self, fetched: Fetched<Arc<Vec<RoadFeature>>>) -> ApplyOutcome {
        let roads = match self.settle(SlotId::Roads, fetched, SessionEvent::RoadsFetched) {
            Ok(roads) => roads,
            Err(outcome) => return outcome,
        };
        self.roads = roads;
        self.rerender(SessionEvent::Stitched);
        ApplyOutcome::Applied
    }

    pub async fn refresh_roads(&mut self, options: RoadFetchOptions) -> ApplyOutcome {
        let fetched = self.begin_roads(options).run().await;
        self.apply_roads(fetched)
    }

    /// Starts fetching cities and towns inside the current regions.
    pub fn begin_settlements(&mut self) -> PendingFetch<Vec<BoundaryFeature>> {
        let ticket = self.settlement_slot.begin();
        self.advance(SessionEvent::BeginBoundaryFetch);
        let fetcher = self.fetcher.clone();
        let targets = self.regions.clone();
        let token = ticket.token().clone();
        PendingFetch::new(ticket, async move { fetcher.fetch_settlements(&targets, &token).await })
    }

    pub fn apply_settlements(&mut self, fetched: Fetched<Vec<BoundaryFeature>>) -> ApplyOutcome {
        let settlements = match self.settle(SlotId::Settlements, fetched, SessionEvent::BoundaryFetched) {
            Ok(s) => s,
            Err(outcome) => return outcome,
        };
        self.settlements = settlements;
        self.rerender(SessionEvent::Stitched);
        ApplyOutcome::Applied
    }

    pub async fn refresh_settlements(&mut self) -> ApplyOutcome {
        let fetched = self.begin_settlements().run().await;
        self.apply_settlements(fetched)
    }

    /// Starts fetching a city to focus on, superseding any earlier one.
    pub fn begin_focus(&mut self, ids: Vec<u64>, kind: OsmType) -> PendingFetch<Option<BoundaryFeature>> {
        let ticket = self.focus_slot.begin();
        self.advance(SessionEvent::BeginBoundaryFetch);
        let fetcher = self.fetcher.clone();
        let token = ticket.token().clone();
        PendingFetch::new(ticket, async move { fetcher.fetch_by_ids(&ids, kind, &token).await })
    }

    pub fn apply_focus(&mut self, fetched: Fetched<Option<BoundaryFeature>>) -> ApplyOutcome {
        let city = match self.settle(SlotId::Focus, fetched, SessionEvent::BoundaryFetched) {
            Ok(city) => city,
            Err(outcome) => return outcome,
        };
        let outcome = match city {
            Some(city) => {
                info!(id = city.id(), name = city.name(), "City focused");
                self.focused_city = Some(city);
                ApplyOutcome::Applied
            }
            None => ApplyOutcome::Empty,
        };
        self.rerender(SessionEvent::Stitched);
        outcome
    }

    pub async fn focus_city(&mut self, ids: Vec<u64>, kind: OsmType) -> ApplyOutcome {
        let fetched = self.begin_focus(ids, kind).run().await;
        self.apply_focus(fetched)
    }

    pub fn clear_focus(&mut self) -> &LiveOverlay {
        self.focus_slot.cancel();
        self.focused_city = None;
        self.rerender(SessionEvent::DataReady)
    }

    pub fn add_layer(&mut self, layer: AnnotationLayer) -> &LiveOverlay {
        match self.layers.iter_mut().find(|l| l.id == layer.id) {
            Some(existing) => *existing = layer,
            None => self.layers.push(layer),
        }
        self.rerender(SessionEvent::DataReady)
    }

    pub fn remove_layer(&mut self, id: &str) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        let removed = self.layers.len() != before;
        if removed {
            self.rerender(SessionEvent::DataReady);
        }
        removed
    }

    /// Cancels every fetch in flight.
    pub fn cancel_all(&mut self) {
        self.region_slot.cancel();
        self.road_slot.cancel();
        self.settlement_slot.cancel();
        self.focus_slot.cancel();
        if self.state.is_in_flight() {
            self.advance(SessionEvent::Cancel);
        }
    }

    /// Replaces all source data, e.g. from a saved project. No network
    /// access is needed to reproduce the previous output.
    pub fn restore(&mut self, inputs: SessionInputs) -> &LiveOverlay {
        self.cancel_all();
        let style = inputs.style;
        self.view = inputs.view.unwrap_or(self.view).with_crs(style.map_style.crs(), self.viewport);
        self.style = style;
        self.regions = inputs.regions;
        self.settlements = inputs.settlements;
        self.focused_city = inputs.focused_city;
        self.roads = Arc::new(inputs.roads);
        self.layers = inputs.layers;
        self.region_generation += 1;
        self.rerender(SessionEvent::DataReady)
    }

    /// Snapshot of the session's source data.
    pub fn inputs(&self) -> SessionInputs {
        SessionInputs {
            regions: self.regions.clone(),
            settlements: self.settlements.clone(),
            focused_city: self.focused_city.clone(),
            roads: self.roads.as_ref().clone(),
            layers: self.layers.clone(),
            style: self.style.clone(),
            view: Some(self.view),
        }
    }

    fn abort_export(&mut self) -> ExportOutcome {
        info!("Export cancelled");
        self.advance(SessionEvent::Cancel);
        ExportOutcome::Cancelled
    }

    /// Renders the current view to an SVG file.
    ///
    /// The view is frozen at the start; later pans do not affect the
    /// artifact. `cancel` covers tile retrieval, encoding and the write, and
    /// a cancelled export leaves no file behind. `path` defaults to a
    /// timestamped name in the export directory.
    pub async fn export(
        &mut self,
        path: Option<PathBuf>,
        cancel: &CancellationToken,
    ) -> Result<ExportOutcome, SessionError> {
        let view = self.view;
        let viewport = self.viewport;
        let map_style = self.style.map_style;
        let path = path.unwrap_or_else(|| default_export_path(&self.export.directory));

        self.advance(SessionEvent::DataReady);
        let overlay = self.compose(view, viewport);
        self.advance(SessionEvent::Projected);

        let mut raster_jpeg = None;
        let mut mosaic_stats = None;
        if let Some(source) = map_style.tile_source() {
            let request = MosaicRequest::new(view, viewport)
                .with_supersample(self.export.supersample)
                .with_zoom_offset(self.export.zoom_offset);

            let mosaic = match self.mosaic.build(&source, map_style, &request, cancel).await {
                Ok(mosaic) => mosaic,
                Err(MosaicError::Cancelled) => return Ok(self.abort_export()),
                Err(e) => {
                    self.advance(SessionEvent::Fail);
                    return Err(ExportError::from(e).into());
                }
            };
            mosaic_stats = Some(mosaic.stats());

            match mosaic.encode_jpeg(self.export.jpeg_quality) {
                Ok(jpeg) => raster_jpeg = Some(jpeg),
                Err(e) => {
                    self.advance(SessionEvent::Fail);
                    return Err(ExportError::from(e).into());
                }
            }
        }
        if cancel.is_cancelled() {
            return Ok(self.abort_export());
        }

        let scene = ExportScene {
            viewport,
            background: map_style.export_background().to_string(),
            raster_jpeg,
            masks: overlay.masks.as_ref().clone(),
            dim_background: self.style.dim_background,
            regions: overlay.regions,
            roads: overlay.roads,
            settlements: overlay.settlements,
            layers: overlay.layers,
        };
        let svg = SvgDocument::build(&scene);
        if cancel.is_cancelled() {
            return Ok(self.abort_export());
        }

        if let Err(e) = write_atomically(&path, svg.as_bytes()) {
            self.advance(SessionEvent::Fail);
            return Err(e.into());
        }

        self.advance(SessionEvent::Rendered { export: true });
        info!(path = %path.display(), bytes = svg.len(), style = %map_style, "Export written");
        Ok(ExportOutcome::Written {
            path,
            bytes: svg.len(),
            mosaic: mosaic_stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Crs;
    use crate::geometry::GeoPoint;
    use crate::provider::{MockAsyncHttpClient, OverpassClient, ProviderError};
    use crate::roads::RoadQueryCache;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Square relation split into two outer ways.
    fn relation_json(id: u64, name: &str, west: f64, south: f64) -> String {
        let (east, north) = (west + 0.5, south + 0.5);
        format!(
            r#"{{"elements":[{{"type":"relation","id":{id},"tags":{{"name":"{name}","admin_level":"4"}},
            "members":[
              {{"type":"way","ref":1,"role":"outer","geometry":[
                {{"lat":{south},"lon":{west}}},{{"lat":{south},"lon":{east}}},{{"lat":{north},"lon":{east}}}]}},
              {{"type":"way","ref":2,"role":"outer","geometry":[
                {{"lat":{north},"lon":{west}}},{{"lat":{north},"lon":{east}}}]}},
              {{"type":"way","ref":3,"role":"outer","geometry":[
                {{"lat":{north},"lon":{west}}},{{"lat":{south},"lon":{west}}}]}}
            ]}}]}}"#
        )
    }

    fn roads_json(way: u64, highway: &str) -> String {
        format!(
            r#"{{"elements":[{{"type":"way","id":{way},"tags":{{"highway":"{highway}"}},
            "geometry":[{{"lat":55.1,"lon":37.1}},{{"lat":55.2,"lon":37.2}}]}}]}}"#
        )
    }

    fn overpass_mock() -> MockAsyncHttpClient {
        MockAsyncHttpClient::new(|_, body| {
            let body = body.unwrap_or_default();
            let json = if body.contains("relation(1);") {
                relation_json(1, "Alpha", 37.0, 55.0)
            } else if body.contains("relation(2);") {
                relation_json(2, "Beta", 37.5, 55.0)
            } else if body.contains("relation(404);") {
                r#"{"elements":[]}"#.to_string()
            } else if body.contains("motorway") {
                roads_json(100, "motorway")
            } else if body.contains("highway") {
                roads_json(200, "tertiary")
            } else if body.contains("place") {
                r#"{"elements":[]}"#.to_string()
            } else {
                return Err(ProviderError::Status {
                    status: 400,
                    url: "bad query".into(),
                });
            };
            Ok(json.into_bytes())
        })
    }

    fn session(mock: &MockAsyncHttpClient) -> CompositingSession<MockAsyncHttpClient> {
        let fetcher = BoundaryFetcher::new(OverpassClient::new(mock.clone(), vec!["https://overpass.test".into()]));
        let viewport = Viewport::new(400, 300);
        let view = ViewTransform::centered(GeoPoint::new(37.5, 55.25), 8, viewport, 256, Crs::WebMercator).unwrap();
        CompositingSession::new(Arc::new(fetcher), MosaicBuilder::new(mock.clone()), view, viewport)
            .with_style(StyleSettings::default().with_map_style(MapStyle::None))
    }

    #[tokio::test]
    async fn test_select_boundary_renders_overlay() {
        let mock = overpass_mock();
        let mut session = session(&mock);

        assert_eq!(session.select_boundary(vec![1], OsmType::Relation).await, ApplyOutcome::Applied);
        assert_eq!(session.state(), SessionState::LiveOverlayReady);
        assert_eq!(session.regions().len(), 1);
        assert!(session.regions()[0].rings().all(|r| r.is_closed()));

        let overlay = session.live_overlay();
        assert_eq!(overlay.regions.len(), 2);
        assert!(!overlay.masks.clip.is_identity());
    }

    #[tokio::test]
    async fn test_reselecting_replaces_by_identity() {
        let mock = overpass_mock();
        let mut session = session(&mock);

        session.select_boundary(vec![1], OsmType::Relation).await;
        session.select_boundary(vec![1], OsmType::Relation).await;
        session.select_boundary(vec![2], OsmType::Relation).await;
        assert_eq!(session.regions().len(), 2);

        assert!(session.remove_boundary("osm-1"));
        assert!(!session.remove_boundary("osm-1"));
        assert_eq!(session.regions()[0].id(), "osm-2");
    }

    #[tokio::test]
    async fn test_removing_last_region_drops_roads_and_settlements() {
        let mock = overpass_mock();
        let cache = Arc::new(RoadQueryCache::new(8, Duration::from_secs(600)));
        let fetcher = BoundaryFetcher::new(OverpassClient::new(mock.clone(), vec!["https://overpass.test".into()]))
            .with_road_cache(cache.clone());
        let viewport = Viewport::new(400, 300);
        let view = ViewTransform::centered(GeoPoint::new(37.5, 55.25), 8, viewport, 256, Crs::WebMercator).unwrap();
        let mut session = CompositingSession::new(Arc::new(fetcher), MosaicBuilder::new(mock.clone()), view, viewport)
            .with_style(StyleSettings::default().with_map_style(MapStyle::None));

        session.select_boundary(vec![1], OsmType::Relation).await;
        let options = RoadFetchOptions::new(true, true);
        assert_eq!(session.refresh_roads(options).await, ApplyOutcome::Applied);
        assert!(!session.roads().is_empty());
        assert_eq!(cache.len(), 1);

        assert!(session.remove_boundary("osm-1"));
        assert!(session.roads().is_empty());
        assert!(session.settlements().is_empty());
        assert!(session.live_overlay().masks.clip.is_identity());
        assert!(session.live_overlay().roads.is_empty());
        assert!(cache.is_empty());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.svg");
        session.export(Some(path.clone()), &CancellationToken::new()).await.unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        let roads = svg.split("<g id=\"Roads\"").nth(1).and_then(|rest| rest.split("</g>").next());
        assert!(roads.map_or(true, |group| !group.contains("<path")));
    }

    #[tokio::test]
    async fn test_removing_one_region_requires_road_refetch() {
        let mock = overpass_mock();
        let mut session = session(&mock);
        session.select_boundary(vec![1], OsmType::Relation).await;
        session.select_boundary(vec![2], OsmType::Relation).await;
        session.refresh_roads(RoadFetchOptions::new(true, false)).await;
        assert_eq!(session.roads().len(), 1);

        assert!(session.remove_boundary("osm-2"));
        assert_eq!(session.regions().len(), 1);
        assert!(session.roads().is_empty());
        assert!(session.live_overlay().roads.is_empty());

        assert_eq!(session.refresh_roads(RoadFetchOptions::new(true, false)).await, ApplyOutcome::Applied);
        assert_eq!(session.roads().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_leaves_state() {
        let mock = overpass_mock();
        let mut session = session(&mock);

        assert_eq!(session.select_boundary(vec![404], OsmType::Relation).await, ApplyOutcome::Empty);
        assert!(session.regions().is_empty());
        assert!(session.live_overlay().masks.clip.is_identity());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_data() {
        let mock = overpass_mock();
        let mut session = session(&mock);
        session.select_boundary(vec![1], OsmType::Relation).await;

        let outcome = session.select_boundary(vec![7], OsmType::Way).await;
        assert!(matches!(outcome, ApplyOutcome::Failed(FetchError::Exhausted { .. })));
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(session.regions().len(), 1);
        assert_eq!(session.live_overlay().regions.len(), 2);
    }

    #[tokio::test]
    async fn test_stale_road_fetch_discarded() {
        let mock = overpass_mock();
        let mut session = session(&mock);
        session.select_boundary(vec![1], OsmType::Relation).await;

        let first = session.begin_roads(RoadFetchOptions::new(true, false));
        let second = session.begin_roads(RoadFetchOptions::new(false, true));

        let second = second.run().await;
        assert_eq!(session.apply_roads(second), ApplyOutcome::Applied);

        let first = first.run().await;
        assert!(matches!(first.result, Err(FetchError::Cancelled)));
        assert_eq!(session.apply_roads(first), ApplyOutcome::Stale);

        assert_eq!(session.roads().len(), 1);
        assert_eq!(session.roads()[0].id().to_string(), "way/200");
    }

    #[tokio::test]
    async fn test_superseded_success_is_still_stale() {
        let mock = overpass_mock();
        let mut session = session(&mock);
        session.select_boundary(vec![1], OsmType::Relation).await;

        let first = session.begin_roads(RoadFetchOptions::new(true, false));
        let stale_ticket = first.ticket().clone();
        let second = session.begin_roads(RoadFetchOptions::new(false, true)).run().await;

        let forged = Fetched {
            ticket: stale_ticket,
            result: Ok(Arc::new(Vec::new())),
        };
        assert_eq!(session.apply_roads(forged), ApplyOutcome::Stale);
        assert_eq!(session.apply_roads(second), ApplyOutcome::Applied);
        assert_eq!(session.roads().len(), 1);
    }

    #[tokio::test]
    async fn test_view_change_reprojects_without_fetching() {
        let mock = overpass_mock();
        let mut session = session(&mock);
        session.select_boundary(vec![1], OsmType::Relation).await;
        let requests = mock.request_count();
        let before = session.live_overlay().regions.clone();

        let moved = ViewTransform::centered(
            GeoPoint::new(37.6, 55.3),
            9,
            session.viewport(),
            256,
            Crs::WebMercator,
        )
        .unwrap();
        let overlay = session.set_view(moved);

        assert_ne!(overlay.regions, before);
        assert_eq!(mock.request_count(), requests);
        assert_eq!(session.state(), SessionState::LiveOverlayReady);
    }

    #[tokio::test]
    async fn test_restore_needs_no_network() {
        let mock = overpass_mock();
        let mut source = session(&mock);
        source.select_boundary(vec![1], OsmType::Relation).await;
        source.refresh_roads(RoadFetchOptions::new(true, true)).await;
        let inputs = source.inputs();

        let offline = MockAsyncHttpClient::failing();
        let mut restored = session(&offline);
        restored.restore(inputs);

        assert_eq!(restored.regions(), source.regions());
        assert_eq!(restored.live_overlay().regions, source.live_overlay().regions);
        assert_eq!(offline.request_count(), 0);
    }

    #[tokio::test]
    async fn test_export_writes_svg() {
        let mock = overpass_mock();
        let mut session = session(&mock);
        session.select_boundary(vec![1], OsmType::Relation).await;
        session.set_dim_background(true);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.svg");
        let outcome = session.export(Some(path.clone()), &CancellationToken::new()).await.unwrap();

        assert!(matches!(outcome, ExportOutcome::Written { mosaic: None, .. }));
        assert_eq!(session.state(), SessionState::ExportArtifactReady);
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("fill=\"#0a0a0a\""));
        assert!(svg.contains("<mask id=\"dim-mask\""));
        assert!(!svg.contains("<image"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_export_leaves_no_file() {
        let tiles = MockAsyncHttpClient::responding(Vec::new()).with_delay(|_| Duration::from_secs(5));
        let mut session = session(&tiles).with_style(StyleSettings::default().with_map_style(MapStyle::BrightV2));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.svg");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = session.export(Some(path.clone()), &cancel).await.unwrap();
        assert_eq!(outcome, ExportOutcome::Cancelled);
        assert_eq!(session.state(), SessionState::Aborted);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
