//! Integration tests for the compositing pipeline.
//!
//! These drive a [`CompositingSession`] end to end against a scripted HTTP
//! backend standing in for the geodata mirrors and the tile server:
//! - boundary fetch → stitch → overlay → SVG export with an embedded raster
//! - superseding fetches completing out of order
//! - project save/load reproducing an export without network access
//!
//! Run with: `cargo test --test compositing_integration`

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use geomosaic::boundary::BoundaryFetcher;
use geomosaic::coord::{project_line_to_container, Crs, ViewTransform, Viewport};
use geomosaic::feature::{classify_road, BoundaryFeature, OsmType, RoadClass};
use geomosaic::geometry::{stitch, GeoArc, GeoPoint, RingKind};
use geomosaic::mask::{synthesize, CLIP_PATH_ID, DIM_MASK_ID};
use geomosaic::mosaic::MosaicBuilder;
use geomosaic::project::ProjectDocument;
use geomosaic::provider::{AsyncHttpClient, BoxFuture, MapStyle, OverpassClient, ProviderError};
use geomosaic::render::path_data;
use geomosaic::roads::RoadFetchOptions;
use geomosaic::session::{ApplyOutcome, CompositingSession, ExportOutcome, SessionState, StyleSettings};
use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Scripted backend
// ============================================================================

/// Answers geodata queries from fixtures and tile requests with a solid PNG.
///
/// Road queries for the federal class are held back by `federal_delay` so
/// that tests can make an earlier fetch finish after a later one.
#[derive(Clone)]
struct ScriptedBackend {
    federal_delay: Duration,
    requests: Arc<AtomicUsize>,
    tile: Arc<Vec<u8>>,
}

impl ScriptedBackend {
    fn new() -> Self {
        Self {
            federal_delay: Duration::ZERO,
            requests: Arc::new(AtomicUsize::new(0)),
            tile: Arc::new(solid_png([40, 120, 200, 255])),
        }
    }

    fn with_federal_delay(mut self, delay: Duration) -> Self {
        self.federal_delay = delay;
        self
    }

    fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn answer(query: &str) -> Result<Vec<u8>, ProviderError> {
        let json = if query.contains("relation(1);") {
            square_relation(1, "Alpha", 37.0, 55.0)
        } else if query.contains("relation(2);") {
            square_relation(2, "Beta", 37.5, 55.0)
        } else if query.contains("motorway") {
            shared_way(500, "motorway")
        } else if query.contains("highway") {
            shared_way(600, "tertiary")
        } else if query.contains("place") {
            r#"{"elements":[]}"#.to_string()
        } else {
            return Err(ProviderError::Status {
                status: 400,
                url: "unexpected query".into(),
            });
        };
        Ok(json.into_bytes())
    }
}

impl AsyncHttpClient for ScriptedBackend {
    fn get<'a>(&'a self, _url: &'a str, _timeout: Duration) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let tile = self.tile.as_ref().clone();
        Box::pin(async move { Ok(tile) })
    }

    fn post_form<'a>(
        &'a self,
        _url: &'a str,
        form: &'a [(&'a str, &'a str)],
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let query = form
            .iter()
            .find(|(k, _)| *k == "data")
            .map(|(_, v)| v.to_string())
            .unwrap_or_default();
        let delay = if query.contains("motorway") {
            self.federal_delay
        } else {
            Duration::ZERO
        };
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Self::answer(&query)
        })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A 0.5° square relation split into three outer ways.
fn square_relation(id: u64, name: &str, west: f64, south: f64) -> String {
    let (east, north) = (west + 0.5, south + 0.5);
    format!(
        r#"{{"elements":[{{"type":"relation","id":{id},"tags":{{"name":"{name}","admin_level":"4"}},
        "members":[
          {{"type":"way","ref":1,"role":"outer","geometry":[
            {{"lat":{south},"lon":{west}}},{{"lat":{south},"lon":{east}}},{{"lat":{north},"lon":{east}}}]}},
          {{"type":"way","ref":2,"role":"outer","geometry":[
            {{"lat":{north},"lon":{west}}},{{"lat":{north},"lon":{east}}}]}},
          {{"type":"way","ref":3,"role":"","geometry":[
            {{"lat":{north},"lon":{west}}},{{"lat":{south},"lon":{west}}}]}}
        ]}}]}}"#
    )
}

/// A way straddling the shared edge of the two fixture regions.
fn shared_way(id: u64, highway: &str) -> String {
    format!(
        r#"{{"elements":[{{"type":"way","id":{id},"tags":{{"highway":"{highway}","name":"Edge road"}},
        "geometry":[{{"lat":55.2,"lon":37.3}},{{"lat":55.25,"lon":37.7}}]}}]}}"#
    )
}

fn solid_png(rgba: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(256, 256, Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn viewport() -> Viewport {
    Viewport::new(480, 320)
}

fn session_with(backend: &ScriptedBackend, style: MapStyle) -> CompositingSession<ScriptedBackend> {
    let overpass = OverpassClient::new(backend.clone(), vec!["https://overpass.test/api".into()]);
    let fetcher = BoundaryFetcher::new(overpass);
    let view = ViewTransform::centered(GeoPoint::new(37.5, 55.25), 8, viewport(), 256, style.crs()).unwrap();
    CompositingSession::new(Arc::new(fetcher), MosaicBuilder::new(backend.clone()), view, viewport())
        .with_style(StyleSettings::default().with_map_style(style))
}

fn p(lon: f64, lat: f64) -> GeoPoint {
    GeoPoint::new(lon, lat)
}

// ============================================================================
// Scenarios
// ============================================================================

/// Two arcs walking the same edge in opposite directions meet at both ends.
#[test]
fn test_back_and_forth_arcs_close_into_one_ring() {
    let arcs = vec![
        GeoArc::new(vec![p(0.0, 0.0), p(1.0, 0.0)]).unwrap(),
        GeoArc::new(vec![p(1.0, 0.0), p(0.0, 0.0)]).unwrap(),
    ];

    let report = stitch(arcs);
    assert_eq!(report.rings().len(), 1);

    let ring = &report.rings()[0];
    assert_eq!(ring.points(), &[p(0.0, 0.0), p(1.0, 0.0), p(0.0, 0.0)]);
    assert_eq!(ring.kind(), RingKind::Collapsed);
}

#[test]
fn test_road_classification() {
    let tags = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    };

    assert_eq!(classify_road(&tags(&[("highway", "motorway")])), RoadClass::Federal);
    assert_eq!(
        classify_road(&tags(&[("highway", "secondary"), ("ref", "P-22")])),
        RoadClass::Regional
    );
}

#[tokio::test]
async fn test_dimmed_export_masks_match_boundary() {
    let backend = ScriptedBackend::new();
    let mut session = session_with(&backend, MapStyle::None);
    assert_eq!(session.select_boundary(vec![1], OsmType::Relation).await, ApplyOutcome::Applied);
    session.set_dim_background(true);

    let region = session.regions()[0].clone();
    let ring = region.rings().next().unwrap();
    assert!(ring.is_closed());
    let projected = project_line_to_container(ring.points(), &session.view());
    let expected = path_data([projected.as_slice()], true);

    let masks = synthesize(std::slice::from_ref(&region), &session.view(), session.viewport());
    assert_eq!(masks.dim.cutouts(), &[expected.clone()]);
    assert_eq!(masks.clip.paths(), masks.dim.cutouts());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dimmed.svg");
    session.export(Some(path.clone()), &CancellationToken::new()).await.unwrap();

    let svg = std::fs::read_to_string(&path).unwrap();
    assert!(svg.contains(&format!("<clipPath id=\"{}\"", CLIP_PATH_ID)));
    assert!(svg.contains(&format!("<mask id=\"{}\"", DIM_MASK_ID)));
    assert!(svg.matches(expected.as_str()).count() >= 2, "clip and mask both carry the ring");
}

#[tokio::test]
async fn test_export_embeds_raster_and_fixed_layer_order() {
    let backend = ScriptedBackend::new();
    let mut session = session_with(&backend, MapStyle::BrightV2);
    session.select_boundary(vec![1], OsmType::Relation).await;
    session.select_boundary(vec![2], OsmType::Relation).await;
    assert_eq!(
        session.refresh_roads(RoadFetchOptions::new(true, false)).await,
        ApplyOutcome::Applied
    );

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("map.svg");
    let outcome = session.export(Some(path.clone()), &CancellationToken::new()).await.unwrap();

    let ExportOutcome::Written { mosaic: Some(stats), .. } = outcome else {
        panic!("expected a written export with a mosaic, got {:?}", outcome);
    };
    assert!(stats.requested > 0);
    assert_eq!(stats.drawn, stats.requested);
    assert_eq!(stats.failed, 0);
    assert_eq!(session.state(), SessionState::ExportArtifactReady);

    let svg = std::fs::read_to_string(&path).unwrap();
    let position = |needle: &str| svg.find(needle).unwrap_or_else(|| panic!("missing {}", needle));
    let image = position("data:image/jpeg;base64,");
    let regions = position("id=\"Regions\"");
    let roads = position("id=\"Roads\"");
    let settlements = position("id=\"Settlements\"");
    assert!(image < regions && regions < roads && roads < settlements);
}

#[tokio::test]
async fn test_shared_way_appears_once() {
    let backend = ScriptedBackend::new();
    let mut session = session_with(&backend, MapStyle::None);
    session.select_boundary(vec![1], OsmType::Relation).await;
    session.select_boundary(vec![2], OsmType::Relation).await;

    session.refresh_roads(RoadFetchOptions::new(true, false)).await;

    assert_eq!(session.regions().len(), 2);
    assert_eq!(session.roads().len(), 1);
    assert_eq!(session.roads()[0].id().to_string(), "way/500");
    assert_eq!(session.live_overlay().roads.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_only_latest_road_fetch_reaches_overlay() {
    let backend = ScriptedBackend::new().with_federal_delay(Duration::from_secs(3));
    let mut session = session_with(&backend, MapStyle::None);
    session.select_boundary(vec![1], OsmType::Relation).await;

    let first = session.begin_roads(RoadFetchOptions::new(true, false));
    let second = session.begin_roads(RoadFetchOptions::new(false, true));

    let (first, second) = tokio::join!(first.run(), second.run());
    assert_eq!(session.apply_roads(second), ApplyOutcome::Applied);
    let late = session.apply_roads(first);
    assert!(matches!(late, ApplyOutcome::Stale | ApplyOutcome::Cancelled), "got {:?}", late);

    assert_eq!(session.roads().len(), 1);
    assert_eq!(session.roads()[0].id().to_string(), "way/600");
    assert_eq!(session.live_overlay().roads.len(), 1);
}

#[tokio::test]
async fn test_saved_project_reproduces_export_offline() {
    let backend = ScriptedBackend::new();
    let mut session = session_with(&backend, MapStyle::None);
    session.select_boundary(vec![1], OsmType::Relation).await;
    session.refresh_roads(RoadFetchOptions::new(true, true)).await;
    session.set_dim_background(true);

    let dir = TempDir::new().unwrap();
    let project_path = dir.path().join("project.json");
    ProjectDocument::from_session_inputs(&session.inputs())
        .save(&project_path)
        .unwrap();

    let online = dir.path().join("online.svg");
    session.export(Some(online.clone()), &CancellationToken::new()).await.unwrap();

    let offline_backend = ScriptedBackend::new();
    let mut restored = session_with(&offline_backend, MapStyle::None);
    let inputs = ProjectDocument::load(&project_path).unwrap().to_session_inputs().unwrap();
    restored.restore(inputs);

    let offline = dir.path().join("offline.svg");
    restored.export(Some(offline.clone()), &CancellationToken::new()).await.unwrap();

    assert_eq!(offline_backend.request_count(), 0);
    assert_eq!(
        std::fs::read_to_string(&online).unwrap(),
        std::fs::read_to_string(&offline).unwrap()
    );
}

#[tokio::test]
async fn test_world_mercator_style_reprojects_rings() {
    let backend = ScriptedBackend::new();
    let mut session = session_with(&backend, MapStyle::None);
    session.select_boundary(vec![1], OsmType::Relation).await;
    let web = session.live_overlay().regions.clone();

    session.set_map_style(MapStyle::Streets);
    assert_eq!(session.view().crs(), Crs::WorldMercator);
    assert_ne!(session.live_overlay().regions, web);

    let regions: Vec<BoundaryFeature> = session.regions().to_vec();
    assert!(regions.iter().all(|r| r.rings().all(|ring| ring.is_closed())));
}
