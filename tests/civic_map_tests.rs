use std::{
  collections::BTreeSet,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use civicmap::{
  CivicMap, MapClick, SearchMode,
  config::Config,
  dataset::FeatureCollection,
  map::{
    camera::CameraCommand,
    cluster::{ClusterAction, MapItem},
    coordinates::WGS84Coordinate,
    icons::{EMERALD, is_red_family},
    layers::{LayerProvider, OverlayDatasets, OverlayKind},
    surface::LayerKey,
  },
  record_source::LoadedRecords,
  records::{MapRecord, RecordKey, RecordTag, records_from_value},
  search::{GeocodeError, GeocodeResult, Geocoder, GeocoderClient},
};
use egui::Pos2;
use serde_json::json;

fn loaded(records: Vec<MapRecord>) -> LoadedRecords {
  LoadedRecords {
    records,
    errors: Vec::new(),
  }
}

fn complaint_and_project() -> Vec<MapRecord> {
  let mut records = records_from_value(
    RecordTag::Complaint,
    &json!([{"id": 1, "title": "Open drain", "lat": 19.07, "lng": 72.90, "severity": 5}]),
  );
  records.extend(records_from_value(
    RecordTag::Project,
    &json!([{"id": 2, "title": "Skywalk", "lat": 19.10, "lng": 72.88, "status": "Completed"}]),
  ));
  records
}

#[test]
fn empty_data_shows_only_the_base_layer() {
  let mut map = CivicMap::new(&Config::default(), LayerProvider::default());
  map.set_records(loaded(Vec::new()));

  assert!(map.map_items().is_empty());
  assert!(map.visible_records().is_empty());
  assert_eq!(map.fetch_error(), None);
  assert!(map.surface().contains(LayerKey::Base));
  assert_eq!(map.surface().total_feature_count(), 0);
  assert!(map.heat_layer().points().is_empty());
}

#[test]
fn complaint_and_project_cluster_and_heat() {
  let mut config = Config::default();
  config.cluster.radius_px = 200.;
  let mut map = CivicMap::new(&config, LayerProvider::default());
  map.set_records(loaded(complaint_and_project()));

  let items = map.map_items();
  assert_eq!(items.len(), 1);
  let MapItem::Cluster(view) = &items[0] else {
    panic!("expected a cluster, got {items:?}");
  };
  assert_eq!(view.count, 2);

  let points = map.heat_layer().points();
  assert_eq!(points.len(), 1);
  assert!((points[0].intensity - 1.).abs() < f64::EPSILON);

  map.set_clustering(false);
  let items = map.map_items();
  assert_eq!(items.len(), 2);
  for item in &items {
    let MapItem::Marker { key, icon, .. } = item else {
      panic!("expected markers only");
    };
    match key.tag {
      RecordTag::Complaint => assert!(is_red_family(icon.fill)),
      RecordTag::Project => assert_eq!(icon.fill, EMERALD),
    }
  }
}

#[test]
fn invalid_coordinates_produce_no_markers() {
  let records = records_from_value(
    RecordTag::Complaint,
    &json!([
      {"id": 1, "title": "ok", "lat": 19.07, "lng": 72.90},
      {"id": 2, "title": "null", "lat": null, "lng": 72.90},
      {"id": 3, "title": "missing"},
      {"id": 4, "title": "text", "lat": "abc", "lng": 72.9}
    ]),
  );
  let mut map = CivicMap::new(&Config::default(), LayerProvider::default());
  map.set_records(loaded(records));
  map.set_clustering(false);
  let items = map.map_items();
  assert_eq!(items.len(), 1);
  assert!(items.iter().all(|item| {
    let p = item.position();
    p.lat.is_finite() && p.lon.is_finite()
  }));
}

#[test]
fn selection_recenters_only_beyond_threshold() {
  let center = Config::default().initial_center;
  let records = records_from_value(
    RecordTag::Complaint,
    &json!([
      {"id": 1, "title": "near", "lat": center.lat + 0.001, "lng": center.lon},
      {"id": 2, "title": "far", "lat": center.lat + 0.05, "lng": center.lon}
    ]),
  );
  let mut map = CivicMap::new(&Config::default(), LayerProvider::default());
  map.set_records(loaded(records));

  assert_eq!(map.select_item(RecordKey::complaint(1), 0.), None);
  assert_eq!(map.camera().issued(), 0);

  let command = map.select_item(RecordKey::complaint(2), 0.);
  let Some(CameraCommand::FlyTo { target, zoom, .. }) = command else {
    panic!("expected a fly-to");
  };
  assert_eq!(target, WGS84Coordinate::new(center.lat + 0.05, center.lon));
  assert!((zoom - map.viewport().zoom).abs() < f64::EPSILON);
  assert_eq!(map.camera().issued(), 1);
}

#[test]
fn overlay_toggles_do_not_accumulate() {
  let boundaries = FeatureCollection::parse(
    &json!({
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "properties": {"name": "Ward A"},
          "geometry": {"type": "Polygon", "coordinates": [[[72.80, 19.00], [72.90, 19.00], [72.90, 19.10], [72.80, 19.00]]]}
        },
        {
          "type": "Feature",
          "properties": {"name": "Ward B"},
          "geometry": {"type": "Polygon", "coordinates": [[[72.90, 19.00], [73.00, 19.00], [73.00, 19.10], [72.90, 19.00]]]}
        }
      ]
    })
    .to_string(),
  )
  .unwrap();
  let provider = LayerProvider::new(OverlayDatasets {
    boundaries: Some(boundaries),
    ..Default::default()
  });
  let mut map = CivicMap::new(&Config::default(), provider);
  let key = LayerKey::Overlay(OverlayKind::Boundaries);

  map.toggle_overlay(OverlayKind::Boundaries);
  let once = map.surface().feature_count(key);
  assert_eq!(once, 2);
  let layers_once = map.surface().len();

  map.toggle_overlay(OverlayKind::Boundaries);
  assert!(!map.surface().contains(key));
  map.toggle_overlay(OverlayKind::Boundaries);
  assert_eq!(map.surface().feature_count(key), once);
  assert_eq!(map.surface().len(), layers_once);
  assert!(map.surface().is_balanced());
  assert_eq!(
    map.state().active_overlays(),
    &BTreeSet::from([OverlayKind::Boundaries])
  );
}

struct CountingGeocoder {
  calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Geocoder for CountingGeocoder {
  fn name(&self) -> &str {
    "counting"
  }

  async fn lookup(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(vec![GeocodeResult {
      place_id: "1".to_string(),
      display_name: format!("{query}, Maharashtra, India"),
      lat: 19.0760,
      lon: 72.8777,
      place_type: "city".to_string(),
    }])
  }
}

async fn wait_for_results(map: &mut CivicMap, now: f64) {
  for _ in 0..50 {
    tokio::time::sleep(Duration::from_millis(10)).await;
    map.tick(now, None);
    if !map.search().results().is_empty() {
      return;
    }
  }
}

#[tokio::test]
async fn location_search_fires_once_and_reverts() {
  let geocoder = Arc::new(CountingGeocoder {
    calls: AtomicUsize::new(0),
  });
  let mut map = CivicMap::new(&Config::default(), LayerProvider::default())
    .with_geocoder(GeocoderClient::new(geocoder.clone()));
  map.set_search_mode(SearchMode::Location);

  let mut now = 0.;
  for prefix in ["M", "Mu", "Mum", "Mumb", "Mumba", "Mumbai"] {
    map.set_search_text(prefix, now);
    map.tick(now, None);
    now += 0.1;
  }
  now += 0.6;
  map.tick(now, None);
  wait_for_results(&mut map, now).await;
  map.tick(now + 0.1, None);

  assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
  assert!(map.search().dropdown_open());

  let command = map.select_location_result(0, now).unwrap();
  let CameraCommand::FlyTo { zoom, .. } = command;
  assert!((zoom - 12.).abs() < f64::EPSILON);
  assert!(map.state().fly_to().is_some());
  assert!(map.state().selected().is_none());
  assert!(!map.search().dropdown_open());

  map.tick(now + 0.5, None);
  assert_eq!(map.state().search_mode(), SearchMode::Location);
  map.tick(now + 1.0, None);
  assert_eq!(map.state().search_mode(), SearchMode::Filter);
  assert_eq!(map.search().query(), "");
  assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn selecting_a_record_closes_the_search_results() {
  let geocoder = Arc::new(CountingGeocoder {
    calls: AtomicUsize::new(0),
  });
  let mut map = CivicMap::new(&Config::default(), LayerProvider::default())
    .with_geocoder(GeocoderClient::new(geocoder));
  map.set_records(loaded(complaint_and_project()));
  map.set_search_mode(SearchMode::Location);
  map.set_search_text("Bandra", 0.);
  map.tick(1., None);
  wait_for_results(&mut map, 1.).await;
  assert!(map.search().dropdown_open());

  map.select_item(RecordKey::project(2), 1.);
  assert!(!map.search().dropdown_open());
  assert_eq!(map.state().selected(), Some(RecordKey::project(2)));
  assert!(map.state().fly_to().is_none());
}

#[tokio::test]
async fn clicking_empty_map_only_closes_the_search_results() {
  let geocoder = Arc::new(CountingGeocoder {
    calls: AtomicUsize::new(0),
  });
  let mut map = CivicMap::new(&Config::default(), LayerProvider::default())
    .with_geocoder(GeocoderClient::new(geocoder));
  map.set_viewport_size([800., 600.]);
  map.set_records(loaded(complaint_and_project()));
  map.select_item(RecordKey::complaint(1), 0.);
  map.set_search_mode(SearchMode::Location);
  map.set_search_text("Bandra", 0.);
  map.tick(1., None);
  wait_for_results(&mut map, 1.).await;
  assert!(map.search().dropdown_open());

  assert_eq!(map.click_at(Pos2::new(2., 2.), false, 1.), MapClick::Empty);
  assert!(!map.search().dropdown_open());
  assert_eq!(map.search().query(), "Bandra");
  assert_eq!(map.state().search_mode(), SearchMode::Location);
  assert_eq!(map.state().selected(), Some(RecordKey::complaint(1)));
}

#[test]
fn double_click_on_a_marker_keeps_the_selection() {
  let mut map = CivicMap::new(&Config::default(), LayerProvider::default());
  map.set_viewport_size([800., 600.]);
  map.set_records(loaded(complaint_and_project()));
  map.set_clustering(false);
  let marker = Pos2::from(map.viewport().project(WGS84Coordinate::new(19.07, 72.90)));

  assert_eq!(map.click_at(marker, false, 0.), MapClick::Item);
  assert_eq!(map.state().selected(), Some(RecordKey::complaint(1)));
  assert_eq!(map.click_at(marker, true, 0.1), MapClick::Item);
  assert_eq!(map.state().selected(), Some(RecordKey::complaint(1)));
  assert!(map.state().fly_to().is_none());

  assert_eq!(map.click_at(Pos2::new(2., 2.), true, 0.2), MapClick::Pin);
  assert!(map.state().selected().is_none());
  assert!(map.state().fly_to().is_some());
}

#[test]
fn heat_raster_is_released_with_its_layer() {
  let mut map = CivicMap::new(&Config::default(), LayerProvider::default());
  map.set_viewport_size([400., 300.]);
  map.set_heat_visible(true);
  map.set_records(loaded(complaint_and_project()));
  map.heat_surface();
  assert!(map.heat_layer().has_raster());

  map.set_heat_visible(false);
  assert!(!map.surface().contains(LayerKey::Heat));
  assert!(!map.heat_layer().has_raster());
  assert!(map.surface().is_balanced());

  map.set_heat_visible(true);
  map.heat_surface();
  map.set_records(loaded(complaint_and_project()));
  assert!(!map.heat_layer().has_raster());
  assert!(map.surface().contains(LayerKey::Heat));
  assert!(map.surface().is_balanced());

  map.heat_surface();
  map.unmount();
  assert!(!map.heat_layer().has_raster());
  assert!(map.surface().is_empty());
  assert!(map.surface().is_balanced());
}

#[test]
fn clicking_a_collinear_cluster_zooms_in() {
  let records = records_from_value(
    RecordTag::Complaint,
    &json!([
      {"id": 1, "title": "west", "lat": 19.07, "lng": 72.900},
      {"id": 2, "title": "east", "lat": 19.07, "lng": 72.904}
    ]),
  );
  let mut map = CivicMap::new(&Config::default(), LayerProvider::default());
  map.set_viewport_size([800., 600.]);
  map.set_records(loaded(records));
  let items = map.map_items();
  let cluster = items
    .iter()
    .find(|item| matches!(item, MapItem::Cluster(_)))
    .cloned()
    .expect("the two records should cluster");

  let action = map.click_map_item(&cluster, 0.);
  let Some(ClusterAction::ZoomTo { zoom, .. }) = action else {
    panic!("expected a zoom, got {action:?}");
  };
  assert!(zoom > map.viewport().zoom);
  assert!(map.map_items().iter().all(|item| !matches!(item, MapItem::SpiderLeg { .. })));
}
