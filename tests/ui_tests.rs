use civicmap::{
  CivicMap, MapMount,
  config::Config,
  map::layers::{LayerProvider, OverlayKind},
  record_source::LoadedRecords,
  records::{RecordTag, records_from_value},
};
use egui_kittest::Harness;
use egui_kittest::kittest::Queryable;
use serde_json::json;

fn create_test_map() -> CivicMap {
  let mut config = Config::default();
  config.tile_cache_dir = None;
  CivicMap::new(&config, LayerProvider::default())
}

fn harness(map: CivicMap) -> Harness<'static, CivicMap> {
  Harness::new_state(|ctx, map: &mut CivicMap| map.show(ctx), map)
}

#[test]
fn empty_sidebar_shows_no_items() {
  let mut map = create_test_map();
  map.set_records(LoadedRecords::default());
  let mut harness = harness(map);
  harness.run();

  harness.get_by_label("No items");
  harness.get_by_label("Layers");
}

#[test]
fn fetch_error_is_shown_inline() {
  let mut map = create_test_map();
  map.set_records(LoadedRecords {
    records: Vec::new(),
    errors: vec!["Could not load complaints".to_string()],
  });
  let mut harness = harness(map);
  harness.run();

  harness.get_by_label("Could not load complaints");
}

#[test]
fn records_are_listed_by_title() {
  let mut map = create_test_map();
  map.set_records(LoadedRecords {
    records: records_from_value(
      RecordTag::Complaint,
      &json!([{"id": 1, "title": "Broken streetlight", "lat": 19.07, "lng": 72.88, "severity": 2}]),
    ),
    errors: Vec::new(),
  });
  let mut harness = harness(map);
  harness.run();

  harness.get_by_label("Broken streetlight");
}

#[test]
fn legend_appears_for_active_overlay() {
  let mut map = create_test_map();
  map.toggle_overlay(OverlayKind::Traffic);
  let mut harness = harness(map);
  harness.run();

  harness.get_by_label("Heavy");
  harness.get_by_label("Medium");
  harness.get_by_label("Light");
}

#[test]
fn pending_mount_shows_loading_placeholder() {
  let mut harness = Harness::new_ui(MapMount::placeholder);
  harness.run();

  harness.get_by_label("Loading records...");
}
