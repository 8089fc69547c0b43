//! The map view: owns the view state and wires clusters, heat, overlays, search, sidebar and
//! legend together.

use std::{collections::BTreeSet, path::PathBuf, sync::Arc};

use chrono::Utc;
use egui::{Color32, Pos2, Rect, Sense, TextureHandle, TextureOptions};

use crate::{
  config::Config,
  legend::{LayerControl, LayerControlAction},
  map::{
    camera::{CameraCommand, FlyToTarget, RecenterController},
    cluster::{ClusterAction, ClusterInput, ClusterLayer, MapItem},
    coordinates::{PixelPosition, WGS84Coordinate},
    drawable::{ScreenTransform, draw_heat, draw_map_item, draw_overlay_feature, hit_feature},
    heat::{HeatLayer, HeatSurface, heat_points},
    icons::marker_icon,
    layers::{BaseLayer, LayerProvider, OverlayKind, Popup, tile_layer::TileLayer},
    surface::{LayerContent, LayerKey, MapSurface},
    viewport::Viewport,
  },
  record_source::LoadedRecords,
  records::{MapRecord, NavigationIntent, RecordKey},
  search::{
    GeocodeResult, GeocoderClient,
    ui::{LocationSearch, LocationSearchOptions, SearchEvent},
  },
  sidebar::{RecordFilter, SidebarContent, SortKey, filter_and_sort, sidebar_ui},
};

/// Zoom used when flying to a dropped pin.
pub const PIN_ZOOM: f64 = 15.;

/// What a click on the map landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapClick {
  Item,
  Feature(OverlayKind),
  Pin,
  Empty,
}

/// What the single search box does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
  #[default]
  Filter,
  Location,
}

/// The state of one map view. Only [`CivicMap`] changes it, and only through the setters
/// below; a selected record and a fly-to target never coexist.
#[derive(Debug, Clone)]
pub struct ViewState {
  selected: Option<RecordKey>,
  fly_to: Option<FlyToTarget>,
  search_mode: SearchMode,
  active_overlays: BTreeSet<OverlayKind>,
  base_layer: BaseLayer,
  filter: RecordFilter,
  sort: SortKey,
  clustering: bool,
  heat_visible: bool,
  revision: u64,
}

impl Default for ViewState {
  fn default() -> Self {
    Self {
      selected: None,
      fly_to: None,
      search_mode: SearchMode::Filter,
      active_overlays: BTreeSet::new(),
      base_layer: BaseLayer::default(),
      filter: RecordFilter::default(),
      sort: SortKey::default(),
      clustering: true,
      heat_visible: true,
      revision: 0,
    }
  }
}

impl ViewState {
  #[must_use]
  pub fn selected(&self) -> Option<RecordKey> {
    self.selected
  }

  #[must_use]
  pub fn fly_to(&self) -> Option<FlyToTarget> {
    self.fly_to
  }

  #[must_use]
  pub fn search_mode(&self) -> SearchMode {
    self.search_mode
  }

  #[must_use]
  pub fn active_overlays(&self) -> &BTreeSet<OverlayKind> {
    &self.active_overlays
  }

  #[must_use]
  pub fn base_layer(&self) -> BaseLayer {
    self.base_layer
  }

  #[must_use]
  pub fn filter(&self) -> &RecordFilter {
    &self.filter
  }

  #[must_use]
  pub fn sort(&self) -> SortKey {
    self.sort
  }

  #[must_use]
  pub fn clustering(&self) -> bool {
    self.clustering
  }

  #[must_use]
  pub fn heat_visible(&self) -> bool {
    self.heat_visible
  }

  /// Bumped on every change.
  #[must_use]
  pub fn revision(&self) -> u64 {
    self.revision
  }

  fn touch(&mut self) {
    self.revision += 1;
  }

  fn select(&mut self, key: Option<RecordKey>) {
    self.selected = key;
    if key.is_some() {
      self.fly_to = None;
    }
    self.touch();
  }

  fn set_fly_to(&mut self, target: FlyToTarget) {
    self.fly_to = Some(target);
    self.selected = None;
    self.touch();
  }
}

/// The interactive map with its sidebar and layer control.
pub struct CivicMap {
  state: ViewState,
  records: Vec<MapRecord>,
  fetch_error: Option<String>,
  viewport: Viewport,
  camera: RecenterController,
  clusters: ClusterLayer,
  heat: HeatLayer,
  heat_texture: Option<(Arc<HeatSurface>, TextureHandle)>,
  layers: LayerProvider,
  surface: MapSurface,
  tiles: Option<TileLayer>,
  tile_cache_dir: Option<PathBuf>,
  search_options: LocationSearchOptions,
  search: LocationSearch,
  layer_control: LayerControl,
  popup: Option<(WGS84Coordinate, Popup)>,
  navigation: Vec<NavigationIntent>,
}

impl CivicMap {
  #[must_use]
  pub fn new(config: &Config, layers: LayerProvider) -> Self {
    let mut map = Self {
      state: ViewState::default(),
      records: Vec::new(),
      fetch_error: None,
      viewport: Viewport::new(config.initial_center, config.initial_zoom, [800., 600.]),
      camera: RecenterController::new(config.recenter_threshold_m),
      clusters: ClusterLayer::new(
        config.cluster.radius_px,
        config.cluster.max_zoom,
        config.cluster.thresholds,
      ),
      heat: HeatLayer::new(config.heat.clone()),
      heat_texture: None,
      layers,
      surface: MapSurface::new(),
      tiles: None,
      tile_cache_dir: config.tile_cache_dir.clone(),
      search_options: config.search,
      search: LocationSearch::new(None, config.search),
      layer_control: LayerControl::default(),
      popup: None,
      navigation: Vec::new(),
    };
    map.sync_layers();
    map
  }

  #[must_use]
  pub fn with_geocoder(mut self, client: GeocoderClient) -> Self {
    self.search = LocationSearch::new(Some(client), self.search_options);
    self
  }

  #[must_use]
  pub fn state(&self) -> &ViewState {
    &self.state
  }

  #[must_use]
  pub fn viewport(&self) -> &Viewport {
    &self.viewport
  }

  pub fn set_viewport_size(&mut self, size: [f32; 2]) {
    self.viewport.size = size;
  }

  #[must_use]
  pub fn records(&self) -> &[MapRecord] {
    &self.records
  }

  #[must_use]
  pub fn fetch_error(&self) -> Option<&str> {
    self.fetch_error.as_deref()
  }

  #[must_use]
  pub fn surface(&self) -> &MapSurface {
    &self.surface
  }

  #[must_use]
  pub fn camera(&self) -> &RecenterController {
    &self.camera
  }

  #[must_use]
  pub fn search(&self) -> &LocationSearch {
    &self.search
  }

  #[must_use]
  pub fn heat_layer(&self) -> &HeatLayer {
    &self.heat
  }

  #[must_use]
  pub fn selected_record(&self) -> Option<&MapRecord> {
    let key = self.state.selected?;
    self.records.iter().find(|r| r.key() == key)
  }

  /// Replaces the record snapshot. Markers and heat are rebuilt from scratch.
  pub fn set_records(&mut self, loaded: LoadedRecords) {
    self.fetch_error = loaded.error_message();
    self.records = loaded.records;
    self
      .clusters
      .set_points(self.records.iter().map(ClusterInput::from).collect());
    self.heat.set_points(heat_points(&self.records).into());
    self.heat_texture = None;
    if self.state.selected.is_some() && self.selected_record().is_none() {
      self.state.select(None);
    }
    self
      .layers
      .refresh_records(&mut self.surface, &self.records, Utc::now());
    self.sync_layers();
    log::info!("Map shows {} records", self.records.len());
  }

  /// The list contents: filtered in filter mode, always sorted.
  #[must_use]
  pub fn visible_records(&self) -> Vec<&MapRecord> {
    filter_and_sort(
      &self.records,
      &self.state.filter,
      self.state.sort,
      self.state.search_mode == SearchMode::Filter,
    )
  }

  /// Selects a record from the map or the list. Clears any place target and closes the search
  /// dropdown; the camera only moves if the record is far away.
  pub fn select_item(&mut self, key: RecordKey, now: f64) -> Option<CameraCommand> {
    let position = self.records.iter().find(|r| r.key() == key)?.position;
    self.state.select(Some(key));
    self.search.close_dropdown();
    self.popup = None;
    self.camera.on_selection(&self.viewport, position, now)
  }

  /// Returns to the list. Filter and sort stay as they are.
  pub fn close_detail(&mut self) {
    if self.state.selected.is_some() {
      self.state.select(None);
    }
  }

  fn fly_to(&mut self, target: FlyToTarget, now: f64) -> CameraCommand {
    self.state.set_fly_to(target);
    self.popup = None;
    self.camera.on_fly_to(&self.viewport, target, now)
  }

  fn apply_location_result(&mut self, result: &GeocodeResult, now: f64) -> CameraCommand {
    self.fly_to(
      FlyToTarget {
        target: result.coordinate(),
        zoom: result.zoom_level(),
      },
      now,
    )
  }

  /// Picks entry `index` of the search dropdown.
  pub fn select_location_result(&mut self, index: usize, now: f64) -> Option<CameraCommand> {
    let result = self.search.select(index, now)?;
    Some(self.apply_location_result(&result, now))
  }

  /// Flies to a user supplied position, e.g. a dropped pin or a GPS fix.
  pub fn drop_pin(&mut self, position: WGS84Coordinate, now: f64) -> CameraCommand {
    self.fly_to(
      FlyToTarget {
        target: position,
        zoom: PIN_ZOOM,
      },
      now,
    )
  }

  pub fn set_search_mode(&mut self, mode: SearchMode) {
    if self.state.search_mode == mode {
      return;
    }
    self.state.search_mode = mode;
    if mode == SearchMode::Filter {
      self.search.clear();
    }
    self.state.touch();
  }

  /// Text of the search box for the current mode.
  #[must_use]
  pub fn search_text(&self) -> &str {
    match self.state.search_mode {
      SearchMode::Filter => &self.state.filter.query,
      SearchMode::Location => self.search.query(),
    }
  }

  pub fn set_search_text(&mut self, text: &str, now: f64) {
    match self.state.search_mode {
      SearchMode::Filter => {
        if self.state.filter.query != text {
          text.clone_into(&mut self.state.filter.query);
          self.state.touch();
        }
      }
      SearchMode::Location => self.search.set_query(text, now),
    }
  }

  pub fn set_filter(&mut self, filter: RecordFilter) {
    if self.state.filter != filter {
      self.state.filter = filter;
      self.state.touch();
    }
  }

  pub fn set_sort(&mut self, sort: SortKey) {
    if self.state.sort != sort {
      self.state.sort = sort;
      self.state.touch();
    }
  }

  pub fn toggle_overlay(&mut self, overlay: OverlayKind) {
    if !self.state.active_overlays.remove(&overlay) {
      self.state.active_overlays.insert(overlay);
    }
    self.state.touch();
    self.sync_layers();
  }

  pub fn set_base_layer(&mut self, base: BaseLayer) {
    if self.state.base_layer != base {
      self.state.base_layer = base;
      self.state.touch();
      self.sync_layers();
    }
  }

  /// Switches between clustered and individual markers.
  pub fn set_clustering(&mut self, enabled: bool) {
    if self.state.clustering != enabled {
      self.state.clustering = enabled;
      self.clusters.collapse();
      self.state.touch();
    }
  }

  pub fn set_heat_visible(&mut self, visible: bool) {
    if self.state.heat_visible != visible {
      self.state.heat_visible = visible;
      self.state.touch();
      self.sync_layers();
    }
  }

  fn sync_layers(&mut self) {
    self.layers.sync(
      &mut self.surface,
      self.state.base_layer,
      &self.state.active_overlays,
      &self.records,
      Utc::now(),
    );
    if !self.surface.contains(LayerKey::Markers) {
      self.surface.add(LayerKey::Markers, LayerContent::Markers);
    }
    match (self.state.heat_visible, self.surface.contains(LayerKey::Heat)) {
      (true, false) => self.surface.add(LayerKey::Heat, LayerContent::Heat),
      (false, true) => {
        self.surface.remove(LayerKey::Heat);
        self.heat.teardown();
        self.heat_texture = None;
      }
      _ => {}
    }
  }

  /// Markers, clusters and spider legs for the current viewport.
  pub fn map_items(&mut self) -> Vec<MapItem> {
    if !self.state.clustering {
      return self
        .records
        .iter()
        .map(|r| MapItem::Marker {
          key: r.key(),
          position: r.position,
          icon: marker_icon(r),
        })
        .collect();
    }
    self.clusters.items(&self.viewport)
  }

  /// Handles a click on a marker layer item.
  pub fn click_map_item(&mut self, item: &MapItem, now: f64) -> Option<ClusterAction> {
    let action = self.clusters.click(item, &self.viewport)?;
    match &action {
      ClusterAction::Select(key) => {
        self.select_item(*key, now);
      }
      ClusterAction::ZoomTo { center, zoom } => {
        self.camera.fit(&self.viewport, *center, *zoom, now);
      }
      ClusterAction::Spiderfied(_) => {}
    }
    Some(action)
  }

  /// Advances time: runs due geocode lookups, applies their replies, hands the search box
  /// back to filtering once a chosen place is reached, and moves the camera.
  pub fn tick(&mut self, now: f64, ctx: Option<&egui::Context>) {
    self.search.tick(now, ctx);
    if self.search.take_revert(now) {
      log::debug!("Search box back to filter mode");
      self.state.search_mode = SearchMode::Filter;
      self.state.touch();
    }
    self.camera.step(&mut self.viewport, now);
  }

  /// Navigation requested since the last call.
  pub fn take_navigation(&mut self) -> Vec<NavigationIntent> {
    std::mem::take(&mut self.navigation)
  }

  /// Removes every layer from the surface and drops all rendering resources.
  pub fn unmount(&mut self) {
    self.surface.clear();
    self.heat.teardown();
    self.heat_texture = None;
    self.clusters.collapse();
    self.tiles = None;
    self.popup = None;
    log::debug!("Map view unmounted");
  }

  fn search_box(&mut self, ui: &mut egui::Ui, now: f64) {
    let mut mode = self.state.search_mode;
    ui.horizontal(|ui| {
      ui.selectable_value(&mut mode, SearchMode::Filter, "Filter records");
      ui.selectable_value(&mut mode, SearchMode::Location, "Find a place");
    });
    self.set_search_mode(mode);

    let hint = match mode {
      SearchMode::Filter => "Search titles and descriptions...",
      SearchMode::Location => "Place name or coordinates (19.07, 72.87)...",
    };
    let mut text = self.search_text().to_string();
    let response = ui.add_sized(
      [ui.available_width(), 0.],
      egui::TextEdit::singleline(&mut text).hint_text(hint),
    );
    if response.changed() {
      self.set_search_text(&text, now);
    }
    if mode == SearchMode::Location
      && let Some(SearchEvent::Selected(result)) = self.search.ui(ui, now)
    {
      self.apply_location_result(&result, now);
    }
  }

  fn sidebar(&mut self, ui: &mut egui::Ui, now: f64) {
    self.search_box(ui, now);
    ui.separator();
    let output = {
      let visible = self.visible_records();
      let content = SidebarContent {
        records: &visible,
        selected: self.selected_record(),
        filter: &self.state.filter,
        sort: self.state.sort,
        filtering: self.state.search_mode == SearchMode::Filter,
        fetch_error: self.fetch_error.as_deref(),
      };
      sidebar_ui(ui, &content)
    };
    if let Some(key) = output.select {
      self.select_item(key, now);
    }
    if output.close_detail {
      self.close_detail();
    }
    if let Some(filter) = output.filter {
      self.set_filter(filter);
    }
    if let Some(sort) = output.sort {
      self.set_sort(sort);
    }
    if let Some(intent) = output.navigate {
      log::info!("Navigate to {}", intent.path());
      self.navigation.push(intent);
    }
  }

  fn layer_panel(&mut self, ui: &mut egui::Ui) {
    let action = self
      .layer_control
      .ui(ui, self.state.base_layer, &self.state.active_overlays);
    match action {
      Some(LayerControlAction::SetBase(base)) => self.set_base_layer(base),
      Some(LayerControlAction::ToggleOverlay(overlay)) => self.toggle_overlay(overlay),
      None => {}
    }
    ui.separator();
    let mut clustering = self.state.clustering;
    if ui.checkbox(&mut clustering, "Cluster markers").changed() {
      self.set_clustering(clustering);
    }
    let mut heat = self.state.heat_visible;
    if ui.checkbox(&mut heat, "Complaint heat").changed() {
      self.set_heat_visible(heat);
    }
  }

  /// Heat raster for the current viewport, computed on demand.
  pub fn heat_surface(&mut self) -> Arc<HeatSurface> {
    self.heat.render(&self.viewport)
  }

  fn heat_texture(&mut self, ctx: &egui::Context) -> Option<TextureHandle> {
    let surface = self.heat_surface();
    if surface.is_blank() {
      return None;
    }
    if let Some((drawn, texture)) = &self.heat_texture
      && Arc::ptr_eq(drawn, &surface)
    {
      return Some(texture.clone());
    }
    let texture = ctx.load_texture("heat", surface.to_color_image(), TextureOptions::LINEAR);
    self.heat_texture = Some((surface, texture.clone()));
    Some(texture)
  }

  fn handle_gestures(&mut self, ui: &egui::Ui, response: &egui::Response, rect: Rect) {
    if response.dragged() {
      let delta = response.drag_delta();
      self.viewport.pan_by(delta.x, delta.y);
    }
    if response.hovered() {
      let (scroll, pointer) = ui.input(|i| (i.smooth_scroll_delta.y, i.pointer.hover_pos()));
      if scroll.abs() > f32::EPSILON
        && let Some(pointer) = pointer
      {
        let anchor = PixelPosition::from(pointer - rect.min.to_vec2());
        self.viewport.zoom_around(f64::from(scroll) / 200., anchor);
      }
    }
  }

  /// Resolves a click at `pos`, given relative to the map's top-left corner.
  ///
  /// The first click of a double-click already went through as a single click, so a double
  /// click only drops a pin on empty map and never re-handles a marker or overlay.
  pub fn click_at(&mut self, pos: Pos2, double: bool, now: f64) -> MapClick {
    let items = self.map_items();
    let viewport = self.viewport;
    let transform = ScreenTransform {
      viewport: &viewport,
      origin: Pos2::ZERO,
    };
    if let Some(item) = Self::hit_item(&items, &transform, pos) {
      if !double {
        if self.state.clustering {
          self.click_map_item(&item, now);
        } else if let MapItem::Marker { key, .. } = item {
          self.select_item(key, now);
        }
      }
      return MapClick::Item;
    }
    if let Some((kind, index)) = self.hovered_feature(&transform, pos) {
      if !double {
        self.popup = self
          .surface
          .get(LayerKey::Overlay(kind))
          .and_then(|content| match content {
            LayerContent::Features(features) => features.get(index)?.popup().cloned(),
            _ => None,
          })
          .map(|popup| (transform.invert(pos), popup));
      }
      return MapClick::Feature(kind);
    }
    if double {
      self.drop_pin(transform.invert(pos), now);
      return MapClick::Pin;
    }
    self.dismiss_transient();
    MapClick::Empty
  }

  /// Closes whatever floats over the map: the feature popup, an open spider and the search
  /// dropdown. Query, search mode and selection stay as they are.
  pub fn dismiss_transient(&mut self) {
    self.popup = None;
    self.clusters.collapse();
    self.search.close_dropdown();
  }

  fn hit_item(items: &[MapItem], transform: &ScreenTransform, pos: Pos2) -> Option<MapItem> {
    items
      .iter()
      .rev()
      .find(|item| transform.apply(item.position()).distance(pos) <= item.hit_radius())
      .cloned()
  }

  fn hovered_feature(&self, transform: &ScreenTransform, pos: Pos2) -> Option<(OverlayKind, usize)> {
    self.surface.iter().rev().find_map(|(key, content)| {
      let (LayerKey::Overlay(kind), LayerContent::Features(features)) = (key, content) else {
        return None;
      };
      features
        .iter()
        .position(|f| hit_feature(transform, f, pos))
        .map(|index| (*kind, index))
    })
  }

  fn draw_popup(&self, ctx: &egui::Context, transform: &ScreenTransform) {
    let Some((anchor, popup)) = &self.popup else {
      return;
    };
    egui::Area::new(egui::Id::new("feature_popup"))
      .fixed_pos(transform.apply(*anchor))
      .order(egui::Order::Foreground)
      .show(ctx, |ui| {
        egui::Frame::popup(ui.style()).show(ui, |ui| {
          ui.strong(&popup.title);
          for (label, value) in &popup.rows {
            ui.horizontal(|ui| {
              ui.small(format!("{label}:"));
              ui.label(value);
            });
          }
        });
      });
  }

  fn map_panel(&mut self, ui: &mut egui::Ui, now: f64) {
    let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
    self.set_viewport_size([rect.width(), rect.height()]);
    self.handle_gestures(ui, &response, rect);
    let painter = ui.painter_at(rect);

    let tiles = self
      .tiles
      .get_or_insert_with(|| TileLayer::new(ui.ctx().clone(), self.tile_cache_dir.clone()));
    if self.surface.contains(LayerKey::Base) {
      tiles.draw(&painter, rect, &self.viewport, self.state.base_layer);
    }

    let viewport = self.viewport;
    let transform = ScreenTransform {
      viewport: &viewport,
      origin: rect.min,
    };
    let pointer = response.hover_pos();
    let hovered = pointer.and_then(|pos| self.hovered_feature(&transform, pos));

    let mut panel_slot = 0;
    for (key, content) in self.surface.iter() {
      let (LayerKey::Overlay(kind), LayerContent::Features(features)) = (key, content) else {
        continue;
      };
      for (index, feature) in features.iter().enumerate() {
        draw_overlay_feature(
          &painter,
          &transform,
          feature,
          hovered == Some((*kind, index)),
          panel_slot,
        );
        if matches!(feature, crate::map::layers::OverlayFeature::Panel { .. }) {
          panel_slot += 1;
        }
      }
    }

    if self.surface.contains(LayerKey::Heat)
      && let Some(texture) = self.heat_texture(ui.ctx())
    {
      draw_heat(&painter, rect, &texture);
    }

    let items = self.map_items();
    let selected = self.state.selected;
    for item in &items {
      let is_selected = match item {
        MapItem::Marker { key, .. } => selected == Some(*key),
        MapItem::SpiderLeg { leg, .. } => selected == Some(leg.key),
        MapItem::Cluster(_) => false,
      };
      draw_map_item(&painter, &transform, item, is_selected);
    }

    if (response.clicked() || response.double_clicked())
      && let Some(pos) = response.interact_pointer_pos()
    {
      self.click_at(pos - rect.min.to_vec2(), response.double_clicked(), now);
    }
    self.draw_popup(ui.ctx(), &transform);

    if self.records.is_empty() {
      painter.text(
        rect.center_top() + egui::vec2(0., 16.),
        egui::Align2::CENTER_TOP,
        "No records to show",
        egui::FontId::proportional(14.),
        Color32::from_gray(80),
      );
    }
  }

  /// Draws the whole view for one frame.
  pub fn show(&mut self, ctx: &egui::Context) {
    let now = ctx.input(|i| i.time);
    self.tick(now, Some(ctx));
    if self.camera.is_animating() || self.search.revert_pending() {
      ctx.request_repaint();
    }

    egui::SidePanel::left("sidebar")
      .default_width(320.)
      .width_range(240.0..=520.0)
      .resizable(true)
      .show(ctx, |ui| self.sidebar(ui, now));

    egui::SidePanel::right("layers")
      .default_width(220.)
      .resizable(false)
      .show(ctx, |ui| self.layer_panel(ui));

    egui::CentralPanel::default()
      .frame(egui::Frame::NONE)
      .show(ctx, |ui| self.map_panel(ui, now));
  }
}

/// Defers building the map until a rendering context exists.
#[derive(Default)]
pub enum MapMount {
  #[default]
  Pending,
  Ready(Box<CivicMap>),
}

impl MapMount {
  /// The mounted map, building it with `build` on first use.
  pub fn get_or_mount(
    &mut self,
    ctx: &egui::Context,
    build: impl FnOnce(&egui::Context) -> CivicMap,
  ) -> &mut CivicMap {
    if let MapMount::Pending = self {
      log::debug!("Mounting map view");
      *self = MapMount::Ready(Box::new(build(ctx)));
    }
    match self {
      MapMount::Ready(map) => map,
      MapMount::Pending => unreachable!("mounted above"),
    }
  }

  #[must_use]
  pub fn map(&self) -> Option<&CivicMap> {
    match self {
      MapMount::Ready(map) => Some(map),
      MapMount::Pending => None,
    }
  }

  pub fn map_mut(&mut self) -> Option<&mut CivicMap> {
    match self {
      MapMount::Ready(map) => Some(map),
      MapMount::Pending => None,
    }
  }

  /// Tears the map down. Returns whether there was one.
  pub fn unmount(&mut self) -> bool {
    match std::mem::take(self) {
      MapMount::Ready(mut map) => {
        map.unmount();
        true
      }
      MapMount::Pending => false,
    }
  }

  /// Placeholder drawn while nothing is mounted.
  pub fn placeholder(ui: &mut egui::Ui) {
    ui.vertical_centered(|ui| {
      ui.add_space((ui.available_height() / 2. - 24.).max(0.));
      ui.spinner();
      ui.label("Loading records...");
    });
  }
}
