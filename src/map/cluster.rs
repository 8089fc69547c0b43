use egui::Color32;
use rstar::{RTree, primitives::GeomWithData};
use serde::{Deserialize, Serialize};

use super::{
  coordinates::{BoundingBox, Coordinate, PixelCoordinate, PixelPosition, WGS84Coordinate},
  icons::{MarkerIcon, marker_icon},
  viewport::Viewport,
};
use crate::records::{MapRecord, RecordKey};

/// Radial placement of over-zoomed cluster members.
pub mod spiderfy;

const MIN_CLUSTER_ZOOM: u8 = 0;

/// Visual weight of a cluster glyph. Ordered: more members never map to a smaller bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClusterBucket {
  Small,
  Medium,
  Large,
}

impl ClusterBucket {
  #[must_use]
  pub fn color(self) -> Color32 {
    match self {
      ClusterBucket::Small => Color32::from_rgb(59, 130, 246),
      ClusterBucket::Medium => Color32::from_rgb(249, 115, 22),
      ClusterBucket::Large => Color32::from_rgb(239, 68, 68),
    }
  }

  #[must_use]
  pub fn diameter(self) -> f32 {
    match self {
      ClusterBucket::Small => 30.,
      ClusterBucket::Medium => 40.,
      ClusterBucket::Large => 50.,
    }
  }

  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      ClusterBucket::Small => "small",
      ClusterBucket::Medium => "medium",
      ClusterBucket::Large => "large",
    }
  }
}

/// Member counts above which a cluster becomes medium or large.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterThresholds {
  pub medium_above: usize,
  pub large_above: usize,
}

impl Default for ClusterThresholds {
  fn default() -> Self {
    Self {
      medium_above: 5,
      large_above: 10,
    }
  }
}

impl ClusterThresholds {
  /// Swaps reversed thresholds so the bucket mapping stays monotonic.
  #[must_use]
  pub fn new(medium_above: usize, large_above: usize) -> Self {
    Self {
      medium_above: medium_above.min(large_above),
      large_above: medium_above.max(large_above),
    }
  }

  #[must_use]
  pub fn bucket(&self, count: usize) -> ClusterBucket {
    if count > self.large_above.max(self.medium_above) {
      ClusterBucket::Large
    } else if count > self.medium_above.min(self.large_above) {
      ClusterBucket::Medium
    } else {
      ClusterBucket::Small
    }
  }
}

/// A point handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterInput {
  pub key: RecordKey,
  pub position: WGS84Coordinate,
  pub icon: MarkerIcon,
}

impl From<&MapRecord> for ClusterInput {
  fn from(record: &MapRecord) -> Self {
    Self {
      key: record.key(),
      position: record.position,
      icon: marker_icon(record),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClusterId {
  pub zoom: u8,
  pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterView {
  pub id: ClusterId,
  pub position: WGS84Coordinate,
  pub count: usize,
  pub bucket: ClusterBucket,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpiderLeg {
  pub key: RecordKey,
  pub icon: MarkerIcon,
  pub offset: PixelPosition,
  pub position: WGS84Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spiderfied {
  pub cluster: ClusterId,
  pub anchor: WGS84Coordinate,
  pub legs: Vec<SpiderLeg>,
}

/// Anything the marker layer draws.
#[derive(Debug, Clone, PartialEq)]
pub enum MapItem {
  Marker {
    key: RecordKey,
    position: WGS84Coordinate,
    icon: MarkerIcon,
  },
  Cluster(ClusterView),
  SpiderLeg {
    anchor: WGS84Coordinate,
    leg: SpiderLeg,
  },
}

impl MapItem {
  #[must_use]
  pub fn position(&self) -> WGS84Coordinate {
    match self {
      MapItem::Marker { position, .. } => *position,
      MapItem::Cluster(view) => view.position,
      MapItem::SpiderLeg { leg, .. } => leg.position,
    }
  }

  /// Screen radius used for hit testing.
  #[must_use]
  pub fn hit_radius(&self) -> f32 {
    match self {
      MapItem::Marker { icon, .. } | MapItem::SpiderLeg { leg: SpiderLeg { icon, .. }, .. } => {
        icon.radius + 2.
      }
      MapItem::Cluster(view) => view.bucket.diameter() / 2.,
    }
  }
}

/// What a click on the marker layer resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterAction {
  /// An individual record was picked.
  Select(RecordKey),
  /// The camera should fit the cluster's members.
  ZoomTo { center: WGS84Coordinate, zoom: f64 },
  /// The cluster was fanned out into this many legs.
  Spiderfied(usize),
}

/// The outcome of expanding a cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
  Spiderfy(Spiderfied),
  ZoomTo { center: WGS84Coordinate, zoom: f64 },
}

#[derive(Debug, Clone)]
struct Node {
  center: PixelCoordinate,
  members: Vec<usize>,
  bounds: BoundingBox,
}

/// Hierarchical greedy clustering: every integer zoom level is clustered from the level above
/// it, so a cluster at zoom `z` is always a union of clusters at `z + 1`.
pub struct ClusterEngine {
  points: Vec<ClusterInput>,
  levels: Vec<Vec<Node>>,
  radius_px: f64,
  max_zoom: u8,
  thresholds: ClusterThresholds,
}

impl ClusterEngine {
  #[must_use]
  pub fn new(
    points: Vec<ClusterInput>,
    radius_px: f64,
    max_zoom: u8,
    thresholds: ClusterThresholds,
  ) -> Self {
    let mut engine = Self {
      points,
      levels: Vec::new(),
      radius_px: radius_px.max(0.),
      max_zoom: max_zoom.max(MIN_CLUSTER_ZOOM),
      thresholds,
    };
    engine.build();
    engine
  }

  fn build(&mut self) {
    let mut current: Vec<Node> = self
      .points
      .iter()
      .enumerate()
      .map(|(i, p)| Node {
        center: p.position.as_pixel_coordinate(),
        members: vec![i],
        bounds: BoundingBox::from_iterator([p.position]),
      })
      .collect();
    let mut levels = vec![Vec::new(); usize::from(self.max_zoom - MIN_CLUSTER_ZOOM) + 1];
    for zoom in (MIN_CLUSTER_ZOOM..=self.max_zoom).rev() {
      current = cluster_level(&current, f64::from(zoom), self.radius_px);
      levels[usize::from(zoom - MIN_CLUSTER_ZOOM)].clone_from(&current);
    }
    log::debug!(
      "Clustered {} points into {} levels",
      self.points.len(),
      levels.len()
    );
    self.levels = levels;
  }

  #[must_use]
  pub fn max_zoom(&self) -> u8 {
    self.max_zoom
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
  fn level_for(&self, zoom: f64) -> u8 {
    zoom
      .floor()
      .clamp(f64::from(MIN_CLUSTER_ZOOM), f64::from(self.max_zoom)) as u8
  }

  fn node(&self, id: ClusterId) -> Option<&Node> {
    self
      .levels
      .get(usize::from(id.zoom.checked_sub(MIN_CLUSTER_ZOOM)?))?
      .get(id.index)
  }

  /// Markers and clusters inside the viewport, partitioned for its zoom level.
  #[must_use]
  pub fn items(&self, viewport: &Viewport) -> Vec<MapItem> {
    if self.points.is_empty() {
      return Vec::new();
    }
    let zoom = self.level_for(viewport.zoom);
    let mut bounds = viewport.world_bounds();
    bounds.frame(self.radius_px / viewport.scale());
    self.levels[usize::from(zoom - MIN_CLUSTER_ZOOM)]
      .iter()
      .enumerate()
      .filter(|(_, node)| bounds.contains(node.center))
      .map(|(index, node)| self.item(ClusterId { zoom, index }, node))
      .collect()
  }

  fn item(&self, id: ClusterId, node: &Node) -> MapItem {
    if let [single] = node.members.as_slice() {
      let point = &self.points[*single];
      MapItem::Marker {
        key: point.key,
        position: point.position,
        icon: point.icon,
      }
    } else {
      MapItem::Cluster(ClusterView {
        id,
        position: node.center.as_wgs84(),
        count: node.members.len(),
        bucket: self.thresholds.bucket(node.members.len()),
      })
    }
  }

  /// Zooms into a cluster, or fans it out when zooming cannot separate its members.
  #[must_use]
  pub fn expand(&self, id: ClusterId, viewport: &Viewport) -> Option<Expansion> {
    let node = self.node(id)?;
    let at_max_zoom = viewport.zoom >= f64::from(self.max_zoom);
    if at_max_zoom || node.bounds.is_point() {
      let anchor = node.center.as_wgs84();
      let anchor_screen = viewport.project(anchor);
      let legs = spiderfy::leg_offsets(node.members.len())
        .into_iter()
        .zip(&node.members)
        .map(|(offset, &member)| {
          let point = &self.points[member];
          SpiderLeg {
            key: point.key,
            icon: point.icon,
            offset,
            position: viewport.unproject(anchor_screen + offset),
          }
        })
        .collect();
      Some(Expansion::Spiderfy(Spiderfied {
        cluster: id,
        anchor,
        legs,
      }))
    } else {
      let zoom = viewport
        .zoom_to_fit(&node.bounds, f64::from(self.max_zoom))
        .max(viewport.zoom.floor() + 1.)
        .min(f64::from(self.max_zoom));
      Some(Expansion::ZoomTo {
        center: node.bounds.center_wgs84(),
        zoom,
      })
    }
  }
}

#[allow(clippy::cast_precision_loss)]
fn cluster_level(nodes: &[Node], zoom: f64, radius_px: f64) -> Vec<Node> {
  let tree = RTree::bulk_load(
    nodes
      .iter()
      .enumerate()
      .map(|(i, node)| GeomWithData::new(node.center.at_zoom(zoom), i))
      .collect(),
  );
  let mut visited = vec![false; nodes.len()];
  let mut clustered = Vec::new();

  for (i, node) in nodes.iter().enumerate() {
    if visited[i] {
      continue;
    }
    visited[i] = true;

    let mut merged = node.clone();
    let mut weight = node.members.len() as f64;
    let mut wx = node.center.x * weight;
    let mut wy = node.center.y * weight;

    for neighbor in tree.locate_within_distance(node.center.at_zoom(zoom), radius_px * radius_px) {
      let j = neighbor.data;
      if visited[j] {
        continue;
      }
      visited[j] = true;
      let other = &nodes[j];
      let w = other.members.len() as f64;
      wx += other.center.x * w;
      wy += other.center.y * w;
      weight += w;
      merged.members.extend_from_slice(&other.members);
      merged.bounds = merged.bounds.extend(&other.bounds);
    }

    merged.center = PixelCoordinate::new(wx / weight, wy / weight);
    clustered.push(merged);
  }
  clustered
}

/// The marker layer: a cluster engine plus the currently spiderfied cluster, if any.
pub struct ClusterLayer {
  engine: ClusterEngine,
  radius_px: f64,
  thresholds: ClusterThresholds,
  spiderfied: Option<(Spiderfied, f64)>,
}

impl ClusterLayer {
  #[must_use]
  pub fn new(radius_px: f64, max_zoom: u8, thresholds: ClusterThresholds) -> Self {
    Self {
      engine: ClusterEngine::new(Vec::new(), radius_px, max_zoom, thresholds),
      radius_px,
      thresholds,
      spiderfied: None,
    }
  }

  /// Replaces the point set and rebuilds the hierarchy.
  pub fn set_points(&mut self, points: Vec<ClusterInput>) {
    self.engine = ClusterEngine::new(
      points,
      self.radius_px,
      self.engine.max_zoom(),
      self.thresholds,
    );
    self.spiderfied = None;
  }

  #[must_use]
  pub fn engine(&self) -> &ClusterEngine {
    &self.engine
  }

  #[must_use]
  pub fn spiderfied(&self) -> Option<&Spiderfied> {
    self.spiderfied.as_ref().map(|(s, _)| s)
  }

  pub fn collapse(&mut self) {
    self.spiderfied = None;
  }

  /// Items for the viewport. A zoom change folds a spiderfied cluster back in.
  pub fn items(&mut self, viewport: &Viewport) -> Vec<MapItem> {
    if self
      .spiderfied
      .as_ref()
      .is_some_and(|(_, zoom)| (zoom - viewport.zoom).abs() > f64::EPSILON)
    {
      log::debug!("Zoom changed, collapsing spiderfied cluster");
      self.spiderfied = None;
    }

    let mut items = self.engine.items(viewport);
    if let Some((spider, _)) = &self.spiderfied {
      items.retain(|item| !matches!(item, MapItem::Cluster(view) if view.id == spider.cluster));
      items.extend(spider.legs.iter().map(|leg| MapItem::SpiderLeg {
        anchor: spider.anchor,
        leg: leg.clone(),
      }));
    }
    items
  }

  /// Resolves a click on one of the items returned by [`ClusterLayer::items`].
  pub fn click(&mut self, item: &MapItem, viewport: &Viewport) -> Option<ClusterAction> {
    match item {
      MapItem::Marker { key, .. } | MapItem::SpiderLeg { leg: SpiderLeg { key, .. }, .. } => {
        Some(ClusterAction::Select(*key))
      }
      MapItem::Cluster(view) => match self.engine.expand(view.id, viewport)? {
        Expansion::Spiderfy(spider) => {
          let count = spider.legs.len();
          log::debug!("Spiderfying cluster of {count}");
          self.spiderfied = Some((spider, viewport.zoom));
          Some(ClusterAction::Spiderfied(count))
        }
        Expansion::ZoomTo { center, zoom } => {
          self.spiderfied = None;
          Some(ClusterAction::ZoomTo { center, zoom })
        }
      },
    }
  }
}
