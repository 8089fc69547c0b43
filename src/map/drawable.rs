use egui::{
  Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, TextureHandle, Vec2,
  epaint::{CircleShape, PathShape, PathStroke, RectShape},
};

use super::{
  cluster::MapItem,
  coordinates::{PixelPosition, WGS84Coordinate, meters_per_pixel},
  icons::{GlyphShape, MarkerIcon},
  layers::{FeatureStyle, OverlayFeature},
  viewport::Viewport,
};

const DASH_LENGTH: f32 = 6.;
const GAP_LENGTH: f32 = 4.;

/// Maps geographic positions into the drawing area of a painter.
#[derive(Debug, Clone, Copy)]
pub struct ScreenTransform<'a> {
  pub viewport: &'a Viewport,
  pub origin: Pos2,
}

impl ScreenTransform<'_> {
  #[must_use]
  pub fn apply(&self, coord: WGS84Coordinate) -> Pos2 {
    Pos2::from(self.viewport.project(coord)) + self.origin.to_vec2()
  }

  #[must_use]
  pub fn invert(&self, pos: Pos2) -> WGS84Coordinate {
    self.viewport.unproject(PixelPosition::from(pos - self.origin.to_vec2()))
  }
}

fn path_shape(points: Vec<Pos2>, closed: bool, style: &FeatureStyle) -> Shape {
  if style.dashed {
    let mut outline = points.clone();
    if closed && let Some(first) = points.first() {
      outline.push(*first);
    }
    let mut shapes = Vec::new();
    if closed && style.fill != Color32::TRANSPARENT {
      shapes.push(Shape::Path(PathShape {
        points,
        closed: true,
        fill: style.fill,
        stroke: PathStroke::NONE,
      }));
    }
    shapes.extend(Shape::dashed_line(
      &outline,
      Stroke::new(style.weight, style.stroke),
      DASH_LENGTH,
      GAP_LENGTH,
    ));
    Shape::Vec(shapes)
  } else {
    Shape::Path(PathShape {
      points,
      closed,
      fill: if closed { style.fill } else { Color32::TRANSPARENT },
      stroke: PathStroke::new(style.weight, style.stroke),
    })
  }
}

/// Draws one overlay feature. Hover styling is derived here and never written back.
#[allow(clippy::cast_possible_truncation)]
pub fn draw_overlay_feature(
  painter: &Painter,
  transform: &ScreenTransform,
  feature: &OverlayFeature,
  hovered: bool,
  panel_slot: usize,
) {
  let pick = |style: &FeatureStyle| if hovered { style.hovered() } else { *style };
  match feature {
    OverlayFeature::Polygon { rings, style, .. } => {
      let style = pick(style);
      for ring in rings.iter().take(1) {
        let points = ring.iter().map(|c| transform.apply(*c)).collect();
        painter.add(path_shape(points, true, &style));
      }
    }
    OverlayFeature::Polyline { path, style, .. } => {
      let points = path.iter().map(|c| transform.apply(*c)).collect();
      painter.add(path_shape(points, false, &pick(style)));
    }
    OverlayFeature::Circle {
      center,
      radius_m,
      style,
    } => {
      let mpp = meters_per_pixel(center.lat, transform.viewport.zoom);
      painter.add(Shape::Circle(CircleShape {
        center: transform.apply(*center),
        radius: (radius_m / mpp) as f32,
        fill: style.fill,
        stroke: Stroke::new(style.weight, style.stroke),
      }));
    }
    OverlayFeature::Panel { title, lines } => {
      draw_panel(painter, title, lines, panel_slot);
    }
  }
}

#[allow(clippy::cast_precision_loss)]
fn draw_panel(painter: &Painter, title: &str, lines: &[String], slot: usize) {
  let clip = painter.clip_rect();
  let height = 24. + 16. * lines.len() as f32;
  let min = clip.right_top() + Vec2::new(-190., 10. + slot as f32 * (height + 8.));
  let rect = Rect::from_min_size(min, Vec2::new(180., height));
  painter.add(RectShape::filled(
    rect,
    egui::CornerRadius::same(6),
    Color32::from_rgba_unmultiplied(255, 255, 255, 230),
  ));
  painter.text(
    rect.min + Vec2::new(8., 6.),
    Align2::LEFT_TOP,
    title,
    FontId::proportional(13.),
    Color32::BLACK,
  );
  for (i, line) in lines.iter().enumerate() {
    painter.text(
      rect.min + Vec2::new(8., 24. + 16. * i as f32),
      Align2::LEFT_TOP,
      line,
      FontId::proportional(12.),
      Color32::DARK_GRAY,
    );
  }
}

fn draw_icon(painter: &Painter, center: Pos2, icon: &MarkerIcon, selected: bool) {
  let stroke = Stroke::new(if selected { 3. } else { 1.5 }, icon.stroke);
  let radius = if selected { icon.radius + 3. } else { icon.radius };
  match icon.shape {
    GlyphShape::Circle => {
      painter.add(Shape::Circle(CircleShape {
        center,
        radius,
        fill: icon.fill,
        stroke,
      }));
    }
    GlyphShape::Square => {
      painter.add(RectShape::new(
        Rect::from_center_size(center, Vec2::splat(radius * 2.)),
        egui::CornerRadius::same(2),
        icon.fill,
        stroke,
        egui::StrokeKind::Middle,
      ));
    }
  }
}

/// Draws a marker, a cluster glyph or a spider leg with its connecting line.
pub fn draw_map_item(
  painter: &Painter,
  transform: &ScreenTransform,
  item: &MapItem,
  selected: bool,
) {
  match item {
    MapItem::Marker { position, icon, .. } => {
      draw_icon(painter, transform.apply(*position), icon, selected);
    }
    MapItem::SpiderLeg { anchor, leg } => {
      let from = transform.apply(*anchor);
      let to = transform.apply(leg.position);
      painter.line_segment([from, to], Stroke::new(1.5, Color32::from_gray(90)));
      draw_icon(painter, to, &leg.icon, selected);
    }
    MapItem::Cluster(view) => {
      let center = transform.apply(view.position);
      let color = view.bucket.color();
      let radius = view.bucket.diameter() / 2.;
      painter.add(Shape::Circle(CircleShape {
        center,
        radius: radius + 4.,
        fill: color.gamma_multiply(0.4),
        stroke: Stroke::NONE,
      }));
      painter.add(Shape::Circle(CircleShape {
        center,
        radius,
        fill: color,
        stroke: Stroke::new(1., Color32::WHITE),
      }));
      painter.text(
        center,
        Align2::CENTER_CENTER,
        view.count.to_string(),
        FontId::proportional(13.),
        Color32::WHITE,
      );
    }
  }
}

/// Stretches the heat raster over the drawing area.
pub fn draw_heat(painter: &Painter, rect: Rect, texture: &TextureHandle) {
  painter.image(
    texture.id(),
    rect,
    Rect::from_min_max(Pos2::ZERO, Pos2::new(1., 1.)),
    Color32::WHITE,
  );
}

/// Whether `pos` lies on a feature, used for hover and popups.
#[must_use]
pub fn hit_feature(transform: &ScreenTransform, feature: &OverlayFeature, pos: Pos2) -> bool {
  match feature {
    OverlayFeature::Polygon { rings, .. } => rings.first().is_some_and(|ring| {
      let points: Vec<Pos2> = ring.iter().map(|c| transform.apply(*c)).collect();
      point_in_polygon(pos, &points)
    }),
    OverlayFeature::Polyline { path, style, .. } => {
      let points: Vec<Pos2> = path.iter().map(|c| transform.apply(*c)).collect();
      points
        .windows(2)
        .any(|w| distance_to_segment(pos, w[0], w[1]) <= style.weight + 3.)
    }
    OverlayFeature::Circle { .. } | OverlayFeature::Panel { .. } => false,
  }
}

fn point_in_polygon(p: Pos2, polygon: &[Pos2]) -> bool {
  let mut inside = false;
  let n = polygon.len();
  let mut j = n.wrapping_sub(1);
  for i in 0..n {
    let (a, b) = (polygon[i], polygon[j]);
    if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
      inside = !inside;
    }
    j = i;
  }
  inside
}

fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
  let ab = b - a;
  let len_sq = ab.length_sq();
  if len_sq == 0. {
    return p.distance(a);
  }
  let t = ((p - a).dot(ab) / len_sq).clamp(0., 1.);
  p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::map::layers::FeatureStyle;

  #[test]
  fn polygon_hit_test() {
    let square = [
      Pos2::new(0., 0.),
      Pos2::new(10., 0.),
      Pos2::new(10., 10.),
      Pos2::new(0., 10.),
    ];
    assert!(point_in_polygon(Pos2::new(5., 5.), &square));
    assert!(!point_in_polygon(Pos2::new(15., 5.), &square));
  }

  #[test]
  fn polyline_hit_uses_stroke_weight() {
    let viewport = Viewport::new(WGS84Coordinate::new(19.07, 72.90), 14., [400., 400.]);
    let transform = ScreenTransform {
      viewport: &viewport,
      origin: Pos2::ZERO,
    };
    let line = OverlayFeature::Polyline {
      path: vec![
        WGS84Coordinate::new(19.07, 72.89),
        WGS84Coordinate::new(19.07, 72.91),
      ],
      style: FeatureStyle::outline(Color32::RED, 4.),
      popup: None,
    };
    let on_line = transform.apply(WGS84Coordinate::new(19.07, 72.90));
    assert!(hit_feature(&transform, &line, on_line));
    assert!(!hit_feature(&transform, &line, on_line + Vec2::new(0., 40.)));
  }

  #[test]
  fn transform_round_trips() {
    let viewport = Viewport::new(WGS84Coordinate::new(19.07, 72.90), 12., [400., 300.]);
    let transform = ScreenTransform {
      viewport: &viewport,
      origin: Pos2::new(100., 50.),
    };
    assert_eq!(transform.apply(viewport.center), Pos2::new(300., 200.));
  }
}
