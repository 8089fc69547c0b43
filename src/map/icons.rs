use egui::Color32;

use crate::records::{MapRecord, RecordKind, StatusClass};

/// The outline a marker is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphShape {
  /// Complaints.
  Circle,
  /// Projects.
  Square,
}

/// How a single record is drawn on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerIcon {
  pub shape: GlyphShape,
  pub fill: Color32,
  pub stroke: Color32,
  pub radius: f32,
}

const MARKER_RADIUS: f32 = 8.;

/// Red family, light to deep, indexed by severity 1..=5.
const SEVERITY_REDS: [Color32; 5] = [
  Color32::from_rgb(252, 165, 165),
  Color32::from_rgb(248, 113, 113),
  Color32::from_rgb(239, 68, 68),
  Color32::from_rgb(220, 38, 38),
  Color32::from_rgb(185, 28, 28),
];

/// Unresolved complaints outside the severity ramp.
pub const SEVERITY_RED: Color32 = Color32::from_rgb(239, 68, 68);
pub const AMBER: Color32 = Color32::from_rgb(245, 158, 11);
pub const GREEN: Color32 = Color32::from_rgb(34, 197, 94);
pub const EMERALD: Color32 = Color32::from_rgb(16, 185, 129);
pub const BLUE: Color32 = Color32::from_rgb(59, 130, 246);
pub const SLATE: Color32 = Color32::from_rgb(100, 116, 139);
pub const VIOLET: Color32 = Color32::from_rgb(139, 92, 246);

/// Maps a record's kind, status and severity to its glyph.
#[must_use]
pub fn marker_icon(record: &MapRecord) -> MarkerIcon {
  let status = record.status_class();
  let (shape, fill) = match record.kind {
    RecordKind::Complaint { severity } => (GlyphShape::Circle, complaint_color(status, severity)),
    RecordKind::Project { .. } => (GlyphShape::Square, project_color(status)),
  };
  MarkerIcon {
    shape,
    fill,
    stroke: Color32::WHITE,
    radius: MARKER_RADIUS,
  }
}

#[must_use]
pub fn complaint_color(status: StatusClass, severity: u8) -> Color32 {
  match status {
    StatusClass::Resolved => GREEN,
    StatusClass::InProgress => AMBER,
    StatusClass::Pending | StatusClass::Other => {
      SEVERITY_REDS[usize::from(severity.clamp(1, 5) - 1)]
    }
  }
}

#[must_use]
pub fn project_color(status: StatusClass) -> Color32 {
  match status {
    StatusClass::Resolved => EMERALD,
    StatusClass::InProgress => BLUE,
    StatusClass::Pending => SLATE,
    StatusClass::Other => VIOLET,
  }
}

/// Whether a color belongs to the red ramp used for open complaints.
#[must_use]
pub fn is_red_family(color: Color32) -> bool {
  SEVERITY_REDS.contains(&color)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::map::coordinates::WGS84Coordinate;

  fn complaint(severity: u8, status: &str) -> MapRecord {
    MapRecord {
      id: 1,
      kind: RecordKind::Complaint { severity },
      title: String::new(),
      description: String::new(),
      position: WGS84Coordinate::new(19.07, 72.90),
      status: status.to_string(),
      photo_urls: vec![],
      created_at: None,
    }
  }

  #[test]
  fn severity_deepens_red() {
    let light = marker_icon(&complaint(1, "pending")).fill;
    let deep = marker_icon(&complaint(5, "pending")).fill;
    assert!(is_red_family(light));
    assert!(is_red_family(deep));
    assert!(deep.g() < light.g());
  }

  #[test]
  fn completed_project_is_emerald_square() {
    let mut project = complaint(1, "Completed");
    project.kind = RecordKind::Project { budget: None };
    let icon = marker_icon(&project);
    assert_eq!(icon.fill, EMERALD);
    assert_eq!(icon.shape, GlyphShape::Square);
  }

  #[test]
  fn resolved_complaint_is_green() {
    assert_eq!(marker_icon(&complaint(4, "RESOLVED")).fill, GREEN);
    assert_eq!(marker_icon(&complaint(4, "in_progress")).fill, AMBER);
  }
}
