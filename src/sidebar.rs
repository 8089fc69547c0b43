//! The list of records and the detail view of the selected one.

use std::cmp::Ordering;

use egui::{Color32, RichText, load::TexturePoll};
use serde::{Deserialize, Serialize};

use crate::records::{MapRecord, NavigationIntent, RecordKey, RecordKind, StatusClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
  /// Complaints first, most severe on top.
  #[default]
  Severity,
  Title,
}

impl SortKey {
  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      SortKey::Severity => "Severity",
      SortKey::Title => "Title",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
  #[default]
  All,
  Only(StatusClass),
}

impl StatusFilter {
  pub const ALL: [StatusFilter; 5] = [
    StatusFilter::All,
    StatusFilter::Only(StatusClass::Pending),
    StatusFilter::Only(StatusClass::InProgress),
    StatusFilter::Only(StatusClass::Resolved),
    StatusFilter::Only(StatusClass::Other),
  ];

  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      StatusFilter::All => "All statuses",
      StatusFilter::Only(status) => status.name(),
    }
  }

  #[must_use]
  pub fn matches(self, status: StatusClass) -> bool {
    match self {
      StatusFilter::All => true,
      StatusFilter::Only(wanted) => wanted == status,
    }
  }
}

/// Record filter of the search box in filter mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
  pub status: StatusFilter,
  /// Complaints below this severity are hidden. Projects have no severity and always pass.
  pub min_severity: u8,
  pub query: String,
}

impl Default for RecordFilter {
  fn default() -> Self {
    Self {
      status: StatusFilter::All,
      min_severity: 1,
      query: String::new(),
    }
  }
}

impl RecordFilter {
  #[must_use]
  pub fn matches(&self, record: &MapRecord) -> bool {
    if !self.status.matches(record.status_class()) {
      return false;
    }
    if record.severity().is_some_and(|s| s < self.min_severity) {
      return false;
    }
    let query = self.query.trim().to_lowercase();
    query.is_empty()
      || record.title.to_lowercase().contains(&query)
      || record.description.to_lowercase().contains(&query)
  }

  #[must_use]
  pub fn is_active(&self) -> bool {
    *self != Self::default()
  }
}

fn compare(a: &MapRecord, b: &MapRecord, sort: SortKey) -> Ordering {
  match sort {
    SortKey::Severity => b
      .is_complaint()
      .cmp(&a.is_complaint())
      .then_with(|| b.severity().cmp(&a.severity())),
    SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
  }
}

/// The records the list shows, in display order. The filter only applies when `filtering` is
/// set, i.e. while the search box is in filter mode.
#[must_use]
pub fn filter_and_sort<'a>(
  records: &'a [MapRecord],
  filter: &RecordFilter,
  sort: SortKey,
  filtering: bool,
) -> Vec<&'a MapRecord> {
  let mut visible: Vec<&MapRecord> = records
    .iter()
    .filter(|r| !filtering || filter.matches(r))
    .collect();
  visible.sort_by(|a, b| compare(a, b, sort));
  visible
}

/// Outbound links offered for a record.
#[must_use]
pub fn detail_actions(record: &MapRecord) -> Vec<NavigationIntent> {
  let mut actions = vec![NavigationIntent::RecordPage(record.key())];
  if record.is_rateable() {
    actions.push(NavigationIntent::RatePage { id: record.id });
  }
  actions
}

fn action_label(intent: &NavigationIntent) -> &'static str {
  match intent {
    NavigationIntent::RecordPage(_) => "Open full page",
    NavigationIntent::RatePage { .. } => "Rate the resolution",
  }
}

/// What the user asked for in the sidebar this frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SidebarOutput {
  pub select: Option<RecordKey>,
  pub close_detail: bool,
  pub navigate: Option<NavigationIntent>,
  pub filter: Option<RecordFilter>,
  pub sort: Option<SortKey>,
}

/// Everything the sidebar shows; it holds no state of its own.
pub struct SidebarContent<'a> {
  pub records: &'a [&'a MapRecord],
  pub selected: Option<&'a MapRecord>,
  pub filter: &'a RecordFilter,
  pub sort: SortKey,
  pub filtering: bool,
  pub fetch_error: Option<&'a str>,
}

fn status_color(status: StatusClass) -> Color32 {
  match status {
    StatusClass::Pending => crate::map::icons::AMBER,
    StatusClass::InProgress => crate::map::icons::BLUE,
    StatusClass::Resolved => crate::map::icons::GREEN,
    StatusClass::Other => crate::map::icons::SLATE,
  }
}

fn record_row(ui: &mut egui::Ui, record: &MapRecord) -> bool {
  let subtitle = match record.kind {
    RecordKind::Complaint { severity } => format!("Complaint · severity {severity}"),
    RecordKind::Project { .. } => "Project".to_string(),
  };
  let response = ui
    .group(|ui| {
      ui.set_width(ui.available_width());
      ui.horizontal(|ui| {
        ui.strong(&record.title);
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
          ui.label(
            RichText::new(record.status_class().name())
              .small()
              .color(status_color(record.status_class())),
          );
        });
      });
      ui.small(subtitle);
    })
    .response
    .interact(egui::Sense::click());
  if response.hovered() {
    ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
  }
  response.clicked()
}

fn filter_controls(ui: &mut egui::Ui, content: &SidebarContent, out: &mut SidebarOutput) {
  let mut filter = content.filter.clone();
  let mut sort = content.sort;
  ui.add_enabled_ui(content.filtering, |ui| {
    ui.horizontal(|ui| {
      egui::ComboBox::from_id_salt("status_filter")
        .selected_text(filter.status.name())
        .show_ui(ui, |ui| {
          for status in StatusFilter::ALL {
            ui.selectable_value(&mut filter.status, status, status.name());
          }
        });
      ui.add(egui::Slider::new(&mut filter.min_severity, 1..=5).text("min severity"));
    });
  });
  ui.horizontal(|ui| {
    ui.label("Sort by");
    for key in [SortKey::Severity, SortKey::Title] {
      ui.selectable_value(&mut sort, key, key.name());
    }
    let clear = egui::Button::new("Clear filters").small();
    if ui
      .add_enabled(content.filtering && filter.is_active(), clear)
      .clicked()
    {
      filter = RecordFilter::default();
    }
  });
  if filter != *content.filter {
    out.filter = Some(filter);
  }
  if sort != content.sort {
    out.sort = Some(sort);
  }
}

fn list_view(ui: &mut egui::Ui, content: &SidebarContent, out: &mut SidebarOutput) {
  filter_controls(ui, content, out);
  ui.separator();
  if let Some(error) = content.fetch_error {
    ui.colored_label(Color32::from_rgb(220, 38, 38), error);
  }
  if content.records.is_empty() {
    ui.vertical_centered(|ui| {
      ui.add_space(20.);
      ui.weak("No items");
    });
    return;
  }
  ui.small(format!("{} items", content.records.len()));
  egui::ScrollArea::vertical()
    .auto_shrink([false; 2])
    .show(ui, |ui| {
      for record in content.records {
        if record_row(ui, record) {
          out.select = Some(record.key());
        }
      }
    });
}

fn photo(ui: &mut egui::Ui, url: &str) {
  let size = egui::vec2(120., 90.);
  let poll = ui.ctx().try_load_texture(
    url,
    egui::TextureOptions::LINEAR,
    egui::load::SizeHint::default(),
  );
  match poll {
    Ok(TexturePoll::Ready { texture }) => {
      ui.add(egui::Image::new(texture).fit_to_exact_size(size));
    }
    Ok(TexturePoll::Pending { .. }) => {
      ui.add_sized(size, egui::Spinner::new());
    }
    Err(e) => {
      log::debug!("Photo {url} unavailable: {e}");
      let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
      ui.painter()
        .rect_filled(rect, egui::CornerRadius::same(4), Color32::from_gray(220));
      ui.painter().text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        "Image unavailable",
        egui::FontId::proportional(11.),
        Color32::from_gray(90),
      );
    }
  }
}

fn detail_view(ui: &mut egui::Ui, record: &MapRecord, out: &mut SidebarOutput) {
  ui.horizontal(|ui| {
    if ui.button("← Back").clicked() {
      out.close_detail = true;
    }
  });
  ui.separator();
  egui::ScrollArea::vertical()
    .auto_shrink([false; 2])
    .show(ui, |ui| {
      ui.heading(&record.title);
      ui.label(
        RichText::new(&record.status)
          .color(status_color(record.status_class()))
          .strong(),
      );
      egui::Grid::new("record_attributes")
        .num_columns(2)
        .show(ui, |ui| {
          match record.kind {
            RecordKind::Complaint { severity } => {
              ui.label("Severity");
              ui.label(format!("{severity} / 5"));
              ui.end_row();
            }
            RecordKind::Project { budget } => {
              ui.label("Budget");
              ui.label(budget.map_or_else(|| "-".to_string(), |b| format!("₹ {b:.0}")));
              ui.end_row();
            }
          }
          ui.label("Location");
          ui.label(format!(
            "{:.5}, {:.5}",
            record.position.lat, record.position.lon
          ));
          ui.end_row();
          if let Some(created_at) = record.created_at {
            ui.label("Reported");
            ui.label(created_at.format("%Y-%m-%d").to_string());
            ui.end_row();
          }
        });
      if !record.description.is_empty() {
        ui.add_space(6.);
        ui.label(&record.description);
      }
      if !record.photo_urls.is_empty() {
        ui.add_space(6.);
        ui.strong("Evidence");
        ui.horizontal_wrapped(|ui| {
          for url in &record.photo_urls {
            photo(ui, url);
          }
        });
      }
      ui.add_space(8.);
      for intent in detail_actions(record) {
        if ui.button(action_label(&intent)).clicked() {
          out.navigate = Some(intent);
        }
      }
    });
}

/// Shows the detail view when a record is selected, the list otherwise.
pub fn sidebar_ui(ui: &mut egui::Ui, content: &SidebarContent) -> SidebarOutput {
  let mut out = SidebarOutput::default();
  match content.selected {
    Some(record) => detail_view(ui, record, &mut out),
    None => list_view(ui, content, &mut out),
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::map::coordinates::WGS84Coordinate;

  fn complaint(id: i64, title: &str, severity: u8, status: &str) -> MapRecord {
    MapRecord {
      id,
      kind: RecordKind::Complaint { severity },
      title: title.to_string(),
      description: String::new(),
      position: WGS84Coordinate::new(19.07, 72.9),
      status: status.to_string(),
      photo_urls: Vec::new(),
      created_at: None,
    }
  }

  fn project(id: i64, title: &str) -> MapRecord {
    MapRecord {
      kind: RecordKind::Project { budget: None },
      ..complaint(id, title, 1, "ongoing")
    }
  }

  fn titles(records: &[&MapRecord]) -> Vec<String> {
    records.iter().map(|r| r.title.clone()).collect()
  }

  #[test]
  fn severity_sort_puts_complaints_first() {
    let records = vec![
      project(1, "Metro"),
      complaint(2, "Pothole", 2, "pending"),
      complaint(3, "Flooding", 5, "pending"),
      project(4, "Bridge"),
    ];
    let sorted = filter_and_sort(&records, &RecordFilter::default(), SortKey::Severity, true);
    assert_eq!(titles(&sorted), ["Flooding", "Pothole", "Metro", "Bridge"]);
  }

  #[test]
  fn title_sort_ignores_case() {
    let records = vec![
      complaint(1, "pothole", 2, "pending"),
      project(2, "Bridge"),
      complaint(3, "Algae", 5, "pending"),
    ];
    let sorted = filter_and_sort(&records, &RecordFilter::default(), SortKey::Title, true);
    assert_eq!(titles(&sorted), ["Algae", "Bridge", "pothole"]);
  }

  #[test]
  fn filter_applies_only_in_filter_mode() {
    let records = vec![
      complaint(1, "Pothole on Link Road", 2, "pending"),
      complaint(2, "Garbage", 4, "resolved"),
    ];
    let filter = RecordFilter {
      query: "link".to_string(),
      ..RecordFilter::default()
    };
    assert_eq!(filter_and_sort(&records, &filter, SortKey::Title, true).len(), 1);
    assert_eq!(filter_and_sort(&records, &filter, SortKey::Title, false).len(), 2);
  }

  #[test]
  fn status_and_severity_filters() {
    let records = vec![
      complaint(1, "a", 2, "pending"),
      complaint(2, "b", 4, "resolved"),
      project(3, "c"),
    ];
    let filter = RecordFilter {
      min_severity: 3,
      ..RecordFilter::default()
    };
    assert_eq!(
      titles(&filter_and_sort(&records, &filter, SortKey::Title, true)),
      ["b", "c"]
    );
    let filter = RecordFilter {
      status: StatusFilter::Only(StatusClass::Pending),
      ..RecordFilter::default()
    };
    assert_eq!(
      titles(&filter_and_sort(&records, &filter, SortKey::Title, true)),
      ["a"]
    );
  }

  #[test]
  fn filter_is_active_once_changed() {
    assert!(!RecordFilter::default().is_active());
    let filter = RecordFilter {
      query: "drain".to_string(),
      ..RecordFilter::default()
    };
    assert!(filter.is_active());
    let filter = RecordFilter {
      status: StatusFilter::Only(StatusClass::Resolved),
      ..RecordFilter::default()
    };
    assert!(filter.is_active());
  }

  #[test]
  fn rating_only_for_resolved_complaints() {
    let resolved = complaint(5, "Fixed", 3, "Completed");
    assert_eq!(
      detail_actions(&resolved),
      vec![
        NavigationIntent::RecordPage(RecordKey::complaint(5)),
        NavigationIntent::RatePage { id: 5 }
      ]
    );
    assert_eq!(detail_actions(&complaint(6, "Open", 3, "pending")).len(), 1);
    let mut finished = project(7, "Done");
    finished.status = "completed".to_string();
    assert_eq!(detail_actions(&finished).len(), 1);
  }
}
