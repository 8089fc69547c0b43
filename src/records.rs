//! The records shown on the map: citizen complaints and municipal projects.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::map::coordinates::WGS84Coordinate;

#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
  #[error("record {id} has no valid coordinate")]
  InvalidCoordinate { id: i64 },
  #[error("record is missing an id")]
  MissingId,
  #[error("record id {0} is not an integer")]
  InvalidId(String),
  #[error("record is not a JSON object: {0}")]
  Malformed(String),
}

/// Discriminant of a ``MapRecord``.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordTag {
  Complaint,
  Project,
}

impl RecordTag {
  /// Path segment of the detail page.
  #[must_use]
  pub fn route(self) -> &'static str {
    match self {
      RecordTag::Complaint => "complaints",
      RecordTag::Project => "projects",
    }
  }
}

/// Identifies a record across both kinds, ids are only unique per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
  pub tag: RecordTag,
  pub id: i64,
}

impl RecordKey {
  #[must_use]
  pub fn complaint(id: i64) -> Self {
    Self {
      tag: RecordTag::Complaint,
      id,
    }
  }

  #[must_use]
  pub fn project(id: i64) -> Self {
    Self {
      tag: RecordTag::Project,
      id,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordKind {
  Complaint { severity: u8 },
  Project { budget: Option<f64> },
}

/// Normalized status used for colors and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusClass {
  Pending,
  InProgress,
  Resolved,
  Other,
}

impl StatusClass {
  /// Case-insensitive normalization of a free-text status label.
  #[must_use]
  pub fn classify(status: &str) -> Self {
    let normalized = status.trim().to_lowercase().replace(['_', ' '], "-");
    match normalized.as_str() {
      "pending" | "open" | "submitted" | "new" => StatusClass::Pending,
      "in-progress" | "inprogress" | "ongoing" | "assigned" => StatusClass::InProgress,
      "resolved" | "completed" | "complete" | "closed" | "done" => StatusClass::Resolved,
      _ => StatusClass::Other,
    }
  }

  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      StatusClass::Pending => "Pending",
      StatusClass::InProgress => "In progress",
      StatusClass::Resolved => "Resolved",
      StatusClass::Other => "Other",
    }
  }
}

/// An immutable snapshot of a complaint or project with a valid position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
  pub id: i64,
  pub kind: RecordKind,
  pub title: String,
  pub description: String,
  pub position: WGS84Coordinate,
  pub status: String,
  pub photo_urls: Vec<String>,
  pub created_at: Option<DateTime<Utc>>,
}

/// The loosely typed shape delivered by the backend. Every field is kept as raw JSON so a
/// wrongly typed optional field degrades to its default instead of rejecting the record.
#[derive(Debug, Deserialize)]
struct RawRecord {
  #[serde(default)]
  id: Option<Value>,
  #[serde(default)]
  title: Option<Value>,
  #[serde(default)]
  description: Option<Value>,
  #[serde(default, alias = "latitude")]
  lat: Option<Value>,
  #[serde(default, alias = "lon", alias = "longitude")]
  lng: Option<Value>,
  #[serde(default)]
  status: Option<Value>,
  #[serde(default)]
  severity: Option<Value>,
  #[serde(default)]
  budget: Option<Value>,
  #[serde(default, alias = "photoUrls", alias = "photos", alias = "images")]
  photo_urls: Option<Value>,
  #[serde(default, alias = "createdAt")]
  created_at: Option<Value>,
}

fn text(value: Option<&Value>) -> Option<String> {
  match value? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// Keeps the string entries of a photo list; anything else is ignored.
fn photo_urls(value: Option<&Value>) -> Vec<String> {
  match value {
    Some(Value::Array(items)) => items
      .iter()
      .filter_map(Value::as_str)
      .filter(|url| !url.trim().is_empty())
      .map(str::to_string)
      .collect(),
    Some(Value::String(url)) if !url.trim().is_empty() => vec![url.clone()],
    _ => Vec::new(),
  }
}

fn record_id(value: Option<&Value>) -> Result<i64, RecordError> {
  match value {
    None | Some(Value::Null) => Err(RecordError::MissingId),
    Some(Value::Number(n)) => n.as_i64().ok_or_else(|| RecordError::InvalidId(n.to_string())),
    Some(Value::String(s)) => s
      .trim()
      .parse()
      .map_err(|_| RecordError::InvalidId(s.clone())),
    Some(other) => Err(RecordError::InvalidId(other.to_string())),
  }
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn number(value: Option<&Value>) -> Option<f64> {
  match value? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  }
  .filter(|v| v.is_finite())
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  if let Ok(naive_dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
    return Some(naive_dt.and_utc());
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|d| d.and_utc())
}

impl MapRecord {
  /// Validates a raw JSON record. Records without a finite in-range coordinate are rejected.
  pub fn from_json(tag: RecordTag, value: &Value) -> Result<Self, RecordError> {
    if !value.is_object() {
      return Err(RecordError::Malformed(value.to_string()));
    }
    let raw: RawRecord =
      serde_json::from_value(value.clone()).map_err(|e| RecordError::Malformed(e.to_string()))?;
    let id = record_id(raw.id.as_ref())?;

    let position = match (number(raw.lat.as_ref()), number(raw.lng.as_ref())) {
      (Some(lat), Some(lon)) => WGS84Coordinate::new(lat, lon),
      _ => return Err(RecordError::InvalidCoordinate { id }),
    };
    if !position.is_valid() {
      return Err(RecordError::InvalidCoordinate { id });
    }

    let kind = match tag {
      RecordTag::Complaint => {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let severity = number(raw.severity.as_ref()).map_or(1, |s| s.round().clamp(1., 5.) as u8);
        RecordKind::Complaint { severity }
      }
      RecordTag::Project => RecordKind::Project {
        budget: number(raw.budget.as_ref()),
      },
    };

    Ok(Self {
      id,
      kind,
      title: text(raw.title.as_ref()).unwrap_or_default(),
      description: text(raw.description.as_ref()).unwrap_or_default(),
      position,
      status: text(raw.status.as_ref()).unwrap_or_else(|| "pending".to_string()),
      photo_urls: photo_urls(raw.photo_urls.as_ref()),
      created_at: text(raw.created_at.as_ref())
        .as_deref()
        .and_then(parse_timestamp),
    })
  }

  #[must_use]
  pub fn key(&self) -> RecordKey {
    RecordKey {
      tag: self.tag(),
      id: self.id,
    }
  }

  #[must_use]
  pub fn tag(&self) -> RecordTag {
    match self.kind {
      RecordKind::Complaint { .. } => RecordTag::Complaint,
      RecordKind::Project { .. } => RecordTag::Project,
    }
  }

  #[must_use]
  pub fn is_complaint(&self) -> bool {
    self.tag() == RecordTag::Complaint
  }

  #[must_use]
  pub fn severity(&self) -> Option<u8> {
    match self.kind {
      RecordKind::Complaint { severity } => Some(severity),
      RecordKind::Project { .. } => None,
    }
  }

  #[must_use]
  pub fn budget(&self) -> Option<f64> {
    match self.kind {
      RecordKind::Project { budget } => budget,
      RecordKind::Complaint { .. } => None,
    }
  }

  #[must_use]
  pub fn status_class(&self) -> StatusClass {
    StatusClass::classify(&self.status)
  }

  /// Heat weight in `[0, 1]`; only complaints carry one.
  #[must_use]
  pub fn heat_intensity(&self) -> Option<f64> {
    self.severity().map(|s| f64::from(s) / 5.)
  }

  /// Resolved complaints can be rated by the citizen who filed them.
  #[must_use]
  pub fn is_rateable(&self) -> bool {
    self.is_complaint() && self.status_class() == StatusClass::Resolved
  }
}

/// Parses a JSON array of records, dropping every record that fails validation.
pub fn parse_records(tag: RecordTag, json: &str) -> anyhow::Result<Vec<MapRecord>> {
  let value: Value = serde_json::from_str(json)?;
  Ok(records_from_value(tag, &value))
}

#[must_use]
pub fn records_from_value(tag: RecordTag, value: &Value) -> Vec<MapRecord> {
  let items = match value {
    Value::Array(items) => items.as_slice(),
    Value::Object(obj) => obj
      .get("data")
      .or_else(|| obj.get(tag.route()))
      .and_then(Value::as_array)
      .map_or(&[][..], Vec::as_slice),
    _ => &[],
  };
  items
    .iter()
    .filter_map(|item| {
      MapRecord::from_json(tag, item)
        .inspect_err(|e| log::debug!("Skipping {tag:?}: {e}"))
        .ok()
    })
    .collect()
}

/// Outbound navigation requested by the map; routing belongs to the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationIntent {
  RecordPage(RecordKey),
  RatePage { id: i64 },
}

impl NavigationIntent {
  #[must_use]
  pub fn path(&self) -> String {
    match self {
      NavigationIntent::RecordPage(key) => format!("/{}/{}", key.tag.route(), key.id),
      NavigationIntent::RatePage { id } => format!("/rate/{id}"),
    }
  }
}
