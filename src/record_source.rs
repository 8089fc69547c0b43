//! Where complaints and projects come from. Records are fetched once per view load.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result, anyhow};

use crate::records::{MapRecord, RecordTag, parse_records};

#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
  fn name(&self) -> String;

  async fn fetch(&self, tag: RecordTag) -> Result<Vec<MapRecord>>;
}

/// `GET {base}/api/complaints` and `GET {base}/api/projects`.
pub struct HttpRecordSource {
  base_url: String,
  client: surf::Client,
}

impl HttpRecordSource {
  #[must_use]
  pub fn new(base_url: &str) -> Self {
    Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      client: surf::Client::new(),
    }
  }

  #[must_use]
  pub fn url_for(&self, tag: RecordTag) -> String {
    format!("{}/api/{}", self.base_url, tag.route())
  }
}

#[async_trait::async_trait]
impl RecordSource for HttpRecordSource {
  fn name(&self) -> String {
    self.base_url.clone()
  }

  async fn fetch(&self, tag: RecordTag) -> Result<Vec<MapRecord>> {
    let url = self.url_for(tag);
    let mut response = self
      .client
      .get(&url)
      .await
      .map_err(|e| anyhow!("request to {url} failed: {e}"))?;
    if response.status() != 200 {
      return Err(anyhow!("{url} answered with status {}", response.status()));
    }
    let body = response
      .body_string()
      .await
      .map_err(|e| anyhow!("could not read {url}: {e}"))?;
    parse_records(tag, &body).with_context(|| format!("invalid records from {url}"))
  }
}

/// JSON files on disk, one per record kind. A kind without a file is asked from the fallback.
#[derive(Default)]
pub struct FileRecordSource {
  complaints: Option<PathBuf>,
  projects: Option<PathBuf>,
  fallback: Option<Arc<dyn RecordSource>>,
}

impl FileRecordSource {
  #[must_use]
  pub fn new(complaints: Option<PathBuf>, projects: Option<PathBuf>) -> Self {
    Self {
      complaints,
      projects,
      fallback: None,
    }
  }

  #[must_use]
  pub fn with_fallback(mut self, fallback: Arc<dyn RecordSource>) -> Self {
    self.fallback = Some(fallback);
    self
  }

  fn path(&self, tag: RecordTag) -> Option<&PathBuf> {
    match tag {
      RecordTag::Complaint => self.complaints.as_ref(),
      RecordTag::Project => self.projects.as_ref(),
    }
  }
}

#[async_trait::async_trait]
impl RecordSource for FileRecordSource {
  fn name(&self) -> String {
    "files".to_string()
  }

  async fn fetch(&self, tag: RecordTag) -> Result<Vec<MapRecord>> {
    if let Some(path) = self.path(tag) {
      let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;
      return parse_records(tag, &json).with_context(|| format!("invalid {}", path.display()));
    }
    match &self.fallback {
      Some(fallback) => fallback.fetch(tag).await,
      None => Ok(Vec::new()),
    }
  }
}

/// Records of both kinds plus a message for each kind that failed to load.
#[derive(Debug, Default, Clone)]
pub struct LoadedRecords {
  pub records: Vec<MapRecord>,
  pub errors: Vec<String>,
}

impl LoadedRecords {
  #[must_use]
  pub fn error_message(&self) -> Option<String> {
    (!self.errors.is_empty()).then(|| self.errors.join("; "))
  }
}

/// Fetches complaints and projects. A failing kind is logged and reported, the other still
/// loads.
pub async fn load_records(source: &dyn RecordSource) -> LoadedRecords {
  let mut loaded = LoadedRecords::default();
  for tag in [RecordTag::Complaint, RecordTag::Project] {
    match source.fetch(tag).await {
      Ok(records) => {
        log::info!("Loaded {} {}", records.len(), tag.route());
        loaded.records.extend(records);
      }
      Err(e) => {
        log::error!("Could not load {} from {}: {e:#}", tag.route(), source.name());
        loaded.errors.push(format!("Could not load {}", tag.route()));
      }
    }
  }
  loaded
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Fixed;

  #[async_trait::async_trait]
  impl RecordSource for Fixed {
    fn name(&self) -> String {
      "fixed".to_string()
    }

    async fn fetch(&self, tag: RecordTag) -> Result<Vec<MapRecord>> {
      match tag {
        RecordTag::Complaint => parse_records(
          tag,
          r#"[{"id": 1, "title": "Pothole", "lat": 19.07, "lng": 72.9, "severity": 4}]"#,
        ),
        RecordTag::Project => Err(anyhow!("boom")),
      }
    }
  }

  #[tokio::test]
  async fn one_failing_kind_keeps_the_other() {
    let loaded = load_records(&Fixed).await;
    assert_eq!(loaded.records.len(), 1);
    assert_eq!(loaded.error_message().as_deref(), Some("Could not load projects"));
  }

  #[tokio::test]
  async fn files_fall_back_per_kind() {
    let dir = std::env::temp_dir().join(format!("civicmap-records-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let projects = dir.join("projects.json");
    std::fs::write(
      &projects,
      r#"[{"id": 7, "title": "Flyover", "lat": 19.1, "lng": 72.85, "budget": 1000000}]"#,
    )
    .unwrap();
    let source = FileRecordSource::new(None, Some(projects)).with_fallback(Arc::new(Fixed));
    let loaded = load_records(&source).await;
    assert_eq!(loaded.records.len(), 2);
    assert!(loaded.errors.is_empty());
    let _ = std::fs::remove_dir_all(dir);
  }

  #[test]
  fn http_urls() {
    let source = HttpRecordSource::new("http://localhost:3000/");
    assert_eq!(
      source.url_for(RecordTag::Complaint),
      "http://localhost:3000/api/complaints"
    );
    assert_eq!(
      source.url_for(RecordTag::Project),
      "http://localhost:3000/api/projects"
    );
  }
}
