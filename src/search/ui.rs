use super::{GeocodeResult, GeocoderClient};
use serde::{Deserialize, Serialize};
use std::{
  sync::mpsc::{Receiver, Sender, channel},
  time::Duration,
};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSearchOptions {
  /// Seconds of idle typing before a lookup fires.
  pub debounce_s: f64,
  pub min_chars: usize,
  /// Seconds after choosing a result until the box is handed back to filtering.
  pub revert_s: f64,
}

impl Default for LocationSearchOptions {
  fn default() -> Self {
    Self {
      debounce_s: 0.5,
      min_chars: 3,
      revert_s: 1.0,
    }
  }
}

/// A lookup the search box wants to run. Replies carry the generation back so that answers to
/// outdated queries can be recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
  pub generation: u64,
  pub query: String,
}

type LookupReply = (u64, Vec<GeocodeResult>);

/// What the user did with the dropdown this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
  Selected(GeocodeResult),
  Dismissed,
}

/// Debounced place search with a results dropdown. Only the reply to the latest query is
/// ever applied.
pub struct LocationSearch {
  client: Option<GeocoderClient>,
  options: LocationSearchOptions,
  query: String,
  results: Vec<GeocodeResult>,
  selected_index: Option<usize>,
  show_results: bool,
  is_searching: bool,
  generation: u64,
  requested_generation: Option<u64>,
  last_input_time: f64,
  revert_at: Option<f64>,
  reply_receiver: Receiver<LookupReply>,
  reply_sender: Sender<LookupReply>,
}

impl LocationSearch {
  #[must_use]
  pub fn new(client: Option<GeocoderClient>, options: LocationSearchOptions) -> Self {
    let (reply_sender, reply_receiver) = channel();
    Self {
      client,
      options,
      query: String::new(),
      results: Vec::new(),
      selected_index: None,
      show_results: false,
      is_searching: false,
      generation: 0,
      requested_generation: None,
      last_input_time: 0.,
      revert_at: None,
      reply_receiver,
      reply_sender,
    }
  }

  #[must_use]
  pub fn query(&self) -> &str {
    &self.query
  }

  #[must_use]
  pub fn results(&self) -> &[GeocodeResult] {
    &self.results
  }

  #[must_use]
  pub fn selected_index(&self) -> Option<usize> {
    self.selected_index
  }

  #[must_use]
  pub fn is_searching(&self) -> bool {
    self.is_searching
  }

  #[must_use]
  pub fn dropdown_open(&self) -> bool {
    self.show_results && !self.results.is_empty()
  }

  #[must_use]
  pub fn generation(&self) -> u64 {
    self.generation
  }

  fn long_enough(&self) -> bool {
    self.query.trim().chars().count() >= self.options.min_chars
  }

  /// Records a keystroke. Any reply still in flight becomes stale.
  pub fn set_query(&mut self, query: &str, now: f64) {
    if query == self.query {
      return;
    }
    query.clone_into(&mut self.query);
    self.generation += 1;
    self.last_input_time = now;
    self.revert_at = None;
    if !self.long_enough() {
      self.results.clear();
      self.show_results = false;
      self.selected_index = None;
      self.is_searching = false;
    }
  }

  /// The lookup to run now, if the query is long enough, the user paused typing, and this query
  /// has not been looked up yet.
  pub fn poll(&mut self, now: f64) -> Option<LookupRequest> {
    if self.requested_generation == Some(self.generation) || !self.long_enough() {
      return None;
    }
    if now - self.last_input_time < self.options.debounce_s {
      return None;
    }
    self.requested_generation = Some(self.generation);
    self.is_searching = true;
    log::debug!("Looking up '{}' (generation {})", self.query.trim(), self.generation);
    Some(LookupRequest {
      generation: self.generation,
      query: self.query.trim().to_string(),
    })
  }

  /// Applies the reply to a lookup. Returns false and changes nothing when the reply belongs to
  /// an older query.
  pub fn deliver(&mut self, generation: u64, results: Vec<GeocodeResult>) -> bool {
    if generation != self.generation {
      log::debug!(
        "Discarding stale geocode reply (generation {generation}, current {})",
        self.generation
      );
      return false;
    }
    self.is_searching = false;
    self.show_results = !results.is_empty();
    self.selected_index = (!results.is_empty()).then_some(0);
    self.results = results;
    true
  }

  /// Runs `request` on the ambient tokio runtime; the reply is picked up by [`Self::receive`].
  pub fn spawn(&mut self, request: LookupRequest, ctx: Option<&egui::Context>) {
    let Some(client) = self.client.clone() else {
      self.is_searching = false;
      return;
    };
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
      log::warn!("No async runtime, cannot look up '{}'", request.query);
      self.is_searching = false;
      return;
    };
    let sender = self.reply_sender.clone();
    let ctx = ctx.cloned();
    handle.spawn(async move {
      let results = match tokio::time::timeout(LOOKUP_TIMEOUT, client.lookup(&request.query)).await
      {
        Ok(results) => results,
        Err(_) => {
          log::warn!("Geocoding '{}' timed out", request.query);
          Vec::new()
        }
      };
      let _ = sender.send((request.generation, results));
      if let Some(ctx) = ctx {
        ctx.request_repaint();
      }
    });
  }

  /// Applies all replies that arrived since the last call. Returns how many were accepted.
  pub fn receive(&mut self) -> usize {
    let replies: Vec<LookupReply> = self.reply_receiver.try_iter().collect();
    let mut accepted = 0;
    for (generation, results) in replies {
      if self.deliver(generation, results) {
        accepted += 1;
      }
    }
    accepted
  }

  /// Polls, spawns due lookups and collects replies.
  pub fn tick(&mut self, now: f64, ctx: Option<&egui::Context>) {
    if let Some(request) = self.poll(now) {
      self.spawn(request, ctx);
    }
    self.receive();
  }

  pub fn move_selection(&mut self, down: bool) {
    if self.results.is_empty() {
      return;
    }
    let last = self.results.len() - 1;
    self.selected_index = Some(match (self.selected_index, down) {
      (None, true) => 0,
      (None, false) => last,
      (Some(i), true) => (i + 1).min(last),
      (Some(i), false) => i.saturating_sub(1),
    });
  }

  /// Chooses a result. The dropdown closes and the box schedules its own reset.
  pub fn select(&mut self, index: usize, now: f64) -> Option<GeocodeResult> {
    let result = self.results.get(index).cloned()?;
    log::info!(
      "Selected location: {} at {:.4}, {:.4}",
      result.display_name,
      result.lat,
      result.lon
    );
    self.show_results = false;
    self.selected_index = None;
    self.revert_at = Some(now + self.options.revert_s);
    Some(result)
  }

  /// True once the reset scheduled by [`Self::select`] is due; the search is cleared then.
  pub fn take_revert(&mut self, now: f64) -> bool {
    if self.revert_at.is_some_and(|at| now >= at) {
      self.revert_at = None;
      self.clear();
      return true;
    }
    false
  }

  #[must_use]
  pub fn revert_pending(&self) -> bool {
    self.revert_at.is_some()
  }

  /// Hides the dropdown, nothing else.
  pub fn close_dropdown(&mut self) {
    self.show_results = false;
  }

  pub fn clear(&mut self) {
    self.query.clear();
    self.results.clear();
    self.show_results = false;
    self.selected_index = None;
    self.is_searching = false;
    self.generation += 1;
    self.revert_at = None;
  }

  fn handle_keys(&mut self, ui: &egui::Ui, now: f64) -> Option<SearchEvent> {
    if !self.dropdown_open() {
      return None;
    }
    let (down, up, enter, escape) = ui.input(|i| {
      (
        i.key_pressed(egui::Key::ArrowDown),
        i.key_pressed(egui::Key::ArrowUp),
        i.key_pressed(egui::Key::Enter),
        i.key_pressed(egui::Key::Escape),
      )
    });
    if down || up {
      self.move_selection(down);
    } else if enter {
      return self
        .selected_index
        .and_then(|index| self.select(index, now))
        .map(SearchEvent::Selected);
    } else if escape {
      self.close_dropdown();
      self.selected_index = None;
      return Some(SearchEvent::Dismissed);
    }
    None
  }

  fn format_result(result: &GeocodeResult) -> String {
    let name = if result.display_name.chars().count() > 40 {
      let truncated: String = result.display_name.chars().take(37).collect();
      format!("{truncated}...")
    } else {
      result.display_name.clone()
    };
    if result.place_type.is_empty() {
      format!("📍 {name}")
    } else {
      format!("📍 {name} ({})", result.place_type)
    }
  }

  fn results_dropdown(&mut self, ui: &mut egui::Ui, now: f64) -> Option<SearchEvent> {
    let mut clicked_index = None;
    let frame = egui::Frame::popup(ui.style()).show(ui, |ui| {
      egui::ScrollArea::vertical().max_height(200.).show(ui, |ui| {
        for (index, result) in self.results.iter().enumerate() {
          let is_selected = self.selected_index == Some(index);
          let response = ui.add_sized(
            [ui.available_width(), 0.],
            egui::Button::new(Self::format_result(result))
              .fill(if is_selected {
                ui.style().visuals.selection.bg_fill
              } else {
                egui::Color32::TRANSPARENT
              })
              .stroke(egui::Stroke::NONE),
          );
          if response.clicked() {
            clicked_index = Some(index);
          }
          if response.hovered() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
            response.on_hover_text(format!("{:.4}°, {:.4}°", result.lat, result.lon));
          }
        }
      });
    });
    if let Some(index) = clicked_index {
      return self.select(index, now).map(SearchEvent::Selected);
    }
    let clicked_elsewhere = ui.input(|i| {
      i.pointer.any_click()
        && i
          .pointer
          .interact_pos()
          .is_some_and(|pos| !frame.response.rect.contains(pos))
    });
    if clicked_elsewhere {
      self.close_dropdown();
      return Some(SearchEvent::Dismissed);
    }
    None
  }

  /// Draws the status line and dropdown below a search box whose text is fed via
  /// [`Self::set_query`].
  pub fn ui(&mut self, ui: &mut egui::Ui, now: f64) -> Option<SearchEvent> {
    if !self.query.trim().is_empty()
      && self.requested_generation != Some(self.generation)
      && self.long_enough()
    {
      ui.ctx().request_repaint_after(Duration::from_millis(50));
    }
    if self.revert_at.is_some() {
      ui.ctx().request_repaint_after(Duration::from_millis(100));
    }
    let event = self.handle_keys(ui, now);
    if self.is_searching {
      ui.horizontal(|ui| {
        ui.spinner();
        ui.small("Searching...");
      });
    } else if self.query.trim().is_empty() {
      ui.small("Try: \"Bandra\", \"19.07, 72.87\" or \"19°04'N 72°52'E\"");
    } else if !self.long_enough() {
      ui.small(format!("Type at least {} characters", self.options.min_chars));
    }
    if event.is_some() {
      return event;
    }
    if self.dropdown_open() && !self.is_searching {
      return self.results_dropdown(ui, now);
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn result(name: &str, place_type: &str) -> GeocodeResult {
    GeocodeResult {
      place_id: name.to_string(),
      display_name: name.to_string(),
      lat: 19.07,
      lon: 72.87,
      place_type: place_type.to_string(),
    }
  }

  fn search() -> LocationSearch {
    LocationSearch::new(None, LocationSearchOptions::default())
  }

  #[test]
  fn fires_once_after_typing_pauses() {
    let mut search = search();
    let mut fired = Vec::new();
    let mut now = 0.;
    for prefix in ["M", "Mu", "Mum", "Mumb", "Mumba", "Mumbai"] {
      search.set_query(prefix, now);
      if let Some(request) = search.poll(now + 0.1) {
        fired.push(request);
      }
      now += 0.2;
    }
    for step in 0..20 {
      if let Some(request) = search.poll(now + f64::from(step) * 0.1) {
        fired.push(request);
      }
    }
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].query, "Mumbai");
    assert!(search.is_searching());
  }

  #[test]
  fn short_queries_never_fire() {
    let mut search = search();
    search.set_query("Mu", 0.);
    assert_eq!(search.poll(10.), None);
    search.set_query("   ab  ", 0.);
    assert_eq!(search.poll(10.), None);
  }

  #[test]
  fn stale_reply_is_discarded() {
    let mut search = search();
    search.set_query("Mumbai", 0.);
    let first = search.poll(1.).unwrap();
    search.set_query("Pune", 1.2);
    let second = search.poll(2.).unwrap();
    assert!(search.deliver(second.generation, vec![result("Pune", "city")]));
    assert!(!search.deliver(first.generation, vec![result("Mumbai", "city")]));
    assert_eq!(search.results()[0].display_name, "Pune");
    assert!(!search.is_searching());
  }

  #[test]
  fn selection_closes_dropdown_and_reverts_later() {
    let mut search = search();
    search.set_query("Mumbai", 0.);
    let request = search.poll(1.).unwrap();
    search.deliver(
      request.generation,
      vec![result("Mumbai", "city"), result("Mumbai Suburban", "state")],
    );
    assert!(search.dropdown_open());
    let chosen = search.select(0, 2.).unwrap();
    assert_eq!(chosen.display_name, "Mumbai");
    assert!(!search.dropdown_open());
    assert!(!search.take_revert(2.5));
    assert_eq!(search.query(), "Mumbai");
    assert!(search.take_revert(3.));
    assert_eq!(search.query(), "");
    assert!(search.results().is_empty());
  }

  #[test]
  fn close_dropdown_keeps_results() {
    let mut search = search();
    search.set_query("Mumbai", 0.);
    let request = search.poll(1.).unwrap();
    search.deliver(request.generation, vec![result("Mumbai", "city")]);
    search.close_dropdown();
    assert!(!search.dropdown_open());
    assert_eq!(search.results().len(), 1);
    assert_eq!(search.query(), "Mumbai");
  }

  #[test]
  fn keyboard_selection_is_clamped() {
    let mut search = search();
    search.set_query("Mumbai", 0.);
    let request = search.poll(1.).unwrap();
    search.deliver(
      request.generation,
      vec![result("a", "city"), result("b", "city")],
    );
    search.move_selection(true);
    search.move_selection(true);
    assert_eq!(search.selected_index(), Some(1));
    search.move_selection(false);
    search.move_selection(false);
    assert_eq!(search.selected_index(), Some(0));
  }

  #[test]
  fn without_runtime_spawn_gives_up() {
    let mut search = LocationSearch::new(
      Some(GeocoderClient::new(std::sync::Arc::new(
        super::super::providers::BackendGeocoder::new("http://localhost:1"),
      ))),
      LocationSearchOptions::default(),
    );
    search.set_query("Mumbai", 0.);
    search.tick(1., None);
    assert!(!search.is_searching());
  }
}
