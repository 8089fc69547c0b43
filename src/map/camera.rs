use super::{
  coordinates::{Coordinate, WGS84Coordinate, distance_in_meters},
  viewport::Viewport,
};

pub const SELECTION_FLY_SECONDS: f64 = 0.8;
pub const SEARCH_FLY_SECONDS: f64 = 1.5;
pub const FIT_SECONDS: f64 = 0.5;

/// A place the user asked to go to, from a search result or a dropped pin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyToTarget {
  pub target: WGS84Coordinate,
  pub zoom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCommand {
  FlyTo {
    target: WGS84Coordinate,
    zoom: f64,
    duration: f64,
  },
}

/// Monotonic easing, so a superseded flight never swings past its target.
fn ease_out_cubic(t: f64) -> f64 {
  let t = t.clamp(0., 1.);
  1. - (1. - t).powi(3)
}

#[derive(Debug, Clone, Copy)]
struct CameraAnimation {
  from: Viewport,
  target: WGS84Coordinate,
  zoom: f64,
  start: f64,
  duration: f64,
}

impl CameraAnimation {
  /// Camera position at `now` and whether the flight is over.
  fn sample(&self, now: f64) -> (WGS84Coordinate, f64, bool) {
    let t = if self.duration > 0. {
      (now - self.start) / self.duration
    } else {
      1.
    };
    let e = ease_out_cubic(t);
    let from = self.from.center.as_pixel_coordinate();
    let to = self.target.as_pixel_coordinate();
    let center = (from + (to - from) * e).as_wgs84();
    let zoom = self.from.zoom + (self.zoom - self.from.zoom) * e;
    (center, zoom, t >= 1.)
  }
}

/// Decides when the camera moves. Selection only recenters when the record is far away;
/// searches always fly. A new command replaces the flight in progress, starting from wherever
/// the camera currently is.
#[derive(Debug, Clone)]
pub struct RecenterController {
  threshold_m: f64,
  animation: Option<CameraAnimation>,
  last_command: Option<CameraCommand>,
  issued: usize,
}

impl RecenterController {
  #[must_use]
  pub fn new(threshold_m: f64) -> Self {
    Self {
      threshold_m,
      animation: None,
      last_command: None,
      issued: 0,
    }
  }

  fn issue(&mut self, viewport: &Viewport, command: CameraCommand, now: f64) -> CameraCommand {
    let CameraCommand::FlyTo {
      target,
      zoom,
      duration,
    } = command;
    if self.animation.is_some() {
      log::debug!("Superseding camera flight");
    }
    self.animation = Some(CameraAnimation {
      from: *viewport,
      target,
      zoom,
      start: now,
      duration,
    });
    self.last_command = Some(command);
    self.issued += 1;
    command
  }

  /// A record was selected. Keeps the zoom and only moves when the record is beyond the
  /// threshold distance from the current center.
  pub fn on_selection(
    &mut self,
    viewport: &Viewport,
    position: WGS84Coordinate,
    now: f64,
  ) -> Option<CameraCommand> {
    let distance = distance_in_meters(viewport.center, position);
    if distance <= self.threshold_m {
      log::debug!("Selection {distance:.0} m away, camera stays");
      return None;
    }
    Some(self.issue(
      viewport,
      CameraCommand::FlyTo {
        target: position,
        zoom: viewport.zoom,
        duration: SELECTION_FLY_SECONDS,
      },
      now,
    ))
  }

  /// A search result or pin. Always flies.
  pub fn on_fly_to(&mut self, viewport: &Viewport, target: FlyToTarget, now: f64) -> CameraCommand {
    self.issue(
      viewport,
      CameraCommand::FlyTo {
        target: target.target,
        zoom: target.zoom,
        duration: SEARCH_FLY_SECONDS,
      },
      now,
    )
  }

  /// Fits a cluster's extent.
  pub fn fit(
    &mut self,
    viewport: &Viewport,
    center: WGS84Coordinate,
    zoom: f64,
    now: f64,
  ) -> CameraCommand {
    self.issue(
      viewport,
      CameraCommand::FlyTo {
        target: center,
        zoom,
        duration: FIT_SECONDS,
      },
      now,
    )
  }

  /// Advances the flight in progress. Returns whether the camera is still moving.
  pub fn step(&mut self, viewport: &mut Viewport, now: f64) -> bool {
    let Some(animation) = self.animation else {
      return false;
    };
    let (center, zoom, done) = animation.sample(now);
    *viewport = Viewport::new(center, zoom, viewport.size);
    if done {
      self.animation = None;
    }
    !done
  }

  #[must_use]
  pub fn is_animating(&self) -> bool {
    self.animation.is_some()
  }

  #[must_use]
  pub fn last_command(&self) -> Option<&CameraCommand> {
    self.last_command.as_ref()
  }

  /// Number of camera commands issued so far.
  #[must_use]
  pub fn issued(&self) -> usize {
    self.issued
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_approx_eq::assert_approx_eq;

  fn viewport() -> Viewport {
    Viewport::new(WGS84Coordinate::new(19.07, 72.90), 13., [800., 600.])
  }

  #[test]
  fn nearby_selection_does_not_move() {
    let mut controller = RecenterController::new(500.);
    // About 330 m north.
    let near = WGS84Coordinate::new(19.073, 72.90);
    assert_eq!(controller.on_selection(&viewport(), near, 0.), None);
    assert_eq!(controller.issued(), 0);
    assert!(!controller.is_animating());
  }

  #[test]
  fn far_selection_flies_once() {
    let mut controller = RecenterController::new(500.);
    let far = WGS84Coordinate::new(19.10, 72.88);
    let command = controller.on_selection(&viewport(), far, 0.);
    assert_eq!(
      command,
      Some(CameraCommand::FlyTo {
        target: far,
        zoom: 13.,
        duration: SELECTION_FLY_SECONDS
      })
    );
    assert_eq!(controller.issued(), 1);
  }

  #[test]
  fn flight_reaches_target_without_overshoot() {
    let mut controller = RecenterController::new(500.);
    let mut vp = viewport();
    let target = FlyToTarget {
      target: WGS84Coordinate::new(19.2, 72.95),
      zoom: 12.,
    };
    controller.on_fly_to(&vp, target, 10.);
    let mut last_lat = vp.center.lat;
    let mut t = 10.;
    while controller.step(&mut vp, t) {
      assert!(vp.center.lat >= last_lat - 1e-12);
      assert!(vp.center.lat <= target.target.lat + 1e-9);
      last_lat = vp.center.lat;
      t += 0.1;
    }
    assert_approx_eq!(vp.center.lat, 19.2, 1e-9);
    assert_approx_eq!(vp.zoom, 12.);
  }

  #[test]
  fn new_command_supersedes_from_current_position() {
    let mut controller = RecenterController::new(500.);
    let mut vp = viewport();
    controller.on_fly_to(
      &vp,
      FlyToTarget {
        target: WGS84Coordinate::new(19.5, 72.90),
        zoom: 12.,
      },
      0.,
    );
    controller.step(&mut vp, 0.5);
    let midway = vp.center;
    controller.on_fly_to(
      &vp,
      FlyToTarget {
        target: WGS84Coordinate::new(18.9, 72.90),
        zoom: 12.,
      },
      0.5,
    );
    controller.step(&mut vp, 0.5);
    assert_approx_eq!(vp.center.lat, midway.lat, 1e-9);
    assert!(!controller.step(&mut vp, 2.5));
    assert_approx_eq!(vp.center.lat, 18.9, 1e-9);
    assert_eq!(controller.issued(), 2);
  }
}
