use std::f32::consts::{PI, TAU};

use crate::map::coordinates::PixelPosition;

const CIRCLE_FOOT_SEPARATION: f32 = 25.;
const CIRCLE_START_ANGLE: f32 = PI / 6.;
const SPIRAL_FOOT_SEPARATION: f32 = 28.;
const SPIRAL_LENGTH_START: f32 = 11.;
const SPIRAL_LENGTH_FACTOR: f32 = 5.;
/// Below this many members the legs are placed on a circle, otherwise on a spiral.
const CIRCLE_SPIRAL_SWITCHOVER: usize = 9;

/// Screen offsets, relative to the cluster centroid, at which the members of a spiderfied
/// cluster are placed. Returns exactly `count` offsets.
#[must_use]
pub fn leg_offsets(count: usize) -> Vec<PixelPosition> {
  if count >= CIRCLE_SPIRAL_SWITCHOVER {
    spiral(count)
  } else {
    circle(count)
  }
}

#[allow(clippy::cast_precision_loss)]
fn circle(count: usize) -> Vec<PixelPosition> {
  if count == 0 {
    return Vec::new();
  }
  let circumference = CIRCLE_FOOT_SEPARATION * (2 + count) as f32;
  let leg_length = circumference / TAU;
  let angle_step = TAU / count as f32;
  (0..count)
    .map(|i| {
      let angle = CIRCLE_START_ANGLE + i as f32 * angle_step;
      PixelPosition::new(leg_length * angle.cos(), leg_length * angle.sin())
    })
    .collect()
}

#[allow(clippy::cast_precision_loss)]
fn spiral(count: usize) -> Vec<PixelPosition> {
  let mut leg_length = SPIRAL_LENGTH_START;
  let mut angle = 0.;
  let mut offsets = Vec::with_capacity(count);
  for i in 0..count {
    angle += SPIRAL_FOOT_SEPARATION / leg_length + i as f32 * 0.0005;
    offsets.push(PixelPosition::new(
      leg_length * angle.cos(),
      leg_length * angle.sin(),
    ));
    leg_length += TAU * SPIRAL_LENGTH_FACTOR / angle;
  }
  offsets
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exact_leg_count() {
    for n in [0, 1, 2, 8, 9, 15, 60] {
      assert_eq!(leg_offsets(n).len(), n);
    }
  }

  #[test]
  fn circle_legs_are_equidistant() {
    let legs = leg_offsets(6);
    let origin = PixelPosition::default();
    let first = legs[0].distance(&origin);
    assert!(legs.iter().all(|l| (l.distance(&origin) - first).abs() < 1e-3));
  }

  #[test]
  fn spiral_grows_outwards() {
    let legs = leg_offsets(20);
    let origin = PixelPosition::default();
    assert!(legs[19].distance(&origin) > legs[0].distance(&origin));
  }

  #[test]
  fn legs_do_not_overlap() {
    let legs = leg_offsets(30);
    for (i, a) in legs.iter().enumerate() {
      for b in &legs[i + 1..] {
        assert!(a.distance(b) > 5.);
      }
    }
  }
}
