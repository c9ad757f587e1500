use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TimeModel {
	// one step of the elapsed wall time, clamped to max_dt
	Realtime { max_dt: f32 },
	// n steps of 1/n per frame
	FixedSteps(u32),
}

impl TimeModel {
	pub fn validate(&self) -> Result<(), Error> {
		match *self {
			Self::Realtime { max_dt } if !(max_dt.is_finite() && max_dt > 0.) => {
				Err(Error::InvalidTimeStep(max_dt))
			}
			Self::FixedSteps(0) => {
				Err(Error::Config("fixed stepping needs at least one step".to_string()))
			}
			_ => Ok(()),
		}
	}

	/// Number of sub-steps and their length for a frame that took `elapsed`.
	/// A zero count means there is nothing to simulate.
	pub fn substeps(&self, elapsed: Duration) -> (u32, f32) {
		match *self {
			Self::Realtime { max_dt } => {
				let dt = elapsed.as_secs_f32().min(max_dt);
				if dt > 0. {
					(1, dt)
				} else {
					(0, 0.)
				}
			}
			Self::FixedSteps(n) => (n, 1. / n as f32),
		}
	}
}

/// Caller-owned frame clock. Time spent paused is not reported as elapsed.
pub struct FrameClock {
	last: Instant,
	pause_start: Option<Instant>,
	total_pause: Duration,
	last_elapsed: Duration,
}

impl FrameClock {
	pub fn new(now: Instant) -> Self {
		Self {
			last: now,
			pause_start: None,
			total_pause: Duration::ZERO,
			last_elapsed: Duration::ZERO,
		}
	}

	pub fn is_paused(&self) -> bool {
		self.pause_start.is_some()
	}

	pub fn set_paused(&mut self, paused: bool, now: Instant) {
		if paused == self.is_paused() {
			return;
		}
		match self.pause_start.take() {
			Some(start) => self.total_pause += now.saturating_duration_since(start),
			None => self.pause_start = Some(now),
		}
	}

	/// Elapsed running time since the previous tick.
	pub fn tick(&mut self, now: Instant) -> Duration {
		let passed = now.saturating_duration_since(self.last);
		self.last = now;
		let mut pause = std::mem::take(&mut self.total_pause);
		if let Some(start) = self.pause_start.as_mut() {
			pause += now.saturating_duration_since(*start);
			*start = now;
		}
		self.last_elapsed = passed.saturating_sub(pause);
		self.last_elapsed
	}

	pub fn fps(&self) -> f32 {
		let secs = self.last_elapsed.as_secs_f32();
		if secs > 0. {
			1. / secs
		} else {
			0.
		}
	}
}
