use serde::{Deserialize, Serialize};

use crate::particle::Particle;
use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
	Euler,
	Verlet,
}

impl Scheme {
	pub fn as_u32(self) -> u32 {
		match self {
			Self::Euler => 0,
			Self::Verlet => 1,
		}
	}
}

/// Moves every unpinned particle by one step of `scheme`, then clears all
/// force accumulators.
pub fn integrate(particles: &mut [Particle], dt: f32, damping: f32, scheme: Scheme) {
	for p in particles.iter_mut() {
		match scheme {
			Scheme::Euler => p.update_euler(dt, damping),
			Scheme::Verlet => p.update_verlet(dt, damping),
		}
		p.clear_forces();
	}
}

/// Rejects a non-positive or non-finite `dt` and damping outside `[0, 1]`.
pub fn check_step(dt: f32, damping: f32) -> Result<(), Error> {
	if !(dt.is_finite() && dt > 0.) {
		return Err(Error::InvalidTimeStep(dt));
	}
	if !(0. ..=1.).contains(&damping) {
		return Err(Error::InvalidDamping(damping));
	}
	Ok(())
}

pub fn clear_forces(particles: &mut [Particle]) {
	particles.iter_mut().for_each(Particle::clear_forces);
}
