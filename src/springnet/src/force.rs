use crate::constraint::Spring;
use crate::particle::Particle;
use crate::V3;

/// Accumulates the Hooke force of every spring onto both endpoints.
/// Returns how many springs were skipped because their endpoints coincide.
pub fn accumulate_springs(particles: &mut [Particle], springs: &[Spring]) -> usize {
	let mut skipped = 0;
	for spring in springs.iter() {
		match spring.force(particles) {
			Some(force) => {
				particles[spring.a].add_force(force);
				particles[spring.b].add_force(-force);
			}
			None => skipped += 1,
		}
	}
	if skipped > 0 {
		log::warn!("{} springs with coincident endpoints contributed no force", skipped);
	}
	skipped
}

pub fn apply_gravity(particles: &mut [Particle], gravity: V3) {
	for p in particles.iter_mut() {
		p.add_gravity(gravity);
	}
}
