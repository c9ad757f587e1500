use super::Family;
use crate::particle::Particle;
use crate::V3;

#[derive(Clone, Debug, PartialEq)]
pub struct Spring {
	pub a: usize,
	pub b: usize,
	pub k: f32,
	// rest length, fixed at creation
	pub l0: f32,
	pub family: Family,
}

impl Spring {
	pub fn new(particles: &[Particle], a: usize, b: usize) -> Self {
		let l0 = (particles[a].get_pos() - particles[b].get_pos()).magnitude();
		Self::new_with_l0(a, b, l0)
	}

	pub fn new_with_l0(a: usize, b: usize, l0: f32) -> Self {
		Self {
			a,
			b,
			k: 0.,
			l0,
			family: Family::Structural,
		}
	}

	pub fn with_stiffness(mut self, k: f32) -> Self {
		self.k = k;
		self
	}

	pub fn with_family(mut self, family: Family) -> Self {
		self.family = family;
		self
	}

	/// Force acting on endpoint `a`; endpoint `b` receives the negation.
	/// `None` when the endpoints coincide.
	pub fn force(&self, particles: &[Particle]) -> Option<V3> {
		hooke(
			particles[self.a].get_pos(),
			particles[self.b].get_pos(),
			self.k,
			self.l0,
		)
	}
}

pub fn hooke(pa: V3, pb: V3, k: f32, l0: f32) -> Option<V3> {
	let dp = pa - pb;
	let l = dp.magnitude();
	if !l.is_normal() {
		return None;
	}
	Some(-k * dp / l * (l - l0))
}

#[cfg(test)]
mod test {
	use super::*;
	use approx::assert_relative_eq;

	#[test]
	fn test_rest_length_from_positions() {
		let ps = vec![
			Particle::new(V3::new(0., 0., 0.), 1.),
			Particle::new(V3::new(3., 4., 0.), 1.),
		];
		let s = Spring::new(&ps, 0, 1).with_stiffness(2.);
		assert_eq!(s.l0, 5.);
		assert_eq!(s.force(&ps), Some(V3::zeros()));
	}

	#[test]
	fn test_stretched_pulls_together() {
		let f = hooke(V3::new(2., 0., 0.), V3::zeros(), 10., 1.).unwrap();
		assert_relative_eq!(f, V3::new(-10., 0., 0.));
		let f = hooke(V3::new(0.5, 0., 0.), V3::zeros(), 10., 1.).unwrap();
		assert_relative_eq!(f, V3::new(5., 0., 0.));
	}

	#[test]
	fn test_coincident_is_none() {
		let p = V3::new(1., 1., 1.);
		assert_eq!(hooke(p, p, 10., 1.), None);
	}
}
