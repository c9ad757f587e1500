use crate::V3;

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
	pub mass: f32,
	pub pinned: bool,
	pub pos: V3,
	// position one step back, kept by both schemes
	pub ppos: V3,
	// verlet keeps it as the mean velocity of its last step
	pub vel: V3,
	pub forces: V3,
	pub normal: V3,
	pub face_count: u32,
}

impl Particle {
	pub fn new(pos: V3, mass: f32) -> Self {
		Self {
			mass,
			pinned: false,
			pos,
			ppos: pos,
			vel: V3::zeros(),
			forces: V3::zeros(),
			normal: V3::zeros(),
			face_count: 0,
		}
	}

	pub fn pinned(mut self) -> Self {
		self.pinned = true;
		self
	}

	pub fn get_pos(&self) -> V3 {
		self.pos
	}

	pub fn add_force(&mut self, f: V3) {
		self.forces += f;
	}

	pub fn clear_forces(&mut self) {
		self.forces = V3::zeros();
	}

	pub fn add_gravity(&mut self, gravity: V3) {
		if !self.pinned {
			self.forces += gravity * self.mass;
		}
	}

	/// Explicit Euler. Damping scales the position update only, the stored
	/// velocity keeps its full value.
	pub fn update_euler(&mut self, dt: f32, damping: f32) {
		if self.pinned {
			return;
		}
		self.ppos = self.pos;
		self.vel += self.forces / self.mass * dt;
		self.pos += self.vel * dt * (1. - damping);
	}

	/// Stormer-Verlet. A fresh particle has `ppos == pos`, so the first step
	/// starts from rest; after euler steps it continues from the last one.
	pub fn update_verlet(&mut self, dt: f32, damping: f32) {
		if self.pinned {
			return;
		}
		let ppos = self.pos;
		self.pos = 2. * self.pos - self.ppos
			+ self.forces / self.mass * dt * dt * (1. - damping);
		self.ppos = ppos;
		self.vel = (self.pos - ppos) / dt;
	}
}
