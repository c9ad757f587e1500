// std430 records shared with the compute shaders. Every vec3 is
// followed by a 4 byte slot so the next member starts on a 16 byte boundary.

use bytemuck::{Pod, Zeroable};

use crate::integrator::Scheme;
use crate::V3;

#[repr(C)]
#[derive(Zeroable, Pod, Default, Debug, Clone, Copy, PartialEq)]
pub struct GpuVertex {
	pub position: [f32; 3],
	pub _pad0: f32,
	pub normal: [f32; 3],
	pub _pad1: f32,
}

#[repr(C)]
#[derive(Zeroable, Pod, Default, Debug, Clone, Copy, PartialEq)]
pub struct GpuParticle {
	// euler: velocity, verlet: pos - ppos
	pub velocity: [f32; 3],
	pub mass: f32,
	pub forces: [f32; 3],
	pub pinned: i32,
}

#[repr(C)]
#[derive(Zeroable, Pod, Default, Debug, Clone, Copy, PartialEq)]
pub struct GpuSpring {
	pub a: i32,
	pub b: i32,
	pub stiffness: f32,
	pub rest_length: f32,
}

/// Push constants for both passes.
#[repr(C)]
#[derive(Zeroable, Pod, Default, Debug, Clone, Copy, PartialEq)]
pub struct PassParams {
	pub gravity: [f32; 3],
	pub dt: f32,
	pub damping: f32,
	pub scheme: u32,
	pub particle_count: u32,
	pub spring_count: u32,
}

const _: () = assert!(std::mem::size_of::<GpuVertex>() == 32);
const _: () = assert!(std::mem::size_of::<GpuParticle>() == 32);
const _: () = assert!(std::mem::size_of::<GpuSpring>() == 16);
const _: () = assert!(std::mem::size_of::<PassParams>() == 32);

impl GpuVertex {
	pub fn new(position: V3, normal: V3) -> Self {
		Self {
			position: position.into(),
			normal: normal.into(),
			..Default::default()
		}
	}

	pub fn pos(&self) -> V3 {
		V3::from(self.position)
	}
}

impl GpuParticle {
	pub fn is_pinned(&self) -> bool {
		self.pinned != 0
	}
}

impl PassParams {
	pub fn scheme(&self) -> Scheme {
		if self.scheme == Scheme::Verlet.as_u32() {
			Scheme::Verlet
		} else {
			Scheme::Euler
		}
	}
}
