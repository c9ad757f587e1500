//! Device offload of the force and integration passes.
//!
//! A device works on its own copy of the net laid out as three flat buffers
//! (see [`layout`]). One step is pass A over springs, a full barrier, then
//! pass B over particles. The host net is only refreshed by an explicit
//! download.

pub mod layout;
pub mod parallel;
#[cfg(feature = "vulkan")]
pub mod vulkan;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::integrator::Scheme;
use crate::net::Net;
use crate::V3;
use layout::{GpuParticle, GpuSpring, GpuVertex, PassParams};

#[derive(Debug, Clone, PartialEq)]
pub enum GpuError {
	// backend not compiled in or no usable adapter
	Unavailable(String),
	Init(String),
	Dispatch(String),
	Layout(String),
}

impl fmt::Display for GpuError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Unavailable(msg) => write!(f, "device unavailable: {}", msg),
			Self::Init(msg) => write!(f, "device init failed: {}", msg),
			Self::Dispatch(msg) => write!(f, "dispatch failed: {}", msg),
			Self::Layout(msg) => write!(f, "buffer layout mismatch: {}", msg),
		}
	}
}

impl std::error::Error for GpuError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
	// single thread, host net is authoritative
	Host,
	// rayon emulation of the two compute passes
	Parallel,
	Vulkan,
}

/// Host-side image of the three device buffers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetBuffers {
	pub vertices: Vec<GpuVertex>,
	pub particles: Vec<GpuParticle>,
	pub springs: Vec<GpuSpring>,
}

/// What comes back from the device; springs never change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Readback {
	pub vertices: Vec<GpuVertex>,
	pub particles: Vec<GpuParticle>,
}

impl NetBuffers {
	/// Flattens `net` for upload. The velocity slot holds the real velocity
	/// for euler and the implicit displacement `pos - ppos` for verlet.
	pub fn from_net(net: &Net, scheme: Scheme) -> Result<Self, GpuError> {
		let to_i32 = |idx: usize| {
			i32::try_from(idx).map_err(|_| {
				GpuError::Layout(format!("index {} does not fit an i32", idx))
			})
		};
		let vertices = net
			.particles()
			.iter()
			.map(|p| GpuVertex::new(p.pos, p.normal))
			.collect();
		let particles = net
			.particles()
			.iter()
			.map(|p| {
				let velocity = match scheme {
					Scheme::Euler => p.vel,
					Scheme::Verlet => p.pos - p.ppos,
				};
				GpuParticle {
					velocity: velocity.into(),
					mass: p.mass,
					forces: p.forces.into(),
					pinned: p.pinned as i32,
				}
			})
			.collect();
		let springs = net
			.springs()
			.iter()
			.map(|s| {
				Ok(GpuSpring {
					a: to_i32(s.a)?,
					b: to_i32(s.b)?,
					stiffness: s.k,
					rest_length: s.l0,
				})
			})
			.collect::<Result<Vec<_>, GpuError>>()?;
		Ok(Self {
			vertices,
			particles,
			springs,
		})
	}
}

/// Push constants for one step of `net`.
pub fn pass_params(
	net: &Net,
	dt: f32,
	gravity: V3,
	damping: f32,
	scheme: Scheme,
) -> PassParams {
	PassParams {
		gravity: gravity.into(),
		dt,
		damping,
		scheme: scheme.as_u32(),
		particle_count: net.particle_count() as u32,
		spring_count: net.spring_count() as u32,
	}
}

impl Readback {
	/// Copies device state into `net` and re-derives the normals there.
	/// `last` is the step that produced this state; it rebuilds whichever of
	/// `vel` and `ppos` the device did not carry.
	pub fn write_back(&self, net: &mut Net, last: &PassParams) -> Result<(), GpuError> {
		if self.vertices.len() != net.particle_count()
			|| self.particles.len() != net.particle_count()
		{
			return Err(GpuError::Layout(format!(
				"read back {} vertices / {} particles for a net of {}",
				self.vertices.len(),
				self.particles.len(),
				net.particle_count()
			)));
		}
		for ((p, v), gp) in net
			.particles_mut()
			.iter_mut()
			.zip(self.vertices.iter())
			.zip(self.particles.iter())
		{
			let pos = v.pos();
			let slot = V3::from(gp.velocity);
			if !p.pinned {
				match last.scheme() {
					Scheme::Euler => {
						p.vel = slot;
						p.ppos = pos - slot * last.dt * (1. - last.damping);
					}
					Scheme::Verlet => {
						p.vel = slot / last.dt;
						p.ppos = pos - slot;
					}
				}
			}
			p.pos = pos;
			p.forces = V3::from(gp.forces);
		}
		net.update_normals();
		Ok(())
	}
}

/// A compute backend holding a device-resident copy of one net.
pub trait ComputeDevice: Send {
	fn name(&self) -> String;

	fn upload(&mut self, buffers: NetBuffers) -> Result<(), GpuError>;

	/// Pass A, barrier, pass B.
	fn step(&mut self, params: &PassParams) -> Result<(), GpuError>;

	fn download(&self) -> Result<Readback, GpuError>;
}

pub fn open_device(kind: BackendKind) -> Result<Box<dyn ComputeDevice>, GpuError> {
	match kind {
		BackendKind::Host => Err(GpuError::Unavailable(
			"host mode has no device".to_string(),
		)),
		BackendKind::Parallel => Ok(Box::new(parallel::ParallelDevice::default())),
		#[cfg(feature = "vulkan")]
		BackendKind::Vulkan => Ok(Box::new(vulkan::VulkanDevice::new()?)),
		#[cfg(not(feature = "vulkan"))]
		BackendKind::Vulkan => Err(GpuError::Unavailable(
			"built without the `vulkan` feature".to_string(),
		)),
	}
}
