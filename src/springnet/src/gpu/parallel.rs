// Rayon stand-in for the compute shaders. Pass A runs one task per spring and
// accumulates into shared per-particle cells with compare-and-swap, pass B
// runs one task per particle and touches only its own slots.

use std::sync::atomic::{fence, AtomicU32, Ordering};

use rayon::prelude::*;

use super::layout::{GpuParticle, GpuSpring, GpuVertex, PassParams};
use super::{ComputeDevice, GpuError, NetBuffers, Readback};
#[cfg(test)]
use super::pass_params;
use crate::constraint::spring::hooke;
use crate::integrator::Scheme;
use crate::V3;

// Returned by pass A; only the barrier can turn it into `ForcesVisible`.
#[must_use]
pub struct ForcesWritten(());

// Required by pass B.
pub struct ForcesVisible(());

fn atomic_add_f32(cell: &AtomicU32, v: f32) {
	let mut current = cell.load(Ordering::Relaxed);
	loop {
		let next = (f32::from_bits(current) + v).to_bits();
		match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
			Ok(_) => return,
			Err(actual) => current = actual,
		}
	}
}

#[derive(Default)]
pub struct ParallelDevice {
	vertices: Vec<GpuVertex>,
	particles: Vec<GpuParticle>,
	springs: Vec<GpuSpring>,
	force_cells: Vec<[AtomicU32; 3]>,
}

impl ParallelDevice {
	pub fn spring_pass(&self) -> ForcesWritten {
		let vertices = &self.vertices;
		let cells = &self.force_cells;
		self.springs.par_iter().for_each(|s| {
			let (a, b) = (s.a as usize, s.b as usize);
			let force = match hooke(
				vertices[a].pos(),
				vertices[b].pos(),
				s.stiffness,
				s.rest_length,
			) {
				Some(f) => f,
				None => return,
			};
			for axis in 0..3 {
				atomic_add_f32(&cells[a][axis], force[axis]);
				atomic_add_f32(&cells[b][axis], -force[axis]);
			}
		});
		ForcesWritten(())
	}

	/// Publishes every accumulated cell into the particle buffer and resets
	/// the cells for the next pass A.
	pub fn barrier(&mut self, _written: ForcesWritten) -> ForcesVisible {
		fence(Ordering::SeqCst);
		self.particles
			.par_iter_mut()
			.zip(self.force_cells.par_iter())
			.for_each(|(p, cells)| {
				for axis in 0..3 {
					p.forces[axis] += f32::from_bits(cells[axis].swap(0, Ordering::Relaxed));
				}
			});
		ForcesVisible(())
	}

	pub fn mass_pass(&mut self, _visible: ForcesVisible, params: &PassParams) {
		let gravity = V3::from(params.gravity);
		let (dt, damping) = (params.dt, params.damping);
		let scheme = params.scheme();
		self.vertices
			.par_iter_mut()
			.zip(self.particles.par_iter_mut())
			.for_each(|(v, p)| {
				if !p.is_pinned() {
					let forces = V3::from(p.forces) + gravity * p.mass;
					let accel = forces / p.mass;
					let pos = v.pos();
					let slot = V3::from(p.velocity);
					match scheme {
						Scheme::Euler => {
							let vel = slot + accel * dt;
							v.position = (pos + vel * dt * (1. - damping)).into();
							p.velocity = vel.into();
						}
						Scheme::Verlet => {
							let next = pos + slot + accel * dt * dt * (1. - damping);
							v.position = next.into();
							p.velocity = (next - pos).into();
						}
					}
				}
				p.forces = [0.; 3];
			});
	}
}

impl ComputeDevice for ParallelDevice {
	fn name(&self) -> String {
		format!("rayon ({} threads)", rayon::current_num_threads())
	}

	fn upload(&mut self, buffers: NetBuffers) -> Result<(), GpuError> {
		let len = buffers.particles.len();
		if buffers.vertices.len() != len {
			return Err(GpuError::Layout(format!(
				"{} vertices for {} particles",
				buffers.vertices.len(),
				len
			)));
		}
		if let Some(s) = buffers
			.springs
			.iter()
			.find(|s| s.a < 0 || s.b < 0 || s.a as usize >= len || s.b as usize >= len)
		{
			return Err(GpuError::Layout(format!(
				"spring ({}, {}) outside {} particles",
				s.a, s.b, len
			)));
		}
		self.vertices = buffers.vertices;
		self.particles = buffers.particles;
		self.springs = buffers.springs;
		self.force_cells = (0..len).map(|_| Default::default()).collect();
		Ok(())
	}

	fn step(&mut self, params: &PassParams) -> Result<(), GpuError> {
		let written = self.spring_pass();
		let visible = self.barrier(written);
		self.mass_pass(visible, params);
		Ok(())
	}

	fn download(&self) -> Result<Readback, GpuError> {
		Ok(Readback {
			vertices: self.vertices.clone(),
			particles: self.particles.clone(),
		})
	}
}
