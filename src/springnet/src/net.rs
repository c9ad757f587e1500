use crate::config::{GridSpec, RopeSpec, Stiffness};
use crate::constraint::{Family, Spring, SpringTemplate};
use crate::integrator::{self, Scheme};
use crate::particle::Particle;
use crate::{force, normal, topology, Error, V3};

/// A fixed topology of particles and springs plus its render mesh.
///
/// Springs refer to particles by index into the same net. Nothing outside the
/// integrator and the builders mutates particle state.
#[derive(Clone, Debug, Default)]
pub struct Net {
	particles: Vec<Particle>,
	springs: Vec<Spring>,
	triangles: Vec<[u32; 3]>,
	tex_coords: Vec<[f32; 2]>,
}

fn check_mass(mass: f32) -> Result<(), Error> {
	if !(mass.is_finite() && mass > 0.) {
		return Err(Error::InvalidMass(mass));
	}
	Ok(())
}

fn check_index(index: usize, len: usize) -> Result<(), Error> {
	if index >= len {
		return Err(Error::InvalidIndex { index, len });
	}
	Ok(())
}

impl Net {
	pub fn new_grid(spec: &GridSpec) -> Result<Self, Error> {
		let (rows, cols) = (spec.rows, spec.cols);
		if rows == 0 || cols == 0 {
			return Err(Error::InvalidGrid { rows, cols });
		}
		let len = rows
			.checked_add(1)
			.zip(cols.checked_add(1))
			.and_then(|(r, c)| r.checked_mul(c))
			.filter(|&len| len <= u32::MAX as usize)
			.ok_or(Error::InvalidGrid { rows, cols })?;
		check_mass(spec.mass)?;
		spec.stiffness.validate()?;
		for &pin in spec.pins.iter() {
			if pin[0] > rows || pin[1] > cols {
				return Err(Error::PinOutOfRange { pin, rows, cols });
			}
		}

		let min = V3::from(spec.min);
		let max = V3::from(spec.max);
		let mut particles = Vec::with_capacity(len);
		for i in 0..=rows {
			for j in 0..=cols {
				let pos = spec.placement.place(
					min,
					max,
					j as f32 / cols as f32,
					i as f32 / rows as f32,
				);
				particles.push(Particle::new(pos, spec.mass));
			}
		}
		for pin in spec.pins.iter() {
			particles[topology::grid_index(cols, pin[0], pin[1])].pinned = true;
		}
		let springs = bind_springs(
			&particles,
			topology::grid_springs(rows, cols),
			&spec.stiffness,
		);
		let net = Self::assemble(
			particles,
			springs,
			topology::grid_triangles(rows, cols),
			topology::grid_tex_coords(rows, cols),
		);
		log::info!(
			"built {}x{} net: {} particles, {} springs, {} triangles",
			rows,
			cols,
			net.particle_count(),
			net.spring_count(),
			net.triangle_count(),
		);
		Ok(net)
	}

	pub fn new_rope(spec: &RopeSpec) -> Result<Self, Error> {
		if spec.nodes == 0 {
			return Err(Error::InvalidGrid {
				rows: 0,
				cols: spec.nodes,
			});
		}
		check_mass(spec.mass)?;
		Stiffness::uniform(spec.stiffness).validate()?;
		for &pin in spec.pins.iter() {
			check_index(pin, spec.nodes)?;
		}

		let start = V3::from(spec.start);
		let step = if spec.nodes > 1 {
			(V3::from(spec.end) - start) / (spec.nodes - 1) as f32
		} else {
			V3::zeros()
		};
		let mut particles: Vec<Particle> = (0..spec.nodes)
			.map(|idx| Particle::new(start + step * idx as f32, spec.mass))
			.collect();
		for &pin in spec.pins.iter() {
			particles[pin].pinned = true;
		}
		let springs = bind_springs(
			&particles,
			topology::rope_springs(spec.nodes),
			&Stiffness::uniform(spec.stiffness),
		);
		Ok(Self::assemble(
			particles,
			springs,
			Vec::new(),
			topology::rope_tex_coords(spec.nodes),
		))
	}

	/// Builds a net from hand-made parts. Springs keep the rest length they
	/// carry; face counts are recomputed from `triangles`.
	pub fn from_parts(
		particles: Vec<Particle>,
		springs: Vec<Spring>,
		triangles: Vec<[u32; 3]>,
		tex_coords: Vec<[f32; 2]>,
	) -> Result<Self, Error> {
		let len = particles.len();
		for p in particles.iter() {
			check_mass(p.mass)?;
		}
		for s in springs.iter() {
			check_index(s.a, len)?;
			check_index(s.b, len)?;
			if s.a == s.b {
				return Err(Error::SelfLink(s.a));
			}
			if !(s.k.is_finite() && s.k >= 0.) {
				return Err(Error::InvalidStiffness(s.k));
			}
		}
		for tri in triangles.iter() {
			for &v in tri.iter() {
				check_index(v as usize, len)?;
			}
		}
		if tex_coords.len() != len {
			return Err(Error::InvalidIndex {
				index: tex_coords.len(),
				len,
			});
		}
		Ok(Self::assemble(particles, springs, triangles, tex_coords))
	}

	fn assemble(
		mut particles: Vec<Particle>,
		springs: Vec<Spring>,
		triangles: Vec<[u32; 3]>,
		tex_coords: Vec<[f32; 2]>,
	) -> Self {
		normal::count_faces(&mut particles, &triangles);
		normal::update_normals(&mut particles, &triangles);
		Self {
			particles,
			springs,
			triangles,
			tex_coords,
		}
	}

	/// Advances the net by one step of `dt` and refreshes the normals.
	pub fn step(
		&mut self,
		dt: f32,
		gravity: V3,
		damping: f32,
		scheme: Scheme,
	) -> Result<(), Error> {
		integrator::check_step(dt, damping)?;
		integrator::clear_forces(&mut self.particles);
		self.accumulate_forces(gravity);
		integrator::integrate(&mut self.particles, dt, damping, scheme);
		self.update_normals();
		Ok(())
	}

	/// Spring forces followed by gravity. Left in the accumulators until the
	/// next integration.
	pub fn accumulate_forces(&mut self, gravity: V3) {
		force::accumulate_springs(&mut self.particles, &self.springs);
		force::apply_gravity(&mut self.particles, gravity);
	}

	pub fn update_normals(&mut self) {
		normal::update_normals(&mut self.particles, &self.triangles);
	}

	pub fn particles(&self) -> &[Particle] {
		&self.particles
	}

	pub fn springs(&self) -> &[Spring] {
		&self.springs
	}

	pub fn triangles(&self) -> &[[u32; 3]] {
		&self.triangles
	}

	pub fn tex_coords(&self) -> &[[f32; 2]] {
		&self.tex_coords
	}

	pub fn positions(&self) -> impl Iterator<Item = V3> + '_ {
		self.particles.iter().map(|p| p.pos)
	}

	pub fn normals(&self) -> impl Iterator<Item = V3> + '_ {
		self.particles.iter().map(|p| p.normal)
	}

	pub fn particle_count(&self) -> usize {
		self.particles.len()
	}

	pub fn spring_count(&self) -> usize {
		self.springs.len()
	}

	pub fn triangle_count(&self) -> usize {
		self.triangles.len()
	}

	pub fn family_count(&self, family: Family) -> usize {
		self.springs.iter().filter(|s| s.family == family).count()
	}

	// device readback lands here; see gpu::Readback::write_back
	pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
		&mut self.particles
	}

	pub fn pr_model(&self) -> protocol::pr_model::PrModel {
		protocol::pr_model::PrModel {
			positions: self.positions().map(Into::into).collect(),
			normals: self.normals().map(Into::into).collect(),
			tex_coords: self.tex_coords.clone(),
			indices: self.triangles.iter().flatten().copied().collect(),
		}
	}
}

fn bind_springs(
	particles: &[Particle],
	templates: Vec<SpringTemplate>,
	stiffness: &Stiffness,
) -> Vec<Spring> {
	templates
		.into_iter()
		.map(|t| {
			Spring::new(particles, t.a, t.b)
				.with_stiffness(stiffness.of(t.family))
				.with_family(t.family)
		})
		.collect()
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::config::Placement;
	use approx::assert_relative_eq;

	fn square(n: usize) -> GridSpec {
		GridSpec::new(V3::new(-1., -1., 0.), V3::new(1., 1., 0.), n, n)
			.with_stiffness(Stiffness::new(100., 10., 1.))
			.with_placement(Placement::Planar)
	}

	#[test]
	fn test_2x2_counts() {
		let net = Net::new_grid(&square(2)).unwrap();
		assert_eq!(net.particle_count(), 9);
		assert_eq!(net.triangle_count(), 8);
		assert_eq!(net.family_count(Family::Structural), 8);
		assert_eq!(net.family_count(Family::Shear), 8);
		assert_eq!(net.spring_count(), 8 + 4 + 8 + 6);
	}

	#[test]
	fn test_family_stiffness() {
		let spec = square(3).with_stiffness(Stiffness::new(1., 2., 3.).with_border(4.));
		let net = Net::new_grid(&spec).unwrap();
		for s in net.springs() {
			let expect = match s.family {
				Family::Structural => 1.,
				Family::Shear => 2.,
				Family::Flexion => 3.,
				Family::Border => 4.,
			};
			assert_eq!(s.k, expect);
		}
	}

	#[test]
	fn test_rest_lengths_follow_box() {
		// 4 wide, 1 tall box with a 2x2 grid: horizontal 2, vertical 0.5
		let spec = GridSpec::new(V3::zeros(), V3::new(4., 1., 0.), 2, 2)
			.with_placement(Placement::Planar);
		let net = Net::new_grid(&spec).unwrap();
		let w = 3;
		for s in net.springs().iter().filter(|s| s.family == Family::Structural) {
			if s.b - s.a == 1 {
				assert_relative_eq!(s.l0, 2.);
			} else {
				assert_eq!(s.b - s.a, w);
				assert_relative_eq!(s.l0, 0.5);
			}
		}
	}

	#[test]
	fn test_sheared_grid_z() {
		let spec = GridSpec::new(V3::zeros(), V3::new(1., 1., 2.), 2, 1);
		let net = Net::new_grid(&spec).unwrap();
		assert_eq!(net.particles()[0].pos.z, 0.);
		assert_eq!(net.particles()[2].pos.z, 1.);
		assert_eq!(net.particles()[5].pos.z, 2.);
	}

	#[test]
	fn test_pins() {
		let net = Net::new_grid(&square(2).with_corner_pins()).unwrap();
		let pinned: Vec<usize> = net
			.particles()
			.iter()
			.enumerate()
			.filter(|(_, p)| p.pinned)
			.map(|(idx, _)| idx)
			.collect();
		assert_eq!(pinned, vec![6, 8]);
	}

	#[test]
	fn test_construction_errors() {
		let err = Net::new_grid(&square(2).with_pins(vec![[3, 0]])).unwrap_err();
		assert!(matches!(err, Error::PinOutOfRange { pin: [3, 0], .. }));
		let err = Net::new_grid(&square(2).with_pins(vec![[0, 3]])).unwrap_err();
		assert!(matches!(err, Error::PinOutOfRange { .. }));
		assert!(matches!(
			Net::new_grid(&square(0)),
			Err(Error::InvalidGrid { .. })
		));
		let huge = GridSpec::new(V3::zeros(), V3::new(1., 1., 0.), usize::MAX, 1);
		assert!(matches!(
			Net::new_grid(&huge),
			Err(Error::InvalidGrid { rows: usize::MAX, cols: 1 })
		));
		let wide = GridSpec::new(V3::zeros(), V3::new(1., 1., 0.), 1, usize::MAX);
		assert!(matches!(Net::new_grid(&wide), Err(Error::InvalidGrid { .. })));
		let tall = GridSpec::new(V3::zeros(), V3::new(1., 1., 0.), 1 << 20, 1 << 20);
		assert!(matches!(Net::new_grid(&tall), Err(Error::InvalidGrid { .. })));
		assert!(matches!(
			Net::new_grid(&square(2).with_mass(0.)),
			Err(Error::InvalidMass(_))
		));
		assert!(matches!(
			Net::new_grid(&square(2).with_mass(-1.)),
			Err(Error::InvalidMass(_))
		));
		assert!(matches!(
			Net::new_grid(&square(2).with_stiffness(Stiffness::new(1., -1., 1.))),
			Err(Error::InvalidStiffness(_))
		));
	}

	#[test]
	fn test_square_symmetry() {
		for n in 1..6 {
			let net = Net::new_grid(&square(n)).unwrap();
			let w = n + 1;
			for family in [Family::Structural, Family::Border, Family::Flexion] {
				let along = |d: usize| {
					net.springs()
						.iter()
						.filter(|s| s.family == family && s.b - s.a == d)
						.count()
				};
				let offset = if family == Family::Flexion { 2 } else { 1 };
				assert_eq!(along(offset), along(offset * w));
			}
			let diag = net
				.springs()
				.iter()
				.filter(|s| s.family == Family::Shear && s.b - s.a == w + 1)
				.count();
			assert_eq!(diag, net.family_count(Family::Shear) / 2);
		}
	}

	#[test]
	fn test_flat_normals_after_build() {
		let net = Net::new_grid(&square(3)).unwrap();
		for n in net.normals() {
			assert_relative_eq!(n, V3::new(0., 0., 1.));
		}
	}

	#[test]
	fn test_rope() {
		let spec = RopeSpec {
			start: [0., 0., 0.],
			end: [3., 0., 0.],
			nodes: 4,
			mass: 1.,
			stiffness: 10.,
			pins: vec![0],
		};
		let net = Net::new_rope(&spec).unwrap();
		assert_eq!(net.particle_count(), 4);
		assert_eq!(net.spring_count(), 3);
		assert_eq!(net.triangle_count(), 0);
		assert!(net.particles()[0].pinned);
		assert_relative_eq!(net.springs()[2].l0, 1.);
		let bad = RopeSpec { pins: vec![4], ..spec };
		assert!(matches!(Net::new_rope(&bad), Err(Error::InvalidIndex { .. })));
	}

	#[test]
	fn test_from_parts_checks() {
		let ps = vec![Particle::new(V3::zeros(), 1.), Particle::new(V3::x(), 1.)];
		let uv = vec![[0., 0.]; 2];
		let err = Net::from_parts(
			ps.clone(),
			vec![Spring::new_with_l0(0, 2, 1.)],
			vec![],
			uv.clone(),
		)
		.unwrap_err();
		assert!(matches!(err, Error::InvalidIndex { index: 2, len: 2 }));
		let err =
			Net::from_parts(ps.clone(), vec![Spring::new_with_l0(1, 1, 1.)], vec![], uv.clone())
				.unwrap_err();
		assert!(matches!(err, Error::SelfLink(1)));
		let err = Net::from_parts(ps.clone(), vec![], vec![[0, 1, 2]], uv.clone()).unwrap_err();
		assert!(matches!(err, Error::InvalidIndex { index: 2, len: 2 }));
		let net = Net::from_parts(ps, vec![Spring::new_with_l0(0, 1, 1.)], vec![], uv).unwrap();
		assert_eq!(net.spring_count(), 1);
		assert_eq!(net.particles()[0].face_count, 0);
	}

	#[test]
	fn test_step_rejects_bad_input() {
		let mut net = Net::new_grid(&square(2)).unwrap();
		let before: Vec<V3> = net.positions().collect();
		let g = V3::new(0., -1., 0.);
		assert!(matches!(
			net.step(0., g, 0., Scheme::Euler),
			Err(Error::InvalidTimeStep(_))
		));
		assert!(net.step(f32::NAN, g, 0., Scheme::Euler).is_err());
		assert!(matches!(
			net.step(0.1, g, 1.5, Scheme::Verlet),
			Err(Error::InvalidDamping(_))
		));
		assert_eq!(net.positions().collect::<Vec<_>>(), before);
	}

	#[test]
	fn test_pr_model() {
		let net = Net::new_grid(&square(2)).unwrap();
		let model = net.pr_model();
		assert_eq!(model.vertex_len(), 9);
		assert_eq!(model.triangle_len(), 8);
		assert_eq!(&model.indices[..3], &[0, 1, 4]);
	}
}
