use crate::particle::Particle;
use crate::V3;

/// Unit normal of the triangle `(a, b, c)`, or zero for a degenerate face.
pub fn face_normal(a: V3, b: V3, c: V3) -> V3 {
	let n = (b - a).cross(&(c - a));
	let l = n.magnitude();
	if !l.is_normal() {
		return V3::zeros();
	}
	n / l
}

pub fn count_faces(particles: &mut [Particle], triangles: &[[u32; 3]]) {
	for p in particles.iter_mut() {
		p.face_count = 0;
	}
	for tri in triangles.iter() {
		for &v in tri.iter() {
			particles[v as usize].face_count += 1;
		}
	}
}

/// Averages the face normals around every vertex, in index-buffer order.
pub fn update_normals(particles: &mut [Particle], triangles: &[[u32; 3]]) {
	for p in particles.iter_mut() {
		p.normal = V3::zeros();
	}
	for tri in triangles.iter() {
		let [a, b, c] = tri.map(|v| v as usize);
		let n = face_normal(particles[a].pos, particles[b].pos, particles[c].pos);
		particles[a].normal += n;
		particles[b].normal += n;
		particles[c].normal += n;
	}
	for p in particles.iter_mut() {
		if p.face_count > 0 {
			p.normal /= p.face_count as f32;
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn quad(z: f32) -> (Vec<Particle>, Vec<[u32; 3]>) {
		let mut ps = vec![
			Particle::new(V3::new(0., 0., 0.), 1.),
			Particle::new(V3::new(1., 0., 0.), 1.),
			Particle::new(V3::new(0., 1., 0.), 1.),
			Particle::new(V3::new(1., 1., z), 1.),
		];
		let tris = vec![[0, 1, 3], [0, 3, 2]];
		count_faces(&mut ps, &tris);
		(ps, tris)
	}

	#[test]
	fn test_flat_quad() {
		let (mut ps, tris) = quad(0.);
		assert_eq!(ps.iter().map(|p| p.face_count).collect::<Vec<_>>(), vec![2, 1, 1, 2]);
		update_normals(&mut ps, &tris);
		for p in ps.iter() {
			assert_eq!(p.normal, V3::new(0., 0., 1.));
		}
	}

	#[test]
	fn test_idempotent() {
		let (mut ps, tris) = quad(0.7);
		update_normals(&mut ps, &tris);
		let first: Vec<V3> = ps.iter().map(|p| p.normal).collect();
		update_normals(&mut ps, &tris);
		let second: Vec<V3> = ps.iter().map(|p| p.normal).collect();
		assert_eq!(first, second);
	}

	#[test]
	fn test_degenerate_face_is_zero() {
		let p = V3::new(1., 1., 1.);
		assert_eq!(face_normal(p, p, V3::new(2., 0., 0.)), V3::zeros());
		let mut ps = vec![Particle::new(p, 1.); 3];
		let tris = vec![[0, 1, 2]];
		count_faces(&mut ps, &tris);
		update_normals(&mut ps, &tris);
		assert!(ps.iter().all(|p| p.normal == V3::zeros()));
	}
}
