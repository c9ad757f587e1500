// Spring, face and texture coordinate generation for the two net layouts.
// Everything here is pure index arithmetic; positions are bound in net.rs.

use crate::constraint::{Family, SpringTemplate};

pub fn grid_index(cols: usize, i: usize, j: usize) -> usize {
	i * (cols + 1) + j
}

pub fn grid_springs(rows: usize, cols: usize) -> Vec<SpringTemplate> {
	let w = cols + 1;
	let mut result = vec![];
	for i in 0..rows {
		for j in 0..cols {
			let idx = grid_index(cols, i, j);
			result.push(SpringTemplate::new(idx, idx + 1, Family::Structural));
			result.push(SpringTemplate::new(idx, idx + w, Family::Structural));
		}
	}
	for j in 0..cols {
		let idx = grid_index(cols, rows, j);
		result.push(SpringTemplate::new(idx, idx + 1, Family::Border));
	}
	for i in 0..rows {
		let idx = grid_index(cols, i, cols);
		result.push(SpringTemplate::new(idx, idx + w, Family::Border));
	}
	for i in 0..rows {
		for j in 0..cols {
			let idx = grid_index(cols, i, j);
			result.push(SpringTemplate::new(idx, idx + w + 1, Family::Shear));
			result.push(SpringTemplate::new(idx + 1, idx + w, Family::Shear));
		}
	}
	for i in 0..=rows {
		for j in 0..=cols {
			let idx = grid_index(cols, i, j);
			if j + 2 <= cols {
				result.push(SpringTemplate::new(idx, idx + 2, Family::Flexion));
			}
			if i + 2 <= rows {
				result.push(SpringTemplate::new(idx, idx + 2 * w, Family::Flexion));
			}
		}
	}
	result
}

pub fn grid_triangles(rows: usize, cols: usize) -> Vec<[u32; 3]> {
	let w = (cols + 1) as u32;
	let mut result = Vec::with_capacity(2 * rows * cols);
	for i in 0..rows {
		for j in 0..cols {
			let idx = grid_index(cols, i, j) as u32;
			result.push([idx, idx + 1, idx + w + 1]);
			result.push([idx, idx + w + 1, idx + w]);
		}
	}
	result
}

pub fn grid_tex_coords(rows: usize, cols: usize) -> Vec<[f32; 2]> {
	let mut result = Vec::with_capacity((rows + 1) * (cols + 1));
	for i in 0..=rows {
		for j in 0..=cols {
			result.push([j as f32 / cols as f32, i as f32 / rows as f32]);
		}
	}
	result
}

pub fn rope_springs(nodes: usize) -> Vec<SpringTemplate> {
	(1..nodes)
		.map(|idx| SpringTemplate::new(idx - 1, idx, Family::Structural))
		.collect()
}

pub fn rope_tex_coords(nodes: usize) -> Vec<[f32; 2]> {
	if nodes < 2 {
		return vec![[0., 0.]; nodes];
	}
	(0..nodes)
		.map(|idx| [idx as f32 / (nodes - 1) as f32, 0.])
		.collect()
}
