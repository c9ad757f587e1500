use serde::{Deserialize, Serialize};

/// Snapshot of one simulated surface, laid out for vertex-buffer upload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrModel {
	pub positions: Vec<[f32; 3]>,
	pub normals: Vec<[f32; 3]>,
	pub tex_coords: Vec<[f32; 2]>,
	// flat triangle list, three indices per face
	pub indices: Vec<u32>,
}

impl PrModel {
	pub fn vertex_len(&self) -> usize {
		self.positions.len()
	}

	pub fn triangle_len(&self) -> usize {
		self.indices.len() / 3
	}

	/// Interleaved `position, normal, tex_coord` records, 8 floats per vertex.
	pub fn interleaved(&self) -> Vec<f32> {
		let mut result = Vec::with_capacity(self.positions.len() * 8);
		let records = self
			.positions
			.iter()
			.zip(self.normals.iter())
			.zip(self.tex_coords.iter());
		for ((pos, normal), uv) in records {
			result.extend_from_slice(pos);
			result.extend_from_slice(normal);
			result.extend_from_slice(uv);
		}
		result
	}
}
