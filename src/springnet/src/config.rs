use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constraint::Family;
use crate::gpu::BackendKind;
use crate::integrator::Scheme;
use crate::time_manager::TimeModel;
use crate::{Error, V3};

pub const DEFAULT_MASS: f32 = 1.0;
pub const DEFAULT_K_STRUCTURAL: f32 = 100.0;
pub const DEFAULT_K_SHEAR: f32 = 5.0;
pub const DEFAULT_K_FLEXION: f32 = 1.0;
pub const DEFAULT_DAMPING: f32 = 0.05;
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -1.0, 0.0];
pub const DEFAULT_STEPS_PER_FRAME: u32 = 64;
pub const DEFAULT_ROWS: usize = 20;
pub const DEFAULT_COLS: usize = 20;

/// Stiffness per spring family. `border` falls back to `structural`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stiffness {
	pub structural: f32,
	pub shear: f32,
	pub flexion: f32,
	pub border: Option<f32>,
}

impl Default for Stiffness {
	fn default() -> Self {
		Self {
			structural: DEFAULT_K_STRUCTURAL,
			shear: DEFAULT_K_SHEAR,
			flexion: DEFAULT_K_FLEXION,
			border: None,
		}
	}
}

impl Stiffness {
	pub fn new(structural: f32, shear: f32, flexion: f32) -> Self {
		Self {
			structural,
			shear,
			flexion,
			border: None,
		}
	}

	pub fn uniform(k: f32) -> Self {
		Self::new(k, k, k)
	}

	pub fn with_border(mut self, k: f32) -> Self {
		self.border = Some(k);
		self
	}

	pub fn of(&self, family: Family) -> f32 {
		match family {
			Family::Structural => self.structural,
			Family::Border => self.border.unwrap_or(self.structural),
			Family::Shear => self.shear,
			Family::Flexion => self.flexion,
		}
	}

	pub fn validate(&self) -> Result<(), Error> {
		for family in Family::ALL {
			let k = self.of(family);
			if !(k.is_finite() && k >= 0.) {
				return Err(Error::InvalidStiffness(k));
			}
		}
		Ok(())
	}
}

/// Where grid point `(i, j)` lands inside the bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
	// z advances with the row, giving a sheared plane across the box
	Sheared,
	// z stays at the box minimum
	Planar,
}

impl Placement {
	pub fn place(&self, min: V3, max: V3, u: f32, v: f32) -> V3 {
		let x = min.x + (max.x - min.x) * u;
		let y = min.y + (max.y - min.y) * v;
		let z = match self {
			Self::Sheared => min.z + (max.z - min.z) * v,
			Self::Planar => min.z,
		};
		V3::new(x, y, z)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
	pub min: [f32; 3],
	pub max: [f32; 3],
	pub rows: usize,
	pub cols: usize,
	pub mass: f32,
	pub stiffness: Stiffness,
	// [row, col]
	pub pins: Vec<[usize; 2]>,
	pub placement: Placement,
}

impl Default for GridSpec {
	fn default() -> Self {
		Self {
			min: [-200., -200., -200.],
			max: [200., 200., -100.],
			rows: DEFAULT_ROWS,
			cols: DEFAULT_COLS,
			mass: DEFAULT_MASS,
			stiffness: Stiffness::default(),
			pins: Vec::new(),
			placement: Placement::Sheared,
		}
	}
}

impl GridSpec {
	pub fn new(min: V3, max: V3, rows: usize, cols: usize) -> Self {
		Self {
			min: min.into(),
			max: max.into(),
			rows,
			cols,
			..Default::default()
		}
	}

	pub fn with_mass(mut self, mass: f32) -> Self {
		self.mass = mass;
		self
	}

	pub fn with_stiffness(mut self, stiffness: Stiffness) -> Self {
		self.stiffness = stiffness;
		self
	}

	pub fn with_pins(mut self, pins: Vec<[usize; 2]>) -> Self {
		self.pins = pins;
		self
	}

	pub fn with_placement(mut self, placement: Placement) -> Self {
		self.placement = placement;
		self
	}

	/// Pins both corners of the last row, like the default scene.
	pub fn with_corner_pins(self) -> Self {
		let pins = vec![[self.rows, 0], [self.rows, self.cols]];
		self.with_pins(pins)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RopeSpec {
	pub start: [f32; 3],
	pub end: [f32; 3],
	pub nodes: usize,
	pub mass: f32,
	pub stiffness: f32,
	pub pins: Vec<usize>,
}

impl Default for RopeSpec {
	fn default() -> Self {
		Self {
			start: [-200., 200., 0.],
			end: [200., 200., 0.],
			nodes: 16,
			mass: DEFAULT_MASS,
			stiffness: DEFAULT_K_STRUCTURAL,
			pins: vec![0],
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
	pub grid: GridSpec,
	pub gravity: [f32; 3],
	pub damping: f32,
	pub scheme: Scheme,
	pub backend: BackendKind,
	pub time: TimeModel,
}

impl Default for SimConfig {
	fn default() -> Self {
		Self {
			grid: GridSpec::default().with_corner_pins(),
			gravity: DEFAULT_GRAVITY,
			damping: DEFAULT_DAMPING,
			scheme: Scheme::Euler,
			backend: BackendKind::Host,
			time: TimeModel::FixedSteps(DEFAULT_STEPS_PER_FRAME),
		}
	}
}

impl SimConfig {
	pub fn from_json_str(s: &str) -> Result<Self, Error> {
		let config: Self = serde_json::from_str(s)?;
		config.validate()?;
		Ok(config)
	}

	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
		let text = std::fs::read_to_string(path)?;
		Self::from_json_str(&text)
	}

	pub fn gravity(&self) -> V3 {
		V3::from(self.gravity)
	}

	/// Checks the stepping parameters; the grid is checked when it is built.
	pub fn validate(&self) -> Result<(), Error> {
		if !self.gravity.iter().all(|g| g.is_finite()) {
			return Err(Error::Config(format!(
				"gravity must be finite, got {:?}",
				self.gravity
			)));
		}
		if !(0. ..=1.).contains(&self.damping) {
			return Err(Error::InvalidDamping(self.damping));
		}
		self.time.validate()
	}
}
