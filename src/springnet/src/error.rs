use std::fmt;

use crate::gpu::GpuError;

#[derive(Debug)]
pub enum Error {
	InvalidMass(f32),
	InvalidStiffness(f32),
	InvalidGrid { rows: usize, cols: usize },
	PinOutOfRange { pin: [usize; 2], rows: usize, cols: usize },
	InvalidIndex { index: usize, len: usize },
	SelfLink(usize),
	InvalidTimeStep(f32),
	InvalidDamping(f32),
	Config(String),
	Gpu(GpuError),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::InvalidMass(m) => {
				write!(f, "node mass must be positive and finite, got {}", m)
			}
			Self::InvalidStiffness(k) => {
				write!(f, "stiffness must be non-negative and finite, got {}", k)
			}
			Self::InvalidGrid { rows, cols } => {
				write!(f, "grid needs at least one row and column, got {}x{}", rows, cols)
			}
			Self::PinOutOfRange { pin, rows, cols } => write!(
				f,
				"pin ({}, {}) is outside the {}x{} grid",
				pin[0], pin[1], rows, cols
			),
			Self::InvalidIndex { index, len } => {
				write!(f, "particle index {} out of range for {} particles", index, len)
			}
			Self::SelfLink(idx) => write!(f, "spring links particle {} to itself", idx),
			Self::InvalidTimeStep(dt) => {
				write!(f, "time step must be positive and finite, got {}", dt)
			}
			Self::InvalidDamping(d) => write!(f, "damping must lie in [0, 1], got {}", d),
			Self::Config(msg) => write!(f, "bad configuration: {}", msg),
			Self::Gpu(e) => write!(f, "device error: {}", e),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Gpu(e) => Some(e),
			_ => None,
		}
	}
}

impl From<GpuError> for Error {
	fn from(e: GpuError) -> Self {
		Self::Gpu(e)
	}
}

impl From<serde_json::Error> for Error {
	fn from(e: serde_json::Error) -> Self {
		Self::Config(e.to_string())
	}
}

impl From<std::io::Error> for Error {
	fn from(e: std::io::Error) -> Self {
		Self::Config(e.to_string())
	}
}
