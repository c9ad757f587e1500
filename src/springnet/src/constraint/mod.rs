pub mod spring;
pub mod template;

pub use spring::Spring;
pub use template::SpringTemplate;

use serde::{Deserialize, Serialize};

/// Which grid neighbours a spring connects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
	// offset 1 along an axis, per cell
	Structural,
	// offset 1 along an axis, closing the last row and column
	Border,
	// offset 1 along both axes
	Shear,
	// offset 2 along an axis
	Flexion,
}

impl Family {
	pub const ALL: [Family; 4] =
		[Family::Structural, Family::Border, Family::Shear, Family::Flexion];
}
