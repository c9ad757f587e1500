use super::Family;

/// A spring before it is bound to particle positions: endpoints and family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpringTemplate {
	pub a: usize,
	pub b: usize,
	pub family: Family,
}

impl SpringTemplate {
	pub fn new(a: usize, b: usize, family: Family) -> Self {
		Self { a, b, family }
	}
}
