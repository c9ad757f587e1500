use crate::pr_model::PrModel;

/// Sent from the simulation thread once per produced frame.
#[derive(Debug)]
pub enum UserEvent {
	Update(PrModel, UpdateInfo),
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateInfo {
	// simulation time spent / frame budget
	pub load: f32,
	pub particle_len: usize,
	pub spring_len: usize,
	pub frame: u64,
}
