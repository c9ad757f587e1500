/// Commands accepted by [`crate::world::World::run_thread`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerMessage {
	// pause or resume free running
	TogglePause,
	// while paused, produce exactly one more frame
	FrameForward,
	Shutdown,
}
