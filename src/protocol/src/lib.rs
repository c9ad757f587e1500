pub mod pr_model;
pub mod user_event;
use pr_model::PrModel;

use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub enum Message {
	WorldUpdate(PrModel),
	Nop,
}

impl Message {
	pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
		bincode::serialize(&self)
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
		bincode::deserialize(bytes)
	}
}
