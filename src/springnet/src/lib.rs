pub mod config;
pub mod constraint;
pub mod controller_message;
pub mod error;
pub mod force;
pub mod gpu;
pub mod integrator;
pub mod net;
pub mod normal;
pub mod particle;
pub mod time_manager;
mod topology;
pub mod world;

pub type V3 = nalgebra::Vector3<f32>;

pub use error::Error;
pub use integrator::Scheme;
pub use net::Net;
