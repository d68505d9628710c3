//! Domain layer - input model and collaborator ports
//!
//! The descriptor types are what translation consumes; the ports are what
//! a deployment needs from the outside world.

pub mod descriptor;
pub mod ports;

pub use descriptor::*;
pub use ports::*;
