// Use cases layer: world driving, hosting and the async tick loop.

pub mod game;
pub mod host;
pub mod types;
pub mod world;

pub use host::{WorldHandle, WorldHost, WorldHostError, WorldSettings};
pub use types::{EntitySnapshot, WorldEvent, WorldState, WorldUpdate};
pub use world::SimWorld;
