// Frameworks layer: env config and runtime bootstrap.

pub mod config;
pub mod server;
