// Infrastructure layer (shared components)
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod store;

// Domain layer
pub mod message;
pub mod session;
pub mod spool;

// Supporting modules
pub mod tasks;
