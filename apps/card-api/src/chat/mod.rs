pub mod frames;
pub mod registry;
pub mod server;
