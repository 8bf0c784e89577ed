pub mod config;
pub mod constants;
pub mod coords;
pub mod engine;
pub mod geocoder;
pub mod map_registry;
pub mod resolver;
pub mod sampler;
pub mod server_protocol;
pub mod server_utils;
pub mod session;
pub mod types;
