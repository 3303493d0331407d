pub mod common;
pub mod configs;
pub mod proxy;
pub mod relay;
pub mod resolver;
pub mod server;
pub mod transport;
pub mod youtube;
