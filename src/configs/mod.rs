pub mod base;
pub mod logging;
pub mod mirrors;
pub mod proxy;
pub mod resolver;
pub mod server;
pub mod youtube;

pub use base::*;
pub use logging::*;
pub use mirrors::*;
pub use proxy::*;
pub use resolver::*;
pub use server::*;
pub use youtube::*;
