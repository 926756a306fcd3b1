pub mod chunker;
pub mod config;
pub mod error;
pub mod formatter;
pub mod lane;
pub mod pool;
pub mod resolver;
pub mod server;
pub mod session;

pub use config::Config;
pub use error::GatewayError;
pub use lane::{LaneContext, Outbound};
pub use pool::DecodePool;
pub use server::Gateway;
