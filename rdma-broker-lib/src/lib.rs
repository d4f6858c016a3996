pub mod bringup;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod ops;
pub mod protocol;
pub mod psn;
pub mod server;
pub mod slots;
pub mod telemetry;
pub mod tls;
pub mod transport;

pub use config::{load_from_path, Config};
pub use connection::Connection;
pub use error::{BrokerError, Result};
pub use server::{run, SharedResources};
