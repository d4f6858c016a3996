mod capacity;
mod loader;
mod remote_write;
mod root;
mod telemetry;
mod timeout;
mod tls;
mod validator;

pub use capacity::{CapacityConfig, CapacityMode};
pub use loader::load_from_path;
pub use remote_write::RemoteWriteConfig;
pub use root::Config;
pub use telemetry::TelemetryConfig;
pub use timeout::TimeoutConfig;
pub use tls::{TlsConfig, TlsVersion};
