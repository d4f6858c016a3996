mod machine;
mod state;

pub use machine::{bring_up_client, bring_up_server};
pub use state::ConnectionState;
