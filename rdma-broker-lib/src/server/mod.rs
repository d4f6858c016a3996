mod acceptor;
mod lifecycle;
mod shared;

pub use acceptor::run;
pub use shared::SharedResources;
