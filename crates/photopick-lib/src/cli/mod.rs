mod args;
mod params;
mod pick;
mod resolved_command;

pub use args::{Args, parse_args};
pub use params::PickParams;
pub use pick::run_pick;
pub use resolved_command::resolve_params;
