pub mod check;
pub mod control;

pub use check::check_config;
pub use control::{ControlCommands, handle_control_command};
