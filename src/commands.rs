pub mod check;

pub use check::{run_config_check, CheckReport};
