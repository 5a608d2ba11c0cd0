pub mod adb;
pub mod checks;
pub mod command;
pub mod error;
pub mod port;

pub use checks::{CheckStatus, SetupCheck, SetupConfig, SetupReport, run_setup_checks};
pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use error::ProbeError;
pub use port::is_port_open;
