use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {status}")]
    CommandFailed { command: String, status: i32 },

    #[error("Could not resolve address {0}")]
    AddressResolution(String),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
