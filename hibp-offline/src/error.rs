use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid scan range: start prefix {start:02X?} is greater than end prefix {end:02X?}")]
    InvalidRange { start: [u8; 3], end: [u8; 3] },

    #[error("error replacing database with '{path}': {source}")]
    UpdateRename {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error reopening database '{path}': {source}")]
    UpdateOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
