/*!
error - The crate's error taxonomy.

Four kinds, matching the balancing engine's own fault model: `Config` and
`Topology` are fatal at startup but non-fatal on reconfig/refresh (the prior
state is retained and the failure is logged); `IoTransient` drops a single
IRQ for one tick without aborting it; `InvalidMask` surfaces as a `Config`
error at load time and is logged+dropped everywhere else.
*/

use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("config error in {path}:{line}: {message}")]
    ConfigLine {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("topology error: {0}")]
    Topology(String),

    #[error("io error on {path}: {source}")]
    IoTransient {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cpu mask: {0}")]
    InvalidMask(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Error {
        Error::IoTransient {
            path: path.into(),
            source,
        }
    }
}
