// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Error types shared by every part of the daemon.

use std::io;
use std::path::PathBuf;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed configuration. The entity it describes is never built.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No hwmon device reports the requested driver name.
    #[error("hwmon driver '{0}' not found")]
    DeviceNotFound(String),

    /// A device file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A device file held something other than the expected number.
    #[error("Could not parse '{contents}' read from {path}")]
    Parse { path: PathBuf, contents: String },

    /// A duty cycle write was attempted while the kernel owns the fan.
    #[error("Fan '{0}' is not under manual control")]
    ControlLost(String),

    /// A duty cycle outside `[0, 100]` was requested.
    #[error("Duty cycle {0} is outside the range [0, 100]")]
    Range(i32),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
