use miette::Diagnostic;
use thiserror::Error;

/// Main error type for camo operations
#[derive(Error, Diagnostic, Debug)]
pub enum CamoError {
    #[error("IO error: {0}")]
    #[diagnostic(code(camo::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(camo::io))]
    Io {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Parse error: {message}")]
    #[diagnostic(code(camo::parse))]
    Parse {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(camo::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Colour clustering failed: {message}")]
    #[diagnostic(code(camo::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Geometry error: {message}")]
    #[diagnostic(code(camo::geometry))]
    Geometry { message: String },

    #[error("A run is already in progress for {0}")]
    #[diagnostic(
        code(camo::busy),
        help("Wait for the previous run on this image to finish")
    )]
    Busy(String),

    #[error("Run cancelled")]
    #[diagnostic(code(camo::cancelled))]
    Cancelled,
}

impl CamoError {
    /// Shorthand for a configuration error with a help line.
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        CamoError::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CamoError>;
