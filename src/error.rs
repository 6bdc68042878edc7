//! Error and warning types for the export pipeline

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort the current export or preview refresh
#[derive(Error, Debug)]
pub enum Error {
    /// Snapshot root is missing or not attached to the live document
    #[error("Snapshot root is not attached: {0}")]
    DetachedRoot(String),

    /// Clone and source subtree disagree on child structure
    #[error("Snapshot structure mismatch at <{tag}>: source has {source_children} children, clone has {clone_children}")]
    StructureMismatch {
        tag: String,
        source_children: usize,
        clone_children: usize,
    },

    /// The renderer failed to produce a pixel buffer
    #[error("Rasterization failed: {0}")]
    Rasterization(String),

    /// Component template/descriptor could not be evaluated
    #[error("Component evaluation failed: {0}")]
    ComponentEvaluation(String),

    /// Another export is already in flight
    #[error("An export is already in progress")]
    Busy,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Image or document encoding failed
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Font/icon fetch failed
    #[error("Failed to load asset {url}: {reason}")]
    Asset { url: String, reason: String },
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Encode(err.to_string())
    }
}

/// Non-fatal conditions recorded while exporting
///
/// Warnings never abort an export; they are logged where they occur and
/// returned alongside the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The selection marker matched nothing; the whole document was exported
    NoMatch { marker: String },
    /// The renderer refused a single property/value pair; it was skipped
    StylePropertyRejected { property: String, value: String },
    /// A font/icon could not be fetched; text may use a fallback face
    AssetLoad { url: String, reason: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NoMatch { marker } => {
                write!(f, "no element carries class '{}', exporting whole document", marker)
            }
            Warning::StylePropertyRejected { property, value } => {
                write!(f, "renderer rejected '{}: {}'", property, value)
            }
            Warning::AssetLoad { url, reason } => write!(f, "asset {} unavailable: {}", url, reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_condition() {
        let err = Error::DetachedRoot("node 7".into());
        assert_eq!(err.to_string(), "Snapshot root is not attached: node 7");

        let err = Error::StructureMismatch {
            tag: "div".into(),
            source_children: 3,
            clone_children: 2,
        };
        assert!(err.to_string().contains("source has 3 children"));
    }

    #[test]
    fn warning_display_mentions_marker() {
        let w = Warning::NoMatch { marker: "export-this".into() };
        assert!(w.to_string().contains("export-this"));
    }
}
