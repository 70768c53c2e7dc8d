use thiserror::Error;

/// The error type for `retinanet-burn` operations.
#[derive(Error, Debug)]
pub enum RetinaNetError {
    /// An identifier outside the allowed backbone set was supplied.
    #[error("backbone '{name}' is not one of the allowed backbones ({allowed})")]
    InvalidBackbone {
        /// The rejected identifier.
        name: String,
        /// The allowed identifiers.
        allowed: String,
    },

    /// A model configuration is logically inconsistent.
    #[error("invalid model configuration: {reason}")]
    InvalidConfiguration {
        /// Why the configuration is invalid.
        reason: String,
    },

    /// An input tensor does not match the configured descriptor.
    #[error("invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The expected shape.
        expected: String,
        /// The actual shape.
        actual: String,
    },

    /// Loading model weights failed.
    #[error("failed to load weights: {reason}")]
    WeightLoadingFailed {
        /// Why loading failed.
        reason: String,
    },

    /// Fetching a pretrained-weights resource failed.
    #[error("failed to fetch '{filename}': {reason}")]
    DownloadFailed {
        /// The resource file name.
        filename: String,
        /// Why the fetch failed.
        reason: String,
    },

    /// A fetched resource did not match its published checksum.
    #[error("checksum mismatch for '{filename}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The resource file name.
        filename: String,
        /// The published MD5 digest.
        expected: String,
        /// The computed MD5 digest.
        actual: String,
    },

    /// A weight file in a format no recorder handles.
    #[error("unsupported weight file format: {format}")]
    UnsupportedFormat {
        /// The offending extension.
        format: String,
    },
}

/// A specialized `Result` type for `retinanet-burn` operations.
pub type RetinaNetResult<T> = Result<T, RetinaNetError>;
