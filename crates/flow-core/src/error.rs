use std::io;

/// `ConfigValidation` and `EndpointOpen` are fatal and short-circuit before
/// the forwarder loop starts; `CopyError` and `CloseError` are surfaced but
/// do not stop the process that produced them.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("configuration invalid: {0}")]
    ConfigValidation(String),

    #[error("failed to open endpoint {id}: {source}")]
    EndpointOpen {
        id: String,
        #[source]
        source: io::Error,
    },

    #[error("copy from reader {reader_id} to writer(s) {writer_ids:?} failed: {source}")]
    CopyError {
        reader_id: String,
        writer_ids: Vec<String>,
        #[source]
        source: io::Error,
    },

    #[error("error while closing endpoints: {0}")]
    CloseError(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
