//! Error types of the generation pipeline and mesh loading.
//!
//! All of them end up as a single status line in the UI; the variants only
//! differ in the message they produce.

use thiserror::Error;

/// The generation request could not be delivered or was rejected by HTTP status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Network failure, invalid URL or unreadable body.
    #[error("Request failed: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("Request failed")]
    Status(u16),
}

/// The backend answered, but not with a usable acknowledgement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid response from backend: {0}")]
    InvalidJson(String),

    /// The status was not the success sentinel or no mesh path was returned.
    #[error("Backend did not return a mesh_file")]
    MissingMeshFile,
}

/// Fetching or parsing the generated mesh failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshLoadError {
    #[error("Failed to fetch mesh {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to parse mesh {url}: {reason}")]
    Parse { url: String, reason: String },

    /// The viewer was disposed before the mesh could be inserted.
    #[error("Viewer is no longer running")]
    ViewerClosed,

    /// A newer load was started; this one must not touch the scene.
    #[error("Superseded by a newer load")]
    Superseded,
}

/// Everything a single form submission can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    MeshLoad(#[from] MeshLoadError),

    /// The submitted form could not be turned into a request body.
    #[error("Cannot read the form: {0}")]
    Form(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Timed out after {0} s")]
    TimedOut(u64),

    /// A newer submission started while this one was in flight.
    #[error("Superseded by a newer request")]
    Superseded,
}

/// Result type for generation operations.
pub type GenerateResult<T> = Result<T, GenerateError>;
