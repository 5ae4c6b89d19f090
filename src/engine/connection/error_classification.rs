//! Error classification helpers for container engine failures.
//!
//! This module converts low-level `Bollard` errors into semantic
//! `ContainerError` variants so callers receive actionable diagnostics, and
//! recognises the engine responses that lifecycle cleanup treats as success.

use std::path::Path;

use crate::error::ContainerError;

/// HTTP status returned when a container is already in the requested state.
const STATUS_NOT_MODIFIED: u16 = 304;

/// HTTP status returned when a container does not exist.
const STATUS_NOT_FOUND: u16 = 404;

/// Extract the filesystem path from a socket URI.
///
/// Strips the scheme prefix (`unix://`, `npipe://`) to get the raw path.
/// For HTTP endpoints or bare paths, returns `None`.
pub(super) fn extract_socket_path(socket_uri: &str) -> Option<&Path> {
    socket_uri
        .strip_prefix("unix://")
        .or_else(|| socket_uri.strip_prefix("npipe://"))
        .map(Path::new)
}

fn classify_io_error_kind(
    kind: std::io::ErrorKind,
    socket_path: Option<&Path>,
    error_msg: &str,
) -> ContainerError {
    match kind {
        std::io::ErrorKind::PermissionDenied => socket_path.map_or_else(
            || ContainerError::ConnectionFailed {
                message: error_msg.to_owned(),
            },
            |path| ContainerError::PermissionDenied {
                path: path.to_path_buf(),
            },
        ),
        std::io::ErrorKind::NotFound => socket_path.map_or_else(
            || ContainerError::ConnectionFailed {
                message: error_msg.to_owned(),
            },
            |path| ContainerError::SocketNotFound {
                path: path.to_path_buf(),
            },
        ),
        _ => ContainerError::ConnectionFailed {
            message: error_msg.to_owned(),
        },
    }
}

/// Classify a `Bollard` connection error into a semantic `ContainerError`.
///
/// Falls back to `ConnectionFailed` for errors that do not match known
/// patterns or for endpoints without filesystem paths.
pub(super) fn classify_connection_error(
    bollard_error: &bollard::errors::Error,
    socket_uri: &str,
) -> ContainerError {
    let socket_path = extract_socket_path(socket_uri);
    let error_msg = bollard_error.to_string();

    match bollard_error {
        bollard::errors::Error::SocketNotFoundError(_) => {
            if let Some(path) = socket_path {
                return ContainerError::SocketNotFound {
                    path: path.to_path_buf(),
                };
            }
        }
        bollard::errors::Error::IOError { err } => {
            let kind = io_error_kind_in_chain(err).unwrap_or_else(|| err.kind());
            return classify_io_error_kind(kind, socket_path, &error_msg);
        }
        _ => {}
    }

    if let Some(kind) = io_error_kind_in_chain(bollard_error) {
        return classify_io_error_kind(kind, socket_path, &error_msg);
    }

    ContainerError::ConnectionFailed { message: error_msg }
}

/// Return true when the engine reports that the container does not exist.
pub(super) fn is_not_found(error: &bollard::errors::Error) -> bool {
    matches!(
        error,
        bollard::errors::Error::DockerResponseServerError {
            status_code: STATUS_NOT_FOUND,
            ..
        }
    )
}

/// Return true when a stop request hit a container that was already stopped
/// or already gone.
pub(super) fn is_already_stopped(error: &bollard::errors::Error) -> bool {
    matches!(
        error,
        bollard::errors::Error::DockerResponseServerError {
            status_code: STATUS_NOT_MODIFIED | STATUS_NOT_FOUND,
            ..
        }
    )
}

/// Walk the error source chain looking for an `io::Error` kind.
fn io_error_kind_in_chain(error: &dyn std::error::Error) -> Option<std::io::ErrorKind> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = error.source();
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return Some(io_err.kind());
        }
        current = err.source();
    }
    None
}
