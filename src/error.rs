/// Errors surfaced by the annotation client and listing.
#[derive(thiserror::Error, Debug)]
pub enum AnnotationError {
    /// The server refused a write. Recoverable: the caller keeps the form open.
    #[error("The server rejected the request with status {status}{}", format_errors(.errors))]
    Rejected {
        /// HTTP status code returned by the server.
        status: u16,
        /// Validation messages extracted from the response body, if any.
        errors: Vec<String>,
    },
    /// The request never produced a response.
    #[error("Request to `{path}` failed: {message}")]
    Transport {
        /// Path of the failed request.
        path:    String,
        /// Underlying transport error.
        message: String,
    },
    /// The response body did not have the expected shape.
    #[error("Could not decode response from `{path}`: {source}")]
    Decode {
        /// Path of the request whose response failed to decode.
        path:   String,
        /// Underlying decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// An operation was invoked on an annotation that cannot support it.
    #[error("Contract violation: {0}")]
    Contract(String),
}

impl AnnotationError {
    /// Returns the HTTP status for rejected requests.
    pub fn status(&self) -> Option<u16> {
        match self {
            AnnotationError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the validation messages carried by a rejection.
    pub fn validation_messages(&self) -> &[String] {
        match self {
            AnnotationError::Rejected { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Renders validation messages as a suffix for the `Rejected` message.
fn format_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        format!(": {}", errors.join("; "))
    }
}

/// Convenience alias used across the crate.
pub type Result<T, E = AnnotationError> = std::result::Result<T, E>;
