use warp::http::StatusCode;

/// Failures of the roster pipeline itself.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("El archivo está vacío")]
    Empty,

    #[error("could not parse roster: {0}")]
    Parse(#[from] csv::Error),

    #[error("El archivo no tiene suficientes columnas")]
    Shape { columns: usize },
}

/// Failures of a single `/upload` request.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file part")]
    MissingFile,

    #[error("No selected file")]
    EmptyFilename,

    #[error("invalid upload filename: {0:?}")]
    InvalidFilename(String),

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] warp::Error),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error("failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Message returned to the client. Storage details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            UploadError::Storage(_) => "failed to store upload".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        assert_eq!(UploadError::MissingFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(UploadError::EmptyFilename.status(), StatusCode::BAD_REQUEST);
        let shape = UploadError::from(RosterError::Shape { columns: 2 });
        assert_eq!(shape.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            shape.client_message(),
            "El archivo no tiene suficientes columnas"
        );
    }

    #[test]
    fn storage_errors_hide_details() {
        let err = UploadError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "/srv/uploads is read-only",
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "failed to store upload");
    }
}
