use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BufMut;
use futures_util::TryStreamExt;
use serde::Serialize;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::multipart::{FormData, Part};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::error::UploadError;
use crate::roster;
use crate::storage::UploadStore;

const FILE_FIELD: &str = "file";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub max_upload_bytes: u64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

struct UploadedFile {
    filename: String,
    data: Vec<u8>,
}

pub async fn run(config: ServerConfig, store: UploadStore) {
    info!("Server starting on {}", config.addr);
    info!("Upload endpoint: POST http://{}/upload", config.addr);
    info!("Uploads stored in {}", store.dir().display());

    warp::serve(routes(Arc::new(store), config.max_upload_bytes))
        .run(config.addr)
        .await;
}

pub fn routes(
    store: Arc<UploadStore>,
    max_upload_bytes: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_check);

    let upload = warp::path("upload")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(max_upload_bytes))
        .and(warp::any().map(move || Arc::clone(&store)))
        .and_then(upload_roster);

    health.or(upload).recover(handle_rejection)
}

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "roster-averages"
    })))
}

async fn upload_roster(form: FormData, store: Arc<UploadStore>) -> Result<Response, Infallible> {
    let span = tracing::info_span!("upload", request_id = %Uuid::new_v4());

    let response = async move {
        match handle_upload(form, &store).await {
            Ok(response) => response,
            Err(err) => {
                if err.status().is_server_error() {
                    error!("Upload failed: {}", err);
                } else {
                    warn!("Rejected upload: {}", err);
                }
                error_reply(err.status(), err.client_message())
            }
        }
    }
    .instrument(span)
    .await;

    Ok(response)
}

async fn handle_upload(form: FormData, store: &UploadStore) -> Result<Response, UploadError> {
    let file = find_file_part(form).await?;
    if file.filename.is_empty() {
        return Err(UploadError::EmptyFilename);
    }

    let path = store.save(&file.filename, &file.data).await?;
    let stored = store.read(&path).await?;
    let result = roster::process(&stored)?;

    info!(
        "Processed {}: {} students, {} at or below {}",
        file.filename,
        result.all_students.len(),
        result.filtered_students.len(),
        roster::AT_RISK_THRESHOLD
    );

    Ok(warp::reply::json(&result).into_response())
}

/// Returns the first `file` part that carries a filename. Parts without a
/// filename are plain form fields, not uploads.
async fn find_file_part(mut form: FormData) -> Result<UploadedFile, UploadError> {
    while let Some(part) = form.try_next().await? {
        if part.name() != FILE_FIELD {
            continue;
        }
        let Some(filename) = part.filename().map(str::to_string) else {
            continue;
        };
        let data = read_part(part).await?;
        return Ok(UploadedFile { filename, data });
    }

    Err(UploadError::MissingFile)
}

async fn read_part(mut part: Part) -> Result<Vec<u8>, UploadError> {
    let mut data = Vec::new();
    while let Some(chunk) = part.data().await {
        data.put(chunk?);
    }
    Ok(data)
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "File too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            "Content-Length header required".to_string(),
        )
    } else if err.find::<warp::reject::MissingHeader>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
    {
        // No multipart content type, so the request cannot hold a file part.
        warn!("Rejected upload request: {:?}", err);
        (StatusCode::BAD_REQUEST, UploadError::MissingFile.to_string())
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (StatusCode::BAD_REQUEST, "Bad Request".to_string())
    };

    Ok(error_reply(status, message))
}

fn error_reply(status: StatusCode, message: String) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorResponse { error: message }), status)
        .into_response()
}
