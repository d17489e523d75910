use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};

use crate::AppState;

/// Serve a stored photo by its relative path under the media directory.
pub async fn serve_photo(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, StatusCode> {
    let file_path = std::path::PathBuf::from(&state.config.media_dir).join(&path);

    // Security: ensure the path doesn't escape the media directory
    let canonical_media = std::fs::canonicalize(&state.config.media_dir)
        .map_err(|_| StatusCode::NOT_FOUND)?;
    let canonical_file = match std::fs::canonicalize(&file_path) {
        Ok(p) => p,
        Err(_) => return Err(StatusCode::NOT_FOUND),
    };
    if !canonical_file.starts_with(&canonical_media) {
        return Err(StatusCode::FORBIDDEN);
    }

    let content_type = mime_guess::from_path(&file_path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let file_bytes = tokio::fs::read(&file_path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, file_bytes.len().to_string())
        .body(Body::from(file_bytes))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
