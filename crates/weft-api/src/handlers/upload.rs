//! Multipart image upload.
//!
//! Blob storage proper is an external concern; files land in the
//! configured upload directory and the returned URL path is what goes into
//! an image message's content.

use crate::response::{fail, ok};
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

pub async fn upload_image(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let max_bytes = state.storage().max_file_size_mb as usize * 1024 * 1024;

    let mut auth_token = String::new();
    let mut file: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "malformed multipart body");
                return fail("invalid upload").into_response();
            }
        };

        match field.name().unwrap_or_default() {
            "authToken" => {
                auth_token = field.text().await.unwrap_or_default();
            }
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) if bytes.len() <= max_bytes => {
                        file = Some((file_name, bytes.to_vec()));
                    }
                    Ok(_) => return fail("file too large").into_response(),
                    Err(e) => {
                        tracing::debug!(error = %e, "upload read failed");
                        return fail("invalid upload").into_response();
                    }
                }
            }
            _ => {}
        }
    }

    if state.resolve_token(&auth_token).await.is_none() {
        return fail("auth fail").into_response();
    }

    let Some((file_name, bytes)) = file else {
        return fail("file is required").into_response();
    };

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return fail("unsupported image type").into_response();
    }

    let stored_name = format!("{}.{extension}", Uuid::new_v4());
    let dir = state.storage().upload_dir.clone();
    let path = std::path::Path::new(&dir).join(&stored_name);

    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        tracing::error!(error = %e, "upload dir unavailable");
        return fail("upload fail").into_response();
    }
    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        tracing::error!(error = %e, "upload write failed");
        return fail("upload fail").into_response();
    }

    tracing::info!(file = %stored_name, bytes = bytes.len(), "image uploaded");
    ok("ok", serde_json::json!({ "url": format!("/uploads/{stored_name}") })).into_response()
}
