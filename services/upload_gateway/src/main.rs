/// Upload Gateway Service - pinning ingress for record files
/// Accepts a multipart upload and pins it to the content-addressed network,
/// returning the content identifier the record workflow writes on-ledger

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub content_id: String,
    pub file_name: String,
}

pub struct AppState {
    client: reqwest::Client,
    pinning_url: String,
    pinning_jwt: String,
}

fn error_body(message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": message }))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, Json<serde_json::Value>)> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, error_body(&e.to_string())))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .unwrap_or("upload.bin")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, error_body(&e.to_string())))?;
        file = Some((file_name, bytes.to_vec()));
    }

    let (file_name, bytes) = file.ok_or((
        StatusCode::BAD_REQUEST,
        error_body("No file uploaded"),
    ))?;
    if bytes.is_empty() {
        return Err((StatusCode::BAD_REQUEST, error_body("No file uploaded")));
    }

    // Pin via the provider, carrying the original filename as pin metadata
    let metadata = serde_json::json!({ "name": file_name.as_str() }).to_string();
    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.clone());
    let form = reqwest::multipart::Form::new()
        .part("file", part)
        .text("pinataMetadata", metadata);

    let response = state
        .client
        .post(&state.pinning_url)
        .bearer_auth(&state.pinning_jwt)
        .multipart(form)
        .send()
        .await
        .map_err(|e| {
            (
                StatusCode::BAD_GATEWAY,
                error_body(&format!("pinning provider unreachable: {e}")),
            )
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        return Err((
            StatusCode::BAD_GATEWAY,
            error_body(&format!("pinning provider returned {status}: {detail}")),
        ));
    }

    let body: serde_json::Value = response.json().await.map_err(|e| {
        (
            StatusCode::BAD_GATEWAY,
            error_body(&format!("malformed provider response: {e}")),
        )
    })?;

    let content_id = body["IpfsHash"]
        .as_str()
        .ok_or((
            StatusCode::BAD_GATEWAY,
            error_body("provider response missing IpfsHash"),
        ))?
        .to_string();

    Ok(Json(UploadResponse {
        content_id,
        file_name,
    }))
}

#[tokio::main]
async fn main() {
    let state = Arc::new(AppState {
        client: reqwest::Client::new(),
        pinning_url: std::env::var("PINNING_API_URL")
            .unwrap_or_else(|_| "https://api.pinata.cloud/pinning/pinFileToIPFS".to_string()),
        pinning_jwt: std::env::var("PINNING_JWT").unwrap_or_default(),
    });

    let app = Router::new()
        .route("/api/upload", post(upload))
        .route("/health", get(|| async { "OK" }))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .with_state(state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
    println!("📦 Upload Gateway starting on {bind_addr}");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
