//! OTA update endpoint
//!
//! `GET <route>` as issued by `ESP8266httpUpdate`. Answers with the new
//! firmware (200), 304 when the device is current, 403 for foreign clients
//! and 500 when version, catalog or binary cannot be resolved. Every
//! outcome is written to the request log.

use std::fmt::Write as _;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use espota_core::request::header as esp_header;
use espota_core::{decide, FirmwareImage, UpdateDecision, UpdateError, UpdateRequest};

use crate::error::ApiError;
use crate::state::AppState;

/// Integrity header checked by the updater before flashing
pub const X_MD5: &str = "x-md5";

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

/// GET <route>
/// Serve a firmware update to an ESP8266 device
pub async fn serve_update(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let (mut parts, _body) = request.into_parts();
    let client = client_address(&mut parts, &state).await;
    let update_request = update_request_from_headers(&parts.headers);

    let decision = match decide(&update_request, state.config()).await {
        Ok(decision) => decision,
        Err(err) => return Err(reject(&state, &client, err).await),
    };
    let message = decision.log_message();

    match decision {
        UpdateDecision::UpToDate { device, .. } => {
            state.request_log().append(&client, &message).await;
            tracing::info!(
                client = %client,
                hardware_revision = %device.hardware_revision,
                software_version = %device.software_version,
                "Firmware up to date"
            );
            Ok(StatusCode::NOT_MODIFIED.into_response())
        }
        UpdateDecision::Available(target) => {
            state
                .request_log()
                .append(&client, &request_dump(&message, &parts))
                .await;

            let image = match FirmwareImage::load(&target.path, state.digest_cache()).await {
                Ok(image) => image,
                Err(e) => {
                    // Removed by the publisher after the existence check
                    tracing::warn!(path = %target.path.display(), error = %e, "Failed to read firmware");
                    let err = UpdateError::BinaryMissing {
                        path: target.path,
                        hardware_revision: target.device.hardware_revision,
                        software_version: target.device.software_version,
                        catalog_version: target.catalog_version,
                    };
                    return Err(reject(&state, &client, err).await);
                }
            };

            tracing::info!(
                client = %client,
                hardware_revision = %target.device.hardware_revision,
                from = %target.device.software_version,
                to = %target.catalog_version,
                file = %image.file_name,
                size = image.bytes.len(),
                mode = update_request.mode.as_deref().unwrap_or("-"),
                "Sending firmware"
            );

            firmware_response(image)
        }
    }
}

/// Build the domain request from raw headers
///
/// User-Agent and version must be UTF-8 to be usable; the device headers
/// only need to be present, so their values are taken lossily.
pub fn update_request_from_headers(headers: &HeaderMap) -> UpdateRequest {
    UpdateRequest::from_lookup(|name| {
        let value = headers.get(name)?;
        match name {
            esp_header::USER_AGENT | esp_header::VERSION => std::str::from_utf8(value.as_bytes())
                .ok()
                .map(str::to_string),
            _ => Some(String::from_utf8_lossy(value.as_bytes()).into_owned()),
        }
    })
}

/// Address recorded in the request log
async fn client_address(parts: &mut Parts, state: &AppState) -> String {
    if state.config().update.trust_forwarded_for {
        if let Some(addr) = forwarded_for(&parts.headers) {
            return addr;
        }
    }

    match ConnectInfo::<SocketAddr>::from_request_parts(parts, state).await {
        Ok(ConnectInfo(addr)) => addr.ip().to_string(),
        Err(_) => UNKNOWN_CLIENT.to_string(),
    }
}

/// First hop of `X-Forwarded-For`
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
}

/// Log a rejection and turn it into the response error
async fn reject(state: &AppState, client: &str, err: UpdateError) -> ApiError {
    state.request_log().append(client, &err.to_string()).await;
    tracing::info!(
        client = %client,
        status = err.status_code(),
        reason = %err,
        "Update request rejected"
    );
    ApiError::from(err)
}

/// Summary line followed by the request line and every header
fn request_dump(summary: &str, parts: &Parts) -> String {
    let mut dump = String::from(summary);
    let _ = write!(dump, "\n{} {}", parts.method, parts.uri);
    for (name, value) in &parts.headers {
        let _ = write!(dump, "\n{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    dump
}

fn firmware_response(image: FirmwareImage) -> Result<Response, ApiError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename={}", image.file_name))
        .map_err(|_| {
            ApiError::Internal(format!(
                "Firmware file name not usable in a header: {:?}",
                image.file_name
            ))
        })?;
    let md5 = HeaderValue::from_str(&image.md5)
        .map_err(|_| ApiError::Internal(format!("Invalid digest: {:?}", image.md5)))?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(image.bytes.len())),
            (HeaderName::from_static(X_MD5), md5),
        ],
        Body::from(image.bytes),
    )
        .into_response())
}
