// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion endpoints for STEP uploads.

use crate::error::ApiError;
use crate::services::run_conversion;
use crate::types::ConvertResponse;
use crate::AppState;
use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use curiosity_processing::{
    MeshFormat, PrinterConfig, RequestContext, UploadedFile, DEFAULT_NOZZLE_MM,
};

/// Extract the upload and printer settings from a multipart request.
///
/// Fields: `file` (required), `export_format`, `nozzle_mm`.
async fn extract_form(multipart: &mut Multipart) -> Result<RequestContext, ApiError> {
    let mut upload = None;
    let mut export_format = MeshFormat::default();
    let mut nozzle_mm = DEFAULT_NOZZLE_MM;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        tracing::debug!(field_name = %field_name, "Processing multipart field");

        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                tracing::debug!(file_name = %file_name, size = bytes.len(), "Extracted file from multipart");
                upload = Some(UploadedFile::new(file_name, bytes.to_vec()));
            }
            "export_format" => {
                let value = field.text().await?;
                export_format =
                    value
                        .trim()
                        .parse()
                        .map_err(|e: curiosity_formats::Error| ApiError::InvalidField {
                            field: "export_format",
                            message: e.to_string(),
                        })?;
            }
            "nozzle_mm" => {
                let value = field.text().await?;
                nozzle_mm = value.trim().parse().map_err(|_| ApiError::InvalidField {
                    field: "nozzle_mm",
                    message: format!("'{}' is not a number", value.trim()),
                })?;
            }
            _ => tracing::debug!(field_name = %field_name, "Ignoring multipart field"),
        }
    }

    let Some(upload) = upload else {
        tracing::warn!("No 'file' field found in multipart request");
        return Err(ApiError::MissingFile);
    };
    if !upload.is_step() {
        return Err(ApiError::UnsupportedFileType(upload.display_name().to_string()));
    }

    let printer = PrinterConfig::new(nozzle_mm, export_format)?;
    Ok(RequestContext::new(upload, printer))
}

/// POST /api/v1/convert - Convert and return analysis, preview and artifact.
pub async fn convert(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ConvertResponse>, ApiError> {
    let ctx = extract_form(&mut multipart).await?;
    let file_name = ctx.upload.display_name().to_string();

    tracing::info!(
        file_name = %file_name,
        size = ctx.upload.bytes.len(),
        format = ctx.printer.export_format.tag(),
        "Converting upload"
    );

    let (states, conversion) = run_conversion(state.pipeline.clone(), ctx).await?;
    Ok(Json(ConvertResponse::new(file_name, states, &conversion)))
}

/// POST /api/v1/convert/download - Convert and return the artifact file.
pub async fn download(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let ctx = extract_form(&mut multipart).await?;
    let (_, conversion) = run_conversion(state.pipeline.clone(), ctx).await?;
    let artifact = conversion.artifact;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", header_safe(&artifact.file_name)),
        )
        .header(header::CONTENT_LENGTH, artifact.bytes.len())
        .body(Body::from(artifact.bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Printable ASCII without quotes, for use inside a quoted header parameter
fn header_safe(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
