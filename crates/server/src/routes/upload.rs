//! Menu image upload.

use axum::Json;
use axum::extract::{Multipart, State};
use serde_json::{Value, json};

use crate::error::AppError;
use crate::middleware::OrgAdmin;
use crate::state::AppState;

/// `POST /api/{org}/admin/upload` — multipart image upload. The content
/// type is validated against the accepted image formats; the stored file
/// is keyed under the organization and returned as a public URL.
pub async fn upload_image(
    State(state): State<AppState>,
    OrgAdmin(session): OrgAdmin,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .ok_or_else(|| AppError::Validation("file content type is required".to_owned()))?
            .to_owned();

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;

        if data.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".to_owned()));
        }

        let public_url = state
            .images()
            .put(session.organization_id, &content_type, &data)
            .await?;

        return Ok(Json(json!({ "publicUrl": public_url })));
    }

    Err(AppError::Validation("no file provided".to_owned()))
}
