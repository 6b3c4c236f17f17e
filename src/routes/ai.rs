use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::assistant::AssistantClient;
use crate::auth::Claims;
use crate::error::{AppError, ValidationError};

const MAX_TEXT_CHARS: usize = 100_000;

#[derive(Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

/// POST /v1/ai/summarize
///
/// # Errors
/// - 400: Empty or oversized text
/// - 502: The assistant failed, timed out or returned nothing
pub async fn summarize(
    claims: web::ReqData<Claims>,
    form: web::Json<SummarizeRequest>,
    assistant: web::Data<AssistantClient>,
) -> Result<HttpResponse, AppError> {
    let text = form.text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyField("text".to_string()).into());
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ValidationError::TooLong("text".to_string(), MAX_TEXT_CHARS).into());
    }

    tracing::info!(user_id = ?claims.id, "Summarization requested");
    let summary = assistant.summarize_text(text).await?;

    Ok(HttpResponse::Ok().json(SummarizeResponse { summary }))
}
