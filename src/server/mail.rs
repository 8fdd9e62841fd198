use axum::{
    extract::{rejection::JsonRejection, FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::json;

use super::AppState;
use crate::core::mail::ContactMessage;

/// JSON-only contact route
pub async fn send_email(
    State(state): State<AppState>,
    payload: Result<Json<ContactMessage>, JsonRejection>,
) -> Response {
    deliver(&state, payload.ok().map(|Json(contact)| contact)).await
}

/// Contact route for browser forms: multipart, urlencoded or JSON
pub async fn send_email_form(State(state): State<AppState>, request: Request) -> Response {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let contact = if content_type.starts_with("multipart/form-data") {
        read_multipart(request).await
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        Form::<ContactMessage>::from_request(request, &())
            .await
            .ok()
            .map(|Form(contact)| contact)
    } else {
        Json::<ContactMessage>::from_request(request, &())
            .await
            .ok()
            .map(|Json(contact)| contact)
    };

    deliver(&state, contact).await
}

/// Text fields only; attachments such as `image` are skipped
async fn read_multipart(request: Request) -> Option<ContactMessage> {
    let mut multipart = match Multipart::from_request(request, &()).await {
        Ok(multipart) => multipart,
        Err(e) => {
            tracing::debug!("[Mail] Rejected multipart body: {}", e);
            return None;
        }
    };

    let mut contact = ContactMessage::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("[Mail] Malformed multipart field: {}", e);
                return None;
            }
        };

        let slot = match field.name() {
            Some("name") => &mut contact.name,
            Some("email") => &mut contact.email,
            Some("message") => &mut contact.message,
            other => {
                tracing::debug!("[Mail] Skipping form field {:?}", other);
                continue;
            }
        };
        *slot = field.text().await.ok()?;
    }

    Some(contact)
}

async fn deliver(state: &AppState, contact: Option<ContactMessage>) -> Response {
    let contact = match contact {
        Some(contact) if contact.is_complete() => contact,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "All fields are required!" })),
            )
                .into_response();
        }
    };

    match state.mail.send(&contact).await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "Email sent successfully!"
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("[Mail] Email sending error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to send email." })),
            )
                .into_response()
        }
    }
}
