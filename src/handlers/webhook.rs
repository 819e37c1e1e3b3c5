use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::db::queries;
use crate::models::{TgUser, Update};
use crate::services::conversation;
use crate::state::AppState;

pub async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Response {
    // Validate the webhook secret token (skip if unset — dev mode)
    if !state.config.webhook_secret.is_empty() {
        let token = headers
            .get("x-telegram-bot-api-secret-token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if token != state.config.webhook_secret {
            tracing::warn!("invalid webhook secret token");
            return (StatusCode::FORBIDDEN, "Invalid secret token").into_response();
        }
    }

    tracing::debug!(update_id = update.update_id, "incoming update");

    if let Some(msg) = &update.message {
        if let Some(from) = &msg.from {
            upsert_user(&state, from);
            if let Err(e) = conversation::handle_message(&state, msg).await {
                tracing::error!(user_id = from.id, error = %e, "message processing failed");
            }
        }
    } else if let Some(query) = &update.callback_query {
        upsert_user(&state, &query.from);
        if let Err(e) = conversation::handle_callback(&state, query).await {
            tracing::error!(user_id = query.from.id, error = %e, "callback processing failed");
        }
    }

    // Always 200, otherwise Telegram redelivers the update.
    StatusCode::OK.into_response()
}

fn upsert_user(state: &Arc<AppState>, from: &TgUser) {
    let db = state.db.lock().unwrap();
    if let Err(e) = queries::upsert_user(
        &db,
        from.id,
        from.username.as_deref(),
        from.first_name.as_deref(),
        from.last_name.as_deref(),
    ) {
        tracing::error!(user_id = from.id, error = %e, "failed to upsert user");
    }
}
