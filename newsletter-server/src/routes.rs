//! HTTP route handlers for the subscription API.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use chrono::Utc;
use folio::core::email::{is_valid_email, same_address};
use folio::io::newsletter::format_date;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::notify::{Notifier, SubscriberNotice};
use crate::state::AppState;
use crate::subscribers::{entry_email, load_subscribers, save_subscribers};

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/subscribe", post(subscribe))
        .route("/subscribers", get(list_subscribers))
}

async fn health() -> &'static str {
    "ok"
}

/// POST /subscribe - record `{email}`.
///
/// 201 for a new address, 200 with "already subscribed" for a known one
/// (case-insensitive), 400 for a missing or malformed address. An unreadable
/// storage file is left untouched and answered with 500.
pub async fn subscribe(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let Some(email) = requested_email(&body) else {
        debug!("rejecting invalid email");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid email" })),
        );
    };

    let guard = state.write_lock.lock().await;
    let mut list = match load_subscribers(&state.storage_path).await {
        Ok(list) => list,
        Err(err) => {
            warn!(error = ?err, "subscriber file unreadable, refusing to overwrite");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "could not read subscriber list" })),
            );
        }
    };
    let known = list
        .iter()
        .filter_map(entry_email)
        .any(|stored| same_address(stored, &email));
    if known {
        debug!(email = %email, "already subscribed");
        return (
            StatusCode::OK,
            Json(json!({ "ok": true, "message": "already subscribed" })),
        );
    }

    list.push(json!({ "email": email, "date": format_date(Utc::now()) }));
    let total = list.len();
    if let Err(err) = save_subscribers(&state.storage_path, list).await {
        warn!(error = ?err, "failed to store subscriber");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "could not store subscriber" })),
        );
    }
    drop(guard);
    info!(email = %email, total, "new subscriber");

    if let Some(notifier) = &state.notifier {
        notify_owner(Arc::clone(notifier), SubscriberNotice { email, total }).await;
    }
    (StatusCode::CREATED, Json(json!({ "ok": true })))
}

/// GET /subscribers - stored list verbatim, in insertion order.
pub async fn list_subscribers(State(state): State<AppState>) -> Json<Vec<Value>> {
    match load_subscribers(&state.storage_path).await {
        Ok(list) => Json(list),
        Err(err) => {
            warn!(error = ?err, "subscriber file unreadable, listing as empty");
            Json(Vec::new())
        }
    }
}

/// The `email` string from a JSON body, if present and well-formed.
fn requested_email(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let email = value.get("email")?.as_str()?;
    is_valid_email(email).then(|| email.to_string())
}

async fn notify_owner(notifier: Arc<dyn Notifier>, notice: SubscriberNotice) {
    let result = tokio::task::spawn_blocking(move || notifier.notify(&notice)).await;
    match result {
        Ok(Ok(())) => debug!("owner notified"),
        Ok(Err(err)) => warn!(error = ?err, "failed to send notification email"),
        Err(err) => warn!(error = %err, "notification task failed"),
    }
}
