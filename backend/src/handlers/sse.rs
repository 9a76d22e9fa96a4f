//! Server-Sent Events stream of admin notifications
//!
//! GET /api/v1/sse/notifications?token=<JWT>
//! The token travels in the query string because `EventSource` cannot send
//! custom headers.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::ApiQuery;
use crate::middleware::{authorize_admin, decode_token};
use crate::services::Subscription;
use crate::AppState;

#[derive(Deserialize)]
pub struct StreamAuthQuery {
    token: Option<String>,
}

/// Open a notification stream for the authenticated admin
pub async fn notification_stream(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StreamAuthQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let token = query.token.ok_or_else(|| AppError::Unauthorized {
        message: "Missing token".to_string(),
        message_fr: "Jeton manquant".to_string(),
    })?;
    let claims = decode_token(&token, &state.config.jwt.secret).map_err(|e| {
        tracing::debug!("SSE token rejected: {}", e);
        e
    })?;
    let user = authorize_admin(&claims)?;

    let subscription = state.notifier.hub().register(user.user_id);
    let keep_alive = Duration::from_secs(state.config.notifications.keep_alive_secs);

    Ok(Sse::new(event_stream(subscription)).keep_alive(
        KeepAlive::new()
            .interval(keep_alive)
            .text("ping"),
    ))
}

/// Frames for every event queued on `subscription`.
///
/// Dropping the stream drops the subscription, which unregisters it.
fn event_stream(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(subscription, |mut subscription| async move {
        loop {
            let event = subscription.next_event().await?;
            match serde_json::to_string(&event) {
                Ok(json) => return Some((Ok(Event::default().data(json)), subscription)),
                Err(e) => {
                    tracing::warn!(event = event.kind(), error = %e, "Skipping unencodable event")
                }
            }
        }
    })
}
