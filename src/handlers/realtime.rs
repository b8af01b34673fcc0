use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use tracing::{info, instrument, warn};

use crate::auth::AuthenticatedUser;
use crate::realtime::FeedItem;
use crate::schemas::AppState;

/// Server-sent change feed of the signed-in user.
///
/// Each event is named after its topic (`transactions`, `recurring_expenses`,
/// `auth`) and carries a `ChangeEvent` as JSON. A `resync` event means events
/// were dropped and the client should re-fetch everything.
#[utoipa::path(
    get,
    path = "/api/v1/realtime",
    tag = "realtime",
    security(("bearer_auth" = [])),
    params(
        ("access_token" = Option<String>, Query, description = "Session token for clients that cannot send headers"),
    ),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream", body = crate::realtime::ChangeEvent),
        (status = 401, description = "Not signed in", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn subscribe_changes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("User {} subscribed to changes", user.user_id);
    let feed = state.changes.subscribe(user.user_id);

    let events = stream::unfold(feed, |mut feed| async move {
        let event = match feed.next().await? {
            FeedItem::Change(change) => Event::default()
                .event(change.topic.as_str())
                .json_data(&change)
                .unwrap_or_else(|e| {
                    warn!("Failed to encode change event: {}", e);
                    Event::default().event("resync").data("encoding")
                }),
            FeedItem::Resync(skipped) => Event::default().event("resync").data(skipped.to_string()),
        };
        Some((Ok::<_, Infallible>(event), feed))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
