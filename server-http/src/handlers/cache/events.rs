use crate::state::AppState;
use axum::{
    extract::State,
    http::Uri,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tagcache::CacheEvent;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    tags: Vec<String>,
    event_type: Vec<String>,
}

impl EventFilter {
    /// Parses `?tag=productsCache,usersCache&type=invalidated,stored`
    fn from_query_string(query: &str) -> Self {
        let mut filter = Self::default();

        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                let values = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                match key {
                    "tag" => filter.tags.extend(values),
                    "type" => filter.event_type.extend(values),
                    _ => {}
                }
            }
        }

        filter
    }

    fn matches(&self, event: &CacheEvent) -> bool {
        if !self.tags.is_empty() && !self.tags.iter().any(|t| event.touches_tag(t)) {
            return false;
        }
        self.event_type.is_empty() || self.event_type.iter().any(|t| t == event.kind())
    }
}

/// GET /events
pub async fn stream_events(
    State(state): State<AppState>,
    uri: Uri,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let filter = uri
        .query()
        .map(EventFilter::from_query_string)
        .unwrap_or_default();

    tracing::info!(
        "New SSE client connected. Filters: tag={:?}, type={:?}",
        filter.tags,
        filter.event_type
    );

    let stream = BroadcastStream::new(state.event_channel.subscribe());

    let filtered_stream = stream.filter_map(move |result| {
        let filter = filter.clone();
        async move {
            match result {
                Ok(event) if filter.matches(&event) => to_sse_event(&event).map(Ok),
                Ok(_) => None,
                Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
                    Some(Ok(Event::default()
                        .event("error")
                        .data(format!("Lagged by {} events", n))))
                }
            }
        }
    });

    Sse::new(filtered_stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_sse_event(event: &CacheEvent) -> Option<Event> {
    match Event::default()
        .event(format!("cache.{}", event.kind()))
        .json_data(event)
    {
        Ok(sse) => Some(sse),
        Err(err) => {
            tracing::warn!("Dropping unserializable cache event: {}", err);
            None
        }
    }
}
