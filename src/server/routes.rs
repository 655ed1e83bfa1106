//! HTTP routes
//!
//! | Path          | Response                                      |
//! |---------------|-----------------------------------------------|
//! | `/`           | 301 to `/index.html`                          |
//! | `/index.html` | bootstrap page with the key and IV embedded   |
//! | `/stream`     | endless `text/event-stream` of frame events   |
//! | anything else | 404                                           |

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use tokio::sync::Semaphore;

use crate::slot::FrameSlot;
use crate::stats::StreamStats;
use crate::stream::{Broadcaster, ClientSession};

/// State shared by all request handlers
#[derive(Clone)]
pub(crate) struct AppState {
    pub slot: Arc<FrameSlot>,
    pub stats: Arc<StreamStats>,
    /// Rendered bootstrap page
    pub page: Bytes,
    pub next_client_id: Arc<AtomicU64>,
    /// Present when the number of stream clients is limited
    pub connection_semaphore: Option<Arc<Semaphore>>,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(redirect_index))
        .route("/index.html", get(index))
        .route("/stream", get(stream))
        .fallback(not_found)
        .with_state(state)
}

async fn redirect_index() -> Response {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, "/index.html")],
    )
        .into_response()
}

async fn index(State(state): State<AppState>) -> Html<Bytes> {
    Html(state.page.clone())
}

async fn stream(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let peer_addr = connect_info.map(|ConnectInfo(addr)| addr);

    // Check connection limit
    let permit = match state.connection_semaphore {
        Some(ref sem) => match Arc::clone(sem).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = ?peer_addr, "Connection rejected: limit reached");
                return (StatusCode::SERVICE_UNAVAILABLE, "too many stream clients")
                    .into_response();
            }
        },
        None => None,
    };

    let client_id = state.next_client_id.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(client_id = client_id, peer = ?peer_addr, "New stream client");

    let session = ClientSession::new(client_id, peer_addr);
    let subscriber = state.slot.subscribe();
    let mut broadcaster = Broadcaster::new(session, subscriber, Arc::clone(&state.stats));
    if let Some(permit) = permit {
        broadcaster = broadcaster.with_permit(permit);
    }

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(broadcaster.into_stream()),
    )
        .into_response()
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
