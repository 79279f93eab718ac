//! Device position stream over WebSocket, with auto-reconnect.
//!
//! Each watch runs as a tokio task that:
//! 1. Connects to the feed endpoint (TLS when `wss://`).
//! 2. Sends a watch request carrying the [`WatchOptions`].
//! 3. Parses every text frame with [`parse_frame`] and forwards the result
//!    to the sample or error callback.
//! 4. Reports an acquisition error whenever `timeout` passes without a reading.
//! 5. Reconnects on disconnection with exponential backoff.
//!
//! Connection failures are acquisition errors: reported, never fatal.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use ahash::AHashMap;
use convoy_core::error::TrackError;
use convoy_core::time_util::now_ms;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tracing::{debug, info, warn};

use super::parse_frame;
use crate::source::{ErrorCallback, HostPositionApi, SampleCallback, WatchHandle, WatchOptions, lock};

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Everything one watch task needs.
#[derive(Debug, Clone)]
struct FeedParams {
    url: String,
    extra_headers: HashMap<String, String>,
    label: String,
    options: WatchOptions,
}

/// How a connection ended.
enum Flow {
    Shutdown,
    Lost,
}

/// WebSocket-backed [`HostPositionApi`].
pub struct WsPositionFeed {
    url: String,
    extra_headers: HashMap<String, String>,
    label: String,
    /// Shutdown senders of running watch tasks.
    watches: Mutex<AHashMap<WatchHandle, watch::Sender<bool>>>,
}

impl WsPositionFeed {
    pub fn new(url: String, extra_headers: HashMap<String, String>, label: String) -> Self {
        Self {
            url,
            extra_headers,
            label,
            watches: Mutex::new(AHashMap::new()),
        }
    }
}

impl HostPositionApi for WsPositionFeed {
    fn watch(
        &self,
        on_sample: SampleCallback,
        on_error: ErrorCallback,
        options: WatchOptions,
    ) -> Result<WatchHandle, TrackError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TrackError::Acquisition(format!("no async runtime for position feed: {e}")))?;

        let handle = WatchHandle::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let params = FeedParams {
            url: self.url.clone(),
            extra_headers: self.extra_headers.clone(),
            label: format!("{}/{handle}", self.label),
            options,
        };
        runtime.spawn(feed_loop(params, on_sample, on_error, shutdown_rx));
        lock(&self.watches).insert(handle, shutdown_tx);
        Ok(handle)
    }

    fn clear_watch(&self, handle: WatchHandle) {
        if let Some(tx) = lock(&self.watches).remove(&handle) {
            let _ = tx.send(true);
        }
    }
}

/// Watch request sent right after connecting.
fn watch_request(options: &WatchOptions) -> String {
    serde_json::json!({
        "op": "watch",
        "enableHighAccuracy": options.high_accuracy,
        "timeout": options.timeout.as_millis() as u64,
        "maximumAge": options.max_age.as_millis() as u64,
    })
    .to_string()
}

/// Main watch loop: connect, stream, reconnect until shut down.
async fn feed_loop(
    params: FeedParams,
    on_sample: SampleCallback,
    on_error: ErrorCallback,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let label = params.label.clone();
    let mut backoff = INITIAL_BACKOFF;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        info!("[{label}] connecting to {}", params.url);
        match connect_ws(&params).await {
            Ok(stream) => {
                backoff = INITIAL_BACKOFF;
                info!("[{label}] connected");
                if let Flow::Shutdown = stream_positions(stream, &params, &on_sample, &on_error, &mut shutdown_rx).await
                {
                    break;
                }
                on_error(TrackError::Acquisition("position stream lost".to_string()));
            }
            Err(e) => {
                on_error(TrackError::Acquisition(format!("connect to {} failed: {e}", params.url)));
            }
        }

        warn!("[{label}] reconnecting in {backoff:?}");
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {},
            _ = shutdown_rx.changed() => break,
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }

    info!("[{label}] watch stopped");
}

/// Read frames from one connection until it drops or shutdown is requested.
async fn stream_positions(
    stream: WsStream,
    params: &FeedParams,
    on_sample: &SampleCallback,
    on_error: &ErrorCallback,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Flow {
    let label = &params.label;
    let (mut ws_write, mut ws_read) = stream.split();

    let request = watch_request(&params.options);
    debug!("[{label}] watch request: {request}");
    if let Err(e) = ws_write.send(Message::Text(request.into())).await {
        warn!("[{label}] watch request failed: {e}");
        return Flow::Lost;
    }

    let timeout = params.options.timeout;
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                let _ = ws_write.close().await;
                return Flow::Shutdown;
            }

            _ = &mut deadline => {
                on_error(TrackError::Acquisition(format!("no position within {timeout:?}")));
                deadline.as_mut().reset(Instant::now() + timeout);
            }

            msg = ws_read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match parse_frame(&text, now_ms()) {
                        Ok(sample) => {
                            deadline.as_mut().reset(Instant::now() + timeout);
                            on_sample(sample);
                        }
                        Err(e) => on_error(e),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        warn!("[{label}] received close frame");
                        return Flow::Lost;
                    }
                    Some(Err(e)) => {
                        warn!("[{label}] read error: {e}");
                        return Flow::Lost;
                    }
                    None => {
                        warn!("[{label}] stream ended");
                        return Flow::Lost;
                    }
                    _ => {} // Binary, Pong, Frame: ignore
                }
            }
        }
    }
}

/// Open the WebSocket with any configured extra headers.
async fn connect_ws(params: &FeedParams) -> anyhow::Result<WsStream> {
    let mut request = params.url.as_str().into_client_request()?;
    for (key, value) in &params.extra_headers {
        request
            .headers_mut()
            .insert(HeaderName::from_bytes(key.as_bytes())?, HeaderValue::from_str(value)?);
    }

    let (stream, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(stream)
}
