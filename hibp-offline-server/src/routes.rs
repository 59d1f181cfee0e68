//! HTTP routes approximating the hosted Pwned Passwords V2 API.
//!
//! Three routes are served:
//!
//! - `/pwnedpassword/{password}`
//! - `/pwnedpassword/{hash}`
//! - `/range/{prefix}`
//!
//! Their behavior is very similar to that of the online equivalent; the
//! same documentation should apply.

use std::io;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use hibp_offline::OfflineDatabase;
use sha1::{Digest, Sha1};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::conversion::{self, PREFIX_LEN};

/// Target size of one streamed body chunk for a range response.
const STREAM_CHUNK_SIZE: usize = 8 << 10;

/// In-flight chunks allowed between the scanning task and the response
/// body before the scan is backpressured.
const STREAM_CHANNEL_DEPTH: usize = 16;

#[derive(Clone)]
pub struct AppState {
    db: OfflineDatabase,
}

/// Builds the API router. Unknown paths fall through to a plain 404.
pub fn router(db: OfflineDatabase) -> Router {
    Router::new()
        .route("/pwnedpassword/*value", get(pwned_password))
        .route("/range/:prefix", get(range))
        .with_state(AppState { db })
}

/// `GET /pwnedpassword/{value}` — the value is taken as a hash when it is
/// 40 hex characters and hashed as a raw password otherwise. The body is
/// the decimal frequency, `0` for a hash that was never breached.
async fn pwned_password(State(state): State<AppState>, Path(value): Path<String>) -> Response {
    let hash = match conversion::decode_hash(value.as_bytes()) {
        Some(hash) => hash,
        None => Sha1::digest(value.as_bytes()).into(),
    };

    debug!(hash = %conversion::hex_string(&hash), "checking password");
    match state.db.pwned(&hash) {
        Ok(frequency) => format!("{frequency}\n").into_response(),
        Err(error) => {
            warn!(%error, "error checking password");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /range/{prefix}` — all suffixes whose hashes begin with the given
/// 5-hex-character prefix, one `HEX35:count` line per record, CRLF
/// delimited, streamed as the underlying scan produces them.
async fn range(State(state): State<AppState>, Path(prefix): Path<String>) -> Response {
    let Some((start, end)) = conversion::range_bounds(prefix.as_bytes()) else {
        return (StatusCode::BAD_REQUEST, "The hash prefix was not in a valid format")
            .into_response();
    };

    let (tx, mut rx) = mpsc::channel::<io::Result<Vec<u8>>>(STREAM_CHANNEL_DEPTH);
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || stream_range(&db, start, end, tx));

    // Wait for the first chunk so an immediate read failure still surfaces
    // as a 500 rather than a broken 200 stream.
    match rx.recv().await {
        None => text_plain(Body::empty()),
        Some(Err(error)) => {
            warn!(%error, "error scanning range");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Some(Ok(first)) => {
            let rest = ReceiverStream::new(rx);
            let stream = tokio_stream::once(Ok::<_, io::Error>(first)).chain(rest);
            text_plain(Body::from_stream(stream))
        }
    }
}

fn text_plain(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// Runs the scan on a blocking thread, batching response lines into
/// chunks. The record hash arrives hex-encoded in full; the line carries
/// everything after the five prefix characters the client already knows.
fn stream_range(
    db: &OfflineDatabase,
    start: [u8; 3],
    end: [u8; 3],
    tx: mpsc::Sender<io::Result<Vec<u8>>>,
) {
    let mut hexhash = [0u8; 40];
    let mut chunk: Vec<u8> = Vec::with_capacity(STREAM_CHUNK_SIZE + 64);

    let result = db.scan(start, end, |hash, frequency| {
        conversion::encode_upper_hex(hash, &mut hexhash);
        chunk.extend_from_slice(&hexhash[PREFIX_LEN..]);
        chunk.push(b':');
        chunk.extend_from_slice(frequency.to_string().as_bytes());
        chunk.extend_from_slice(b"\r\n");

        if chunk.len() >= STREAM_CHUNK_SIZE {
            // A closed receiver means the client went away; stop the scan.
            return tx.blocking_send(Ok(std::mem::take(&mut chunk))).is_err();
        }
        false
    });

    match result {
        Ok(()) => {
            if !chunk.is_empty() {
                let _ = tx.blocking_send(Ok(chunk));
            }
        }
        Err(error) => {
            warn!(%error, "error scanning range");
            let _ = tx.blocking_send(Err(io::Error::other(error)));
        }
    }
}
