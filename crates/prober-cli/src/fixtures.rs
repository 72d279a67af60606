//! Demo fixture servers
//!
//! An HTTP server with known-good and known-bad endpoints plus a POST
//! endpoint that answers with whatever status and body the request asks
//! for, and a TCP listener that acknowledges every connection. Both run
//! until the shutdown future completes.

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use prober_core::engine::ContentKind;
use serde::Deserialize;
use std::future::Future;
use std::io;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Reply written to every TCP connection
pub const TCP_ACK: &[u8] = b"Message received.";

const TCP_READ_LIMIT: usize = 1024;

/// Create the fixture router
pub fn create_router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/success", get(success))
        .route("/fail", get(fail))
        .route("/post-demo", post(post_demo))
}

async fn root() -> StatusCode {
    tracing::debug!(path = "/", "Fixture request");
    StatusCode::OK
}

async fn success() -> StatusCode {
    tracing::debug!(path = "/success", "Fixture request");
    StatusCode::OK
}

async fn fail() -> StatusCode {
    tracing::debug!(path = "/fail", "Fixture request");
    StatusCode::FORBIDDEN
}

/// Status and body requested by a `/post-demo` caller
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Expectation {
    expected_code: String,
    #[serde(default)]
    expected_response: String,
}

async fn post_demo(headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let kind = ContentKind::from_content_type(&content_type);
    tracing::debug!(path = "/post-demo", ?kind, "Fixture request");

    let reply = match kind {
        ContentKind::Json => expectation_from_json(&body),
        ContentKind::UrlEncodedForm => expectation_from_form(&body),
        ContentKind::Raw => Ok((StatusCode::OK, body.to_vec())),
    };

    match reply {
        Ok((code, body)) => {
            let mut response = (code, body).into_response();
            if let Ok(value) = HeaderValue::from_str(&content_type) {
                if !content_type.is_empty() {
                    response.headers_mut().insert(CONTENT_TYPE, value);
                }
            }
            response
        }
        Err(reason) => {
            tracing::debug!(%reason, "Rejected post-demo request");
            (StatusCode::BAD_REQUEST, reason).into_response()
        }
    }
}

fn expectation_from_json(body: &[u8]) -> Result<(StatusCode, Vec<u8>), String> {
    let expectation: Expectation =
        serde_json::from_slice(body).map_err(|e| format!("invalid JSON body: {}", e))?;
    let code = parse_status(&expectation.expected_code)?;
    Ok((code, expectation.expected_response.into_bytes()))
}

/// First value of each key wins; a missing code means 200
fn expectation_from_form(body: &[u8]) -> Result<(StatusCode, Vec<u8>), String> {
    let mut code = None;
    let mut response = None;
    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "expectedCode" if code.is_none() => code = Some(parse_status(&value)?),
            "expectedResponse" if response.is_none() => response = Some(value.into_owned()),
            _ => {}
        }
    }

    Ok((
        code.unwrap_or(StatusCode::OK),
        response.unwrap_or_default().into_bytes(),
    ))
}

fn parse_status(code: &str) -> Result<StatusCode, String> {
    code.trim()
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| format!("invalid expectedCode {:?}", code))
}

/// Serve the fixture router on `listener` until `shutdown` completes
pub async fn serve_http<F>(listener: TcpListener, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(address = %listener.local_addr()?, "HTTP fixture started");
    axum::serve(listener, create_router())
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("HTTP fixture stopped");
    Ok(())
}

/// Acknowledge TCP connections on `listener` until `shutdown` completes.
///
/// Connections in flight when the shutdown arrives are finished first.
pub async fn serve_tcp<F>(listener: TcpListener, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send,
{
    tracing::info!(address = %listener.local_addr()?, "TCP fixture started");
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                tracing::debug!(%peer, "TCP fixture connection");
                connections.spawn(acknowledge(stream));
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    while connections.join_next().await.is_some() {}
    tracing::info!("TCP fixture stopped");
    Ok(())
}

async fn acknowledge(mut stream: TcpStream) {
    let mut buf = [0u8; TCP_READ_LIMIT];
    if let Err(e) = stream.read(&mut buf).await {
        tracing::debug!(error = %e, "Error reading from TCP fixture connection");
    }
    if let Err(e) = stream.write_all(TCP_ACK).await {
        tracing::debug!(error = %e, "Error writing TCP fixture acknowledgement");
    }
    if let Err(e) = stream.shutdown().await {
        tracing::debug!(error = %e, "Error closing TCP fixture connection");
    }
}

/// Run both fixtures until `shutdown` completes
pub async fn run_client<F>(http: TcpListener, tcp: TcpListener, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, stop_rx) = watch::channel(());
    tokio::spawn(async move {
        shutdown.await;
        tracing::info!("Stop signal received, stopping fixtures");
        let _ = stop_tx.send(());
    });

    tokio::try_join!(
        serve_http(http, stopped(stop_rx.clone())),
        serve_tcp(tcp, stopped(stop_rx)),
    )?;
    Ok(())
}

async fn stopped(mut stop: watch::Receiver<()>) {
    // Err means the sender is gone, which also means stop.
    let _ = stop.changed().await;
}
