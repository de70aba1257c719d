//! Push endpoint for the ingestion handler.
//!
//! Accepts finalize-event JSON over HTTP and returns a status the delivery
//! channel understands: 2xx acknowledges the event, 5xx asks for
//! redelivery. A failure the handler marks `Drop` is therefore answered
//! with 200 — redelivering it would not help — and only logged.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use plinth_ingest::{Disposition, IngestHandler, StorageEvent};

/// HTTP push server wrapping one `IngestHandler`.
pub struct PushServer {
    bind_addr: SocketAddr,
    handler: Arc<IngestHandler>,
}

impl PushServer {
    pub fn new(bind_addr: SocketAddr, handler: Arc<IngestHandler>) -> Self {
        Self { bind_addr, handler }
    }

    /// Serve until the shutdown signal flips. One tokio task per
    /// connection, HTTP/1.1, mirroring each event to one handler
    /// invocation.
    pub async fn serve(self, mut shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .context("failed to bind push endpoint")?;

        info!(addr = %self.bind_addr, "push endpoint listening");

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, peer_addr) = accept_result.context("accept failed")?;
                    let handler = self.handler.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let svc = service_fn(move |req: Request<Incoming>| {
                            let handler = handler.clone();
                            async move {
                                Ok::<_, hyper::Error>(route(req, handler.as_ref()).await)
                            }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                            error!(%peer_addr, error = %e, "connection error");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    info!("push endpoint shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn route(req: Request<Incoming>, handler: &IngestHandler) -> Response<Full<Bytes>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/healthz") => text(StatusCode::OK, "ok"),
        (&Method::POST, "/") => deliver(req, handler).await,
        _ => text(StatusCode::NOT_FOUND, "not found"),
    }
}

async fn deliver(req: Request<Incoming>, handler: &IngestHandler) -> Response<Full<Bytes>> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read event body");
            return text(StatusCode::BAD_REQUEST, "unreadable body");
        }
    };

    let event: StorageEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "event body is not valid JSON");
            return text(StatusCode::BAD_REQUEST, "malformed event");
        }
    };

    match handler.handle(&event).await {
        Ok(record) => text(StatusCode::OK, &format!("ok: recorded id {}", record.id)),
        Err(failure) => match failure.disposition {
            // Non-2xx asks the channel to redeliver.
            Disposition::Retry => text(StatusCode::INTERNAL_SERVER_ERROR, &failure.to_string()),
            // Acknowledge so the channel stops redelivering a lost cause.
            Disposition::Drop => {
                warn!(error = %failure, "dropping event; redelivery would not help");
                text(StatusCode::OK, &format!("dropped: {failure}"))
            }
        },
    }
}

fn text(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::from(body.to_string())));
    *resp.status_mut() = status;
    resp
}
