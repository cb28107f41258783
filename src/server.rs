//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Stops calling `listener.accept()`; no new connections are taken.
//! 2. Tells every open connection to shut down gracefully. Idle keep-alive
//!    connections close at once; a connection with a request in progress
//!    finishes that response and then closes (HTTP/2 gets a `GOAWAY`).
//! 3. Waits up to the drain timeout for those connections to finish.
//! 4. Aborts whatever is still open and returns from [`Server::serve`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::response::Response;
use crate::router::Router;

/// How long in-flight connections get after a shutdown signal by default.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest request body read by default; bigger bodies get a `413`.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// The HTTP server.
#[derive(Debug, Clone)]
pub struct Server {
    host: String,
    port: u16,
    drain_timeout: Duration,
    max_body_bytes: usize,
}

impl Server {
    /// Configures the server to listen on `host:port` when
    /// [`serve`](Server::serve) is called. `host` may be an IP literal or a
    /// resolvable name.
    ///
    /// ```rust
    /// use roster::Server;
    /// let server = Server::bind("127.0.0.1", 8000);
    /// ```
    pub fn bind(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::bind(config.bind_host(), config.port)
            .drain_timeout(config.shutdown_timeout())
            .max_body_bytes(config.max_body_bytes)
    }

    /// Upper bound on how long shutdown waits for in-flight connections.
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Upper bound on the size of a request body.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Serves `router` until SIGTERM or Ctrl-C, then drains.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves `router` until `signal` resolves, then drains.
    pub async fn serve_with_shutdown<F>(self, router: Router, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        let limits = Limits { drain: self.drain_timeout, max_body_bytes: self.max_body_bytes };
        run(listener, router, signal, limits).await
    }
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    drain: Duration,
    max_body_bytes: usize,
}

async fn run<F>(listener: TcpListener, router: Router, signal: F, limits: Limits) -> Result<(), Error>
where
    F: Future<Output = ()>,
{
    let router = Arc::new(router);
    info!(addr = %listener.local_addr()?, routes = router.len(), "roster listening");

    let mut tasks = JoinSet::new();
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::pin!(signal);

    loop {
        tokio::select! {
            // Check shutdown first so a signal stops accepting immediately,
            // even with connections queued.
            biased;

            () = &mut signal => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let router = Arc::clone(&router);
                let io = TokioIo::new(stream);
                let mut stop = stop_rx.clone();
                let max_body = limits.max_body_bytes;

                tasks.spawn(async move {
                    // Called once per request on the connection.
                    let svc = service_fn(move |req| {
                        let router = Arc::clone(&router);
                        async move { handle(&router, req, peer, max_body).await }
                    });

                    // HTTP/1.1 or HTTP/2, whichever the client speaks.
                    let builder = ConnBuilder::new(TokioExecutor::new());
                    let conn = builder.serve_connection(io, svc);
                    tokio::pin!(conn);

                    let res = tokio::select! {
                        res = conn.as_mut() => res,
                        _ = stop.changed() => {
                            conn.as_mut().graceful_shutdown();
                            conn.await
                        }
                    };
                    if let Err(e) = res {
                        error!(%peer, "connection error: {e}");
                    }
                });
            }

            // Reap finished connections so the set does not grow unbounded.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    stop_tx.send_replace(true);
    let drain = limits.drain;
    let drained = tokio::time::timeout(drain, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(remaining = tasks.len(), ?drain, "drain timeout elapsed, aborting connections");
        tasks.shutdown().await;
    }

    info!("roster stopped");
    Ok(())
}

/// Reads the whole body, up to `max_body` bytes, then hands the request to
/// the router.
///
/// The error type is [`Infallible`]: every failure becomes a response, so
/// hyper never sees one.
async fn handle(
    router: &Router,
    req: hyper::Request<hyper::body::Incoming>,
    peer: SocketAddr,
    max_body: usize,
) -> Result<http::Response<http_body_util::Full<bytes::Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, max_body).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(%peer, limit = max_body, "request body too large");
            let res = Response::builder()
                .status(StatusCode::PAYLOAD_TOO_LARGE)
                .text("request body too large");
            return Ok(res.into_inner());
        }
        Err(e) => {
            warn!(%peer, "failed to read request body: {e}");
            let res = Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .text("bad request");
            return Ok(res.into_inner());
        }
    };

    let response = router.dispatch(http::Request::from_parts(parts, body)).await;
    Ok(response.into_inner())
}

/// Resolves on the first SIGTERM (Kubernetes, systemd) or SIGINT (Ctrl-C).
/// On non-Unix platforms only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
