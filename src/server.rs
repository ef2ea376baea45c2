//! HTTP server and dispatch.
//!
//! hyper owns the connection: parsing, keep-alive, HTTP/1.1 vs HTTP/2. This
//! module accepts sockets, hands each request to [`dispatch`], and stops
//! cleanly on SIGTERM / Ctrl-C:
//!
//! 1. Stop calling `listener.accept()`; no new connections are made.
//! 2. Let every in-flight connection task run to completion.
//! 3. Return from [`Server::serve`].
//!
//! # Verbosity
//!
//! Whether the server logs is a property of the server, not of the process.
//! `verbose(false)` silences the server's own startup, per-request, and
//! connection events. Handler failures are still reported at `error` level.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::app::{self, App, Resolved};
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

enum Bind {
    Addr { hostname: String, port: u16 },
    Listener(TcpListener),
}

/// The HTTP server.
///
/// ```rust,no_run
/// use plume::{App, Server};
///
/// #[tokio::main]
/// async fn main() -> Result<(), plume::Error> {
///     let app = App::new().get("/", |_req, res| {
///         res.send("hello");
///     });
///     Server::bind("0.0.0.0", 3000).verbose(false).serve(app).await
/// }
/// ```
pub struct Server {
    bind: Bind,
    verbose: bool,
}

impl Server {
    /// Configures the server to bind to `hostname:port` when
    /// [`serve`](Server::serve) is called. `hostname` may be a name
    /// (`"localhost"`) or an IP literal. Verbose by default.
    pub fn bind(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            bind: Bind::Addr { hostname: hostname.into(), port },
            verbose: true,
        }
    }

    /// Serves on an already-bound listener, e.g. one bound to port 0.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener), verbose: true }
    }

    /// Turns the server's own logging on or off.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Starts accepting connections and dispatching them through `app`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, app: App) -> Result<(), Error> {
        self.serve_with_shutdown(app, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but shuts down when `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, app: App, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let listener = match self.bind {
            Bind::Addr { hostname, port } => TcpListener::bind((hostname.as_str(), port)).await?,
            Bind::Listener(listener) => listener,
        };
        let verbose = self.verbose;
        let app = Arc::new(app);

        let addr = listener.local_addr()?;
        if verbose {
            info!(%addr, "plume listening");
        }

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting at once,
                // even if more connections are queued.
                biased;

                () = &mut signal => {
                    if verbose {
                        info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    }
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            if verbose {
                                error!("accept error: {e}");
                            }
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(app, req, remote_addr, verbose).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            if verbose {
                                error!(peer = %remote_addr, "connection error: {e}");
                            }
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        if verbose {
            info!("plume stopped");
        }
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response.
///
/// The error type is [`Infallible`](std::convert::Infallible): every failure
/// is turned into a 4xx/5xx here, so hyper never sees an error.
async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
    verbose: bool,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_owned();

    let response = match app.resolve(&parts.method, parts.uri.path()) {
        Resolved::Found { handler, params, route } => match body.collect().await {
            Ok(collected) => {
                let request = Request::new(parts, collected.to_bytes(), params, route, remote_addr);
                // Handlers are synchronous and may block on file reads.
                match tokio::task::spawn_blocking(move || app::invoke(&handler, &request)).await {
                    Ok(res) => res,
                    Err(e) => {
                        error!(%method, path = %path, "handler panicked: {e}");
                        app::internal_error()
                    }
                }
            }
            Err(e) => {
                if verbose {
                    warn!(peer = %remote_addr, %method, path = %path, "failed to read request body: {e}");
                }
                let mut res = Response::new();
                res.send_status(Status::BadRequest.code());
                res
            }
        },
        Resolved::MethodNotAllowed(allowed) => app::method_not_allowed(&allowed),
        Resolved::NotFound => app::not_found(),
    };

    if verbose {
        info!(
            peer = %remote_addr,
            %method,
            path = %path,
            status = response.status_code(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "request"
        );
    }

    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C). On
/// Windows only Ctrl-C is available. A handler that fails to install never
/// fires; the other still does.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
