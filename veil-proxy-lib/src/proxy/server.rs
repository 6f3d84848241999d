use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::proxy::connection::ConnectionGuard;
use crate::proxy::context::ProxyState;
use crate::proxy::router::handle_request;
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// Run the proxy until SIGTERM or SIGINT.
pub async fn run(config: Arc<Config>, metrics: Option<Arc<Metrics>>) -> Result<()> {
    let listener = TcpListener::bind(config.listen).await.map_err(ProxyError::Io)?;
    let state = Arc::new(ProxyState::new(Arc::clone(&config), metrics)?);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    serve(listener, state, shutdown_rx).await
}

/// Serve on an already-bound listener until a signal arrives or `shutdown`
/// flips to `true`, then drain active connections for up to
/// `timeout.shutdown_secs`.
pub async fn serve(listener: TcpListener, state: Arc<ProxyState>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let addr = listener.local_addr().map_err(ProxyError::Io)?;
    let builder = ConnBuilder::new(TokioExecutor::new());

    // Track active connections for graceful shutdown
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (closed_tx, mut closed_rx) = watch::channel(());

    // Setup signal handlers
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .map_err(|e| ProxyError::Io(std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}"))))?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .map_err(|e| ProxyError::Io(std::io::Error::other(format!("Failed to setup SIGINT handler: {e}"))))?;

    info!(?addr, public_origin = ?state.config.public_origin, "starting iframe proxy (h1/h2)");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating graceful shutdown");
                break;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Shutdown requested, initiating graceful shutdown");
                    break;
                }
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };

                let guard = ConnectionGuard::accept(
                    Arc::clone(&active_connections),
                    closed_tx.clone(),
                    state.metrics.clone(),
                );
                tokio::spawn(handle_connection(stream, peer, builder.clone(), Arc::clone(&state), guard));
            }
        }
    }
    // Stop accepting before draining
    drop(listener);

    let shutdown_secs = state.config.timeout.shutdown_secs;
    info!("Waiting for active connections to finish (timeout: {}s)", shutdown_secs);
    let shutdown_timeout = Duration::from_secs(shutdown_secs);
    let start = std::time::Instant::now();

    loop {
        let active = active_connections.load(Ordering::Relaxed);
        if active == 0 {
            info!("All connections closed, shutdown complete");
            break;
        }

        if start.elapsed() >= shutdown_timeout {
            warn!(active_connections = active, "Shutdown timeout reached, {} connections still active", active);
            break;
        }

        debug!(active_connections = active, "Waiting for connections to close");
        tokio::select! {
            _ = closed_rx.changed() => {}
            _ = sleep(Duration::from_millis(100)) => {}
        }
    }

    info!("Proxy server stopped");
    Ok(())
}

/// Serve one downstream connection, bounded by `timeout.connection_handling_secs`.
async fn handle_connection(
    stream: TcpStream,
    peer: std::net::SocketAddr,
    builder: ConnBuilder<TokioExecutor>,
    state: Arc<ProxyState>,
    _guard: ConnectionGuard,
) {
    let timeout = Duration::from_secs(state.config.timeout.connection_handling_secs);
    let metrics = state.metrics.clone();

    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
        let state = Arc::clone(&state);
        async move { Ok::<_, hyper::Error>(handle_request(req, state).await) }
    });

    match tokio::time::timeout(timeout, builder.serve_connection(TokioIo::new(stream), svc)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(?peer, error = %e, "serve_connection error");
        }
        Err(_) => {
            warn!(?peer, "connection handling timeout");
            if let Some(ref m) = metrics {
                m.record_timeout(values::TIMEOUT_CONNECTION_HANDLING);
            }
        }
    }
}
