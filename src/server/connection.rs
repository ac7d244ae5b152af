// Connection handling module
// Admits a single TCP connection and serves it on its own task

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::config::AppState;
use crate::handler;

const IDLE_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Accept a connection unless `max_connections` is already reached.
///
/// The counter is incremented before the check so concurrent accepts cannot
/// both slip under the limit.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) {
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            );
            drop(stream);
            return;
        }
    }

    tracing::trace!("Accepted connection from {peer_addr}");
    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
    );
}

/// Serve one HTTP/1.1 connection in a spawned task.
///
/// Request headers must arrive within `read_timeout`. Between requests the
/// connection may sit idle for `keep_alive_timeout` (or `read_timeout` when
/// keep-alive is off) before it is closed; a request in flight is never cut
/// short. The counter is released when the task ends.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let read_timeout = Duration::from_secs(performance.read_timeout);
        let idle_limit = if performance.keep_alive_timeout > 0 {
            Duration::from_secs(performance.keep_alive_timeout)
        } else {
            read_timeout
        };

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(read_timeout)
            .keep_alive(performance.keep_alive_timeout > 0);

        let activity = Arc::new(Activity::new());
        let service_state = Arc::clone(&state);
        let service_activity = Arc::clone(&activity);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                let activity = Arc::clone(&service_activity);
                async move {
                    let _in_flight = activity.begin();
                    handler::handle_request(req, state, peer_addr).await
                }
            }),
        );
        tokio::pin!(conn);

        let mut closing = false;
        loop {
            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(err) = result {
                        tracing::debug!("Connection error from {peer_addr}: {err}");
                    }
                    break;
                }
                () = tokio::time::sleep(IDLE_CHECK_INTERVAL), if !closing => {
                    if activity.idle_for() >= idle_limit {
                        tracing::debug!(
                            "Closing connection from {peer_addr} after {}s idle",
                            idle_limit.as_secs()
                        );
                        conn.as_mut().graceful_shutdown();
                        closing = true;
                    }
                }
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Requests in flight on one connection and when the last one finished
struct Activity {
    opened: Instant,
    in_flight: AtomicUsize,
    /// Milliseconds since `opened`
    last_seen_ms: AtomicU64,
}

impl Activity {
    fn new() -> Self {
        Self {
            opened: Instant::now(),
            in_flight: AtomicUsize::new(0),
            last_seen_ms: AtomicU64::new(0),
        }
    }

    fn begin(self: &Arc<Self>) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight(Arc::clone(self))
    }

    fn touch(&self) {
        let elapsed = u64::try_from(self.opened.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_seen_ms.store(elapsed, Ordering::SeqCst);
    }

    /// Zero while a request is being handled
    fn idle_for(&self) -> Duration {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return Duration::ZERO;
        }
        let last_seen = Duration::from_millis(self.last_seen_ms.load(Ordering::SeqCst));
        self.opened.elapsed().saturating_sub(last_seen)
    }
}

struct InFlight(Arc<Activity>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.touch();
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
