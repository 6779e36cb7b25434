use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use lazy_static::lazy_static;
use regex::Regex;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};

use crate::Result;

lazy_static! {
    static ref CREDENTIALS: Regex = Regex::new(r"//.*@").expect("credentials pattern is valid");
}

/// Masks any `user:password@` section of a connection string before it is logged
pub fn redact_credentials(uri: &str) -> String {
    CREDENTIALS.replace(uri, "//***@").into_owned()
}

/// Performs the actual handshake with a store
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    type Connection: Clone + Send + Sync + 'static;

    async fn connect(&self, uri: &str) -> Result<Self::Connection>;
}

type PendingConnection<T> = Shared<BoxFuture<'static, Result<T>>>;

enum ConnectionState<T> {
    Disconnected,
    Connecting {
        attempt: u64,
        pending: PendingConnection<T>,
    },
    Connected(T),
}

struct Inner<T> {
    state: ConnectionState<T>,
    attempts: u64,
}

/// Lazily establishes one connection and hands out clones of it
///
/// Callers that arrive while the first handshake is still running await that
/// same handshake. A failed handshake is reported to every one of them and
/// leaves the manager disconnected, so the next call starts a fresh attempt.
pub struct ConnectionManager<C: Connect> {
    connector: Arc<C>,
    uri: String,
    inner: Mutex<Inner<C::Connection>>,
}

impl<C: Connect> ConnectionManager<C> {
    pub fn new(connector: C, uri: impl Into<String>) -> Self {
        Self {
            connector: Arc::new(connector),
            uri: uri.into(),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                attempts: 0,
            }),
        }
    }

    /// Returns the shared connection, connecting first if needed
    pub async fn acquire(&self) -> Result<C::Connection> {
        let (attempt, pending) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            match &inner.state {
                ConnectionState::Connected(connection) => return Ok(connection.clone()),
                ConnectionState::Connecting { attempt, pending } => (*attempt, pending.clone()),
                ConnectionState::Disconnected => {
                    inner.attempts += 1;
                    let attempt = inner.attempts;
                    let pending = self.handshake().boxed().shared();
                    inner.state = ConnectionState::Connecting {
                        attempt,
                        pending: pending.clone(),
                    };
                    (attempt, pending)
                }
            }
        };

        let outcome = pending.await;

        let mut guard = self.lock();
        let inner = &mut *guard;
        let still_current = matches!(
            &inner.state,
            ConnectionState::Connecting { attempt: current, .. } if *current == attempt
        );
        if still_current {
            inner.state = match &outcome {
                Ok(connection) => ConnectionState::Connected(connection.clone()),
                Err(_) => ConnectionState::Disconnected,
            };
        }
        outcome
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.lock().state, ConnectionState::Connected(_))
    }

    /// Number of handshakes started so far
    pub fn attempts(&self) -> u64 {
        self.lock().attempts
    }

    fn handshake(&self) -> impl Future<Output = Result<C::Connection>> + Send + 'static {
        let connector = Arc::clone(&self.connector);
        let uri = self.uri.clone();
        async move {
            let redacted = redact_credentials(&uri);
            match connector.connect(&uri).await {
                Ok(connection) => {
                    info!(uri = %redacted, "database connected");
                    Ok(connection)
                }
                Err(e) => {
                    error!(err = ?e, uri = %redacted, "database connection failed");
                    Err(e)
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<C::Connection>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
