use super::DbPool;
use crate::errors::StorageError;
use circlepoints_core::errors::{DatabaseError, Error, Result};
use diesel::SqliteConnection;
use log::{debug, error};
use std::any::Any;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

// A job runs against the writer's connection inside one immediate transaction.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;
type AnyBox = Box<dyn Any + Send + 'static>;
type Envelope = (Job<AnyBox>, Ticket, oneshot::Sender<Result<AnyBox>>);

const PENDING: u8 = 0;
const CLAIMED: u8 = 1;
const ABANDONED: u8 = 2;

/// Decides the race between a job's commit and its caller's timeout.
///
/// Exactly one side wins the transition out of `PENDING`: the writer claims
/// the ticket right before committing, the caller abandons it when its
/// timeout fires. An abandoned job is rolled back or never started.
#[derive(Clone, Default)]
struct Ticket(Arc<AtomicU8>);

impl Ticket {
    fn claim(&self) -> bool {
        self.settle(CLAIMED)
    }

    fn abandon(&self) -> bool {
        self.settle(ABANDONED)
    }

    fn is_abandoned(&self) -> bool {
        self.0.load(Ordering::Acquire) == ABANDONED
    }

    fn settle(&self, to: u8) -> bool {
        self.0
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Default time a caller waits for its write job to come back.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

const QUEUE_DEPTH: usize = 1024;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<Envelope>,
    timeout: Duration,
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection.
    ///
    /// The job runs inside an immediate transaction: an `Err` from the job
    /// rolls back everything it wrote, and the error reaches the caller
    /// unchanged. If no reply arrives within the handle's timeout the call
    /// fails with [`DatabaseError::Timeout`] and the job has no effect: a
    /// queued job is skipped, a running one is rolled back. Once the job has
    /// reached its commit the caller waits for the outcome instead.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, mut ret_rx) = oneshot::channel();
        let ticket = Ticket::default();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as AnyBox)),
                ticket.clone(),
                ret_tx,
            ))
            .await
            .map_err(|_| {
                Error::Database(DatabaseError::ConnectionFailed(
                    "writer actor has stopped".to_string(),
                ))
            })?;

        let reply = match tokio::time::timeout(self.timeout, &mut ret_rx).await {
            Ok(reply) => reply,
            Err(_) if ticket.abandon() => {
                return Err(Error::Database(DatabaseError::Timeout(
                    self.timeout.as_millis() as u64,
                )))
            }
            // Claimed: the commit is under way.
            Err(_) => ret_rx.await,
        };

        let boxed = reply.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "writer actor dropped the reply".to_string(),
            ))
        })??;

        boxed.downcast::<T>().map(|v| *v).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "writer actor returned an unexpected type".to_string(),
            ))
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Spawns a background Tokio task that acts as the single writer to the database.
/// The actor owns one pooled connection and processes write jobs serially.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    spawn_writer_with_timeout(pool, DEFAULT_WRITE_TIMEOUT)
}

pub fn spawn_writer_with_timeout(pool: DbPool, timeout: Duration) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<Envelope>(QUEUE_DEPTH);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("Writer actor could not acquire a connection: {}", e);
                // Answer every request so callers fail fast instead of timing out.
                while let Some((_, _, reply_tx)) = rx.recv().await {
                    let _ = reply_tx.send(Err(Error::Database(
                        DatabaseError::ConnectionFailed(e.to_string()),
                    )));
                }
                return;
            }
        };

        let timeout_ms = timeout.as_millis() as u64;
        while let Some((job, ticket, reply_tx)) = rx.recv().await {
            if ticket.is_abandoned() || reply_tx.is_closed() {
                debug!("Skipping write job whose caller gave up");
                continue;
            }

            let result: Result<AnyBox> = conn
                .immediate_transaction::<_, StorageError, _>(|c| {
                    let value = job(c).map_err(StorageError::from)?;
                    if ticket.claim() {
                        Ok(value)
                    } else {
                        Err(Error::Database(DatabaseError::Timeout(timeout_ms)).into())
                    }
                })
                .map_err(Error::from);

            if ticket.is_abandoned() {
                debug!("Rolled back write job whose caller timed out");
            }
            let _ = reply_tx.send(result);
        }
        debug!("Writer actor stopped: all handles dropped");
    });

    WriteHandle { tx, timeout }
}
