use super::DbPool;
use crate::errors::{DatabaseError, Error, Result};
use diesel::{Connection, SqliteConnection};
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

// A job takes the writer's dedicated connection and returns a type-erased
// result so one channel can carry jobs of any return type.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

/// Handle for sending jobs to the writer actor.
///
/// All mutations of one account's database go through this handle; the actor
/// drains them strictly one at a time, each inside an immediate transaction,
/// so no two read-modify-write cycles can interleave.
#[derive(Clone)]
pub struct WriteHandle {
    #[allow(clippy::type_complexity)]
    tx: mpsc::Sender<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>,
    )>,
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| {
                Error::Database(DatabaseError::WriterUnavailable(
                    "writer actor stopped".to_string(),
                ))
            })?;

        let boxed = ret_rx.await.map_err(|_| {
            Error::Database(DatabaseError::WriterUnavailable(
                "writer actor dropped the reply".to_string(),
            ))
        })??;

        boxed.downcast::<T>().map(|b| *b).map_err(|_| {
            Error::Database(DatabaseError::WriterUnavailable(
                "writer actor returned an unexpected type".to_string(),
            ))
        })
    }
}

/// Spawns a background tokio task acting as the single writer for one
/// database. The actor owns one pooled connection and processes jobs
/// serially; each job runs inside `immediate_transaction` so the write lock
/// is taken up front.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    #[allow(clippy::type_complexity)]
    let (tx, mut rx) = mpsc::channel::<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>,
    )>(1024);

    tokio::spawn(async move {
        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send + 'static>> = match pool.get() {
                Ok(mut conn) => conn.immediate_transaction::<_, Error, _>(|c| job(c)),
                Err(e) => Err(e.into()),
            };

            // Receiver may have given up; nothing to do then.
            let _ = reply_tx.send(result);
        }
        // Channel closed: every WriteHandle was dropped, actor exits.
    });

    WriteHandle { tx }
}
