use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinSet;

use crate::error::{GreenlabelError, Result};

/// Store writes that run off the response path.
#[derive(Clone, Default)]
pub struct BackgroundWrites {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `write` in the background. A failure is logged with `what`.
    pub fn spawn<F>(&self, what: &'static str, write: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let mut tasks = self.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            if let Err(e) = write.await {
                tracing::error!(what, code = e.code(), error = %e, "Background write failed");
            }
        });
    }

    /// Wait for every write still in flight.
    pub async fn flush(&self) {
        let mut tasks = std::mem::take(&mut *self.lock());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Background write task failed");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Tag a store error as a write failure.
pub fn persistence_error(e: GreenlabelError) -> GreenlabelError {
    match e {
        GreenlabelError::Persistence(_) => e,
        other => GreenlabelError::Persistence(other.to_string()),
    }
}
