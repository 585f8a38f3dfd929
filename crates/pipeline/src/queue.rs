use thiserror::Error;
use tokio::sync::mpsc;

/// The consuming stage has shut down.
#[derive(Debug, Error)]
#[error("{stage} queue is closed")]
pub struct QueueClosed {
    pub stage: &'static str,
}

/// Producer side of a stage queue. Cheap to clone; the stage's worker
/// exits once every clone is dropped and the queue is drained.
pub struct JobSender<T> {
    stage: &'static str,
    tx: mpsc::Sender<T>,
}

impl<T> Clone for JobSender<T> {
    fn clone(&self) -> Self {
        Self {
            stage: self.stage,
            tx: self.tx.clone(),
        }
    }
}

impl<T> JobSender<T> {
    /// Enqueue a job, waiting for room when the queue is full.
    pub async fn submit(&self, job: T) -> Result<(), QueueClosed> {
        self.tx
            .send(job)
            .await
            .map_err(|_| QueueClosed { stage: self.stage })
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }
}

pub type JobReceiver<T> = mpsc::Receiver<T>;

/// Bounded FIFO queue for one stage.
pub fn queue<T>(stage: &'static str, capacity: usize) -> (JobSender<T>, JobReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (JobSender { stage, tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_and_close_on_drop() {
        let (tx, mut rx) = queue::<u32>("test", 4);
        tx.submit(1).await.unwrap();
        tx.clone().submit(2).await.unwrap();
        drop(tx);

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn submit_after_consumer_gone_fails() {
        let (tx, rx) = queue::<u32>("publication", 1);
        drop(rx);
        let err = tx.submit(1).await.unwrap_err();
        assert_eq!(err.stage, "publication");
    }
}
