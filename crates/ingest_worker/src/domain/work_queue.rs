use crate::domain::WorkItem;

/// Create the bounded queue between the poller and the worker pool.
///
/// `capacity` is the prefetch count; a zero capacity is raised to one.
pub fn work_queue(capacity: usize) -> (WorkQueueSender, WorkQueueReceiver) {
    let (tx, rx) = async_channel::bounded(capacity.max(1));
    (WorkQueueSender { tx }, WorkQueueReceiver { rx })
}

/// Producer half, owned by the single poller.
///
/// Dropping it closes the queue; receivers still drain what is buffered.
pub struct WorkQueueSender {
    tx: async_channel::Sender<WorkItem>,
}

impl WorkQueueSender {
    /// Push an item, waiting while the queue is full.
    ///
    /// Returns the item back if every receiver is gone.
    pub async fn push(&self, item: WorkItem) -> Result<(), WorkItem> {
        self.tx.send(item).await.map_err(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }
}

/// Consumer half, cloned once per worker
#[derive(Clone)]
pub struct WorkQueueReceiver {
    rx: async_channel::Receiver<WorkItem>,
}

impl WorkQueueReceiver {
    /// Pop the next item, waiting while the queue is empty.
    ///
    /// Returns `None` once the sender is dropped and the queue is drained.
    pub async fn pop(&self) -> Option<WorkItem> {
        self.rx.recv().await.ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
