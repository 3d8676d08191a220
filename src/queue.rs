//! # EventQueue: unbuffered handoff of event batches.
//!
//! Producers block in [`EventQueue::push`] until a consumer has taken their
//! batch. Nothing is buffered, so a producer returning `Ok` knows the batch
//! reached the dispatch loop.
//!
//! ## Architecture
//! ```text
//! consumer: next() ── post slot (oneshot::Sender<Batch>) ──► [slots]
//!                  ◄─ await slot receiver ──────────────────────┐
//!                                                               │
//! producer: push(batch) ── lock slots (fair) ── take slot ── slot.send(batch)
//!                              │                     └─ Err: consumer left, take next slot
//!                              └─ closed ─► Err(QueueError::Closed)
//! ```
//!
//! ## Rules
//! - A batch is accepted exactly when `slot.send` succeeds; the consumer
//!   closes its slot before giving up, so acceptance and abandonment never race.
//! - Producers are served in arrival order (tokio's mutex is fair).
//! - [`EventQueue::close`] is idempotent. Waiting producers get
//!   [`QueueError::Closed`]; waiting consumers get `None`. A batch already
//!   handed over is still returned by the consumer that owned the slot.
//! - Cancel a wait with [`EventQueue::next_until`], not by dropping the future.
//! - Slots left behind by stopped or dropped consumers are discarded when the
//!   next consumer arrives.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;
use crate::workload::Batch;

type Slot = oneshot::Sender<Batch>;

struct Shared {
    slot_tx: mpsc::UnboundedSender<Slot>,
    slot_rx: Mutex<mpsc::UnboundedReceiver<Slot>>,
    closed: CancellationToken,
}

/// Rendezvous queue carrying event batches from producers to one consumer at a time.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct EventQueue {
    shared: Arc<Shared>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    /// Creates an open queue.
    pub fn new() -> Self {
        let (slot_tx, slot_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                slot_tx,
                slot_rx: Mutex::new(slot_rx),
                closed: CancellationToken::new(),
            }),
        }
    }

    /// Hands `batch` to a consumer, waiting until one takes it.
    ///
    /// Returns [`QueueError::Closed`] if the queue is closed before a consumer
    /// accepted the batch.
    pub async fn push(&self, batch: Batch) -> Result<(), QueueError> {
        let closed = &self.shared.closed;
        if closed.is_cancelled() {
            return Err(QueueError::Closed);
        }

        let mut slots = tokio::select! {
            biased;
            _ = closed.cancelled() => return Err(QueueError::Closed),
            slots = self.shared.slot_rx.lock() => slots,
        };

        let mut batch = batch;
        loop {
            let slot = tokio::select! {
                biased;
                _ = closed.cancelled() => return Err(QueueError::Closed),
                slot = slots.recv() => slot.ok_or(QueueError::Closed)?,
            };
            match slot.send(batch) {
                Ok(()) => return Ok(()),
                // The consumer behind this slot stopped waiting.
                Err(returned) => batch = returned,
            }
        }
    }

    /// Waits for the next batch; `None` once the queue is closed.
    pub async fn next(&self) -> Option<Batch> {
        self.recv(None).await
    }

    /// Like [`next`](Self::next), but also returns `None` when `stop` fires.
    pub async fn next_until(&self, stop: &CancellationToken) -> Option<Batch> {
        self.recv(Some(stop)).await
    }

    async fn recv(&self, stop: Option<&CancellationToken>) -> Option<Batch> {
        self.prune();
        let (slot, mut rx) = oneshot::channel();
        if self.shared.slot_tx.send(slot).is_err() {
            return None;
        }

        let stopped = async {
            match stop {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            res = &mut rx => return res.ok(),
            _ = self.shared.closed.cancelled() => {}
            _ = stopped => {}
        }

        // Refuse further handoffs, but keep one that already happened.
        rx.close();
        rx.try_recv().ok()
    }

    /// Drops slots whose consumer is gone, keeping the order of the rest.
    ///
    /// Skipped while a producer holds the slots; it discards closed slots itself.
    fn prune(&self) {
        let Ok(mut slots) = self.shared.slot_rx.try_lock() else {
            return;
        };
        let mut open = Vec::new();
        while let Ok(slot) = slots.try_recv() {
            if !slot.is_closed() {
                open.push(slot);
            }
        }
        for slot in open {
            let _ = self.shared.slot_tx.send(slot);
        }
    }

    #[cfg(test)]
    fn waiting_slots(&self) -> usize {
        self.shared.slot_rx.try_lock().map_or(0, |slots| slots.len())
    }

    /// Closes the queue. Idempotent.
    pub fn close(&self) {
        self.shared.closed.cancel();
    }

    /// True once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    /// Lazy sequence of batches, ending when the queue is closed.
    pub fn batches(&self) -> impl Stream<Item = Batch> + Send + use<> {
        futures::stream::unfold(self.clone(), |queue| async move {
            let batch = queue.next().await?;
            Some((batch, queue))
        })
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::time;

    use crate::workload::Event;

    fn batch(ids: &[&str]) -> Batch {
        ids.iter().map(|id| Event::tracked(*id)).collect()
    }

    #[tokio::test]
    async fn push_blocks_until_a_consumer_takes_the_batch() {
        let q = EventQueue::new();
        let producer = {
            let q = q.clone();
            tokio::spawn(async move { q.push(batch(&["spam/eggs"])).await })
        };

        time::sleep(Duration::from_millis(20)).await;
        assert!(!producer.is_finished(), "nothing consumed yet");

        let got = q.next().await.unwrap();
        assert_eq!(&*got, &*batch(&["spam/eggs"]));
        assert_eq!(producer.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn batches_arrive_in_handoff_order() {
        let q = EventQueue::new();
        let producer = {
            let q = q.clone();
            tokio::spawn(async move {
                for i in 0..10 {
                    q.push(batch(&[format!("w/{i}").as_str()])).await.unwrap();
                }
                q.close();
            })
        };

        let got: Vec<Batch> = q.batches().collect().await;
        producer.await.unwrap();

        let ids: Vec<String> = got.iter().map(|b| b[0].id.clone()).collect();
        let want: Vec<String> = (0..10).map(|i| format!("w/{i}")).collect();
        assert_eq!(ids, want);
    }

    #[tokio::test]
    async fn close_wakes_a_waiting_consumer() {
        let q = EventQueue::new();
        let consumer = {
            let q = q.clone();
            tokio::spawn(async move { q.next().await })
        };

        time::sleep(Duration::from_millis(20)).await;
        q.close();

        let got = time::timeout(Duration::from_secs(1), consumer).await.unwrap().unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn close_fails_a_waiting_producer() {
        let q = EventQueue::new();
        let producer = {
            let q = q.clone();
            tokio::spawn(async move { q.push(batch(&["spam/eggs"])).await })
        };

        time::sleep(Duration::from_millis(20)).await;
        q.close();

        let res = time::timeout(Duration::from_secs(1), producer).await.unwrap().unwrap();
        assert_eq!(res, Err(QueueError::Closed));
        assert!(q.batches().collect::<Vec<_>>().await.is_empty());
    }

    #[tokio::test]
    async fn push_after_close_fails_and_close_is_idempotent() {
        let q = EventQueue::new();
        q.close();
        q.close();
        assert!(q.is_closed());
        assert_eq!(q.push(batch(&["spam/eggs"])).await, Err(QueueError::Closed));
        assert!(q.next().await.is_none());
    }

    #[tokio::test]
    async fn stopped_consumer_does_not_swallow_batches() {
        let q = EventQueue::new();
        let stop = CancellationToken::new();

        let first = {
            let q = q.clone();
            let stop = stop.clone();
            tokio::spawn(async move { q.next_until(&stop).await })
        };
        time::sleep(Duration::from_millis(20)).await;
        stop.cancel();
        assert!(first.await.unwrap().is_none());

        // The abandoned slot is skipped; the batch goes to the next consumer.
        let producer = {
            let q = q.clone();
            tokio::spawn(async move { q.push(batch(&["spam/eggs"])).await })
        };
        let got = q.next().await.unwrap();
        assert_eq!(got[0].id, "spam/eggs");
        assert_eq!(producer.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn abandoned_slots_do_not_pile_up() {
        let q = EventQueue::new();
        for _ in 0..32 {
            let stop = CancellationToken::new();
            stop.cancel();
            assert!(q.next_until(&stop).await.is_none());

            // Dropped mid-wait.
            let _ = time::timeout(Duration::from_millis(1), q.next()).await;
        }
        assert!(q.waiting_slots() <= 1);

        let producer = {
            let q = q.clone();
            tokio::spawn(async move { q.push(batch(&["spam/eggs"])).await })
        };
        assert_eq!(q.next().await.unwrap()[0].id, "spam/eggs");
        assert_eq!(producer.await.unwrap(), Ok(()));
        assert_eq!(q.waiting_slots(), 0);
    }

    #[tokio::test]
    async fn concurrent_producers_each_delivered_once() {
        let q = EventQueue::new();
        let mut producers = Vec::new();
        for i in 0..8 {
            let q = q.clone();
            producers.push(tokio::spawn(async move {
                q.push(batch(&[format!("p/{i}").as_str()])).await
            }));
        }

        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(q.next().await.unwrap()[0].id.clone());
        }
        for p in producers {
            assert_eq!(p.await.unwrap(), Ok(()));
        }
        seen.sort();
        let mut want: Vec<String> = (0..8).map(|i| format!("p/{i}")).collect();
        want.sort();
        assert_eq!(seen, want);
    }
}
