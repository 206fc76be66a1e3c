//! Outbound frame queue.
//!
//! Frames composed while the socket is not open are buffered here and
//! flushed in FIFO order once it opens. Unbounded by default; a capacity
//! evicts the oldest frame, and a max age drops frames that waited too long
//! to still be meaningful.

use std::{collections::VecDeque, num::NonZeroUsize, time::Duration};

use parlor_proto::OutboundKind;
use serde_json::Value;

use crate::env::Moment;

/// A frame waiting for transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundFrame<I> {
    /// Frame kind.
    pub kind: OutboundKind,
    /// Payload, serialized into the envelope's `data` field at send time.
    pub payload: Value,
    /// When the frame was composed.
    pub enqueued_at: I,
}

impl<I> OutboundFrame<I> {
    /// Create a frame.
    pub fn new(kind: OutboundKind, payload: Value, enqueued_at: I) -> Self {
        Self { kind, payload, enqueued_at }
    }
}

/// Queue bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum buffered frames. `None` is unbounded.
    pub capacity: Option<NonZeroUsize>,
    /// Frames older than this are dropped at flush time. `None` keeps them
    /// forever.
    pub max_age: Option<Duration>,
}

/// FIFO buffer of outbound frames.
#[derive(Debug, Clone)]
pub struct OutboundQueue<I> {
    frames: VecDeque<OutboundFrame<I>>,
    config: QueueConfig,
    dropped: u64,
}

impl<I: Moment> OutboundQueue<I> {
    /// Create an empty queue.
    pub fn new(config: QueueConfig) -> Self {
        Self { frames: VecDeque::new(), config, dropped: 0 }
    }

    /// Append a frame, evicting the oldest if at capacity.
    pub fn enqueue(&mut self, frame: OutboundFrame<I>) {
        if let Some(capacity) = self.config.capacity
            && self.frames.len() >= capacity.get()
            && let Some(evicted) = self.frames.pop_front()
        {
            self.dropped += 1;
            tracing::warn!(kind = evicted.kind.as_tag(), capacity = capacity.get(), "outbound queue full, dropped oldest frame");
        }
        self.frames.push_back(frame);
    }

    /// Hand every buffered frame to `send`, oldest first.
    ///
    /// A frame leaves the queue only once `send` accepted it. On the first
    /// failure the flush stops and that frame (and everything behind it)
    /// stays queued in order. Frames past `max_age` are discarded first.
    ///
    /// Returns the number of frames sent.
    ///
    /// # Errors
    ///
    /// The first error returned by `send`.
    pub fn flush<E, F>(&mut self, now: I, mut send: F) -> Result<usize, E>
    where
        F: FnMut(&OutboundFrame<I>) -> Result<(), E>,
    {
        self.expire(now);

        let mut sent = 0;
        while let Some(frame) = self.frames.front() {
            send(frame)?;
            self.frames.pop_front();
            sent += 1;
        }
        Ok(sent)
    }

    /// Put frames that were handed to a socket but never delivered back at
    /// the head of the queue, keeping their relative order.
    ///
    /// Only chat messages are requeued. A late ping or typing hint is worse
    /// than none.
    pub fn requeue_front(&mut self, frames: Vec<OutboundFrame<I>>) {
        for frame in frames.into_iter().rev() {
            if frame.kind != OutboundKind::PrivateMessage {
                continue;
            }
            self.frames.push_front(frame);
        }

        if let Some(capacity) = self.config.capacity {
            while self.frames.len() > capacity.get()
                && let Some(evicted) = self.frames.pop_front()
            {
                self.dropped += 1;
                tracing::warn!(kind = evicted.kind.as_tag(), capacity = capacity.get(), "outbound queue full, dropped oldest frame");
            }
        }
    }

    /// Drop every buffered frame. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.frames.len();
        self.frames.clear();
        n
    }

    /// Buffered frame count.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames lost to eviction or expiry since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Buffered frames, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &OutboundFrame<I>> {
        self.frames.iter()
    }

    fn expire(&mut self, now: I) {
        let Some(max_age) = self.config.max_age else {
            return;
        };

        let before = self.frames.len();
        self.frames.retain(|frame| now - frame.enqueued_at <= max_age);
        let expired = before - self.frames.len();
        if expired > 0 {
            self.dropped += expired as u64;
            tracing::warn!(expired, "dropped stale outbound frames");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use serde_json::json;

    use super::*;

    fn chat(n: u64, at: Instant) -> OutboundFrame<Instant> {
        OutboundFrame::new(OutboundKind::PrivateMessage, json!({"receiver_id": 2, "content": n.to_string()}), at)
    }

    fn contents(queue: &OutboundQueue<Instant>) -> Vec<String> {
        queue.iter().map(|f| f.payload["content"].as_str().unwrap_or_default().to_string()).collect()
    }

    #[test]
    fn flush_is_fifo() {
        let now = Instant::now();
        let mut queue = OutboundQueue::new(QueueConfig::default());
        for n in 1..=3 {
            queue.enqueue(chat(n, now));
        }

        let mut sent = Vec::new();
        let count = queue
            .flush(now, |f| {
                sent.push(f.payload["content"].as_str().unwrap().to_string());
                Ok::<_, ()>(())
            })
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(sent, vec!["1", "2", "3"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn failed_send_keeps_frame_and_order() {
        let now = Instant::now();
        let mut queue = OutboundQueue::new(QueueConfig::default());
        for n in 1..=3 {
            queue.enqueue(chat(n, now));
        }

        let mut calls = 0;
        let result = queue.flush(now, |_| {
            calls += 1;
            if calls == 2 { Err("socket gone") } else { Ok(()) }
        });

        assert_eq!(result, Err("socket gone"));
        assert_eq!(contents(&queue), vec!["2", "3"]);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let now = Instant::now();
        let mut queue = OutboundQueue::new(QueueConfig { capacity: NonZeroUsize::new(2), max_age: None });
        for n in 1..=3 {
            queue.enqueue(chat(n, now));
        }

        assert_eq!(contents(&queue), vec!["2", "3"]);
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn requeue_over_capacity_evicts_oldest() {
        let now = Instant::now();
        let mut queue = OutboundQueue::new(QueueConfig { capacity: NonZeroUsize::new(2), max_age: None });
        queue.enqueue(chat(3, now));

        queue.requeue_front(vec![chat(1, now), chat(2, now)]);

        assert_eq!(contents(&queue), vec!["2", "3"]);
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn stale_frames_expire_on_flush() {
        let start = Instant::now();
        let mut queue = OutboundQueue::new(QueueConfig { capacity: None, max_age: Some(Duration::from_secs(60)) });
        queue.enqueue(chat(1, start));
        queue.enqueue(chat(2, start + Duration::from_secs(30)));

        let mut sent = 0;
        queue
            .flush(start + Duration::from_secs(70), |_| {
                sent += 1;
                Ok::<_, ()>(())
            })
            .unwrap();

        assert_eq!(sent, 1);
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn requeue_front_preserves_order_and_skips_ephemeral_frames() {
        let now = Instant::now();
        let mut queue = OutboundQueue::new(QueueConfig::default());
        queue.enqueue(chat(3, now));

        queue.requeue_front(vec![
            chat(1, now),
            OutboundFrame::new(OutboundKind::Ping, Value::Null, now),
            chat(2, now),
            OutboundFrame::new(OutboundKind::Typing, serde_json::json!({"receiver_id": 4}), now),
        ]);

        assert_eq!(contents(&queue), vec!["1", "2", "3"]);
        assert!(queue.iter().all(|f| f.kind == OutboundKind::PrivateMessage));
    }
}
