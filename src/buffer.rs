//! Latest-frame handoff between an SDK callback thread and a polling consumer.
//!
//! The producer side replaces a single pending slot; the consumer adopts the
//! pending frame as its current one. The lock only covers moving a `Box`
//! in or out of the slot, so neither side waits on the other's copying or
//! iteration. Frames that are replaced before being adopted are dropped:
//! the consumer always sees the newest frame, never a backlog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Slot<T> {
    next: Mutex<Option<Box<T>>>,
    published: AtomicU64,
    superseded: AtomicU64,
}

impl<T> Slot<T> {
    // The slot holds a plain Option, so a panic elsewhere cannot leave it
    // half-written.
    fn lock(&self) -> MutexGuard<'_, Option<Box<T>>> {
        self.next.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a connected publisher/consumer pair.
pub fn frame_buffer<T>() -> (FramePublisher<T>, FrameConsumer<T>) {
    let slot = Arc::new(Slot {
        next: Mutex::new(None),
        published: AtomicU64::new(0),
        superseded: AtomicU64::new(0),
    });
    (
        FramePublisher { slot: slot.clone() },
        FrameConsumer {
            slot,
            current: None,
            adopted: 0,
        },
    )
}

/// Write side, owned by the delivery context.
pub struct FramePublisher<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for FramePublisher<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> FramePublisher<T> {
    /// Make `frame` the pending frame, replacing any pending frame that was
    /// never adopted.
    pub fn publish(&self, frame: Box<T>) {
        let previous = self.slot.lock().replace(frame);
        self.slot.published.fetch_add(1, Ordering::Relaxed);
        if previous.is_some() {
            self.slot.superseded.fetch_add(1, Ordering::Relaxed);
            log::trace!("pending frame superseded before adoption");
        }
        // `previous` is released here, outside the lock.
    }

    /// Total frames handed to [`Self::publish`].
    pub fn published(&self) -> u64 {
        self.slot.published.load(Ordering::Relaxed)
    }
}

/// Read side, owned by the consumer loop.
pub struct FrameConsumer<T> {
    slot: Arc<Slot<T>>,
    current: Option<Box<T>>,
    adopted: u64,
}

impl<T> FrameConsumer<T> {
    /// Adopt the pending frame, if any, as the current frame.
    ///
    /// Returns the newly adopted frame. With nothing pending, returns `None`
    /// and leaves the current frame as it was.
    pub fn try_adopt(&mut self) -> Option<&T> {
        let next = self.slot.lock().take()?;
        // The old current frame is dropped here, after the lock is released.
        self.current = Some(next);
        self.adopted += 1;
        self.current.as_deref()
    }

    /// The last adopted frame.
    pub fn current(&self) -> Option<&T> {
        self.current.as_deref()
    }

    /// Whether a published frame is waiting to be adopted.
    pub fn has_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub fn adopted_frames(&self) -> u64 {
        self.adopted
    }

    /// Frames that were replaced while pending and never adopted.
    pub fn dropped_frames(&self) -> u64 {
        self.slot.superseded.load(Ordering::Relaxed)
    }

    /// A new publisher feeding this consumer.
    pub fn publisher(&self) -> FramePublisher<T> {
        FramePublisher {
            slot: self.slot.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    #[test]
    fn test_adopt_returns_latest_publish() {
        let (tx, mut rx) = frame_buffer();
        for i in 0..5u32 {
            tx.publish(Box::new(i));
        }
        assert_eq!(rx.try_adopt(), Some(&4));
        assert_eq!(rx.dropped_frames(), 4);
        assert_eq!(tx.published(), 5);

        tx.publish(Box::new(10));
        tx.publish(Box::new(11));
        assert_eq!(rx.try_adopt(), Some(&11));
        assert_eq!(rx.adopted_frames(), 2);
    }

    #[test]
    fn test_adopt_without_publish_keeps_current() {
        let (tx, mut rx) = frame_buffer::<String>();
        assert!(rx.try_adopt().is_none());
        assert!(rx.current().is_none());

        tx.publish(Box::new("first".to_string()));
        assert_eq!(rx.try_adopt().map(String::as_str), Some("first"));
        assert!(!rx.has_pending());

        assert!(rx.try_adopt().is_none());
        assert_eq!(rx.current().map(String::as_str), Some("first"));
        assert_eq!(rx.adopted_frames(), 1);
    }

    #[test]
    fn test_replaced_frames_are_released() {
        struct Counted(Arc<AtomicU64>);
        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicU64::new(0));
        let (tx, mut rx) = frame_buffer();
        tx.publish(Box::new(Counted(drops.clone())));
        tx.publish(Box::new(Counted(drops.clone())));
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        rx.try_adopt();
        tx.publish(Box::new(Counted(drops.clone())));
        rx.try_adopt();
        // The previously adopted frame goes when its successor is adopted.
        assert_eq!(drops.load(Ordering::SeqCst), 2);

        drop(rx);
        drop(tx);
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_concurrent_publish_never_tears_frames() {
        const LEN: usize = 256;
        const FRAMES: u32 = 20_000;

        let (tx, mut rx) = frame_buffer::<Vec<u32>>();
        let done = Arc::new(AtomicBool::new(false));
        let done_writer = done.clone();

        let writer = thread::spawn(move || {
            for seq in 1..=FRAMES {
                tx.publish(Box::new(vec![seq; LEN]));
            }
            done_writer.store(true, Ordering::SeqCst);
        });

        let mut last_seen = 0u32;
        loop {
            let finished = done.load(Ordering::SeqCst);
            if let Some(frame) = rx.try_adopt() {
                let seq = frame[0];
                assert_eq!(frame.len(), LEN);
                assert!(frame.iter().all(|&v| v == seq), "torn frame {}", seq);
                assert!(seq > last_seen, "frame {} after {}", seq, last_seen);
                last_seen = seq;
            }
            if finished && !rx.has_pending() {
                break;
            }
        }
        writer.join().unwrap();

        assert_eq!(last_seen, FRAMES);
        assert_eq!(rx.adopted_frames() + rx.dropped_frames(), FRAMES as u64);
    }

    #[test]
    fn test_cloned_publishers_share_slot() {
        let (tx, mut rx) = frame_buffer();
        let other = rx.publisher();
        tx.publish(Box::new(1));
        other.publish(Box::new(2));
        assert_eq!(rx.try_adopt(), Some(&2));
        assert_eq!(rx.dropped_frames(), 1);
    }
}
