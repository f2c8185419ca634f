//! Event: notifications from the audio thread to the control thread.

use std::sync::Arc;

use crate::history::HistoryBuffer;
use crate::ring_buffer::RingBuffer;

/// Notification from the audio thread to the control thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// History the audio thread no longer uses; the control thread drops it.
    Retired(Box<HistoryBuffer>),
}

/// Producer side of the event channel. Only the audio thread should hold this.
pub struct EventSender {
    inner: Arc<RingBuffer<Event>>,
}

impl EventSender {
    /// Tries to send an event. Returns `Err(event)` if the buffer is full.
    pub fn try_send(&self, event: Event) -> Result<(), Event> {
        self.inner.try_send(event)
    }
}

/// Consumer side of the event channel. Only the control thread should hold this.
pub struct EventReceiver {
    inner: Arc<RingBuffer<Event>>,
}

impl EventReceiver {
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv()
    }
}

/// Creates an event channel: a sender for the audio thread and a receiver for the control thread.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    let arc = Arc::new(RingBuffer::<Event>::new(capacity));
    (EventSender { inner: arc.clone() }, EventReceiver { inner: arc })
}

#[cfg(test)]
mod tests {
    use super::{event_channel, Event};
    use crate::history::HistoryBuffer;

    #[test]
    fn test_event_is_small() {
        assert!(std::mem::size_of::<Event>() <= 16, "Event must be small");
    }

    #[test]
    fn test_event_channel_send_recv() {
        let (tx, rx) = event_channel(2);
        let history = Box::new(HistoryBuffer::allocate(2, 2).unwrap());
        tx.try_send(Event::Retired(history.clone())).unwrap();
        assert_eq!(rx.try_recv(), Some(Event::Retired(history)));
        assert!(rx.try_recv().is_none());
    }
}
