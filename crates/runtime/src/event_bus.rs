use crate::frame::Frame;

/// An outbound notification stamped with the frame it was raised in.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    pub frame_index: u64,
    pub seq: u64,
    pub payload: E,
}

/// Ordered buffer of notifications for the host to drain.
///
/// Events are drained in emission order; `seq` increases monotonically over
/// the lifetime of the bus, across drains.
#[derive(Debug)]
pub struct EventBus<E> {
    next_seq: u64,
    events: Vec<Event<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            events: Vec::new(),
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, frame: Frame, payload: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event {
            frame_index: frame.index,
            seq,
            payload,
        });
    }

    pub fn events(&self) -> &[Event<E>] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        std::mem::take(&mut self.events)
    }
}
