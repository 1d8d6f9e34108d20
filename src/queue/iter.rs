use super::bounded::{ClosableQueue, Message};

/// Iterator over a [`ClosableQueue`] that ends at the first close marker.
///
/// The item handed out last is acknowledged when the next one is requested (or when the
/// iterator is dropped), so `join` on the queue covers the consumer's work on that item.
/// Once the marker is seen the iterator stays exhausted.
pub struct QueueIter<'a, T> {
    queue: &'a ClosableQueue<T>,
    pending_ack: bool,
    finished: bool,
}

impl<'a, T> QueueIter<'a, T> {
    pub(crate) fn new(queue: &'a ClosableQueue<T>) -> Self {
        Self {
            queue,
            pending_ack: false,
            finished: false,
        }
    }

    fn ack_pending(&mut self) {
        if self.pending_ack {
            self.pending_ack = false;
            self.queue.mark_done();
        }
    }
}

impl<T> Iterator for QueueIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.ack_pending();
        if self.finished {
            return None;
        }
        match self.queue.get() {
            Message::Item(item) => {
                self.pending_ack = true;
                Some(item)
            }
            Message::EndOfStream => {
                self.finished = true;
                self.queue.mark_done();
                None
            }
        }
    }
}

impl<T> Drop for QueueIter<'_, T> {
    fn drop(&mut self) {
        self.ack_pending();
    }
}
