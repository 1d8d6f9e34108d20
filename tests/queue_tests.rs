//! ClosableQueue tests: FIFO, blocking, timeouts, join accounting and close-marker iteration.

use queuepipe::{ClosableQueue, Message, QueueError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const BLOCK: Duration = Duration::from_millis(150);
// Sleep granularity on loaded CI machines; elapsed checks allow this much slack.
const SLACK: Duration = Duration::from_millis(30);

// --- FIFO / blocking ---

#[test]
fn test_fifo_order_on_idle_queue() {
    let q = ClosableQueue::new(8);
    for i in 0..8 {
        q.put(i);
    }
    let got: Vec<i32> = (0..8).map(|_| q.get().into_item().unwrap()).collect();
    assert_eq!(got, (0..8).collect::<Vec<_>>());
}

#[test]
fn test_put_blocks_while_full() {
    let q = Arc::new(ClosableQueue::new(2));
    q.put(1);
    q.put(2);
    assert_eq!(q.len(), 2);

    let producer_q = Arc::clone(&q);
    let producer = thread::spawn(move || {
        let start = Instant::now();
        producer_q.put(3);
        start.elapsed()
    });

    thread::sleep(BLOCK);
    assert_eq!(q.len(), 2, "producer must not overfill the queue");
    assert_eq!(q.get(), Message::Item(1));
    let blocked_for = producer.join().unwrap();
    assert!(blocked_for + SLACK >= BLOCK, "put returned after {blocked_for:?}");
    assert_eq!(q.get(), Message::Item(2));
    assert_eq!(q.get(), Message::Item(3));
}

#[test]
fn test_get_blocks_until_put() {
    let q: Arc<ClosableQueue<&str>> = Arc::new(ClosableQueue::new(1));
    let consumer_q = Arc::clone(&q);
    let consumer = thread::spawn(move || {
        let start = Instant::now();
        let msg = consumer_q.get();
        (msg, start.elapsed())
    });
    thread::sleep(BLOCK);
    q.put("photo");
    let (msg, waited) = consumer.join().unwrap();
    assert_eq!(msg, Message::Item("photo"));
    assert!(waited + SLACK >= BLOCK);
}

// --- timeouts ---

#[test]
fn test_put_timeout_hands_item_back() {
    let q = ClosableQueue::new(1);
    q.put(String::from("first"));
    let err = q
        .put_timeout(String::from("second"), Duration::from_millis(20))
        .unwrap_err();
    assert!(matches!(err, QueueError::PutTimeout { .. }));
    assert_eq!(err.into_item().as_deref(), Some("second"));
    assert_eq!(q.len(), 1);
    assert_eq!(q.unfinished(), 1);
}

#[test]
fn test_put_timeout_succeeds_when_room_frees_up() {
    let q = Arc::new(ClosableQueue::new(1));
    q.put(1);
    let consumer_q = Arc::clone(&q);
    let consumer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        consumer_q.get()
    });
    assert!(q.put_timeout(2, Duration::from_secs(5)).is_ok());
    assert_eq!(consumer.join().unwrap(), Message::Item(1));
    assert_eq!(q.get(), Message::Item(2));
}

#[test]
fn test_get_timeout_on_empty_queue() {
    let q: ClosableQueue<u8> = ClosableQueue::new(4);
    let err = q.get_timeout(Duration::from_millis(20)).unwrap_err();
    assert!(matches!(err, QueueError::GetTimeout(_)));
    assert!(err.to_string().contains("empty"));
}

#[test]
fn test_huge_timeouts_wait_without_deadline() {
    let q = Arc::new(ClosableQueue::new(1));
    assert!(q.put_timeout(1, Duration::MAX).is_ok());
    assert_eq!(q.get_timeout(Duration::MAX).unwrap(), Message::Item(1));
    q.mark_done();
    assert!(q.join_timeout(Duration::MAX).is_ok());
    assert!(q.close_timeout(Duration::MAX).is_ok());
    assert!(q.get_timeout(Duration::MAX).unwrap().is_end());

    // Still blocks like the untimed call until the worker acknowledges.
    let worker_q = Arc::clone(&q);
    let start = Instant::now();
    let worker = thread::spawn(move || {
        thread::sleep(BLOCK);
        worker_q.mark_done();
    });
    assert!(q.join_timeout(Duration::MAX).is_ok());
    assert!(start.elapsed() + SLACK >= BLOCK);
    worker.join().unwrap();
}

#[test]
fn test_close_timeout_on_full_queue_keeps_depth() {
    let q = ClosableQueue::new(2);
    q.put('a');
    q.put('b');
    let err = q.close_timeout(Duration::from_millis(20)).unwrap_err();
    assert!(matches!(err, QueueError::CloseTimeout(_)));
    assert!(err.to_string().contains("full"));
    assert_eq!(q.len(), 2);
    assert_eq!(q.unfinished(), 2);
}

// --- join / mark_done ---

#[test]
fn test_join_waits_for_mark_done() {
    let q = Arc::new(ClosableQueue::new(4));
    q.put(7);
    let worker_q = Arc::clone(&q);
    let start = Instant::now();
    let worker = thread::spawn(move || {
        let _item = worker_q.get();
        thread::sleep(BLOCK);
        worker_q.mark_done();
    });
    q.join();
    assert!(start.elapsed() + SLACK >= BLOCK);
    assert_eq!(q.unfinished(), 0);
    worker.join().unwrap();
}

#[test]
fn test_join_timeout_reports_unfinished() {
    let q = ClosableQueue::new(4);
    q.put(1);
    q.put(2);
    let _ = q.get();
    q.mark_done();
    match q.join_timeout(Duration::from_millis(20)) {
        Err(QueueError::JoinTimeout { unfinished, .. }) => assert_eq!(unfinished, 1),
        other => panic!("expected JoinTimeout, got {other:?}"),
    }
}

#[test]
fn test_join_on_fresh_queue_returns_immediately() {
    let q: ClosableQueue<u8> = ClosableQueue::new(1);
    assert!(q.join_timeout(Duration::from_millis(1)).is_ok());
}

// --- close / iteration ---

#[test]
fn test_iter_stops_at_close_and_acknowledges_everything() {
    let q = ClosableQueue::new(0);
    for i in 1..=3 {
        q.put(i);
    }
    q.close();
    let got: Vec<i32> = q.iter().collect();
    assert_eq!(got, vec![1, 2, 3]);
    assert_eq!(q.unfinished(), 0);
    q.join();
}

#[test]
fn test_iter_acknowledges_item_only_when_next_requested() {
    let q = ClosableQueue::new(0);
    q.put(42);
    q.close();
    let mut it = q.iter();
    assert_eq!(it.next(), Some(42));
    // The item is still being "processed", plus the unread close marker.
    assert_eq!(q.unfinished(), 2);
    assert_eq!(it.next(), None);
    assert_eq!(q.unfinished(), 0);
    assert_eq!(it.next(), None, "iterator stays exhausted");
}

#[test]
fn test_dropping_iter_acknowledges_pending_item() {
    let q = ClosableQueue::new(0);
    q.put("a");
    q.put("b");
    {
        let mut it = q.iter();
        assert_eq!(it.next(), Some("a"));
    }
    assert_eq!(q.unfinished(), 1);
    assert_eq!(q.len(), 1);
}

#[test]
fn test_close_marker_never_collides_with_payload() {
    // `None` is a perfectly good payload; only the marker ends iteration.
    let q: ClosableQueue<Option<u32>> = ClosableQueue::new(0);
    q.put(None);
    q.put(Some(0));
    q.close();
    let got: Vec<Option<u32>> = (&q).into_iter().collect();
    assert_eq!(got, vec![None, Some(0)]);
}

#[test]
fn test_one_close_per_consumer() {
    let q = Arc::new(ClosableQueue::new(4));
    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let q = Arc::clone(&q);
            thread::spawn(move || q.iter().count())
        })
        .collect();
    for i in 0..100 {
        q.put(i);
    }
    for _ in &consumers {
        q.close();
    }
    q.join();
    let total: usize = consumers.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 100);
    assert!(q.is_empty());
}

#[test]
fn test_closing_twice_enqueues_two_markers() {
    let q: ClosableQueue<u8> = ClosableQueue::new(0);
    q.close();
    q.close();
    assert_eq!(q.len(), 2);
    assert_eq!(q.iter().count(), 0);
    assert_eq!(q.len(), 1);
}
