// tests/coalescer.rs

mod common;
use crate::common::{init_tracing, p};

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use devloop::watch::{Batch, Coalescer, NotificationSource, RawEvent};

#[tokio::test(start_paused = true)]
async fn burst_is_released_as_one_batch() {
    init_tracing();
    let (tx, mut source) = NotificationSource::channel();
    let cancel = CancellationToken::new();
    let mut coalescer = Coalescer::new(Duration::from_millis(100));

    tx.send_event(RawEvent::create(p("a")));
    tx.send_event(RawEvent::write(p("a")));
    tx.send_event(RawEvent::write(p("b")));

    let batch = coalescer.next_batch(&mut source, &cancel).await;
    assert_eq!(
        batch,
        Batch::Events(vec![
            RawEvent::create(p("a")),
            RawEvent::write(p("a")),
            RawEvent::write(p("b")),
        ])
    );
}

#[tokio::test(start_paused = true)]
async fn each_event_extends_the_quiet_window() {
    let (tx, mut source) = NotificationSource::channel();
    let cancel = CancellationToken::new();
    let mut coalescer = Coalescer::new(Duration::from_millis(100));

    let feeder = tokio::spawn(async move {
        tx.send_event(RawEvent::write(p("one")));
        sleep(Duration::from_millis(60)).await;
        tx.send_event(RawEvent::write(p("two")));
        sleep(Duration::from_millis(60)).await;
        tx.send_event(RawEvent::write(p("three")));
        sleep(Duration::from_millis(500)).await;
        tx.send_event(RawEvent::write(p("four")));
        tx
    });

    let started = Instant::now();
    let first = coalescer.next_batch(&mut source, &cancel).await;
    assert_eq!(
        first,
        Batch::Events(vec![
            RawEvent::write(p("one")),
            RawEvent::write(p("two")),
            RawEvent::write(p("three")),
        ])
    );
    // Released one full window after the last event of the burst.
    assert!(started.elapsed() >= Duration::from_millis(220));

    let second = coalescer.next_batch(&mut source, &cancel).await;
    assert_eq!(second, Batch::Events(vec![RawEvent::write(p("four"))]));

    let _tx = feeder.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancellation_discards_partial_burst() {
    let (tx, mut source) = NotificationSource::channel();
    let cancel = CancellationToken::new();
    let mut coalescer = Coalescer::new(Duration::from_millis(100));

    tx.send_event(RawEvent::write(p("partial")));
    cancel.cancel();

    let batch = coalescer.next_batch(&mut source, &cancel).await;
    assert_eq!(batch, Batch::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_quiet_window_wins() {
    let (tx, mut source) = NotificationSource::channel();
    let cancel = CancellationToken::new();
    let mut coalescer = Coalescer::new(Duration::from_millis(100));

    tx.send_event(RawEvent::write(p("partial")));
    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let batch = coalescer.next_batch(&mut source, &cancel).await;
    assert_eq!(batch, Batch::Cancelled);
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn source_error_takes_priority_over_buffered_events() {
    let (tx, mut source) = NotificationSource::channel();
    let cancel = CancellationToken::new();
    let mut coalescer = Coalescer::new(Duration::from_millis(100));

    tx.send_event(RawEvent::write(p("a")));
    tx.send_event(RawEvent::write(p("b")));
    tx.send_error("error1");

    let batch = coalescer.next_batch(&mut source, &cancel).await;
    assert_eq!(batch, Batch::SourceError("error1".to_string()));
}

#[tokio::test(start_paused = true)]
async fn closed_source_is_reported() {
    let (tx, mut source) = NotificationSource::channel();
    let cancel = CancellationToken::new();
    let mut coalescer = Coalescer::new(Duration::from_millis(100));
    drop(tx);

    let batch = coalescer.next_batch(&mut source, &cancel).await;
    assert_eq!(batch, Batch::Closed);
}

#[tokio::test(start_paused = true)]
async fn buffered_events_are_flushed_before_close() {
    let (tx, mut source) = NotificationSource::channel();
    let cancel = CancellationToken::new();
    let mut coalescer = Coalescer::default();

    tx.send_event(RawEvent::write(p("last")));
    drop(tx);

    let first = coalescer.next_batch(&mut source, &cancel).await;
    assert_eq!(first, Batch::Events(vec![RawEvent::write(p("last"))]));
    let second = coalescer.next_batch(&mut source, &cancel).await;
    assert_eq!(second, Batch::Closed);
}
