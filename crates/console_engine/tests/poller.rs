use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use console_engine::JobPoller;
use tokio::runtime::Handle;

fn counting(ticks: &Arc<AtomicUsize>) -> impl Fn() + Send + 'static {
    let ticks = ticks.clone();
    move || {
        ticks.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ticks_immediately_then_periodically() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let _poller = JobPoller::start(&Handle::current(), Duration::from_millis(20), counting(&ticks));

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(ticks.load(Ordering::SeqCst) >= 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(ticks.load(Ordering::SeqCst) >= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_ends_ticking() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let mut poller =
        JobPoller::start(&Handle::current(), Duration::from_millis(10), counting(&ticks));
    tokio::time::sleep(Duration::from_millis(35)).await;

    poller.stop();
    assert!(!poller.is_running());
    tokio::time::sleep(Duration::from_millis(10)).await;
    let after_stop = ticks.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn drop_tears_down_timer() {
    let ticks = Arc::new(AtomicUsize::new(0));
    {
        let _poller =
            JobPoller::start(&Handle::current(), Duration::from_millis(10), counting(&ticks));
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    let after_drop = ticks.load(Ordering::SeqCst);
    assert!(after_drop >= 1);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), after_drop);
}
