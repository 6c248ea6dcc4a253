#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use cloudsyncd::Clock;
use futures::future;
use tokio::{sync::Notify, time::Instant};

/// Clock that never waits.
/// Each sleep jumps to its deadline. Once `max_sleeps` is reached,
/// sleeping blocks forever and `exhausted` resolves.
pub struct Stub {
    now: Mutex<Instant>,
    deadlines: Mutex<Vec<Instant>>,
    sleeps: AtomicUsize,
    max_sleeps: usize,
    exhausted: Notify,
}

impl Stub {
    pub fn new(max_sleeps: usize) -> Self {
        Self {
            now: Mutex::new(Instant::now()),
            deadlines: Mutex::new(Vec::new()),
            sleeps: AtomicUsize::new(0),
            max_sleeps,
            exhausted: Notify::new(),
        }
    }

    /// Delays between successive deadlines
    pub fn intervals(&self) -> Vec<Duration> {
        let deadlines = self.deadlines.lock().unwrap();
        deadlines.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }

    pub async fn exhausted(&self) {
        self.exhausted.notified().await
    }
}

impl Clock for Stub {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }

    async fn sleep_until(&self, deadline: Instant) {
        let count = self.sleeps.fetch_add(1, Ordering::SeqCst) + 1;
        self.deadlines.lock().unwrap().push(deadline);
        {
            let mut now = self.now.lock().unwrap();
            if deadline > *now {
                *now = deadline;
            }
        }
        if count >= self.max_sleeps {
            self.exhausted.notify_one();
            future::pending::<()>().await;
        }
        tokio::task::yield_now().await;
    }
}
