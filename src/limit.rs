//! Client-side rate limiting — dual sliding windows.
//!
//! The broker publishes hard quotas (100 calls/minute, 5000 calls/day); the
//! defaults here sit below them to absorb clock skew and in-flight requests.
//! One limiter instance is shared between the synchronous call path and the
//! streaming listener, so check-and-record runs as a single critical section
//! behind one mutex.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_lock::Mutex;

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Window capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub per_minute: usize,
    pub per_day: usize,
}

impl Default for RateLimits {
    fn default() -> Self {
        // Safety margin below the broker's 100/minute and 5000/day.
        Self {
            per_minute: 90,
            per_day: 5000,
        }
    }
}

/// Outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Over budget; `retry_after` is when the binding window frees a slot.
    Rejected { retry_after: Duration },
}

struct Windows {
    minute: VecDeque<Instant>,
    day: VecDeque<Instant>,
}

/// Sliding-window call budget, safe under concurrent admission attempts.
pub struct RateLimiter {
    limits: RateLimits,
    windows: Mutex<Windows>,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            windows: Mutex::new(Windows {
                minute: VecDeque::new(),
                day: VecDeque::new(),
            }),
        }
    }

    /// Attempt to admit one call at `now`.
    ///
    /// Stale entries are pruned lazily, then both counters must be under
    /// capacity; on admission `now` is recorded in both windows within the
    /// same lock, so concurrent callers can never overshoot a budget. On
    /// rejection the hint is the wait until the oldest entry of the more
    /// constrained window (the longer of the two waits) slides out.
    pub async fn try_admit(&self, now: Instant) -> Admission {
        let mut w = self.windows.lock().await;
        prune(&mut w.minute, now, MINUTE);
        prune(&mut w.day, now, DAY);

        let minute_full = w.minute.len() >= self.limits.per_minute;
        let day_full = w.day.len() >= self.limits.per_day;

        if !minute_full && !day_full {
            w.minute.push_back(now);
            w.day.push_back(now);
            return Admission::Admitted;
        }

        let mut retry_after = Duration::ZERO;
        if minute_full {
            if let Some(oldest) = w.minute.front() {
                retry_after = retry_after.max(until_free(*oldest, now, MINUTE));
            }
        }
        if day_full {
            if let Some(oldest) = w.day.front() {
                retry_after = retry_after.max(until_free(*oldest, now, DAY));
            }
        }

        tracing::debug!(retry_after_ms = retry_after.as_millis() as u64, "rate limit hit");
        Admission::Rejected { retry_after }
    }

    /// Block-until-admitted policy: sleep on each rejection hint and retry.
    pub async fn admit(&self) {
        loop {
            match self.try_admit(Instant::now()).await {
                Admission::Admitted => return,
                Admission::Rejected { retry_after } => {
                    let wait = retry_after.max(Duration::from_millis(10));
                    futures_timer::Delay::new(wait).await;
                }
            }
        }
    }

    /// Current `(per_minute, per_day)` usage after pruning.
    pub async fn usage(&self, now: Instant) -> (usize, usize) {
        let mut w = self.windows.lock().await;
        prune(&mut w.minute, now, MINUTE);
        prune(&mut w.day, now, DAY);
        (w.minute.len(), w.day.len())
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
    while let Some(oldest) = window.front() {
        if now.duration_since(*oldest) >= span {
            window.pop_front();
        } else {
            break;
        }
    }
}

fn until_free(oldest: Instant, now: Instant, span: Duration) -> Duration {
    (oldest + span).saturating_duration_since(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(per_minute: usize, per_day: usize) -> RateLimiter {
        RateLimiter::new(RateLimits {
            per_minute,
            per_day,
        })
    }

    #[tokio::test]
    async fn test_admits_up_to_capacity_then_rejects() {
        let rl = limiter(3, 100);
        let t0 = Instant::now();

        for i in 0..3 {
            let at = t0 + Duration::from_secs(i);
            assert_eq!(rl.try_admit(at).await, Admission::Admitted);
        }

        match rl.try_admit(t0 + Duration::from_secs(3)).await {
            Admission::Rejected { retry_after } => {
                // Oldest entry was at t0; it frees at t0 + 60s.
                assert_eq!(retry_after, Duration::from_secs(57));
            }
            Admission::Admitted => panic!("fourth call within the minute must be rejected"),
        }
    }

    #[tokio::test]
    async fn test_admits_again_after_window_slides() {
        let rl = limiter(3, 100);
        let t0 = Instant::now();

        for _ in 0..3 {
            assert_eq!(rl.try_admit(t0).await, Admission::Admitted);
        }
        assert!(matches!(
            rl.try_admit(t0 + Duration::from_secs(1)).await,
            Admission::Rejected { .. }
        ));

        // All three entries have left the minute window.
        let later = t0 + Duration::from_secs(61);
        assert_eq!(rl.try_admit(later).await, Admission::Admitted);
        assert_eq!(rl.usage(later).await, (1, 4));
    }

    #[tokio::test]
    async fn test_day_window_binds_when_minute_is_free() {
        let rl = limiter(100, 2);
        let t0 = Instant::now();

        assert_eq!(rl.try_admit(t0).await, Admission::Admitted);
        assert_eq!(rl.try_admit(t0).await, Admission::Admitted);

        // Minute window has slid, the day window has not.
        let later = t0 + Duration::from_secs(120);
        match rl.try_admit(later).await {
            Admission::Rejected { retry_after } => {
                assert_eq!(retry_after, DAY - Duration::from_secs(120));
            }
            Admission::Admitted => panic!("day budget must bind"),
        }
    }

    #[tokio::test]
    async fn test_hint_is_the_longer_of_the_two_waits() {
        let rl = limiter(1, 1);
        let t0 = Instant::now();
        assert_eq!(rl.try_admit(t0).await, Admission::Admitted);

        match rl.try_admit(t0 + Duration::from_secs(1)).await {
            Admission::Rejected { retry_after } => {
                // Both windows are full; the day window needs the longer wait.
                assert_eq!(retry_after, DAY - Duration::from_secs(1));
            }
            Admission::Admitted => panic!("both budgets are exhausted"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admissions_never_exceed_capacity() {
        let rl = Arc::new(limiter(3, 100));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let rl = Arc::clone(&rl);
            handles.push(tokio::spawn(async move {
                rl.try_admit(Instant::now()).await
            }));
        }

        let mut admitted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Admission::Admitted => admitted += 1,
                Admission::Rejected { retry_after } => {
                    assert!(retry_after > Duration::ZERO);
                    rejected += 1;
                }
            }
        }

        assert_eq!(admitted, 3);
        assert_eq!(rejected, 7);
    }
}
