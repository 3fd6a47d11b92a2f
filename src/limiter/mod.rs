//! Per-upstream token-bucket admission control.
//!
//! Each upstream client owns one [`TokenBucket`], so exhausting one
//! upstream's budget never blocks another's. Refill is integer-interval
//! based: a partial interval yields nothing, and excess refill beyond the
//! bucket capacity is discarded, not banked. Queued callers are admitted in
//! strict arrival order by a drain timer that re-arms itself until the queue
//! empties.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Token bucket parameters.
#[derive(Debug, Clone, Copy)]
pub struct BucketConfig {
    /// Hard capacity ceiling.
    pub max_tokens: u32,
    /// Tokens added per elapsed refill interval.
    pub refill_amount: u32,
    /// Length of one refill interval.
    pub refill_interval: Duration,
}

/// Observability snapshot returned by [`TokenBucket::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketState {
    pub available: u32,
    pub pending: usize,
}

struct State {
    tokens: u32,
    last_refill: Instant,
    waiters: VecDeque<oneshot::Sender<()>>,
    timer_armed: bool,
}

/// A FIFO-fair token bucket.
///
/// [`acquire`](TokenBucket::acquire) resolves immediately while tokens are
/// available and no one is queued; otherwise the caller joins a wait queue
/// and is resolved by a future refill, never out of arrival order.
pub struct TokenBucket {
    config: BucketConfig,
    state: Arc<Mutex<State>>,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(config: BucketConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                tokens: config.max_tokens,
                last_refill: Instant::now(),
                waiters: VecDeque::new(),
                timer_armed: false,
            })),
            config,
        }
    }

    /// Acquire one token, suspending if none is available.
    ///
    /// A caller that finds the queue non-empty always queues behind it, even
    /// when a token happens to be free, preserving FIFO admission.
    pub async fn acquire(&self) {
        let rx = {
            let mut st = self.state.lock();
            refill(&mut st, &self.config, Instant::now());

            if st.waiters.is_empty() && st.tokens > 0 {
                st.tokens -= 1;
                return;
            }

            let (tx, rx) = oneshot::channel();
            st.waiters.push_back(tx);
            if !st.timer_armed {
                st.timer_armed = true;
                self.spawn_drain();
            }
            rx
        };

        // The drain task holds the shared state alive, so the sender side is
        // only dropped after a send.
        let _ = rx.await;
    }

    /// Snapshot `(available, pending)` after recomputing the refill.
    pub fn state(&self) -> BucketState {
        let mut st = self.state.lock();
        refill(&mut st, &self.config, Instant::now());
        BucketState {
            available: st.tokens,
            pending: st.waiters.len(),
        }
    }

    /// Arm the drain timer: sleep to the next refill boundary, refill, admit
    /// queued callers FIFO while tokens last, and re-arm until the queue is
    /// empty.
    fn spawn_drain(&self) {
        let state = Arc::clone(&self.state);
        let config = self.config;
        tokio::spawn(async move {
            loop {
                let deadline = {
                    let st = state.lock();
                    st.last_refill + config.refill_interval
                };
                tokio::time::sleep_until(deadline).await;

                let mut st = state.lock();
                refill(&mut st, &config, Instant::now());

                while st.tokens > 0 {
                    match st.waiters.pop_front() {
                        Some(tx) => {
                            st.tokens -= 1;
                            if tx.send(()).is_err() {
                                // Caller gave up while queued; return the token.
                                st.tokens += 1;
                            }
                        }
                        None => break,
                    }
                }

                if st.waiters.is_empty() {
                    st.timer_armed = false;
                    break;
                }
            }
        });
    }
}

/// Add `refill_amount` tokens per whole elapsed interval, capped at
/// `max_tokens`. `last_refill` advances by whole intervals only, so partial
/// intervals carry over rather than being lost or double-counted.
fn refill(st: &mut State, config: &BucketConfig, now: Instant) {
    let elapsed = now.saturating_duration_since(st.last_refill);
    let interval_nanos = config.refill_interval.as_nanos();
    if interval_nanos == 0 {
        return;
    }

    let intervals = elapsed.as_nanos() / interval_nanos;
    if intervals == 0 {
        return;
    }

    let added = u64::try_from(intervals)
        .unwrap_or(u64::MAX)
        .saturating_mul(config.refill_amount as u64);
    st.tokens = (st.tokens as u64 + added).min(config.max_tokens as u64) as u32;

    let remainder = elapsed.as_nanos() % interval_nanos;
    st.last_refill = now - Duration::from_nanos(remainder as u64);
}
