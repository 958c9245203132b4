/*!
 * Fixed-window rate limiting.
 *
 * Two flavours share the same window arithmetic:
 * - `RateLimiter` guards outbound provider calls and makes callers wait for the
 *   next window when the budget is spent.
 * - `KeyedRateLimiter` guards the HTTP API per client key and rejects with the
 *   time until the client's window resets.
 *
 * Both use `tokio::time::Instant` so paused-clock tests drive them deterministically.
 */

use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Entries kept before expired client windows are swept
const SWEEP_THRESHOLD: usize = 1024;

/// One fixed window of `capacity` tokens
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    used: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self { started: now, used: 0 }
    }

    /// Take a token, or report how long until the window resets
    fn take(&mut self, now: Instant, capacity: u32, length: Duration) -> Result<u32, Duration> {
        if now.duration_since(self.started) >= length {
            *self = Window::new(now);
        }
        if self.used < capacity {
            self.used += 1;
            Ok(capacity - self.used)
        } else {
            Err((self.started + length).saturating_duration_since(now))
        }
    }

    fn expired(&self, now: Instant, length: Duration) -> bool {
        now.duration_since(self.started) >= length
    }
}

/// Blocking limiter for outbound calls
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl RateLimiter {
    /// Create a limiter allowing `capacity` acquisitions per `window`
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            window,
            state: Mutex::new(Window::new(Instant::now())),
        }
    }

    /// Take a token without waiting
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.state
            .lock()
            .take(Instant::now(), self.capacity, self.window)
            .map(|_| ())
    }

    /// Take a token, sleeping until the next window if the current one is spent
    pub async fn acquire(&self) {
        loop {
            match self.try_acquire() {
                Ok(()) => return,
                Err(wait) => {
                    debug!("Rate limit reached, waiting {:?} for the next window", wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Tokens left in the current window
    pub fn available(&self) -> u32 {
        let state = self.state.lock();
        if state.expired(Instant::now(), self.window) {
            self.capacity
        } else {
            self.capacity.saturating_sub(state.used)
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

/// Outcome of a keyed check that was allowed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allowance {
    /// Requests left for this key in the current window
    pub remaining: u32,
}

/// Rejecting limiter keyed by client identity
#[derive(Debug)]
pub struct KeyedRateLimiter {
    capacity: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl KeyedRateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `key`; `Err` carries the time until the key may retry
    pub fn check(&self, key: &str) -> Result<Allowance, Duration> {
        let now = Instant::now();
        let mut clients = self.clients.lock();

        if clients.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| !w.expired(now, window));
        }

        clients
            .entry(key.to_string())
            .or_insert_with(|| Window::new(now))
            .take(now, self.capacity, self.window)
            .map(|remaining| Allowance { remaining })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
