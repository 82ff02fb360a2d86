use crate::cache::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy)]
struct UserState {
    last_call: Option<Instant>,
    blocked_until: Option<Instant>,
}

/// Per-user spacing of upstream calls, with a longer cool-down once the
/// upstream has rate-limited a user.
pub struct UserRateLimiter {
    min_interval: Duration,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
    users: Mutex<HashMap<String, UserState>>,
}

impl UserRateLimiter {
    pub fn new(min_interval: Duration, cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            cooldown,
            clock,
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Reserve a call slot for `user`, or report how long to wait.
    pub fn acquire(&self, user: &str) -> Result<(), Duration> {
        let now = self.clock.now();
        let Ok(mut users) = self.users.lock() else {
            return Ok(());
        };
        let state = users.entry(user.to_string()).or_default();

        if let Some(until) = state.blocked_until {
            if now < until {
                return Err(until - now);
            }
            state.blocked_until = None;
        }
        if let Some(last) = state.last_call {
            let next = last + self.min_interval;
            if now < next {
                return Err(next - now);
            }
        }
        state.last_call = Some(now);
        Ok(())
    }

    /// Block `user` for the cool-down period.
    pub fn penalize(&self, user: &str) {
        let until = self.clock.now() + self.cooldown;
        if let Ok(mut users) = self.users.lock() {
            users.entry(user.to_string()).or_default().blocked_until = Some(until);
        }
    }

    pub fn is_blocked(&self, user: &str) -> bool {
        let now = self.clock.now();
        self.users
            .lock()
            .ok()
            .and_then(|users| users.get(user).and_then(|s| s.blocked_until))
            .map(|until| now < until)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn limiter() -> (Arc<ManualClock>, UserRateLimiter) {
        let clock = Arc::new(ManualClock::new());
        let limiter = UserRateLimiter::new(
            Duration::from_secs(10),
            Duration::from_secs(900),
            clock.clone(),
        );
        (clock, limiter)
    }

    #[test]
    fn test_min_interval_per_user() {
        let (clock, limiter) = limiter();
        assert!(limiter.acquire("ana").is_ok());
        assert_eq!(limiter.acquire("ana"), Err(Duration::from_secs(10)));
        // other users are independent
        assert!(limiter.acquire("bo").is_ok());

        clock.advance(Duration::from_secs(10));
        assert!(limiter.acquire("ana").is_ok());
    }

    #[test]
    fn test_cooldown_after_penalty() {
        let (clock, limiter) = limiter();
        limiter.penalize("ana");
        assert!(limiter.is_blocked("ana"));
        assert_eq!(limiter.acquire("ana"), Err(Duration::from_secs(900)));

        clock.advance(Duration::from_secs(899));
        assert!(limiter.acquire("ana").is_err());
        clock.advance(Duration::from_secs(1));
        assert!(!limiter.is_blocked("ana"));
        assert!(limiter.acquire("ana").is_ok());
    }
}
