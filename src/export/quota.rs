use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;

/// Per-user hourly export allowance.
///
/// Only exports that produced a file draw from the allowance; a request
/// rejected for another reason never consumes it.
pub struct ExportQuota {
    limiter: DefaultKeyedRateLimiter<String>,
    per_hour: NonZeroU32,
}

impl ExportQuota {
    /// A zero quota is treated as one export per hour.
    #[must_use]
    pub fn per_hour(exports: u32) -> Self {
        let per_hour = NonZeroU32::new(exports).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_hour(per_hour)),
            per_hour,
        }
    }

    #[must_use]
    pub const fn per_hour_limit(&self) -> u32 {
        self.per_hour.get()
    }

    /// Draw one export for `user_id`. `false` when the allowance is used up.
    pub fn try_acquire(&self, user_id: &str) -> bool {
        self.limiter.check_key(&user_id.to_string()).is_ok()
    }
}
