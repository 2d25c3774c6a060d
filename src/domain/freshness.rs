//! Time-to-live arithmetic for cached entries.

use std::time::Duration;

use time::OffsetDateTime;

/// Whether an entry stored at `stored_at` is still servable at `now`.
///
/// An entry is fresh strictly before `stored_at + ttl`; at the boundary it is stale.
pub fn is_fresh(stored_at: OffsetDateTime, now: OffsetDateTime, ttl: Duration) -> bool {
    // An expiry past the representable range never arrives.
    let Ok(ttl) = time::Duration::try_from(ttl) else {
        return true;
    };
    match stored_at.checked_add(ttl) {
        Some(expires_at) => now < expires_at,
        None => true,
    }
}
