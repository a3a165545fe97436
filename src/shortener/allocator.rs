//! Short code allocation with collision retry and length escalation.
//!
//! Codes are random draws from a 62 symbol alphabet. Each length gets a fixed
//! number of existence checks before the length grows; once the longest
//! length is exhausted a timestamp based code is returned unchecked. The
//! existence check is advisory: the store's uniqueness constraint on insert
//! is what actually guarantees uniqueness.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::ShortenerError;
use crate::storage::Storage;

pub const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const INITIAL_LENGTH: usize = 6;
pub const MAX_LENGTH: usize = 8;
pub const ATTEMPTS_PER_LENGTH: usize = 5;
const FALLBACK_SUFFIX_LENGTH: usize = 3;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Last millisecond value handed out to a fallback code in this process
static LAST_FALLBACK_MILLIS: AtomicU64 = AtomicU64::new(0);

pub struct CodeAllocator {
    storage: Arc<dyn Storage>,
}

impl CodeAllocator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Produce a short code that was not in use when checked.
    ///
    /// Performs at most `ATTEMPTS_PER_LENGTH` checks for every length from
    /// `INITIAL_LENGTH` to `MAX_LENGTH`, then falls back to
    /// [`fallback_code`]. Fails only when an existence check fails.
    pub async fn allocate(&self) -> Result<String, ShortenerError> {
        for length in INITIAL_LENGTH..=MAX_LENGTH {
            for attempt in 1..=ATTEMPTS_PER_LENGTH {
                let code = random_code(length);
                let taken = self
                    .storage
                    .exists(&code)
                    .await
                    .map_err(|e| ShortenerError::StoreUnavailable(e.to_string()))?;

                if !taken {
                    return Ok(code);
                }

                debug!(length, attempt, "short code collision");
            }

            debug!(length, "collision budget exhausted, escalating code length");
        }

        let code = fallback_code();
        warn!(
            short_code = %code,
            "all random lengths collided, using timestamp fallback code"
        );
        Ok(code)
    }
}

/// `length` independent uniform draws from [`ALPHABET`]
pub fn random_code(length: usize) -> String {
    std::iter::repeat_with(|| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
        .take(length)
        .collect()
}

/// Base-36 encoding of a per-process monotonic millisecond timestamp followed
/// by `FALLBACK_SUFFIX_LENGTH` random alphabet symbols. Not existence checked.
pub fn fallback_code() -> String {
    let mut code = to_base36(next_fallback_millis());
    code.push_str(&random_code(FALLBACK_SUFFIX_LENGTH));
    code
}

/// Wall-clock milliseconds, bumped past the previous value when the clock
/// has not advanced (or went backwards) since the last call.
fn next_fallback_millis() -> u64 {
    let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut last = LAST_FALLBACK_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_FALLBACK_MILLIS.compare_exchange_weak(
            last,
            next,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
