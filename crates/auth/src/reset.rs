use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use vocalyx_core::UserId;

/// Default lifetime of a reset token, in seconds (15 minutes).
pub const DEFAULT_RESET_TTL_SECS: i64 = 900;

/// One-time credential recovery token.
///
/// Only the latest unused token per user is meant to be live: issuing a new
/// one marks the older ones used (done by the store in the same write).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetToken {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl core::fmt::Debug for PasswordResetToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordResetToken")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .field("used", &self.used)
            .finish_non_exhaustive()
    }
}

impl PasswordResetToken {
    /// Fresh token: 32 random bytes, hex encoded.
    pub fn issue(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            token: hex::encode(bytes),
            user_id,
            expires_at: now + ttl,
            used: false,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }
}
