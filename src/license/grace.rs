//! Offline-grace state machine.
//!
//! ```text
//! ONLINE_VALID --lose connectivity--> OFFLINE_GRACE(now + grace)
//! OFFLINE_GRACE --validate before deadline--> OFFLINE_GRACE
//! OFFLINE_GRACE --deadline passed--> EXPIRED_OFFLINE
//! OFFLINE_GRACE | EXPIRED_OFFLINE --reconnect, remote valid--> ONLINE_VALID
//! ```
//!
//! Once `EXPIRED_OFFLINE` is reached, every validation is denied no matter
//! how intact the cached copy is; only a confirmed reconnect recovers.

use crate::TenantgateError;
use chrono::{DateTime, Duration, Utc};

/// Connectivity state of a tenant's license validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraceState {
    /// Last remote validation succeeded.
    OnlineValid,
    /// Operating on the cached sealed copy until the deadline.
    OfflineGrace {
        /// Instant after which offline validation is denied.
        deadline: DateTime<Utc>,
    },
    /// Grace deadline passed; hard deny until reconnect.
    ExpiredOffline,
}

impl GraceState {
    /// Transition on losing connectivity.
    ///
    /// Entering from `OnlineValid` starts a fresh window; an already
    /// offline state keeps its original deadline so repeated failures
    /// cannot extend the grace.
    pub fn lose_connectivity(self, now: DateTime<Utc>, grace_hours: i64) -> Self {
        match self {
            GraceState::OnlineValid => GraceState::OfflineGrace {
                deadline: now + Duration::hours(grace_hours),
            },
            other => other,
        }
    }

    /// Check an offline validation attempt, advancing to `ExpiredOffline`
    /// when the deadline has passed.
    ///
    /// Returns the (possibly advanced) state; `Err(OfflineGraceExpired)`
    /// means the attempt is denied.
    pub fn validate_offline(self, now: DateTime<Utc>) -> (Self, Result<(), TenantgateError>) {
        match self {
            GraceState::OfflineGrace { deadline } if now <= deadline => (self, Ok(())),
            GraceState::OfflineGrace { .. } | GraceState::ExpiredOffline => (
                GraceState::ExpiredOffline,
                Err(TenantgateError::OfflineGraceExpired),
            ),
            // Online state has no business validating offline; treat as a
            // fresh window never granted.
            GraceState::OnlineValid => (self, Ok(())),
        }
    }

    /// Transition on reconnecting to the remote service.
    ///
    /// Only a remote confirmation restores `OnlineValid`; a rejected
    /// license keeps the current state.
    pub fn reconnect(self, remote_valid: bool) -> Self {
        if remote_valid {
            GraceState::OnlineValid
        } else {
            self
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn losing_connectivity_starts_grace_window() {
        let state = GraceState::OnlineValid.lose_connectivity(at(12, 0, 0), 72);
        assert_eq!(
            state,
            GraceState::OfflineGrace {
                deadline: Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()
            }
        );
    }

    #[test]
    fn repeated_failures_do_not_extend_deadline() {
        let state = GraceState::OnlineValid.lose_connectivity(at(12, 0, 0), 72);
        let later = state.lose_connectivity(at(20, 0, 0), 72);
        assert_eq!(state, later);
    }

    #[test]
    fn validation_one_second_before_deadline_succeeds() {
        let deadline = at(12, 0, 0);
        let state = GraceState::OfflineGrace { deadline };
        let (next, result) = state.validate_offline(deadline - Duration::seconds(1));
        assert!(result.is_ok());
        assert_eq!(next, state);
    }

    #[test]
    fn validation_one_second_after_deadline_denied() {
        let deadline = at(12, 0, 0);
        let state = GraceState::OfflineGrace { deadline };
        let (next, result) = state.validate_offline(deadline + Duration::seconds(1));
        assert!(matches!(result, Err(TenantgateError::OfflineGraceExpired)));
        assert_eq!(next, GraceState::ExpiredOffline);
    }

    #[test]
    fn expired_offline_stays_denied() {
        let (next, result) = GraceState::ExpiredOffline.validate_offline(at(0, 0, 1));
        assert!(matches!(result, Err(TenantgateError::OfflineGraceExpired)));
        assert_eq!(next, GraceState::ExpiredOffline);
    }

    #[test]
    fn reconnect_with_valid_remote_restores_online() {
        assert_eq!(
            GraceState::ExpiredOffline.reconnect(true),
            GraceState::OnlineValid
        );
        let grace = GraceState::OfflineGrace { deadline: at(1, 0, 0) };
        assert_eq!(grace.reconnect(true), GraceState::OnlineValid);
    }

    #[test]
    fn reconnect_with_invalid_remote_keeps_state() {
        assert_eq!(
            GraceState::ExpiredOffline.reconnect(false),
            GraceState::ExpiredOffline
        );
    }
}
