use chrono::{DateTime, Utc};

/// Certificates with more than this many seconds left are left alone.
pub const RENEWAL_THRESHOLD_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalDecision {
    Skip { seconds_remaining: i64 },
    Renew { seconds_remaining: i64 },
}

impl RenewalDecision {
    pub fn seconds_remaining(self) -> i64 {
        match self {
            RenewalDecision::Skip { seconds_remaining }
            | RenewalDecision::Renew { seconds_remaining } => seconds_remaining,
        }
    }

    pub fn is_renew(self) -> bool {
        matches!(self, RenewalDecision::Renew { .. })
    }
}

pub fn evaluate(not_after: DateTime<Utc>, now: DateTime<Utc>) -> RenewalDecision {
    let seconds_remaining = (not_after - now).num_seconds();
    if seconds_remaining > RENEWAL_THRESHOLD_SECS {
        RenewalDecision::Skip { seconds_remaining }
    } else {
        RenewalDecision::Renew { seconds_remaining }
    }
}
