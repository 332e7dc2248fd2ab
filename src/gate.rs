use std::time::Duration;

use time::OffsetDateTime;

use crate::session::Session;

/// How long after a refresh attempt the next one becomes due, unless configured otherwise.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Whether a session last refreshed at `last_refreshed_at` is due for another refresh at `now`.
///
/// A session that was never refreshed is not due. Otherwise it is due once strictly more than
/// `threshold` has passed. A threshold reaching past the representable date range is never
/// reached, so the session is not due.
pub fn is_due(
    last_refreshed_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
    threshold: Duration,
) -> bool {
    let Some(last) = last_refreshed_at else {
        return false;
    };
    match time::Duration::try_from(threshold)
        .ok()
        .and_then(|threshold| last.checked_add(threshold))
    {
        Some(due_at) => now > due_at,
        None => false,
    }
}

/// Outcome of consulting the [`RefreshGate`] for one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateDecision {
    pub due: bool,
    /// Last refresh time as read from the session, before any baseline was recorded.
    pub last_refreshed_at: Option<OffsetDateTime>,
}

/// Time-based gate limiting how often the identity backend is contacted for a session.
#[derive(Clone, Copy, Debug)]
pub struct RefreshGate {
    threshold: Duration,
}

impl RefreshGate {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Decides whether `session` is due for a refresh, reading its timestamp once.
    ///
    /// On the first observation of a session this records `now` as its baseline and is not due.
    pub fn evaluate(&self, session: &Session, now: OffsetDateTime) -> GateDecision {
        let last_refreshed_at = session.last_refreshed_at();
        if last_refreshed_at.is_none() {
            session.set_last_refreshed_at(now);
        }
        GateDecision {
            due: is_due(last_refreshed_at, now, self.threshold),
            last_refreshed_at,
        }
    }
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}

#[cfg(test)]
mod test {
    use time::macros::datetime;

    use super::*;
    use crate::session::MemorySession;

    const NOW: OffsetDateTime = datetime!(2024-05-01 12:00:00 UTC);

    fn aged(secs: i64) -> Option<OffsetDateTime> {
        Some(NOW - time::Duration::seconds(secs))
    }

    #[test]
    fn test_never_due_without_previous_refresh() {
        assert!(!is_due(None, NOW, DEFAULT_REFRESH_INTERVAL));
        assert!(!is_due(None, NOW, Duration::ZERO));
    }

    #[test]
    fn test_threshold_boundary() {
        for age in [0, 1, 10, 29, 30] {
            assert!(!is_due(aged(age), NOW, DEFAULT_REFRESH_INTERVAL), "age {age}s");
        }
        for age in [31, 45, 3600] {
            assert!(is_due(aged(age), NOW, DEFAULT_REFRESH_INTERVAL), "age {age}s");
        }
        assert!(is_due(
            Some(NOW - time::Duration::milliseconds(30_001)),
            NOW,
            DEFAULT_REFRESH_INTERVAL
        ));
    }

    #[test]
    fn test_first_observation_records_baseline() {
        let session = Session::new(MemorySession::new());
        let gate = RefreshGate::default();

        let first = gate.evaluate(&session, NOW);
        assert!(!first.due);
        assert_eq!(first.last_refreshed_at, None);
        assert_eq!(session.last_refreshed_at(), Some(NOW));

        let later = NOW + Duration::from_secs(31);
        assert_eq!(
            gate.evaluate(&session, later),
            GateDecision {
                due: true,
                last_refreshed_at: Some(NOW),
            }
        );
        // Evaluating an observed session never moves its timestamp.
        assert_eq!(session.last_refreshed_at(), Some(NOW));
    }

    #[test]
    fn test_configured_threshold() {
        let session = Session::new(MemorySession::new());
        session.set_last_refreshed_at(NOW - time::Duration::seconds(6));

        assert!(RefreshGate::new(Duration::from_secs(5)).evaluate(&session, NOW).due);
        assert!(!RefreshGate::new(Duration::from_secs(60)).evaluate(&session, NOW).due);
    }

    #[test]
    fn test_unrepresentable_threshold_is_never_due() {
        let session = Session::new(MemorySession::new());
        session.set_last_refreshed_at(NOW - time::Duration::seconds(45));

        let gate = RefreshGate::new(Duration::from_secs(u64::MAX / 2));
        assert!(!gate.evaluate(&session, NOW).due);
        assert!(!is_due(aged(45), NOW, Duration::MAX));
    }

    #[test]
    fn test_last_refresh_near_date_limit_is_not_due() {
        let last = Some(datetime!(9999-12-31 23:59:50 UTC));
        assert!(!is_due(last, NOW, DEFAULT_REFRESH_INTERVAL));
    }
}
