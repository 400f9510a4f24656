/// Session state definitions for the per-route crawl state machine
///
/// A session moves forward through the booking flow phases and ends in
/// either `Done` or `Aborted`.
use std::fmt;

/// Represents the phase a crawl session has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    // ===== Active States =====
    /// Session created, site opened or about to be opened
    Init,

    /// Consent prompt dismissed or confirmed absent
    ConsentHandled,

    /// Search form filled (trip type, airports, date)
    FormFilled,

    /// Search submitted and the result list is visible
    Searched,

    /// Results sorted/filtered and the cheapest offer selected
    Refined,

    /// Offer fields read and parsed
    Extracted,

    // ===== Terminal States =====
    /// A valid offer was produced and stored
    Done,

    /// A fatal step failure ended the session
    Aborted,
}

impl SessionState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Position of the state in the booking flow
    fn rank(&self) -> u8 {
        match self {
            Self::Init => 0,
            Self::ConsentHandled => 1,
            Self::FormFilled => 2,
            Self::Searched => 3,
            Self::Refined => 4,
            Self::Extracted => 5,
            Self::Done => 6,
            Self::Aborted => 7,
        }
    }

    /// Returns true if the machine may move from `self` to `next`
    ///
    /// Phases may be skipped (a deep-link site has no form) or repeated
    /// (several steps complete the same phase), but never revisited once
    /// left. `Aborted` is reachable from every active state; `Done` only
    /// from `Extracted`.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Aborted => true,
            Self::Done => *self == Self::Extracted,
            _ => next.rank() >= self.rank(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::ConsentHandled => "consent_handled",
            Self::FormFilled => "form_filled",
            Self::Searched => "searched",
            Self::Refined => "refined",
            Self::Extracted => "extracted",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!SessionState::Init.is_terminal());
        assert!(!SessionState::Extracted.is_terminal());

        assert!(SessionState::Done.is_terminal());
        assert!(SessionState::Aborted.is_terminal());
    }

    #[test]
    fn test_forward_transitions() {
        assert!(SessionState::Init.can_transition_to(SessionState::ConsentHandled));
        assert!(SessionState::ConsentHandled.can_transition_to(SessionState::FormFilled));
        assert!(SessionState::FormFilled.can_transition_to(SessionState::FormFilled));
        assert!(SessionState::Extracted.can_transition_to(SessionState::Done));

        // Deep-link sites skip the form
        assert!(SessionState::ConsentHandled.can_transition_to(SessionState::Searched));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!SessionState::Searched.can_transition_to(SessionState::FormFilled));
        assert!(!SessionState::Refined.can_transition_to(SessionState::ConsentHandled));
    }

    #[test]
    fn test_done_only_from_extracted() {
        assert!(!SessionState::Init.can_transition_to(SessionState::Done));
        assert!(!SessionState::Refined.can_transition_to(SessionState::Done));
    }

    #[test]
    fn test_aborted_from_any_active_state() {
        for state in [
            SessionState::Init,
            SessionState::ConsentHandled,
            SessionState::FormFilled,
            SessionState::Searched,
            SessionState::Refined,
            SessionState::Extracted,
        ] {
            assert!(state.can_transition_to(SessionState::Aborted));
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        assert!(!SessionState::Done.can_transition_to(SessionState::Aborted));
        assert!(!SessionState::Aborted.can_transition_to(SessionState::Init));
    }
}
