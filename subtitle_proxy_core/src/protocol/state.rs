//! Session state management
//!
//! This module implements the state machine for the remote session lifecycle:
//! `LoggedOut → LoggingIn → Authenticated → (Expired | LoggedOut)`.

use std::fmt;
use std::time::{Duration, Instant};

/// Session state of the remote client
#[derive(Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No session token
    LoggedOut,
    /// Login exchange in progress
    LoggingIn,
    /// Holding a token accepted by the server
    Authenticated { token: String, obtained_at: Instant },
    /// Token was rejected or outlived its lifetime
    Expired,
}

impl SessionState {
    /// Check if a token is currently held
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    /// Get the token if authenticated and younger than `ttl`
    pub fn fresh_token(&self, ttl: Duration) -> Option<&str> {
        match self {
            SessionState::Authenticated { token, obtained_at } if obtained_at.elapsed() < ttl => {
                Some(token)
            }
            _ => None,
        }
    }

    /// Age of the current token, if any
    pub fn age(&self) -> Option<Duration> {
        match self {
            SessionState::Authenticated { obtained_at, .. } => Some(obtained_at.elapsed()),
            _ => None,
        }
    }

    /// Short state name without the token
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::LoggedOut => "logged_out",
            SessionState::LoggingIn => "logging_in",
            SessionState::Authenticated { .. } => "authenticated",
            SessionState::Expired => "expired",
        }
    }
}

// Never print the token
impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Authenticated { obtained_at, .. } => f
                .debug_struct("Authenticated")
                .field("token", &"***")
                .field("age", &obtained_at.elapsed())
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::LoggedOut => write!(f, "Logged out"),
            SessionState::LoggingIn => write!(f, "Logging in"),
            SessionState::Authenticated { obtained_at, .. } => {
                write!(f, "Authenticated ({}s old)", obtained_at.elapsed().as_secs())
            }
            SessionState::Expired => write!(f, "Expired"),
        }
    }
}

/// State transition validator
pub struct StateTransition<'a> {
    from: &'a SessionState,
    to: &'a SessionState,
}

impl<'a> StateTransition<'a> {
    /// Create a new state transition
    pub fn new(from: &'a SessionState, to: &'a SessionState) -> Self {
        Self { from, to }
    }

    /// Check if the transition is valid according to the state machine rules
    pub fn is_valid(&self) -> bool {
        use SessionState::*;

        match (self.from, self.to) {
            (LoggedOut, LoggingIn) => true,

            (LoggingIn, Authenticated { .. }) => true,
            (LoggingIn, LoggedOut) => true, // Login failed

            (Authenticated { .. }, Expired) => true,
            (Authenticated { .. }, LoggedOut) => true,
            (Authenticated { .. }, LoggingIn) => true, // Token outlived its ttl

            (Expired, LoggingIn) => true,
            (Expired, LoggedOut) => true,

            // Logout is always allowed as a reset
            (LoggedOut, LoggedOut) => true,

            _ => false,
        }
    }

    /// Get a description of why a transition might be invalid
    pub fn validation_error(&self) -> Option<String> {
        if self.is_valid() {
            None
        } else {
            Some(format!(
                "Invalid transition from {} to {}",
                self.from.name(),
                self.to.name()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticated() -> SessionState {
        SessionState::Authenticated {
            token: "abc123".to_string(),
            obtained_at: Instant::now(),
        }
    }

    #[test]
    fn test_state_capabilities() {
        let ttl = Duration::from_secs(60);

        assert!(!SessionState::LoggedOut.is_authenticated());
        assert_eq!(SessionState::LoggedOut.fresh_token(ttl), None);
        assert_eq!(SessionState::Expired.fresh_token(ttl), None);

        let state = authenticated();
        assert!(state.is_authenticated());
        assert_eq!(state.fresh_token(ttl), Some("abc123"));
        assert_eq!(state.fresh_token(Duration::ZERO), None);
        assert!(state.age().is_some());
    }

    #[test]
    fn test_valid_transitions() {
        let valid = vec![
            (SessionState::LoggedOut, SessionState::LoggingIn),
            (SessionState::LoggingIn, authenticated()),
            (SessionState::LoggingIn, SessionState::LoggedOut),
            (authenticated(), SessionState::Expired),
            (authenticated(), SessionState::LoggedOut),
            (authenticated(), SessionState::LoggingIn),
            (SessionState::Expired, SessionState::LoggingIn),
            (SessionState::Expired, SessionState::LoggedOut),
        ];

        for (from, to) in valid {
            let transition = StateTransition::new(&from, &to);
            assert!(
                transition.is_valid(),
                "Transition from {from:?} to {to:?} should be valid"
            );
            assert_eq!(transition.validation_error(), None);
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let invalid = vec![
            (SessionState::LoggedOut, authenticated()),
            (SessionState::LoggedOut, SessionState::Expired),
            (SessionState::Expired, authenticated()),
            (SessionState::LoggingIn, SessionState::Expired),
            (SessionState::LoggingIn, SessionState::LoggingIn),
        ];

        for (from, to) in invalid {
            let transition = StateTransition::new(&from, &to);
            assert!(
                !transition.is_valid(),
                "Transition from {from:?} to {to:?} should be invalid"
            );
            assert!(transition.validation_error().is_some());
        }
    }

    #[test]
    fn test_debug_hides_token() {
        let rendered = format!("{:?}", authenticated());
        assert!(!rendered.contains("abc123"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::LoggedOut.to_string(), "Logged out");
        assert_eq!(SessionState::LoggingIn.to_string(), "Logging in");
        assert_eq!(SessionState::Expired.to_string(), "Expired");
        assert!(authenticated().to_string().starts_with("Authenticated"));
    }
}
