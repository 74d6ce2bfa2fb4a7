//! Per-invocation ceremony state machine
//!
//! `idle -> awaiting-options -> options-validated -> awaiting-platform-ceremony
//! -> awaiting-finish -> {succeeded | rejected}`. Password ceremonies jump
//! from `idle` straight to `awaiting-finish`. Any live state may drop to
//! `rejected`; terminal states never move again, so a retry starts a fresh
//! [`Ceremony`].

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CeremonyKind {
    Registration,
    Authentication,
    PasswordLogin,
    PasswordRegistration,
}

impl fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CeremonyKind::Registration => "registration",
            CeremonyKind::Authentication => "authentication",
            CeremonyKind::PasswordLogin => "password-login",
            CeremonyKind::PasswordRegistration => "password-registration",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CeremonyState {
    Idle,
    AwaitingOptions,
    OptionsValidated,
    AwaitingPlatformCeremony,
    AwaitingFinish,
    Succeeded,
    Rejected,
}

impl CeremonyState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, CeremonyState::Succeeded | CeremonyState::Rejected)
    }

    /// Whether `self -> next` is a legal transition
    #[must_use]
    pub const fn can_transition_to(self, next: CeremonyState) -> bool {
        use CeremonyState::{
            AwaitingFinish, AwaitingOptions, AwaitingPlatformCeremony, Idle, OptionsValidated,
            Rejected, Succeeded,
        };
        match (self, next) {
            (Succeeded | Rejected, _) => false,
            (_, Rejected)
            | (Idle, AwaitingOptions | AwaitingFinish)
            | (AwaitingOptions, OptionsValidated)
            | (OptionsValidated, AwaitingPlatformCeremony)
            | (AwaitingPlatformCeremony, AwaitingFinish)
            | (AwaitingFinish, Succeeded) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CeremonyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CeremonyState::Idle => "idle",
            CeremonyState::AwaitingOptions => "awaiting-options",
            CeremonyState::OptionsValidated => "options-validated",
            CeremonyState::AwaitingPlatformCeremony => "awaiting-platform-ceremony",
            CeremonyState::AwaitingFinish => "awaiting-finish",
            CeremonyState::Succeeded => "succeeded",
            CeremonyState::Rejected => "rejected",
        })
    }
}

/// One ceremony invocation
#[derive(Debug, Clone)]
pub struct Ceremony {
    id: Uuid,
    kind: CeremonyKind,
    state: CeremonyState,
    started_at: DateTime<Utc>,
    history: Vec<CeremonyState>,
}

impl Ceremony {
    /// Start a new invocation in `idle`
    #[must_use]
    pub fn start(kind: CeremonyKind) -> Self {
        let ceremony = Self {
            id: Uuid::new_v4(),
            kind,
            state: CeremonyState::Idle,
            started_at: Utc::now(),
            history: vec![CeremonyState::Idle],
        };
        log::debug!("[{}] {} ceremony created", ceremony.id, kind);
        ceremony
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> CeremonyKind {
        self.kind
    }

    #[must_use]
    pub fn state(&self) -> CeremonyState {
        self.state
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Every state visited, starting with `idle`
    #[must_use]
    pub fn history(&self) -> &[CeremonyState] {
        &self.history
    }

    /// Move to `next`; returns `false` and stays put on an illegal transition
    pub fn advance(&mut self, next: CeremonyState) -> bool {
        if !self.state.can_transition_to(next) {
            log::error!(
                "[{}] illegal {} transition {} -> {}",
                self.id,
                self.kind,
                self.state,
                next
            );
            return false;
        }
        log::debug!("[{}] {} -> {}", self.id, self.state, next);
        self.state = next;
        self.history.push(next);
        true
    }

    /// Drop to `rejected` from any live state
    pub fn reject(&mut self) {
        if !self.state.is_terminal() {
            self.advance(CeremonyState::Rejected);
        }
    }
}

/// Finish-endpoint verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Verified,
    NotVerified,
}

/// Result of a ceremony that reached the finish endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CeremonyOutcome {
    pub id: Uuid,
    pub kind: CeremonyKind,
    pub verdict: Verdict,
    /// `Succeeded` when verified, `Rejected` otherwise
    pub state: CeremonyState,
    /// Echoed by a successful password login, for display only
    pub device_id_hash: Option<String>,
}

impl CeremonyOutcome {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verdict == Verdict::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webauthn_path() {
        let mut ceremony = Ceremony::start(CeremonyKind::Registration);
        for next in [
            CeremonyState::AwaitingOptions,
            CeremonyState::OptionsValidated,
            CeremonyState::AwaitingPlatformCeremony,
            CeremonyState::AwaitingFinish,
            CeremonyState::Succeeded,
        ] {
            assert!(ceremony.advance(next), "transition to {next}");
        }
        assert_eq!(ceremony.state(), CeremonyState::Succeeded);
        assert_eq!(ceremony.history().len(), 6);
    }

    #[test]
    fn test_password_path_skips_options() {
        let mut ceremony = Ceremony::start(CeremonyKind::PasswordLogin);
        assert!(ceremony.advance(CeremonyState::AwaitingFinish));
        assert!(ceremony.advance(CeremonyState::Succeeded));
    }

    #[test]
    fn test_illegal_transitions_are_refused() {
        let mut ceremony = Ceremony::start(CeremonyKind::Authentication);
        assert!(!ceremony.advance(CeremonyState::AwaitingPlatformCeremony));
        assert!(!ceremony.advance(CeremonyState::Succeeded));
        assert_eq!(ceremony.state(), CeremonyState::Idle);
    }

    #[test]
    fn test_any_live_state_can_reject() {
        let mut ceremony = Ceremony::start(CeremonyKind::Registration);
        ceremony.advance(CeremonyState::AwaitingOptions);
        ceremony.reject();
        assert_eq!(ceremony.state(), CeremonyState::Rejected);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut ceremony = Ceremony::start(CeremonyKind::Authentication);
        ceremony.reject();
        assert!(!ceremony.advance(CeremonyState::AwaitingOptions));
        ceremony.reject();
        assert_eq!(
            ceremony.history(),
            &[CeremonyState::Idle, CeremonyState::Rejected]
        );
    }

    #[test]
    fn test_invocations_get_distinct_ids() {
        let a = Ceremony::start(CeremonyKind::Registration);
        let b = Ceremony::start(CeremonyKind::Registration);
        assert_ne!(a.id(), b.id());
    }
}
