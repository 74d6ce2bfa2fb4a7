//! Ceremony error types and the user-facing error classifier
//!
//! Every fallible step of a ceremony reports a [`CeremonyError`]. Callers that
//! need to show something to a person call [`CeremonyError::classify`], which
//! folds the error into one of a closed set of [`ErrorCategory`] values with a
//! readable message. Classification only shapes the message; it never changes
//! what the ceremony did.

use std::fmt;

use crate::codec::CodecError;
use crate::transport::TransportError;

/// A failure reported by the platform credential API
///
/// Mirrors the `name`/`message` pair carried by platform exceptions, e.g.
/// `NotAllowedError: The operation either timed out or was not allowed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    pub name: String,
    pub message: String,
}

impl PlatformError {
    /// Create a new platform error
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

impl std::error::Error for PlatformError {}

/// Errors that abort a ceremony invocation
#[derive(Debug)]
pub enum CeremonyError {
    /// No email address was supplied
    MissingEmail,
    /// No password was supplied
    MissingPassword,
    /// The platform exposes no credential API
    UnsupportedPlatform,
    /// The client is not running in a secure context
    InsecureContext { protocol: String, hostname: String },
    /// A required field is absent from the server-issued options
    MissingField(&'static str),
    /// The server-issued options do not have the expected shape
    InvalidOptions(String),
    /// A server-issued field could not be decoded into bytes
    MalformedField { field: String, source: CodecError },
    /// The platform ceremony was rejected
    Platform(PlatformError),
    /// The platform ceremony resolved without a credential
    EmptyCredential,
    /// The platform credential lacks a required binary field
    IncompleteCredential(&'static str),
    /// The service answered with a non-success status
    ServerRejected { status: u16, message: String },
    /// The request never produced a usable response
    Transport(TransportError),
    /// A configured value cannot be used
    InvalidConfiguration { setting: &'static str, reason: String },
}

impl fmt::Display for CeremonyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CeremonyError::MissingEmail => write!(f, "Email is required"),
            CeremonyError::MissingPassword => write!(f, "Password is required"),
            CeremonyError::UnsupportedPlatform => {
                write!(f, "Platform credential API is not available")
            }
            CeremonyError::InsecureContext { protocol, hostname } => {
                write!(f, "Insecure context: {protocol}//{hostname}")
            }
            CeremonyError::MissingField(field) => {
                write!(f, "Missing protocol field: {field}")
            }
            CeremonyError::InvalidOptions(reason) => write!(f, "Invalid options: {reason}"),
            CeremonyError::MalformedField { field, source } => {
                write!(f, "Malformed protocol field {field}: {source}")
            }
            CeremonyError::Platform(err) => write!(f, "Platform error: {err}"),
            CeremonyError::EmptyCredential => write!(f, "Platform returned no credential"),
            CeremonyError::IncompleteCredential(field) => {
                write!(f, "Platform credential is missing {field}")
            }
            CeremonyError::ServerRejected { status, message } => {
                write!(f, "Server rejected request ({status}): {message}")
            }
            CeremonyError::Transport(err) => write!(f, "Transport error: {err}"),
            CeremonyError::InvalidConfiguration { setting, reason } => {
                write!(f, "Invalid configuration for {setting}: {reason}")
            }
        }
    }
}

impl std::error::Error for CeremonyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CeremonyError::MalformedField { source, .. } => Some(source),
            CeremonyError::Platform(err) => Some(err),
            CeremonyError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PlatformError> for CeremonyError {
    fn from(err: PlatformError) -> Self {
        CeremonyError::Platform(err)
    }
}

impl From<TransportError> for CeremonyError {
    fn from(err: TransportError) -> Self {
        CeremonyError::Transport(err)
    }
}

/// User-facing failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    UnsupportedPlatform,
    InsecureContext,
    MissingProtocolField,
    UserCancelledOrDenied,
    CredentialAlreadyExists,
    NotSupportedByAuthenticator,
    SecurityContextError,
    MalformedOptions,
    ServerRejected,
    Unknown,
}

impl ErrorCategory {
    /// Stable kebab-case code for the category
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            ErrorCategory::UnsupportedPlatform => "unsupported-platform",
            ErrorCategory::InsecureContext => "insecure-context",
            ErrorCategory::MissingProtocolField => "missing-protocol-field",
            ErrorCategory::UserCancelledOrDenied => "user-cancelled-or-denied",
            ErrorCategory::CredentialAlreadyExists => "credential-already-exists",
            ErrorCategory::NotSupportedByAuthenticator => "not-supported-by-authenticator",
            ErrorCategory::SecurityContextError => "security-context-error",
            ErrorCategory::MalformedOptions => "malformed-options",
            ErrorCategory::ServerRejected => "server-rejected",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Broad class of the failure
    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            ErrorCategory::UnsupportedPlatform
            | ErrorCategory::InsecureContext
            | ErrorCategory::SecurityContextError
            | ErrorCategory::NotSupportedByAuthenticator => ErrorKind::Environmental,
            ErrorCategory::MissingProtocolField | ErrorCategory::MalformedOptions => {
                ErrorKind::Protocol
            }
            ErrorCategory::UserCancelledOrDenied => ErrorKind::UserInteraction,
            ErrorCategory::CredentialAlreadyExists => ErrorKind::StateConflict,
            ErrorCategory::ServerRejected => ErrorKind::ServerRejection,
            ErrorCategory::Unknown => ErrorKind::Unknown,
        }
    }

    /// Default message shown when the failure carries nothing better
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            ErrorCategory::UnsupportedPlatform => "Passkeys are not supported on this device",
            ErrorCategory::InsecureContext => {
                "Passkeys require a secure connection (HTTPS or localhost)"
            }
            ErrorCategory::MissingProtocolField => {
                "The server sent incomplete passkey options"
            }
            ErrorCategory::UserCancelledOrDenied => {
                "The passkey request was cancelled, timed out, or was not allowed"
            }
            ErrorCategory::CredentialAlreadyExists => {
                "A passkey for this account already exists on this device, try logging in instead"
            }
            ErrorCategory::NotSupportedByAuthenticator => {
                "Your authenticator does not support the requested options"
            }
            ErrorCategory::SecurityContextError => {
                "The request was blocked for security reasons, check the site domain"
            }
            ErrorCategory::MalformedOptions => "The passkey options could not be processed",
            ErrorCategory::ServerRejected => "The server rejected the request",
            ErrorCategory::Unknown => "Something went wrong, please try again",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Failure taxonomy deciding whether a retry can help
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fatal until the environment changes
    Environmental,
    /// Server/client version skew
    Protocol,
    /// Cancellation or platform timeout
    UserInteraction,
    /// A credential already exists for this device
    StateConflict,
    /// The finish endpoint declined
    ServerRejection,
    Unknown,
}

impl ErrorKind {
    /// Whether the user may restart the ceremony and expect a different result
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::UserInteraction | ErrorKind::StateConflict | ErrorKind::ServerRejection
        )
    }
}

/// A classified failure ready to surface to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ClassifiedError {
    fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    fn with_default_message(category: ErrorCategory) -> Self {
        Self::new(category, category.default_message())
    }

    /// Broad class of the failure
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.category.kind()
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.category)
    }
}

// Exception names checked before any message text
const NAME_RULES: &[(&str, ErrorCategory)] = &[
    ("NotAllowedError", ErrorCategory::UserCancelledOrDenied),
    ("AbortError", ErrorCategory::UserCancelledOrDenied),
    ("InvalidStateError", ErrorCategory::CredentialAlreadyExists),
    ("NotSupportedError", ErrorCategory::NotSupportedByAuthenticator),
    ("SecurityError", ErrorCategory::SecurityContextError),
    ("TypeError", ErrorCategory::MalformedOptions),
];

// Lowercase message fragments, checked in order when no name matched
const MESSAGE_RULES: &[(&str, ErrorCategory)] = &[
    ("not allowed", ErrorCategory::UserCancelledOrDenied),
    ("cancel", ErrorCategory::UserCancelledOrDenied),
    ("timed out", ErrorCategory::UserCancelledOrDenied),
    ("already registered", ErrorCategory::CredentialAlreadyExists),
    ("already exists", ErrorCategory::CredentialAlreadyExists),
    ("excluded", ErrorCategory::CredentialAlreadyExists),
    ("not supported", ErrorCategory::NotSupportedByAuthenticator),
    ("security", ErrorCategory::SecurityContextError),
    ("relying party id", ErrorCategory::SecurityContextError),
    ("invalid domain", ErrorCategory::SecurityContextError),
    ("type mismatch", ErrorCategory::MalformedOptions),
    ("failed to convert", ErrorCategory::MalformedOptions),
];

/// Classify a platform failure by its name, then by its message
///
/// The first matching rule wins. Unmatched failures are `unknown` and keep
/// their own message when they have one.
#[must_use]
pub fn classify_platform_error(err: &PlatformError) -> ClassifiedError {
    if let Some((_, category)) = NAME_RULES.iter().find(|(name, _)| *name == err.name) {
        return ClassifiedError::with_default_message(*category);
    }

    let message = err.message.to_lowercase();
    if let Some((_, category)) = MESSAGE_RULES
        .iter()
        .find(|(fragment, _)| message.contains(fragment))
    {
        return ClassifiedError::with_default_message(*category);
    }

    if err.message.is_empty() {
        ClassifiedError::with_default_message(ErrorCategory::Unknown)
    } else {
        ClassifiedError::new(ErrorCategory::Unknown, err.message.clone())
    }
}

impl CeremonyError {
    /// Fold this error into a user-facing category and message
    #[must_use]
    pub fn classify(&self) -> ClassifiedError {
        match self {
            CeremonyError::UnsupportedPlatform => {
                ClassifiedError::with_default_message(ErrorCategory::UnsupportedPlatform)
            }
            CeremonyError::InsecureContext { .. } => {
                ClassifiedError::with_default_message(ErrorCategory::InsecureContext)
            }
            CeremonyError::MissingField(_) => {
                ClassifiedError::with_default_message(ErrorCategory::MissingProtocolField)
            }
            CeremonyError::InvalidOptions(_) | CeremonyError::MalformedField { .. } => {
                ClassifiedError::with_default_message(ErrorCategory::MalformedOptions)
            }
            CeremonyError::Platform(err) => classify_platform_error(err),
            CeremonyError::ServerRejected { message, .. } => {
                if message.trim().is_empty() {
                    ClassifiedError::with_default_message(ErrorCategory::ServerRejected)
                } else {
                    ClassifiedError::new(ErrorCategory::ServerRejected, message.clone())
                }
            }
            CeremonyError::MissingEmail
            | CeremonyError::MissingPassword
            | CeremonyError::EmptyCredential
            | CeremonyError::IncompleteCredential(_)
            | CeremonyError::Transport(_)
            | CeremonyError::InvalidConfiguration { .. } => {
                ClassifiedError::new(ErrorCategory::Unknown, self.to_string())
            }
        }
    }

    /// Shorthand for `self.classify().category`
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.classify().category
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_allowed_error_ignores_message_text() {
        let err = PlatformError::new("NotAllowedError", "A credential already exists");
        let classified = classify_platform_error(&err);
        assert_eq!(classified.category, ErrorCategory::UserCancelledOrDenied);
        assert!(classified.kind().is_retryable());
    }

    #[test]
    fn test_invalid_state_error_is_existing_credential() {
        let err = PlatformError::new("InvalidStateError", "The operation is not allowed");
        let classified = classify_platform_error(&err);
        assert_eq!(classified.category, ErrorCategory::CredentialAlreadyExists);
        assert_eq!(classified.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn test_name_rules() {
        let cases = [
            ("NotSupportedError", ErrorCategory::NotSupportedByAuthenticator),
            ("SecurityError", ErrorCategory::SecurityContextError),
            ("TypeError", ErrorCategory::MalformedOptions),
            ("AbortError", ErrorCategory::UserCancelledOrDenied),
        ];
        for (name, expected) in cases {
            let classified = classify_platform_error(&PlatformError::new(name, ""));
            assert_eq!(classified.category, expected, "{name}");
        }
    }

    #[test]
    fn test_message_fallback_first_match_wins() {
        let err = PlatformError::new("Error", "User cancelled; credential already exists");
        assert_eq!(
            classify_platform_error(&err).category,
            ErrorCategory::UserCancelledOrDenied
        );

        let err = PlatformError::new("Error", "Authenticator: Credential ALREADY REGISTERED");
        assert_eq!(
            classify_platform_error(&err).category,
            ErrorCategory::CredentialAlreadyExists
        );
    }

    #[test]
    fn test_unknown_keeps_platform_message() {
        let err = PlatformError::new("UnknownError", "HID device unplugged");
        let classified = classify_platform_error(&err);
        assert_eq!(classified.category, ErrorCategory::Unknown);
        assert_eq!(classified.message, "HID device unplugged");
        assert!(!classified.kind().is_retryable());
    }

    #[test]
    fn test_server_rejection_uses_body_message() {
        let err = CeremonyError::ServerRejected {
            status: 400,
            message: "Challenge expired".to_string(),
        };
        let classified = err.classify();
        assert_eq!(classified.category, ErrorCategory::ServerRejected);
        assert_eq!(classified.message, "Challenge expired");

        let err = CeremonyError::ServerRejected {
            status: 500,
            message: String::new(),
        };
        assert_eq!(
            err.classify().message,
            ErrorCategory::ServerRejected.default_message()
        );
    }

    #[test]
    fn test_environmental_errors_are_not_retryable() {
        let insecure = CeremonyError::InsecureContext {
            protocol: "http:".to_string(),
            hostname: "example.com".to_string(),
        };
        assert_eq!(insecure.category(), ErrorCategory::InsecureContext);
        assert!(!insecure.classify().kind().is_retryable());
        assert_eq!(
            CeremonyError::UnsupportedPlatform.category(),
            ErrorCategory::UnsupportedPlatform
        );
    }

    #[test]
    fn test_protocol_field_errors() {
        assert_eq!(
            CeremonyError::MissingField("rp.id").category(),
            ErrorCategory::MissingProtocolField
        );
        let malformed = CeremonyError::MalformedField {
            field: "challenge".to_string(),
            source: CodecError::InvalidLength(5),
        };
        assert_eq!(malformed.category(), ErrorCategory::MalformedOptions);
        assert_eq!(malformed.classify().kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_category_codes() {
        assert_eq!(ErrorCategory::UserCancelledOrDenied.to_string(), "user-cancelled-or-denied");
        assert_eq!(ErrorCategory::MissingProtocolField.code(), "missing-protocol-field");
    }
}
