//! Step outcomes and failure classification
//!
//! Adapter steps never raise past the session boundary. Helpers return
//! `Result<_, StepFailure>`; the failure's [`FailureKind`] decides the base
//! [`StepStatus`] and the step's [`StepPolicy`] may promote it to `Fatal`.

use super::SessionState;
use crate::driver::DriverError;
use crate::parse::PriceFormatError;
use std::fmt;

/// Canonical UI steps shared by all site adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    OpenSite,
    DismissConsent,
    SetTripType,
    SetOrigin,
    SetDestination,
    SetDepartureDate,
    SubmitSearch,
    ApplySort,
    ApplyFilter,
    SelectCheapestOffer,
    ExtractOffer,
}

impl StepKind {
    /// The session state reached once this step completes
    pub fn completes(&self) -> SessionState {
        match self {
            Self::OpenSite => SessionState::Init,
            Self::DismissConsent => SessionState::ConsentHandled,
            Self::SetTripType
            | Self::SetOrigin
            | Self::SetDestination
            | Self::SetDepartureDate => SessionState::FormFilled,
            Self::SubmitSearch => SessionState::Searched,
            Self::ApplySort | Self::ApplyFilter | Self::SelectCheapestOffer => {
                SessionState::Refined
            }
            Self::ExtractOffer => SessionState::Extracted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenSite => "open_site",
            Self::DismissConsent => "dismiss_consent",
            Self::SetTripType => "set_trip_type",
            Self::SetOrigin => "set_origin",
            Self::SetDestination => "set_destination",
            Self::SetDepartureDate => "set_departure_date",
            Self::SubmitSearch => "submit_search",
            Self::ApplySort => "apply_sort",
            Self::ApplyFilter => "apply_filter",
            Self::SelectCheapestOffer => "select_cheapest_offer",
            Self::ExtractOffer => "extract_offer",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tri-state outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStatus {
    Ok,
    /// Step failed but the session can still reach a valid result
    Degraded,
    /// Step failure invalidates the rest of the session
    Fatal,
}

impl StepStatus {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Degraded => write!(f, "degraded"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// What a session does with a `Degraded` outcome of a given step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Log and continue
    Tolerate,
    /// Promote to `Fatal`
    Escalate,
}

impl StepPolicy {
    /// Applies the policy to a raw step status
    pub fn apply(&self, status: StepStatus) -> StepStatus {
        match (self, status) {
            (Self::Escalate, StepStatus::Degraded) => StepStatus::Fatal,
            (_, status) => status,
        }
    }
}

/// Outcome of one step, consumed immediately by the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step: StepKind,
    pub status: StepStatus,
    pub detail: String,
}

impl StepResult {
    pub fn ok(step: StepKind) -> Self {
        Self::with_status(step, StepStatus::Ok, String::new())
    }

    pub fn ok_with(step: StepKind, detail: impl Into<String>) -> Self {
        Self::with_status(step, StepStatus::Ok, detail)
    }

    pub fn degraded(step: StepKind, detail: impl Into<String>) -> Self {
        Self::with_status(step, StepStatus::Degraded, detail)
    }

    pub fn fatal(step: StepKind, detail: impl Into<String>) -> Self {
        Self::with_status(step, StepStatus::Fatal, detail)
    }

    fn with_status(step: StepKind, status: StepStatus, detail: impl Into<String>) -> Self {
        Self {
            step,
            status,
            detail: detail.into(),
        }
    }

    /// Converts a helper result into a step result
    pub fn from_outcome(step: StepKind, outcome: Result<(), StepFailure>) -> Self {
        match outcome {
            Ok(()) => Self::ok(step),
            Err(failure) => failure.into_result(step),
        }
    }
}

/// Failure taxonomy for step helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Locator missing on an optional or best-effort step
    SoftUi,
    /// An input field did not retain its typed value
    FieldVerification,
    /// Required offer text missing or unparsable
    Extraction,
    /// A bounded wait ran out
    Timeout,
    /// The driver itself failed (protocol or transport)
    Driver,
}

impl FailureKind {
    /// Base status before the step policy is applied
    pub fn status(&self) -> StepStatus {
        match self {
            Self::SoftUi | Self::Timeout | Self::Driver => StepStatus::Degraded,
            Self::FieldVerification | Self::Extraction => StepStatus::Fatal,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SoftUi => write!(f, "soft_ui"),
            Self::FieldVerification => write!(f, "field_verification"),
            Self::Extraction => write!(f, "extraction"),
            Self::Timeout => write!(f, "timeout"),
            Self::Driver => write!(f, "driver"),
        }
    }
}

/// A classified step failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl StepFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn soft_ui(message: impl Into<String>) -> Self {
        Self::new(FailureKind::SoftUi, message)
    }

    pub fn field_verification(message: impl Into<String>) -> Self {
        Self::new(FailureKind::FieldVerification, message)
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Extraction, message)
    }

    /// Turns the failure into the step result it implies
    pub fn into_result(self, step: StepKind) -> StepResult {
        StepResult {
            step,
            status: self.kind.status(),
            detail: format!("{}: {}", self.kind, self.message),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<DriverError> for StepFailure {
    fn from(error: DriverError) -> Self {
        let kind = if error.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Driver
        };
        Self::new(kind, error.to_string())
    }
}

impl From<PriceFormatError> for StepFailure {
    fn from(error: PriceFormatError) -> Self {
        Self::extraction(error.to_string())
    }
}
