//! Classification of free-text driver errors.
//!
//! Driver diagnostics carry no machine-readable code, so errors are sorted by
//! case-insensitive substring matching. Callers only see [`classify`]; the
//! matching rules can change without touching them.

/// User-facing category of an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ConnectFailure,
    HistoryFailure,
    ScanFailure,
    Critical,
    /// Diagnostic noise that only belongs in the activity log.
    Informational,
}

impl ErrorCategory {
    /// Notification text for the category, if it warrants one.
    #[must_use]
    pub fn toast_message(self) -> Option<&'static str> {
        match self {
            Self::ConnectFailure => Some("Failed to connect, please try again"),
            Self::HistoryFailure => Some("Failed to load workout history"),
            Self::ScanFailure => Some("Device scan failed, please try again"),
            Self::Critical => Some("An error occurred, please check the activity log"),
            Self::Informational => None,
        }
    }
}

/// Outcome of classifying one error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: ErrorCategory,
    pub show_toast: bool,
}

const RULES: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::ConnectFailure,
        &[
            "connection failed",
            "connect failed",
            "connection timed out",
            "failed to connect",
        ],
    ),
    (
        ErrorCategory::HistoryFailure,
        &["workout history retrieval failed", "workout history failed"],
    ),
    (ErrorCategory::ScanFailure, &["scan failed"]),
    (ErrorCategory::Critical, &["critical", "fatal"]),
];

/// Classify raw error text. Rules are checked in priority order.
#[must_use]
pub fn classify(raw: &str) -> Classification {
    let text = raw.to_lowercase();
    let category = RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|needle| text.contains(needle)))
        .map_or(ErrorCategory::Informational, |(category, _)| *category);

    Classification {
        category,
        show_toast: category != ErrorCategory::Informational,
    }
}
