use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Date {date} is not available ({reason})")]
    DateUnavailable {
        date: NaiveDate,
        reason: crate::domain::availability::DateStatus,
    },

    #[error("The selected range contains unavailable dates (first: {first})")]
    RangeContainsUnavailableDates { first: NaiveDate },

    #[error("House rules must be accepted first")]
    RulesNotAccepted,

    #[error("Missing required field: {field}")]
    MissingRequiredField { field: &'static str },

    #[error("Coupon code is empty")]
    EmptyCode,

    #[error("Coupon code '{code}' is invalid or expired")]
    InvalidOrExpired { code: String },

    #[error("Record store lookup failed: {reason}")]
    LookupFailed { reason: String },

    #[error("Dates {check_in} to {check_out} are no longer available, please choose different dates")]
    DatesNoLongerAvailable {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("Payment gateway error: {reason}")]
    Gateway { reason: String },

    #[error("Rental unit not found: {id}")]
    UnitNotFound { id: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl BookingError {
    /// The current date selection is stale and the user must pick again.
    pub fn requires_date_reselection(&self) -> bool {
        matches!(self, Self::DatesNoLongerAvailable { .. })
    }

    /// Errors produced while picking dates. They block a transition but
    /// never end the session.
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            Self::DateUnavailable { .. }
                | Self::RangeContainsUnavailableDates { .. }
                | Self::RulesNotAccepted
        )
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
