//! Gemini status classes
//!
//! The first digit of the two-digit status code picks the behaviour:
//! ```text
//! 1x input  2x success  3x redirect
//! 4x temporary failure  5x permanent failure  6x client certificate
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Input,
    Success,
    Redirect,
    TemporaryFailure,
    PermanentFailure,
    CertificateRequired,
}

impl StatusClass {
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1 => Some(StatusClass::Input),
            2 => Some(StatusClass::Success),
            3 => Some(StatusClass::Redirect),
            4 => Some(StatusClass::TemporaryFailure),
            5 => Some(StatusClass::PermanentFailure),
            6 => Some(StatusClass::CertificateRequired),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StatusClass::TemporaryFailure
                | StatusClass::PermanentFailure
                | StatusClass::CertificateRequired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Input => "input",
            StatusClass::Success => "success",
            StatusClass::Redirect => "redirect",
            StatusClass::TemporaryFailure => "temporary failure",
            StatusClass::PermanentFailure => "permanent failure",
            StatusClass::CertificateRequired => "certificate required",
        }
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
