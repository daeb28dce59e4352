//! State shared by nurse and doctor forms.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::ParseEnumError;

/// A form starts as a draft and becomes immutable once submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    Draft,
    Submitted,
}

impl FormStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormStatus::Draft => "draft",
            FormStatus::Submitted => "submitted",
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, FormStatus::Draft)
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(FormStatus::Draft),
            "submitted" => Ok(FormStatus::Submitted),
            other => Err(ParseEnumError::new("form status", other)),
        }
    }
}
