//! Field-level validation shared by every request type.
//!
//! Request structs derive [`validator::Validate`] for the declarative rules
//! (lengths, ranges, email format, nested structs). Rules that need more than
//! one field, or that parse a value into a domain type, are checked by hand
//! and pushed onto the same [`Violations`] collector so that a client always
//! receives every problem with its payload in one 422 response.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

lazy_static! {
    pub(crate) static ref USERNAME_RE: Regex =
        Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").expect("username pattern compiles");
    pub(crate) static ref NATIONAL_ID_RE: Regex =
        Regex::new(r"^\d{6,20}$").expect("national id pattern compiles");
    static ref PHONE_CHARS_RE: Regex =
        Regex::new(r"^[\d\s\-+()]+$").expect("phone pattern compiles");
}

/// A single rejected field in a request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Dotted path of the offending field (`assessment_data.vital_signs.pulse`).
    pub field: String,
    /// Machine-readable rule name (`length`, `range`, `email`, `pattern`, ...).
    pub code: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Accumulates violations from derived and hand-written checks.
#[derive(Debug, Default)]
pub struct Violations {
    items: Vec<FieldViolation>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the derived validator rules of `value`, nesting its field names under `prefix`.
    pub fn check<T: Validate>(&mut self, prefix: &str, value: &T) {
        if let Err(errors) = value.validate() {
            flatten(prefix, &errors, &mut self.items);
        }
    }

    pub fn push(
        &mut self,
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.items.push(FieldViolation::new(field, code, message));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `Ok(value)` when nothing was collected, otherwise the sorted violations.
    pub fn finish<T>(mut self, value: T) -> Result<T, Vec<FieldViolation>> {
        if self.items.is_empty() {
            return Ok(value);
        }
        self.items
            .sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
        self.items.dedup();
        Err(self.items)
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldViolation>) {
    for (field, kind) in errors.errors() {
        let path = join_path(prefix, &field.to_string());
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", err.code));
                    out.push(FieldViolation::new(path.clone(), err.code.to_string(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

/// Phone numbers may contain digits, spaces, `+`, `-` and parentheses, and
/// must carry at least ten digits.
pub fn is_valid_phone(value: &str) -> bool {
    PHONE_CHARS_RE.is_match(value) && value.chars().filter(char::is_ascii_digit).count() >= 10
}

/// Returns the reason a password is too weak, if it is.
pub fn password_weakness(password: &str) -> Option<&'static str> {
    if password.chars().count() < 8 {
        return Some("password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("password must contain an uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("password must contain a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("password must contain a digit");
    }
    None
}
