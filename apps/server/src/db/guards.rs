//! Precondition checks shared by the store implementations.
//!
//! Each store loads the current rows inside its unit of work and runs them
//! through these functions, so both backends reject the same requests with
//! the same errors.

use shorouk_models::{Role, User, Visit, VisitStatus};
use uuid::Uuid;

use super::traits::{FormKind, FormRecord};
use crate::{Error, Result};

pub fn duplicate_username(username: &str) -> Error {
    Error::Conflict(format!("Username '{username}' is already taken"))
}

pub fn duplicate_email(email: &str) -> Error {
    Error::Conflict(format!("Email '{email}' is already registered"))
}

pub fn duplicate_medical_number(medical_number: &str) -> Error {
    Error::Conflict(format!(
        "Medical number '{medical_number}' is already assigned to another patient"
    ))
}

pub fn patient_exists(found: bool, patient_id: Uuid) -> Result<()> {
    if found {
        Ok(())
    } else {
        Err(Error::invalid_field(
            "patient_id",
            "reference",
            format!("patient {patient_id} does not exist"),
        ))
    }
}

/// The referenced doctor must exist, hold the doctor role and be active.
pub fn assignable_doctor(doctor: Option<&User>, doctor_id: Uuid) -> Result<()> {
    match doctor {
        Some(user) if user.role == Role::Doctor && user.is_active => Ok(()),
        Some(_) => Err(Error::invalid_field(
            "doctor_id",
            "reference",
            format!("user {doctor_id} is not an active doctor"),
        )),
        None => Err(Error::invalid_field(
            "doctor_id",
            "reference",
            format!("doctor {doctor_id} does not exist"),
        )),
    }
}

pub fn transition(current: VisitStatus, next: VisitStatus) -> Result<()> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(Error::InvalidTransition(format!(
            "Visit cannot move from '{current}' to '{next}'"
        )))
    }
}

/// Forms may only be attached to an existing visit that is still open.
pub fn visit_accepts_forms(visit: Option<&Visit>, visit_id: Uuid) -> Result<()> {
    match visit {
        None => Err(Error::invalid_field(
            "visit_id",
            "reference",
            format!("visit {visit_id} does not exist"),
        )),
        Some(v) if v.status.is_terminal() => Err(Error::BusinessRule(format!(
            "Visit {visit_id} is {} and no longer accepts forms",
            v.status
        ))),
        Some(_) => Ok(()),
    }
}

pub fn nurse_form_submitted(has_submitted: bool, visit_id: Uuid) -> Result<()> {
    if has_submitted {
        Ok(())
    } else {
        Err(Error::BusinessRule(format!(
            "Visit {visit_id} has no submitted nurse form yet"
        )))
    }
}

/// Drafts can only be changed by their author.
pub fn form_editable(
    form: Option<&FormRecord>,
    kind: FormKind,
    id: Uuid,
    author_id: Uuid,
) -> Result<()> {
    let form = form.ok_or_else(|| Error::not_found(kind.label(), id))?;
    if form.author_id != author_id {
        return Err(Error::Forbidden(format!(
            "{} {id} belongs to another user",
            kind.label()
        )));
    }
    if !form.status.is_editable() {
        return Err(Error::BusinessRule(format!(
            "{} {id} has been submitted and can no longer be changed",
            kind.label()
        )));
    }
    Ok(())
}
