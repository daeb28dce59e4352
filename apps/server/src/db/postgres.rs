//! PostgreSQL-backed `Store` implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use shorouk_models::{
    AuditLogEntry, AuditRecord, EmergencyContact, Patient, PatientFields, User, UserChanges,
    Visit, VisitStatus,
};
use sqlx::{postgres::PgRow, types::Json, PgConnection, PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use super::{
    guards,
    traits::{
        AuditFilter, FormFilter, FormInsertRules, FormKind, FormRecord, PatientFilter, Store,
        UserFilter, UserRecord, VisitFilter,
    },
};
use crate::{Error, Result};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, full_name, is_active, \
                            created_at, updated_at, last_login_at";
const PATIENT_COLUMNS: &str = "id, full_name, national_id, medical_number, date_of_birth, \
                               gender, mobile_number, address, emergency_contact, created_at, updated_at";
const VISIT_COLUMNS: &str = "id, patient_id, nurse_id, doctor_id, arrival_mode, chief_complaint, \
                             status, visit_date, created_at, updated_at";
const FORM_COLUMNS: &str =
    "id, visit_id, author_id, status, data, created_at, updated_at, submitted_at";

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_column<T: FromStr>(raw: String, column: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| Error::Internal(format!("corrupt {column} column: {e}")))
}

fn user_from_row(row: &PgRow) -> Result<UserRecord> {
    Ok(UserRecord {
        user: User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            role: parse_column(row.try_get("role")?, "role")?,
            full_name: row.try_get("full_name")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            last_login_at: row.try_get("last_login_at")?,
        },
        password_hash: row.try_get("password_hash")?,
    })
}

fn patient_from_row(row: &PgRow) -> Result<Patient> {
    let contact: Option<Json<EmergencyContact>> = row.try_get("emergency_contact")?;
    Ok(Patient {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        national_id: row.try_get("national_id")?,
        medical_number: row.try_get("medical_number")?,
        date_of_birth: row.try_get("date_of_birth")?,
        gender: parse_column(row.try_get("gender")?, "gender")?,
        mobile_number: row.try_get("mobile_number")?,
        address: row.try_get("address")?,
        emergency_contact: contact.map(|c| c.0),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn visit_from_row(row: &PgRow) -> Result<Visit> {
    Ok(Visit {
        id: row.try_get("id")?,
        patient_id: row.try_get("patient_id")?,
        nurse_id: row.try_get("nurse_id")?,
        doctor_id: row.try_get("doctor_id")?,
        arrival_mode: parse_column(row.try_get("arrival_mode")?, "arrival_mode")?,
        chief_complaint: row.try_get("chief_complaint")?,
        status: parse_column(row.try_get("status")?, "status")?,
        visit_date: row.try_get("visit_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn form_from_row(kind: FormKind, row: &PgRow) -> Result<FormRecord> {
    Ok(FormRecord {
        id: row.try_get("id")?,
        kind,
        visit_id: row.try_get("visit_id")?,
        author_id: row.try_get("author_id")?,
        status: parse_column(row.try_get("status")?, "status")?,
        data: row.try_get("data")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        submitted_at: row.try_get("submitted_at")?,
    })
}

fn audit_from_row(row: &PgRow) -> Result<AuditLogEntry> {
    Ok(AuditLogEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        action: row.try_get("action")?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        details: row.try_get("details")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Maps unique-index violations onto conflict errors; anything else stays a database error.
fn map_unique_violation(
    err: sqlx::Error,
    on_conflict: impl FnOnce(&str) -> Option<Error>,
) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            if let Some(mapped) = on_conflict(db_err.constraint().unwrap_or_default()) {
                return mapped;
            }
        }
    }
    Error::Database(err)
}

/// `%term%` for ILIKE with the wildcard characters of `term` escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

async fn insert_audit(
    conn: &mut PgConnection,
    record: &AuditRecord,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO audit_logs (user_id, action, entity_type, entity_id, details, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(record.user_id)
    .bind(record.action.as_str())
    .bind(record.entity_type.as_str())
    .bind(record.entity_id)
    .bind(record.details.as_ref())
    .bind(at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn lock_form(
    conn: &mut PgConnection,
    kind: FormKind,
    id: Uuid,
) -> Result<Option<FormRecord>> {
    let sql = format!(
        "SELECT {FORM_COLUMNS} FROM {} WHERE id = $1 FOR UPDATE",
        kind.table()
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(conn).await?;
    row.map(|r| form_from_row(kind, &r)).transpose()
}

#[async_trait]
impl Store for PostgresStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(
        &self,
        user: User,
        password_hash: String,
        audit: AuditRecord,
    ) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, role, full_name, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&password_hash)
            .bind(user.role.as_str())
            .bind(&user.full_name)
            .bind(user.is_active)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                map_unique_violation(e, |constraint| match constraint {
                    "users_username_key" => Some(guards::duplicate_username(&user.username)),
                    "users_email_key" => Some(guards::duplicate_email(&user.email)),
                    _ => None,
                })
            })?;
        let created = user_from_row(&row)?.user;

        insert_audit(&mut tx, &audit, created.created_at).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserRecord>> {
        // An exact username match wins over an email match.
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE username = $1 OR LOWER(email) = LOWER($1)
             ORDER BY (username = $1) DESC
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<(Vec<User>, i64)> {
        let search = filter.search.as_deref().map(like_pattern);
        let role = filter.role.map(|r| r.as_str());
        let predicate = "($1::TEXT IS NULL OR role = $1)
              AND ($2::BOOLEAN IS NULL OR is_active = $2)
              AND ($3::TEXT IS NULL OR username ILIKE $3 OR full_name ILIKE $3 OR email ILIKE $3)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {predicate}"))
                .bind(role)
                .bind(filter.is_active)
                .bind(search.as_deref())
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {predicate}
             ORDER BY created_at ASC, username ASC
             LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query(&sql)
            .bind(role)
            .bind(filter.is_active)
            .bind(search.as_deref())
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        let users = rows
            .iter()
            .map(|r| user_from_row(r).map(|u| u.user))
            .collect::<Result<Vec<_>>>()?;
        Ok((users, total))
    }

    async fn update_user(
        &self,
        id: Uuid,
        changes: &UserChanges,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE users SET
                email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                role = COALESCE($4, role),
                is_active = COALESCE($5, is_active),
                updated_at = $6
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(changes.email.as_deref())
            .bind(changes.full_name.as_deref())
            .bind(changes.role.map(|r| r.as_str()))
            .bind(changes.is_active)
            .bind(at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                map_unique_violation(e, |constraint| {
                    (constraint == "users_email_key").then(|| {
                        guards::duplicate_email(changes.email.as_deref().unwrap_or_default())
                    })
                })
            })?
            .ok_or_else(|| Error::not_found("User", id))?;
        let updated = user_from_row(&row)?.user;

        insert_audit(&mut tx, &audit, at).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>, audit: AuditRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(Error::not_found("User", id));
        }
        insert_audit(&mut tx, &audit, at).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_patient(&self, patient: Patient, audit: AuditRecord) -> Result<Patient> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO patients (id, full_name, national_id, medical_number, date_of_birth, gender,
                                   mobile_number, address, emergency_contact, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {PATIENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(patient.id)
            .bind(&patient.full_name)
            .bind(&patient.national_id)
            .bind(&patient.medical_number)
            .bind(patient.date_of_birth)
            .bind(patient.gender.as_str())
            .bind(patient.mobile_number.as_deref())
            .bind(patient.address.as_deref())
            .bind(patient.emergency_contact.clone().map(Json))
            .bind(patient.created_at)
            .bind(patient.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                map_unique_violation(e, |constraint| {
                    (constraint == "patients_medical_number_key")
                        .then(|| guards::duplicate_medical_number(&patient.medical_number))
                })
            })?;
        let created = patient_from_row(&row)?;

        insert_audit(&mut tx, &audit, created.created_at).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(patient_from_row).transpose()
    }

    async fn list_patients(&self, filter: &PatientFilter) -> Result<(Vec<Patient>, i64)> {
        let search = filter
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(like_pattern);
        let predicate = "($1::TEXT IS NULL
                 OR full_name ILIKE $1
                 OR national_id ILIKE $1
                 OR medical_number ILIKE $1
                 OR mobile_number ILIKE $1)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM patients WHERE {predicate}"))
                .bind(search.as_deref())
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE {predicate}
             ORDER BY created_at DESC, id ASC
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(search.as_deref())
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        let patients = rows.iter().map(patient_from_row).collect::<Result<Vec<_>>>()?;
        Ok((patients, total))
    }

    async fn update_patient(
        &self,
        id: Uuid,
        fields: &PatientFields,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<Patient> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE patients SET
                full_name = $2, national_id = $3, medical_number = $4, date_of_birth = $5,
                gender = $6, mobile_number = $7, address = $8, emergency_contact = $9,
                updated_at = $10
             WHERE id = $1
             RETURNING {PATIENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&fields.full_name)
            .bind(&fields.national_id)
            .bind(&fields.medical_number)
            .bind(fields.date_of_birth)
            .bind(fields.gender.as_str())
            .bind(fields.mobile_number.as_deref())
            .bind(fields.address.as_deref())
            .bind(fields.emergency_contact.clone().map(Json))
            .bind(at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                map_unique_violation(e, |constraint| {
                    (constraint == "patients_medical_number_key")
                        .then(|| guards::duplicate_medical_number(&fields.medical_number))
                })
            })?
            .ok_or_else(|| Error::not_found("Patient", id))?;
        let updated = patient_from_row(&row)?;

        insert_audit(&mut tx, &audit, at).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn insert_visit(&self, visit: Visit, audit: AuditRecord) -> Result<Visit> {
        let mut tx = self.pool.begin().await?;

        let patient = sqlx::query("SELECT 1 FROM patients WHERE id = $1 FOR SHARE")
            .bind(visit.patient_id)
            .fetch_optional(&mut *tx)
            .await?;
        guards::patient_exists(patient.is_some(), visit.patient_id)?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR SHARE");
        let doctor = sqlx::query(&sql)
            .bind(visit.doctor_id)
            .fetch_optional(&mut *tx)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()?;
        guards::assignable_doctor(doctor.as_ref().map(|r| &r.user), visit.doctor_id)?;

        let sql = format!(
            "INSERT INTO visits (id, patient_id, nurse_id, doctor_id, arrival_mode, chief_complaint,
                                 status, visit_date, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {VISIT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(visit.id)
            .bind(visit.patient_id)
            .bind(visit.nurse_id)
            .bind(visit.doctor_id)
            .bind(visit.arrival_mode.as_str())
            .bind(&visit.chief_complaint)
            .bind(visit.status.as_str())
            .bind(visit.visit_date)
            .bind(visit.created_at)
            .bind(visit.updated_at)
            .fetch_one(&mut *tx)
            .await?;
        let created = visit_from_row(&row)?;

        insert_audit(&mut tx, &audit, created.created_at).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find_visit(&self, id: Uuid) -> Result<Option<Visit>> {
        let sql = format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(visit_from_row).transpose()
    }

    async fn list_visits(&self, filter: &VisitFilter) -> Result<(Vec<Visit>, i64)> {
        let status = filter.status.map(|s| s.as_str());
        let predicate = "($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR patient_id = $2)
              AND ($3::UUID IS NULL OR nurse_id = $3)
              AND ($4::UUID IS NULL OR doctor_id = $4)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM visits WHERE {predicate}"))
                .bind(status)
                .bind(filter.patient_id)
                .bind(filter.nurse_id)
                .bind(filter.doctor_id)
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            "SELECT {VISIT_COLUMNS} FROM visits WHERE {predicate}
             ORDER BY visit_date DESC, created_at DESC
             LIMIT $5 OFFSET $6"
        );
        let rows = sqlx::query(&sql)
            .bind(status)
            .bind(filter.patient_id)
            .bind(filter.nurse_id)
            .bind(filter.doctor_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        let visits = rows.iter().map(visit_from_row).collect::<Result<Vec<_>>>()?;
        Ok((visits, total))
    }

    async fn transition_visit(
        &self,
        id: Uuid,
        next: VisitStatus,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<Visit> {
        let mut tx = self.pool.begin().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM visits WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current: VisitStatus = match current {
            Some(raw) => parse_column(raw, "status")?,
            None => return Err(Error::not_found("Visit", id)),
        };
        guards::transition(current, next)?;

        let sql = format!(
            "UPDATE visits SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {VISIT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(next.as_str())
            .bind(at)
            .fetch_one(&mut *tx)
            .await?;
        let updated = visit_from_row(&row)?;

        insert_audit(&mut tx, &audit, at).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn insert_form(
        &self,
        form: FormRecord,
        rules: FormInsertRules,
        audit: AuditRecord,
    ) -> Result<FormRecord> {
        let mut tx = self.pool.begin().await?;

        // FOR SHARE keeps the visit from being closed while the form is attached.
        let sql = format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = $1 FOR SHARE");
        let visit = sqlx::query(&sql)
            .bind(form.visit_id)
            .fetch_optional(&mut *tx)
            .await?
            .as_ref()
            .map(visit_from_row)
            .transpose()?;
        guards::visit_accepts_forms(visit.as_ref(), form.visit_id)?;

        if rules.require_submitted_nurse_form {
            let submitted: bool = sqlx::query_scalar(
                "SELECT EXISTS (
                     SELECT 1 FROM nurse_forms WHERE visit_id = $1 AND status = 'submitted'
                 )",
            )
            .bind(form.visit_id)
            .fetch_one(&mut *tx)
            .await?;
            guards::nurse_form_submitted(submitted, form.visit_id)?;
        }

        let sql = format!(
            "INSERT INTO {} (id, visit_id, author_id, status, data, created_at, updated_at, submitted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {FORM_COLUMNS}",
            form.kind.table()
        );
        let row = sqlx::query(&sql)
            .bind(form.id)
            .bind(form.visit_id)
            .bind(form.author_id)
            .bind(form.status.as_str())
            .bind(&form.data)
            .bind(form.created_at)
            .bind(form.updated_at)
            .bind(form.submitted_at)
            .fetch_one(&mut *tx)
            .await?;
        let created = form_from_row(form.kind, &row)?;

        insert_audit(&mut tx, &audit, created.created_at).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find_form(&self, kind: FormKind, id: Uuid) -> Result<Option<FormRecord>> {
        let sql = format!("SELECT {FORM_COLUMNS} FROM {} WHERE id = $1", kind.table());
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| form_from_row(kind, &r)).transpose()
    }

    async fn list_forms(
        &self,
        kind: FormKind,
        filter: &FormFilter,
    ) -> Result<(Vec<FormRecord>, i64)> {
        let table = kind.table();
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {table} WHERE ($1::UUID IS NULL OR visit_id = $1)"
        ))
        .bind(filter.visit_id)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {FORM_COLUMNS} FROM {table}
             WHERE ($1::UUID IS NULL OR visit_id = $1)
             ORDER BY created_at DESC, id ASC
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.visit_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        let forms = rows
            .iter()
            .map(|r| form_from_row(kind, r))
            .collect::<Result<Vec<_>>>()?;
        Ok((forms, total))
    }

    async fn update_form_data(
        &self,
        kind: FormKind,
        id: Uuid,
        author_id: Uuid,
        data: JsonValue,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<FormRecord> {
        let mut tx = self.pool.begin().await?;

        let current = lock_form(&mut tx, kind, id).await?;
        guards::form_editable(current.as_ref(), kind, id, author_id)?;

        let sql = format!(
            "UPDATE {} SET data = $2, updated_at = $3 WHERE id = $1 RETURNING {FORM_COLUMNS}",
            kind.table()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&data)
            .bind(at)
            .fetch_one(&mut *tx)
            .await?;
        let updated = form_from_row(kind, &row)?;

        insert_audit(&mut tx, &audit, at).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn submit_form(
        &self,
        kind: FormKind,
        id: Uuid,
        author_id: Uuid,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<FormRecord> {
        let mut tx = self.pool.begin().await?;

        let current = lock_form(&mut tx, kind, id).await?;
        guards::form_editable(current.as_ref(), kind, id, author_id)?;

        let sql = format!(
            "UPDATE {} SET status = 'submitted', submitted_at = $2, updated_at = $2
             WHERE id = $1
             RETURNING {FORM_COLUMNS}",
            kind.table()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(at)
            .fetch_one(&mut *tx)
            .await?;
        let updated = form_from_row(kind, &row)?;

        insert_audit(&mut tx, &audit, at).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn list_audit_logs(&self, filter: &AuditFilter) -> Result<(Vec<AuditLogEntry>, i64)> {
        let predicate = "($1::UUID IS NULL OR user_id = $1)
              AND ($2::TEXT IS NULL OR action = $2)
              AND ($3::TEXT IS NULL OR entity_type = $3)
              AND ($4::UUID IS NULL OR entity_id = $4)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audit_logs WHERE {predicate}"))
                .bind(filter.user_id)
                .bind(filter.action.as_deref())
                .bind(filter.entity_type.as_deref())
                .bind(filter.entity_id)
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            "SELECT id, user_id, action, entity_type, entity_id, details, created_at
             FROM audit_logs WHERE {predicate}
             ORDER BY created_at DESC, id DESC
             LIMIT $5 OFFSET $6"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.user_id)
            .bind(filter.action.as_deref())
            .bind(filter.entity_type.as_deref())
            .bind(filter.entity_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        let entries = rows.iter().map(audit_from_row).collect::<Result<Vec<_>>>()?;
        Ok((entries, total))
    }
}
