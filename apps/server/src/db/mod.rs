//! Persistence layer.

pub mod guards;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use traits::{
    AuditFilter, FormFilter, FormInsertRules, FormKind, FormRecord, PatientFilter, Store,
    UserFilter, UserRecord, VisitFilter,
};
