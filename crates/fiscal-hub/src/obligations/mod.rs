//! Recurring fiscal obligations: the static rule catalog, the persisted
//! record model, and the monthly reconciliation engine.

pub mod catalog;
pub mod domain;
pub mod repository;
pub mod sync;

pub use catalog::{standard_rules, DueDayRule, ObligationRule};
pub use domain::{
    Company, Competence, DocumentRef, InvalidCompetence, Jurisdiction, ObligationClass,
    ObligationKey, ObligationRecord, TaskStatus, UnknownCode,
};
pub use repository::{
    AssignmentUpdate, AuditEvent, AuditTrail, ClassificationRecord, ClassificationStore,
    CompanyDirectory, NewObligation, Notification, NotificationKind, NotificationSink,
    ObligationFilter, ObligationStore, StoreError,
};
pub use sync::{MonthlySyncEngine, SyncError, SyncGate, SyncReport};
