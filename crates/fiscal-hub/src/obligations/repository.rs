use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{
    Company, Competence, DocumentRef, Jurisdiction, ObligationClass, ObligationKey,
    ObligationRecord, TaskStatus,
};
use crate::classifier::{ClassificationResult, ReviewStatus};

/// Error enumeration for persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists for this natural key")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Field values for inserting a new obligation record.
#[derive(Debug, Clone)]
pub struct NewObligation {
    pub company_id: u64,
    pub owner_id: u64,
    pub title: String,
    pub class: ObligationClass,
    pub jurisdiction: Jurisdiction,
    pub tax_code: String,
    pub competence: Competence,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
}

/// The rule-derived fields the sync engine may rewrite on an existing record.
/// Status and the remaining workflow fields are never touched here.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentUpdate {
    pub title: String,
    pub due_date: NaiveDate,
    pub owner_id: u64,
}

/// Listing filter for the read endpoint.
#[derive(Debug, Clone, Default)]
pub struct ObligationFilter {
    pub company_id: Option<u64>,
    pub competence: Option<Competence>,
    pub status: Option<TaskStatus>,
    pub jurisdiction: Option<Jurisdiction>,
}

/// Storage abstraction for obligation records.
///
/// Implementations must enforce natural-key uniqueness: `insert` rejects a
/// record whose key already exists, closing the race the lookup-then-write
/// pattern alone would leave open.
pub trait ObligationStore: Send + Sync {
    fn find_by_key(&self, key: &ObligationKey) -> Result<Option<ObligationRecord>, StoreError>;
    fn get(&self, id: u64) -> Result<Option<ObligationRecord>, StoreError>;
    fn insert(&self, record: NewObligation) -> Result<ObligationRecord, StoreError>;
    fn update_assignment(&self, id: u64, update: AssignmentUpdate) -> Result<(), StoreError>;
    fn attach_document(&self, id: u64, document: DocumentRef) -> Result<(), StoreError>;
    fn list(&self, filter: &ObligationFilter) -> Result<Vec<ObligationRecord>, StoreError>;
    /// Free-text lookup over a company's titles and tax codes, used to
    /// suggest candidates when a classification needs manual review.
    fn find_similar(
        &self,
        company_id: u64,
        text: &str,
        limit: usize,
    ) -> Result<Vec<ObligationRecord>, StoreError>;
}

/// Company metadata lookups used by the sync engine and the upload flow.
pub trait CompanyDirectory: Send + Sync {
    fn list_active(&self) -> Result<Vec<Company>, StoreError>;
    fn get(&self, id: u64) -> Result<Option<Company>, StoreError>;
}

/// One append-only audit entry tied to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub task_id: u64,
    pub actor_id: Option<u64>,
    pub action: String,
    pub details: String,
}

/// Append-only audit log. Recording must never fail the calling flow;
/// implementations handle their own errors.
pub trait AuditTrail: Send + Sync {
    fn record(&self, event: AuditEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Inconsistency,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inconsistency => "inconsistency",
        }
    }
}

/// A message delivered to a user's notification feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub user_id: u64,
    pub kind: NotificationKind,
    pub ref_id: u64,
    pub message: String,
}

/// Fire-and-forget notification delivery.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// A classification outcome persisted alongside the upload that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRecord {
    pub task_id: u64,
    pub actor_id: Option<u64>,
    pub status: ReviewStatus,
    #[serde(flatten)]
    pub result: ClassificationResult,
}

/// Persistence for classification outcomes.
pub trait ClassificationStore: Send + Sync {
    fn insert(&self, record: ClassificationRecord) -> Result<(), StoreError>;
}
