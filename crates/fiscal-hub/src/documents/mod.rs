//! Cross-checks extracted document text against the obligation record the
//! upload was attached to.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;

use crate::obligations::{
    AuditEvent, AuditTrail, Company, Competence, Notification, NotificationKind,
    NotificationSink, ObligationRecord,
};

/// Best-effort conversion of raw document bytes into text.
///
/// Implementations never fail: any unreadable input yields an empty string,
/// which downstream checks treat as "no evidence" rather than as a mismatch.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    CnpjMismatch,
    CompetenceMismatch,
    TaxCodeNotFound,
}

/// One discrepancy between a document and its task's recorded metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyIssue {
    pub kind: IssueKind,
    pub detail: String,
}

/// Reduces a CNPJ to its 14 digits; anything else is treated as absent.
pub fn normalize_cnpj(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(|ch| ch.is_ascii_digit()).collect();
    (digits.len() == 14).then_some(digits)
}

/// Finds a CNPJ in document text: the punctuated form first, then a bare
/// 14-digit run.
pub fn find_cnpj(text: &str) -> Option<String> {
    static PUNCTUATED: OnceLock<Regex> = OnceLock::new();
    static BARE: OnceLock<Regex> = OnceLock::new();

    let punctuated = PUNCTUATED.get_or_init(|| {
        Regex::new(r"\b\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}\b").expect("pattern is valid")
    });
    let bare = BARE.get_or_init(|| Regex::new(r"\b\d{14}\b").expect("pattern is valid"));

    punctuated
        .find(text)
        .or_else(|| bare.find(text))
        .and_then(|found| normalize_cnpj(found.as_str()))
}

/// Finds an `MM/YYYY` or `MM-YYYY` competence token in document text.
pub fn find_competence(text: &str) -> Option<Competence> {
    static RX: OnceLock<Regex> = OnceLock::new();
    let rx = RX.get_or_init(|| {
        Regex::new(r"\b(0[1-9]|1[0-2])[/-](\d{4})\b").expect("pattern is valid")
    });

    let captures = rx.captures(text)?;
    let month = captures[1].parse().ok()?;
    let year = captures[2].parse().ok()?;
    Competence::new(year, month).ok()
}

/// Compares document facts against the task and its company. Each check only
/// fires when both sides carry a value; an empty extraction yields no issues
/// at all, trading false negatives for zero false alarms.
pub fn review(
    document_text: &str,
    task: &ObligationRecord,
    company: &Company,
) -> Vec<ConsistencyIssue> {
    if document_text.trim().is_empty() {
        return Vec::new();
    }

    let mut issues = Vec::new();

    let expected_cnpj = company.cnpj.as_deref().and_then(normalize_cnpj);
    if let (Some(found), Some(expected)) = (find_cnpj(document_text), expected_cnpj) {
        if found != expected {
            issues.push(ConsistencyIssue {
                kind: IssueKind::CnpjMismatch,
                detail: format!("CNPJ diverge (documento {found} != empresa {expected})"),
            });
        }
    }

    if let Some(found) = find_competence(document_text) {
        if found != task.competence {
            issues.push(ConsistencyIssue {
                kind: IssueKind::CompetenceMismatch,
                detail: format!(
                    "competência diverge (documento {} != tarefa {})",
                    found.storage_key(),
                    task.competence.storage_key()
                ),
            });
        }
    }

    let tax_code = task.tax_code.trim();
    if !tax_code.is_empty() {
        let haystack = document_text.to_lowercase();
        if !haystack.contains(&tax_code.to_lowercase()) {
            issues.push(ConsistencyIssue {
                kind: IssueKind::TaxCodeNotFound,
                detail: format!("tributo '{tax_code}' não encontrado no documento"),
            });
        }
    }

    issues
}

/// Runs the consistency review and routes any findings to the audit trail
/// and the task owner's notification feed. Findings never block the upload.
pub struct ConsistencyChecker<A, N> {
    audit: Arc<A>,
    notifications: Arc<N>,
}

impl<A, N> ConsistencyChecker<A, N>
where
    A: AuditTrail,
    N: NotificationSink,
{
    pub fn new(audit: Arc<A>, notifications: Arc<N>) -> Self {
        Self {
            audit,
            notifications,
        }
    }

    pub fn check(
        &self,
        document_text: &str,
        task: &ObligationRecord,
        company: &Company,
        actor_id: Option<u64>,
    ) -> Vec<ConsistencyIssue> {
        let issues = review(document_text, task, company);
        if issues.is_empty() {
            return issues;
        }

        let details = issues
            .iter()
            .map(|issue| issue.detail.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        self.audit.record(AuditEvent {
            task_id: task.id,
            actor_id,
            action: "inconsistency".to_string(),
            details: details.clone(),
        });
        self.notifications.notify(Notification {
            user_id: task.owner_id,
            kind: NotificationKind::Inconsistency,
            ref_id: task.id,
            message: format!("Inconsistência na tarefa {}: {details}", task.title),
        });

        issues
    }
}
