use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::catalog::{standard_rules, DueDayRule, ObligationRule};
use super::domain::{Company, Competence, ObligationKey, TaskStatus};
use super::repository::{
    AssignmentUpdate, CompanyDirectory, NewObligation, ObligationStore, StoreError,
};
use crate::calendar::{last_day_of_month, national_holidays, previous_business_day};

/// Counters describing what one reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub competence: Competence,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl SyncReport {
    fn new(competence: Competence) -> Self {
        Self {
            competence,
            created: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("could not enumerate companies: {0}")]
    Directory(#[source] StoreError),
}

enum Reconciliation {
    Created,
    Updated,
    Unchanged,
}

/// Reconciles obligation records for a competence across every active
/// company and every catalog rule.
///
/// `sync_month` is idempotent: re-running it for the same competence
/// converges to the same record set, so a crash mid-pass or a concurrent
/// re-run only costs wasted work, never duplicate records.
pub struct MonthlySyncEngine<S, C> {
    store: Arc<S>,
    directory: Arc<C>,
    rules: &'static [ObligationRule],
}

impl<S, C> MonthlySyncEngine<S, C>
where
    S: ObligationStore,
    C: CompanyDirectory,
{
    pub fn new(store: Arc<S>, directory: Arc<C>) -> Self {
        Self::with_rules(store, directory, standard_rules())
    }

    pub fn with_rules(
        store: Arc<S>,
        directory: Arc<C>,
        rules: &'static [ObligationRule],
    ) -> Self {
        Self {
            store,
            directory,
            rules,
        }
    }

    pub fn sync_month(&self, competence: Competence) -> Result<SyncReport, SyncError> {
        let companies = self
            .directory
            .list_active()
            .map_err(SyncError::Directory)?;

        let mut report = SyncReport::new(competence);
        let competence_holidays = national_holidays(competence.year());

        for company in &companies {
            let owner_id = company.effective_owner();
            for rule in self.rules {
                match self.reconcile(company, owner_id, rule, competence, &competence_holidays) {
                    Ok(Reconciliation::Created) => report.created += 1,
                    Ok(Reconciliation::Updated) => report.updated += 1,
                    Ok(Reconciliation::Unchanged) => report.unchanged += 1,
                    Err(err) => {
                        // One bad company/rule pair must not sink the batch;
                        // the next pass retries it.
                        warn!(
                            company_id = company.id,
                            tax_code = rule.tax_code,
                            error = %err,
                            "skipping obligation during monthly sync"
                        );
                        report.skipped += 1;
                    }
                }
            }
        }

        info!(
            competence = %competence,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            "monthly sync finished"
        );
        Ok(report)
    }

    fn reconcile(
        &self,
        company: &Company,
        owner_id: u64,
        rule: &ObligationRule,
        competence: Competence,
        competence_holidays: &BTreeSet<NaiveDate>,
    ) -> Result<Reconciliation, StoreError> {
        let target = competence.shift(rule.month_offset);
        let due_holidays;
        let holidays = if target.year() == competence.year() {
            competence_holidays
        } else {
            due_holidays = national_holidays(target.year());
            &due_holidays
        };

        let last_day = last_day_of_month(target.year(), target.month());
        let base_day = match rule.due {
            DueDayRule::Day(day) => day.min(last_day),
            DueDayRule::LastBusinessDay => last_day,
        };
        let anchor = NaiveDate::from_ymd_opt(target.year(), target.month(), base_day)
            .expect("anchored day is within the target month");
        let due_date = previous_business_day(anchor, holidays);

        let key = ObligationKey::new(
            company.id,
            competence,
            rule.class,
            rule.jurisdiction,
            rule.tax_code,
        );

        match self.store.find_by_key(&key)? {
            Some(existing) => {
                if existing.title != rule.tax_code
                    || existing.due_date != due_date
                    || existing.owner_id != owner_id
                {
                    self.store.update_assignment(
                        existing.id,
                        AssignmentUpdate {
                            title: rule.tax_code.to_string(),
                            due_date,
                            owner_id,
                        },
                    )?;
                    Ok(Reconciliation::Updated)
                } else {
                    Ok(Reconciliation::Unchanged)
                }
            }
            None => {
                self.store.insert(NewObligation {
                    company_id: company.id,
                    owner_id,
                    title: rule.tax_code.to_string(),
                    class: rule.class,
                    jurisdiction: rule.jurisdiction,
                    tax_code: rule.tax_code.to_string(),
                    competence,
                    due_date,
                    status: TaskStatus::Pending,
                })?;
                Ok(Reconciliation::Created)
            }
        }
    }
}

/// Serializes lazy re-syncs behind a mutex so concurrent requests observing
/// a stale competence cannot duplicate the work. The lock is held across the
/// run on purpose; the sync itself stays idempotent either way.
#[derive(Default)]
pub struct SyncGate {
    last: Mutex<Option<Competence>>,
}

impl SyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `sync` unless `current` was already synced. Returns the report
    /// when a run happened, `None` when the gate was already current.
    pub fn ensure_current<F>(
        &self,
        current: Competence,
        sync: F,
    ) -> Result<Option<SyncReport>, SyncError>
    where
        F: FnOnce() -> Result<SyncReport, SyncError>,
    {
        let mut last = self.last.lock().expect("sync gate mutex poisoned");
        if *last == Some(current) {
            return Ok(None);
        }
        let report = sync()?;
        *last = Some(current);
        Ok(Some(report))
    }

    /// Records an administratively forced sync for `competence`.
    pub fn mark(&self, competence: Competence) {
        let mut last = self.last.lock().expect("sync gate mutex poisoned");
        *last = Some(competence);
    }
}
