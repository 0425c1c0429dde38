//! Integration specifications for the monthly reconciliation engine: record
//! creation, idempotence, drift repair, and per-item failure isolation, all
//! exercised through the public store/directory traits.

mod common {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    use fiscal_hub::obligations::{
        AssignmentUpdate, Company, CompanyDirectory, DocumentRef, NewObligation,
        ObligationFilter, ObligationKey, ObligationRecord, ObligationStore, StoreError,
    };

    /// Mutex-backed store with an optional poisoned tax code so tests can
    /// simulate a single company/rule pair failing mid-batch.
    #[derive(Default)]
    pub(super) struct TestStore {
        records: Mutex<Vec<ObligationRecord>>,
        sequence: AtomicU64,
        pub(super) fail_tax_code: Option<&'static str>,
    }

    impl TestStore {
        pub(super) fn failing_on(tax_code: &'static str) -> Self {
            Self {
                fail_tax_code: Some(tax_code),
                ..Self::default()
            }
        }

        pub(super) fn snapshot(&self) -> Vec<ObligationRecord> {
            self.records.lock().expect("store mutex poisoned").clone()
        }

        pub(super) fn set_status(
            &self,
            id: u64,
            status: fiscal_hub::obligations::TaskStatus,
        ) {
            let mut records = self.records.lock().expect("store mutex poisoned");
            let record = records
                .iter_mut()
                .find(|record| record.id == id)
                .expect("record present");
            record.status = status;
        }

        fn check_poisoned(&self, tax_code: &str) -> Result<(), StoreError> {
            match self.fail_tax_code {
                Some(poisoned) if poisoned == tax_code => Err(StoreError::Unavailable(
                    "simulated storage failure".to_string(),
                )),
                _ => Ok(()),
            }
        }
    }

    impl ObligationStore for TestStore {
        fn find_by_key(
            &self,
            key: &ObligationKey,
        ) -> Result<Option<ObligationRecord>, StoreError> {
            self.check_poisoned(&key.tax_code)?;
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records.iter().find(|record| record.key() == *key).cloned())
        }

        fn get(&self, id: u64) -> Result<Option<ObligationRecord>, StoreError> {
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records.iter().find(|record| record.id == id).cloned())
        }

        fn insert(&self, new: NewObligation) -> Result<ObligationRecord, StoreError> {
            self.check_poisoned(&new.tax_code)?;
            let mut records = self.records.lock().expect("store mutex poisoned");
            let record = ObligationRecord {
                id: self.sequence.fetch_add(1, Ordering::Relaxed) + 1,
                company_id: new.company_id,
                owner_id: new.owner_id,
                title: new.title,
                class: new.class,
                jurisdiction: new.jurisdiction,
                tax_code: new.tax_code,
                competence: new.competence,
                due_date: new.due_date,
                status: new.status,
                document: None,
            };
            if records.iter().any(|existing| existing.key() == record.key()) {
                return Err(StoreError::Conflict);
            }
            records.push(record.clone());
            Ok(record)
        }

        fn update_assignment(
            &self,
            id: u64,
            update: AssignmentUpdate,
        ) -> Result<(), StoreError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            let record = records
                .iter_mut()
                .find(|record| record.id == id)
                .ok_or(StoreError::NotFound)?;
            record.title = update.title;
            record.due_date = update.due_date;
            record.owner_id = update.owner_id;
            Ok(())
        }

        fn attach_document(&self, id: u64, document: DocumentRef) -> Result<(), StoreError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            let record = records
                .iter_mut()
                .find(|record| record.id == id)
                .ok_or(StoreError::NotFound)?;
            record.document = Some(document);
            Ok(())
        }

        fn list(&self, filter: &ObligationFilter) -> Result<Vec<ObligationRecord>, StoreError> {
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records
                .iter()
                .filter(|record| {
                    filter
                        .company_id
                        .map_or(true, |company_id| record.company_id == company_id)
                })
                .cloned()
                .collect())
        }

        fn find_similar(
            &self,
            company_id: u64,
            text: &str,
            limit: usize,
        ) -> Result<Vec<ObligationRecord>, StoreError> {
            let needle = text.trim().to_lowercase();
            let records = self.records.lock().expect("store mutex poisoned");
            let mut matches: Vec<ObligationRecord> = records
                .iter()
                .filter(|record| record.company_id == company_id)
                .filter(|record| {
                    record.title.to_lowercase().contains(&needle)
                        || record.tax_code.to_lowercase().contains(&needle)
                })
                .cloned()
                .collect();
            matches.truncate(limit);
            Ok(matches)
        }
    }

    pub(super) struct TestDirectory {
        companies: Mutex<Vec<Company>>,
    }

    impl TestDirectory {
        pub(super) fn with_companies(companies: Vec<Company>) -> Self {
            Self {
                companies: Mutex::new(companies),
            }
        }

        pub(super) fn set_responsible(&self, company_id: u64, responsible_id: Option<u64>) {
            let mut companies = self.companies.lock().expect("directory mutex poisoned");
            let company = companies
                .iter_mut()
                .find(|company| company.id == company_id)
                .expect("company present");
            company.responsible_id = responsible_id;
        }
    }

    impl CompanyDirectory for TestDirectory {
        fn list_active(&self) -> Result<Vec<Company>, StoreError> {
            let companies = self.companies.lock().expect("directory mutex poisoned");
            Ok(companies.clone())
        }

        fn get(&self, id: u64) -> Result<Option<Company>, StoreError> {
            let companies = self.companies.lock().expect("directory mutex poisoned");
            Ok(companies.iter().find(|company| company.id == id).cloned())
        }
    }

    /// Directory that always fails, to assert aggregate failures are fatal.
    pub(super) struct OfflineDirectory;

    impl CompanyDirectory for OfflineDirectory {
        fn list_active(&self) -> Result<Vec<Company>, StoreError> {
            Err(StoreError::Unavailable("directory offline".to_string()))
        }

        fn get(&self, _id: u64) -> Result<Option<Company>, StoreError> {
            Err(StoreError::Unavailable("directory offline".to_string()))
        }
    }

    pub(super) fn companies() -> Vec<Company> {
        vec![
            Company {
                id: 1,
                name: "Comercial Alfa Ltda".to_string(),
                cnpj: Some("12.345.678/0001-95".to_string()),
                manager_id: 10,
                responsible_id: Some(20),
            },
            Company {
                id: 2,
                name: "Indústria Beta SA".to_string(),
                cnpj: None,
                manager_id: 10,
                responsible_id: None,
            },
        ]
    }
}

use std::sync::Arc;

use chrono::{Datelike, Weekday};
use fiscal_hub::calendar::national_holidays;
use fiscal_hub::obligations::{
    standard_rules, Competence, DueDayRule, MonthlySyncEngine, TaskStatus,
};

use common::{companies, OfflineDirectory, TestDirectory, TestStore};

fn competence(year: i32, month: u32) -> Competence {
    Competence::new(year, month).expect("valid competence")
}

#[test]
fn first_sync_creates_one_record_per_company_and_rule() {
    let store = Arc::new(TestStore::default());
    let directory = Arc::new(TestDirectory::with_companies(companies()));
    let engine = MonthlySyncEngine::new(store.clone(), directory);

    let report = engine.sync_month(competence(2026, 2)).expect("sync succeeds");

    assert_eq!(report.created, companies().len() * standard_rules().len());
    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 0);

    let records = store.snapshot();
    assert_eq!(records.len(), report.created);
    assert!(records
        .iter()
        .all(|record| record.status == TaskStatus::Pending));
    assert!(records
        .iter()
        .all(|record| record.title == record.tax_code));

    // Owner falls back to the manager when no responsible is assigned.
    assert!(records
        .iter()
        .filter(|record| record.company_id == 1)
        .all(|record| record.owner_id == 20));
    assert!(records
        .iter()
        .filter(|record| record.company_id == 2)
        .all(|record| record.owner_id == 10));
}

#[test]
fn every_computed_due_date_is_a_business_day() {
    let store = Arc::new(TestStore::default());
    let directory = Arc::new(TestDirectory::with_companies(companies()));
    let engine = MonthlySyncEngine::new(store.clone(), directory);

    engine.sync_month(competence(2026, 2)).expect("sync succeeds");

    for record in store.snapshot() {
        let holidays = national_holidays(record.due_date.year());
        assert!(
            !matches!(record.due_date.weekday(), Weekday::Sat | Weekday::Sun),
            "{} due on a weekend",
            record.tax_code
        );
        assert!(
            !holidays.contains(&record.due_date),
            "{} due on a holiday",
            record.tax_code
        );
    }
}

#[test]
fn last_business_day_rules_stay_inside_their_target_month() {
    let store = Arc::new(TestStore::default());
    let directory = Arc::new(TestDirectory::with_companies(companies()));
    let engine = MonthlySyncEngine::new(store.clone(), directory);

    for month in 1..=12 {
        engine.sync_month(competence(2026, month)).expect("sync succeeds");
    }

    let sentinel_codes: Vec<&str> = standard_rules()
        .iter()
        .filter(|rule| rule.due == DueDayRule::LastBusinessDay)
        .map(|rule| rule.tax_code)
        .collect();

    for record in store.snapshot() {
        if sentinel_codes.contains(&record.tax_code.as_str()) {
            assert_eq!(record.due_date.month(), record.competence.month());
            assert_eq!(record.due_date.year(), record.competence.year());
        }
    }
}

#[test]
fn second_sync_changes_nothing() {
    let store = Arc::new(TestStore::default());
    let directory = Arc::new(TestDirectory::with_companies(companies()));
    let engine = MonthlySyncEngine::new(store.clone(), directory);

    engine.sync_month(competence(2026, 2)).expect("first sync succeeds");
    let before = store.snapshot();

    let report = engine.sync_month(competence(2026, 2)).expect("second sync succeeds");

    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 0);
    assert_eq!(report.unchanged, before.len());
    assert_eq!(store.snapshot(), before);
}

#[test]
fn owner_drift_is_repaired_without_touching_status() {
    let store = Arc::new(TestStore::default());
    let directory = Arc::new(TestDirectory::with_companies(companies()));
    let engine = MonthlySyncEngine::new(store.clone(), directory.clone());

    engine.sync_month(competence(2026, 2)).expect("first sync succeeds");
    let done_task = store
        .snapshot()
        .into_iter()
        .find(|record| record.company_id == 1)
        .expect("record present");
    store.set_status(done_task.id, TaskStatus::Done);

    directory.set_responsible(1, Some(33));
    let report = engine.sync_month(competence(2026, 2)).expect("resync succeeds");

    let per_company = standard_rules().len();
    assert_eq!(report.updated, per_company);
    assert_eq!(report.created, 0);

    let records = store.snapshot();
    assert!(records
        .iter()
        .filter(|record| record.company_id == 1)
        .all(|record| record.owner_id == 33));

    let preserved = records
        .iter()
        .find(|record| record.id == done_task.id)
        .expect("record present");
    assert_eq!(preserved.status, TaskStatus::Done);
}

#[test]
fn a_failing_rule_is_skipped_and_the_batch_continues() {
    let store = Arc::new(TestStore::failing_on("GIA"));
    let directory = Arc::new(TestDirectory::with_companies(companies()));
    let engine = MonthlySyncEngine::new(store.clone(), directory);

    let report = engine.sync_month(competence(2026, 2)).expect("sync succeeds");

    let company_count = companies().len();
    assert_eq!(report.skipped, company_count);
    assert_eq!(
        report.created,
        company_count * (standard_rules().len() - 1)
    );
    assert!(store
        .snapshot()
        .iter()
        .all(|record| record.tax_code != "GIA"));
}

#[test]
fn an_unreachable_directory_is_fatal() {
    let store = Arc::new(TestStore::default());
    let engine = MonthlySyncEngine::new(store, Arc::new(OfflineDirectory));

    let error = engine
        .sync_month(competence(2026, 2))
        .expect_err("aggregate failure propagates");
    assert!(error.to_string().contains("could not enumerate companies"));
}
