use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use fiscal_hub::classifier::ClassificationArchive;
use fiscal_hub::config::StorageConfig;
use fiscal_hub::documents::{ConsistencyChecker, TextExtractor};
use fiscal_hub::obligations::{
    AssignmentUpdate, AuditEvent, AuditTrail, ClassificationRecord, ClassificationStore, Company,
    CompanyDirectory, DocumentRef, MonthlySyncEngine, NewObligation, Notification,
    NotificationSink, ObligationFilter, ObligationRecord, ObligationStore, StoreError, SyncGate,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Domain collaborators shared by every route handler.
#[derive(Clone)]
pub(crate) struct HubState {
    pub(crate) store: Arc<InMemoryObligationStore>,
    pub(crate) directory: Arc<InMemoryCompanyDirectory>,
    pub(crate) audit: Arc<InMemoryAuditTrail>,
    pub(crate) notifications: Arc<InMemoryNotificationSink>,
    pub(crate) classifications: Arc<InMemoryClassificationStore>,
    pub(crate) engine: Arc<MonthlySyncEngine<InMemoryObligationStore, InMemoryCompanyDirectory>>,
    pub(crate) gate: Arc<SyncGate>,
    pub(crate) checker: Arc<ConsistencyChecker<InMemoryAuditTrail, InMemoryNotificationSink>>,
    pub(crate) archive: Arc<ClassificationArchive>,
    pub(crate) extractor: Arc<PlainTextExtractor>,
    pub(crate) max_upload_bytes: usize,
}

impl HubState {
    pub(crate) fn build(storage: &StorageConfig) -> Self {
        let store = Arc::new(InMemoryObligationStore::default());
        let directory = Arc::new(InMemoryCompanyDirectory::default());
        let audit = Arc::new(InMemoryAuditTrail::default());
        let notifications = Arc::new(InMemoryNotificationSink::default());
        let classifications = Arc::new(InMemoryClassificationStore::default());
        let engine = Arc::new(MonthlySyncEngine::new(store.clone(), directory.clone()));
        let checker = Arc::new(ConsistencyChecker::new(
            audit.clone(),
            notifications.clone(),
        ));
        let archive = Arc::new(ClassificationArchive::new(&storage.data_dir));

        Self {
            store,
            directory,
            audit,
            notifications,
            classifications,
            engine,
            gate: Arc::new(SyncGate::new()),
            checker,
            archive,
            extractor: Arc::new(PlainTextExtractor),
            max_upload_bytes: storage.max_upload_bytes(),
        }
    }
}

#[derive(Default)]
pub(crate) struct InMemoryObligationStore {
    records: Mutex<Vec<ObligationRecord>>,
    sequence: AtomicU64,
}

impl ObligationStore for InMemoryObligationStore {
    fn find_by_key(
        &self,
        key: &fiscal_hub::obligations::ObligationKey,
    ) -> Result<Option<ObligationRecord>, StoreError> {
        let records = self.records.lock().expect("store mutex poisoned");
        Ok(records.iter().find(|record| record.key() == *key).cloned())
    }

    fn get(&self, id: u64) -> Result<Option<ObligationRecord>, StoreError> {
        let records = self.records.lock().expect("store mutex poisoned");
        Ok(records.iter().find(|record| record.id == id).cloned())
    }

    fn insert(&self, new: NewObligation) -> Result<ObligationRecord, StoreError> {
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

    fn update_assignment(&self, id: u64, update: AssignmentUpdate) -> Result<(), StoreError> {
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
        let mut selected: Vec<ObligationRecord> = records
            .iter()
            .filter(|record| {
                filter
                    .company_id
                    .map_or(true, |company_id| record.company_id == company_id)
                    && filter
                        .competence
                        .map_or(true, |competence| record.competence == competence)
                    && filter.status.map_or(true, |status| record.status == status)
                    && filter
                        .jurisdiction
                        .map_or(true, |jurisdiction| record.jurisdiction == jurisdiction)
            })
            .cloned()
            .collect();
        selected.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(selected)
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
        matches.sort_by(|a, b| {
            b.competence
                .cmp(&a.competence)
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        });
        matches.truncate(limit);
        Ok(matches)
    }
}

#[derive(Default)]
pub(crate) struct InMemoryCompanyDirectory {
    companies: Mutex<Vec<Company>>,
}

impl InMemoryCompanyDirectory {
    pub(crate) fn insert(&self, company: Company) {
        let mut companies = self.companies.lock().expect("directory mutex poisoned");
        companies.push(company);
    }
}

impl CompanyDirectory for InMemoryCompanyDirectory {
    fn list_active(&self) -> Result<Vec<Company>, StoreError> {
        let companies = self.companies.lock().expect("directory mutex poisoned");
        Ok(companies.clone())
    }

    fn get(&self, id: u64) -> Result<Option<Company>, StoreError> {
        let companies = self.companies.lock().expect("directory mutex poisoned");
        Ok(companies.iter().find(|company| company.id == id).cloned())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryAuditTrail {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditTrail {
    pub(crate) fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditTrail for InMemoryAuditTrail {
    fn record(&self, event: AuditEvent) {
        let mut events = self.events.lock().expect("audit mutex poisoned");
        events.push(event);
    }
}

#[derive(Default)]
pub(crate) struct InMemoryNotificationSink {
    sent: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationSink {
    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn notify(&self, notification: Notification) {
        let mut sent = self.sent.lock().expect("notification mutex poisoned");
        sent.push(notification);
    }
}

#[derive(Default)]
pub(crate) struct InMemoryClassificationStore {
    records: Mutex<Vec<ClassificationRecord>>,
}

impl InMemoryClassificationStore {
    pub(crate) fn records(&self) -> Vec<ClassificationRecord> {
        self.records
            .lock()
            .expect("classification mutex poisoned")
            .clone()
    }
}

impl ClassificationStore for InMemoryClassificationStore {
    fn insert(&self, record: ClassificationRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("classification mutex poisoned");
        records.push(record);
        Ok(())
    }
}

/// Extraction stand-in for plain-text payloads. Real PDF extraction plugs in
/// behind the same trait; anything unreadable degrades to an empty string.
pub(crate) struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> String {
        String::from_utf8(bytes.to_vec()).unwrap_or_default()
    }
}
