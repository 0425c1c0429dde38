use std::sync::Arc;

use chrono::Local;
use clap::Args;
use fiscal_hub::classifier::classify_filename;
use fiscal_hub::documents::ConsistencyChecker;
use fiscal_hub::error::AppError;
use fiscal_hub::obligations::{
    ClassificationRecord, ClassificationStore, Company, Competence, MonthlySyncEngine,
    ObligationFilter, ObligationStore,
};

use crate::infra::{
    InMemoryAuditTrail, InMemoryClassificationStore, InMemoryCompanyDirectory,
    InMemoryNotificationSink, InMemoryObligationStore,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Competence year to reconcile. Defaults to the current year.
    #[arg(long)]
    pub(crate) year: Option<i32>,
    /// Competence month to reconcile. Defaults to the current month.
    #[arg(long)]
    pub(crate) month: Option<u32>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let current = Competence::from_date(Local::now().date_naive());
    let competence = match (args.year, args.month) {
        (Some(year), Some(month)) => match Competence::new(year, month) {
            Ok(competence) => competence,
            Err(err) => {
                eprintln!("invalid competence: {err}");
                return Ok(());
            }
        },
        (None, None) => current,
        _ => {
            eprintln!("provide --year and --month together, or neither");
            return Ok(());
        }
    };

    let store = Arc::new(InMemoryObligationStore::default());
    let directory = Arc::new(InMemoryCompanyDirectory::default());
    let company = Company {
        id: 1,
        name: "Comercial Alfa Ltda".to_string(),
        cnpj: Some("12.345.678/0001-95".to_string()),
        manager_id: 1,
        responsible_id: Some(2),
    };
    directory.insert(company.clone());
    directory.insert(Company {
        id: 2,
        name: "Indústria Beta SA".to_string(),
        cnpj: Some("98.765.432/0001-10".to_string()),
        manager_id: 1,
        responsible_id: None,
    });

    let engine = MonthlySyncEngine::new(store.clone(), directory);

    println!("Fiscal obligation scheduler demo");
    println!("Competence: {}", competence.label());

    let report = engine.sync_month(competence).map_err(AppError::from)?;
    println!(
        "First pass: {} created, {} updated, {} unchanged, {} skipped",
        report.created, report.updated, report.unchanged, report.skipped
    );

    let second = engine.sync_month(competence).map_err(AppError::from)?;
    println!(
        "Second pass (idempotence): {} created, {} updated, {} unchanged",
        second.created, second.updated, second.unchanged
    );

    let records = store
        .list(&ObligationFilter::default())
        .unwrap_or_default();
    println!("\nSchedule by due date");
    for record in &records {
        println!(
            "- {} | company {} | {} {} | {} | due {} | {}",
            record.competence.label(),
            record.company_id,
            record.class.code(),
            record.jurisdiction.code(),
            record.title,
            record.due_date,
            record.status.label()
        );
    }

    println!("\nFilename classification samples");
    let classifications = InMemoryClassificationStore::default();
    let samples = [
        "02-2026 - ICMS DIFAL - Comercial Alfa Ltda.pdf",
        "02-2026 - DARF PIS - Indústria Beta SA.pdf",
        "02-2026 - SPED Contribuições - Comercial Alfa Ltda.pdf",
        "digitalizacao avulsa.pdf",
    ];
    for sample in samples {
        let result = classify_filename(sample);
        println!(
            "- {sample}\n    tax code {:?} | action {:?} | confidence {:.2} | status {}",
            result.tax_code,
            result.action.map(|action| action.code()),
            result.confidence,
            result.review_status().label()
        );
        let record = ClassificationRecord {
            task_id: 0,
            actor_id: None,
            status: result.review_status(),
            result,
        };
        if let Err(err) = classifications.insert(record) {
            eprintln!("classification not stored: {err}");
        }
    }
    println!("Stored classification records: {}", classifications.records().len());

    if let Some(task) = records.iter().find(|record| record.company_id == company.id) {
        println!("\nConsistency review sample");
        let audit = Arc::new(InMemoryAuditTrail::default());
        let notifications = Arc::new(InMemoryNotificationSink::default());
        let checker = ConsistencyChecker::new(audit.clone(), notifications.clone());

        let text = format!(
            "{} período {} CNPJ 98.765.432/0001-10",
            task.tax_code,
            competence.label()
        );
        for issue in checker.check(&text, task, &company, None) {
            println!("- [{:?}] {}", issue.kind, issue.detail);
        }
        println!("Audit entries recorded: {}", audit.events().len());
        for notification in notifications.sent() {
            println!(
                "- notified user {} about task {}: {}",
                notification.user_id, notification.ref_id, notification.message
            );
        }
    }

    Ok(())
}
