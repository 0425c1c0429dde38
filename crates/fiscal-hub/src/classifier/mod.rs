//! Filename classification against the obligation signature catalog.

pub mod archive;
mod catalog;
mod normalizer;

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::obligations::{Competence, Jurisdiction, ObligationClass};

pub use archive::{ArchiveError, ClassificationArchive};
pub use catalog::{signature_catalog, SignaturePattern};
pub use normalizer::normalize;

/// Action a document represents, inferred from keywords in its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InferredAction {
    #[serde(rename = "APURACAO")]
    Assessment,
    #[serde(rename = "GUIA")]
    PaymentGuide,
    #[serde(rename = "ENTREGA")]
    Delivery,
}

impl InferredAction {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Assessment => "APURACAO",
            Self::PaymentGuide => "GUIA",
            Self::Delivery => "ENTREGA",
        }
    }
}

/// Whether a classification is trustworthy enough to file automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Ok,
    NeedsReview,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NeedsReview => "needs_review",
        }
    }
}

/// Everything the classifier could infer from one filename. Absence of a
/// catalog match is a valid low-confidence result, never an error.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub filename: String,
    pub competence: Option<Competence>,
    pub company_fragment: String,
    pub group: Option<&'static str>,
    pub subgroup: Option<&'static str>,
    pub class: Option<ObligationClass>,
    pub jurisdiction: Option<Jurisdiction>,
    pub tax_code: Option<&'static str>,
    pub subtype: Option<String>,
    pub action: Option<InferredAction>,
    pub confidence: f32,
    pub raw_text: String,
}

impl ClassificationResult {
    pub fn is_match(&self) -> bool {
        self.tax_code.is_some()
    }

    pub fn review_status(&self) -> ReviewStatus {
        if self.is_match() {
            ReviewStatus::Ok
        } else {
            ReviewStatus::NeedsReview
        }
    }
}

/// Classifies an uploaded filename of the form
/// `"<competence> - <obligation description> - <company>"`.
///
/// Segment 0 is the competence token, segment 1 the obligation description,
/// and anything after that the company fragment. A single-segment name is
/// treated as a bare description. Competence parsing falls back to the whole
/// stem when the first segment does not carry one.
pub fn classify_filename(filename: &str) -> ClassificationResult {
    let stem = Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let segments: Vec<&str> = segment_splitter()
        .split(&stem)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();

    let (competence_raw, description_raw) = if segments.len() >= 2 {
        (segments[0], segments[1])
    } else {
        ("", segments.first().copied().unwrap_or(""))
    };
    let company_fragment = if segments.len() >= 3 {
        segments[2..].join(" - ")
    } else {
        String::new()
    };

    let competence = Competence::parse_flexible(competence_raw)
        .or_else(|| Competence::parse_flexible(&stem));

    let normalized = normalize(description_raw);
    let signature = catalog::match_signature(&normalized);

    let action = infer_action(&normalized, signature.map(|pattern| pattern.class));
    let mut subtype = infer_subtype(&normalized);
    if let Some(quarter) = infer_quarter(&normalized) {
        let quarterly_signature = signature
            .and_then(|pattern| pattern.subgroup)
            .is_some_and(|subgroup| subgroup.starts_with("TRIMESTRAL"));
        if quarterly_signature {
            subtype = Some(quarter);
        }
    }

    let confidence = match (signature.is_some(), action.is_some()) {
        (false, _) => 0.0,
        (true, true) => 0.95,
        (true, false) => 0.9,
    };

    ClassificationResult {
        filename: filename.to_string(),
        competence,
        company_fragment,
        group: signature.map(|pattern| pattern.group),
        subgroup: signature.and_then(|pattern| pattern.subgroup),
        class: signature.map(|pattern| pattern.class),
        jurisdiction: signature.map(|pattern| pattern.jurisdiction),
        tax_code: signature.map(|pattern| pattern.tax_code),
        subtype,
        action,
        confidence,
        raw_text: description_raw.to_string(),
    }
}

fn segment_splitter() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"\s+-\s+").expect("pattern is valid"))
}

fn infer_action(normalized: &str, class: Option<ObligationClass>) -> Option<InferredAction> {
    static ASSESSMENT: OnceLock<Regex> = OnceLock::new();
    static GUIDE: OnceLock<Regex> = OnceLock::new();

    let assessment =
        ASSESSMENT.get_or_init(|| Regex::new(r"\bAPUR").expect("pattern is valid"));
    let guide = GUIDE.get_or_init(|| {
        Regex::new(r"\b(?:GUIA|GR|GA|DARE|DAE|DUA|GRPR|DARF|GNRE|DAS)\b")
            .expect("pattern is valid")
    });

    if assessment.is_match(normalized) {
        Some(InferredAction::Assessment)
    } else if guide.is_match(normalized) {
        Some(InferredAction::PaymentGuide)
    } else if class == Some(ObligationClass::AncillaryFiling) {
        Some(InferredAction::Delivery)
    } else {
        None
    }
}

/// Keyword priority order matters: `GRPR` must win over `GR` even when both
/// occur, so each abbreviation is tested in turn rather than via a single
/// alternation.
fn infer_subtype(normalized: &str) -> Option<String> {
    static KEYWORDS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    let keywords = KEYWORDS.get_or_init(|| {
        ["GRPR", "GR", "GA", "DARE", "DAE", "DUA", "DCTFWEB", "GNRE", "DARF"]
            .iter()
            .map(|key| {
                let expr = format!(r"\b{key}\b");
                (*key, Regex::new(&expr).expect("pattern is valid"))
            })
            .collect()
    });

    keywords
        .iter()
        .find(|(_, rx)| rx.is_match(normalized))
        .map(|(key, _)| (*key).to_string())
}

fn infer_quarter(normalized: &str) -> Option<String> {
    static RX: OnceLock<Regex> = OnceLock::new();
    let rx = RX.get_or_init(|| {
        Regex::new(r"\b([1-4])\s+TRIMESTRE\b").expect("pattern is valid")
    });
    rx.captures(normalized)
        .map(|captures| format!("TRIMESTRE_{}", &captures[1]))
}
