use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::calendar::shift_year_month;

/// A fiscal competence: the year/month a filing or payment pertains to.
///
/// The storage form is the six-digit `YYYYMM` key; the display label used in
/// titles and messages is `MM/YYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Competence {
    year: i32,
    month: u32,
}

impl Competence {
    pub fn new(year: i32, month: u32) -> Result<Self, InvalidCompetence> {
        if !(1..=12).contains(&month) {
            return Err(InvalidCompetence::MonthOutOfRange { month });
        }
        if !(1583..=9999).contains(&year) {
            return Err(InvalidCompetence::YearOutOfRange { year });
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub const fn year(&self) -> i32 {
        self.year
    }

    pub const fn month(&self) -> u32 {
        self.month
    }

    /// `"202602"`, the form persisted and used in natural keys.
    pub fn storage_key(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    /// `"02/2026"`, the human-facing label.
    pub fn label(&self) -> String {
        format!("{:02}/{:04}", self.month, self.year)
    }

    pub fn shift(&self, offset: i32) -> Self {
        let (year, month) = shift_year_month(self.year, self.month, offset);
        Self { year, month }
    }

    /// Lenient parsing used on filename fragments: accepts `MM-YYYY`,
    /// `MM/YYYY`, or a bare `MMYYYY` run anywhere in the input.
    pub fn parse_flexible(raw: &str) -> Option<Self> {
        static SEPARATED: OnceLock<Regex> = OnceLock::new();
        static BARE: OnceLock<Regex> = OnceLock::new();

        let separated = SEPARATED
            .get_or_init(|| Regex::new(r"\b(\d{2})[-/](\d{4})\b").expect("pattern is valid"));
        let bare = BARE.get_or_init(|| Regex::new(r"\b(\d{2})(\d{4})\b").expect("pattern is valid"));

        let captures = separated.captures(raw).or_else(|| bare.captures(raw))?;
        let month = captures[1].parse().ok()?;
        let year = captures[2].parse().ok()?;
        Self::new(year, month).ok()
    }
}

impl fmt::Display for Competence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

impl FromStr for Competence {
    type Err = InvalidCompetence;

    /// Parses the storage form `YYYYMM`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.len() != 6 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidCompetence::Malformed {
                value: trimmed.to_string(),
            });
        }
        let year = trimmed[..4].parse().map_err(|_| InvalidCompetence::Malformed {
            value: trimmed.to_string(),
        })?;
        let month = trimmed[4..].parse().map_err(|_| InvalidCompetence::Malformed {
            value: trimmed.to_string(),
        })?;
        Self::new(year, month)
    }
}

impl Serialize for Competence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.storage_key())
    }
}

impl<'de> Deserialize<'de> for Competence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidCompetence {
    #[error("month {month} is outside 1-12")]
    MonthOutOfRange { month: u32 },
    #[error("year {year} is outside the supported calendar range")]
    YearOutOfRange { year: i32 },
    #[error("'{value}' is not a YYYYMM competence key")]
    Malformed { value: String },
}

/// Whether a catalog entry is a payment duty or a regulatory filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObligationClass {
    #[serde(rename = "OBR")]
    Obligation,
    #[serde(rename = "ACS")]
    AncillaryFiling,
}

impl ObligationClass {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Obligation => "OBR",
            Self::AncillaryFiling => "ACS",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Obligation => "Obrigação",
            Self::AncillaryFiling => "Acessória",
        }
    }
}

impl FromStr for ObligationClass {
    type Err = UnknownCode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OBR" => Ok(Self::Obligation),
            "ACS" => Ok(Self::AncillaryFiling),
            _ => Err(UnknownCode {
                field: "obligation class",
                value: value.to_string(),
            }),
        }
    }
}

/// The tax authority an obligation answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    #[serde(rename = "MUN")]
    Municipal,
    #[serde(rename = "EST")]
    State,
    #[serde(rename = "FED")]
    Federal,
}

impl Jurisdiction {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Municipal => "MUN",
            Self::State => "EST",
            Self::Federal => "FED",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Municipal => "Municipal",
            Self::State => "Estadual",
            Self::Federal => "Federal",
        }
    }
}

impl FromStr for Jurisdiction {
    type Err = UnknownCode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MUN" | "MUNICIPAL" => Ok(Self::Municipal),
            "EST" | "ESTADUAL" => Ok(Self::State),
            "FED" | "FEDERAL" => Ok(Self::Federal),
            _ => Err(UnknownCode {
                field: "jurisdiction",
                value: value.to_string(),
            }),
        }
    }
}

/// Workflow status of an obligation record. The scheduler only ever writes
/// `Pending`; the remaining transitions belong to the task workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
    Sent,
}

impl TaskStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Sent => "SENT",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownCode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "DONE" => Ok(Self::Done),
            "SENT" => Ok(Self::Sent),
            _ => Err(UnknownCode {
                field: "task status",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized {field} value '{value}'")]
pub struct UnknownCode {
    pub field: &'static str,
    pub value: String,
}

/// Natural key under which at most one obligation record may exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObligationKey {
    pub company_id: u64,
    pub competence: Competence,
    pub class: ObligationClass,
    pub jurisdiction: Jurisdiction,
    pub tax_code: String,
}

impl ObligationKey {
    pub fn new(
        company_id: u64,
        competence: Competence,
        class: ObligationClass,
        jurisdiction: Jurisdiction,
        tax_code: &str,
    ) -> Self {
        Self {
            company_id,
            competence,
            class,
            jurisdiction,
            tax_code: tax_code.trim().to_string(),
        }
    }
}

/// Reference to a document attached to an obligation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub filename: String,
}

/// A persisted obligation record, reconciled monthly by the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObligationRecord {
    pub id: u64,
    pub company_id: u64,
    pub owner_id: u64,
    pub title: String,
    pub class: ObligationClass,
    pub jurisdiction: Jurisdiction,
    pub tax_code: String,
    pub competence: Competence,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentRef>,
}

impl ObligationRecord {
    pub fn key(&self) -> ObligationKey {
        ObligationKey::new(
            self.company_id,
            self.competence,
            self.class,
            self.jurisdiction,
            &self.tax_code,
        )
    }
}

/// A client company tracked by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    pub manager_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_id: Option<u64>,
}

impl Company {
    /// The user who owns generated tasks: the designated responsible party,
    /// falling back to the company's manager.
    pub fn effective_owner(&self) -> u64 {
        self.responsible_id.unwrap_or(self.manager_id)
    }
}
