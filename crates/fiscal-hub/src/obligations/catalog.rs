use chrono::NaiveDate;

use super::domain::{Competence, Jurisdiction, ObligationClass};
use crate::calendar::{last_day_of_month, national_holidays, previous_business_day};

/// Due-date anchor for a rule: a fixed day of the month, or the month's last
/// business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDayRule {
    Day(u32),
    LastBusinessDay,
}

/// A catalog entry describing one recurring obligation. The table is static
/// for the process lifetime; the sync engine walks it for every company.
#[derive(Debug, Clone, Copy)]
pub struct ObligationRule {
    pub class: ObligationClass,
    pub jurisdiction: Jurisdiction,
    pub tax_code: &'static str,
    pub due: DueDayRule,
    /// 0 = due within the competence month, 1 = due in the following month.
    pub month_offset: i32,
}

impl ObligationRule {
    /// Resolves the rule against a competence: shift the month, anchor the
    /// day, then pull back to the nearest preceding business day.
    pub fn due_date(&self, competence: Competence) -> NaiveDate {
        let target = competence.shift(self.month_offset);
        let holidays = national_holidays(target.year());
        let last_day = last_day_of_month(target.year(), target.month());
        let base_day = match self.due {
            DueDayRule::Day(day) => day.min(last_day),
            DueDayRule::LastBusinessDay => last_day,
        };
        let anchor = NaiveDate::from_ymd_opt(target.year(), target.month(), base_day)
            .expect("anchored day is within the target month");
        previous_business_day(anchor, &holidays)
    }
}

/// The standard rule table the monthly sync reconciles against.
pub fn standard_rules() -> &'static [ObligationRule] {
    STANDARD_RULES
}

const fn obligation(
    jurisdiction: Jurisdiction,
    tax_code: &'static str,
    due: DueDayRule,
) -> ObligationRule {
    ObligationRule {
        class: ObligationClass::Obligation,
        jurisdiction,
        tax_code,
        due,
        month_offset: 0,
    }
}

const fn ancillary(
    jurisdiction: Jurisdiction,
    tax_code: &'static str,
    due: DueDayRule,
) -> ObligationRule {
    ObligationRule {
        class: ObligationClass::AncillaryFiling,
        jurisdiction,
        tax_code,
        due,
        month_offset: 0,
    }
}

static STANDARD_RULES: &[ObligationRule] = &[
    obligation(Jurisdiction::Federal, "DARF PIS", DueDayRule::Day(25)),
    obligation(Jurisdiction::Federal, "DARF COFINS", DueDayRule::Day(25)),
    obligation(Jurisdiction::Federal, "DARF IPI", DueDayRule::Day(20)),
    obligation(Jurisdiction::Federal, "DARF CSRF", DueDayRule::Day(20)),
    obligation(Jurisdiction::Federal, "DARF IRRF", DueDayRule::Day(20)),
    obligation(Jurisdiction::Federal, "DARF INSS", DueDayRule::Day(20)),
    obligation(Jurisdiction::Federal, "DARF IRPJ", DueDayRule::LastBusinessDay),
    obligation(Jurisdiction::Federal, "DARF CSLL", DueDayRule::LastBusinessDay),
    // Delivered in the month after the competence closes.
    ObligationRule {
        class: ObligationClass::AncillaryFiling,
        jurisdiction: Jurisdiction::Federal,
        tax_code: "SPED CONTRIBUIÇÕES",
        due: DueDayRule::Day(10),
        month_offset: 1,
    },
    ancillary(Jurisdiction::Federal, "MIT - DCTFWEB", DueDayRule::LastBusinessDay),
    ancillary(Jurisdiction::Federal, "REINF", DueDayRule::Day(15)),
    obligation(Jurisdiction::State, "GR PR ICMS", DueDayRule::Day(12)),
    obligation(Jurisdiction::State, "DARE SP ICMS", DueDayRule::Day(20)),
    obligation(Jurisdiction::State, "DARE SC ICMS", DueDayRule::Day(10)),
    obligation(Jurisdiction::State, "DUA ES ICMS", DueDayRule::Day(25)),
    obligation(Jurisdiction::State, "DAE MG ICMS", DueDayRule::Day(8)),
    obligation(Jurisdiction::State, "GA RS ICMS", DueDayRule::Day(15)),
    ancillary(Jurisdiction::State, "SPED FISCAL", DueDayRule::Day(20)),
    ancillary(Jurisdiction::State, "DAPI", DueDayRule::Day(8)),
    ancillary(Jurisdiction::State, "DIME", DueDayRule::Day(10)),
    ancillary(Jurisdiction::State, "GIA", DueDayRule::Day(15)),
    ancillary(Jurisdiction::State, "DeSTDA", DueDayRule::LastBusinessDay),
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Weekday};

    fn competence(year: i32, month: u32) -> Competence {
        Competence::new(year, month).expect("valid competence")
    }

    #[test]
    fn catalog_covers_both_spheres() {
        let rules = standard_rules();
        assert_eq!(rules.len(), 22);
        assert!(rules
            .iter()
            .any(|rule| rule.jurisdiction == Jurisdiction::Federal));
        assert!(rules
            .iter()
            .any(|rule| rule.jurisdiction == Jurisdiction::State));
    }

    #[test]
    fn fixed_day_rule_lands_on_a_business_day() {
        let pis = standard_rules()
            .iter()
            .find(|rule| rule.tax_code == "DARF PIS")
            .expect("rule present");
        // 2025-05-25 is a Sunday; the due date backs up to Friday the 23rd.
        assert_eq!(
            pis.due_date(competence(2025, 5)),
            NaiveDate::from_ymd_opt(2025, 5, 23).expect("valid date")
        );
    }

    #[test]
    fn last_business_day_rule_stays_inside_the_month() {
        let irpj = standard_rules()
            .iter()
            .find(|rule| rule.tax_code == "DARF IRPJ")
            .expect("rule present");
        for month in 1..=12 {
            let due = irpj.due_date(competence(2025, month));
            assert_eq!(due.month(), month);
            assert_eq!(due.year(), 2025);
            assert!(!matches!(due.weekday(), Weekday::Sat | Weekday::Sun));
        }
    }

    #[test]
    fn month_offset_moves_delivery_into_the_following_month() {
        let sped = standard_rules()
            .iter()
            .find(|rule| rule.tax_code == "SPED CONTRIBUIÇÕES")
            .expect("rule present");
        // Competence December 2025 is delivered in January 2026; the 10th is
        // a Saturday, so the due date is Friday the 9th.
        assert_eq!(
            sped.due_date(competence(2025, 12)),
            NaiveDate::from_ymd_opt(2026, 1, 9).expect("valid date")
        );
    }
}
