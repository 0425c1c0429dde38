use std::sync::OnceLock;

use regex::Regex;

use crate::obligations::{Jurisdiction, ObligationClass};

/// One entry in the signature catalog: the metadata a match infers plus the
/// expressions (over normalized text) that trigger it.
#[derive(Debug)]
pub struct SignaturePattern {
    pub name: &'static str,
    pub class: ObligationClass,
    pub group: &'static str,
    pub jurisdiction: Jurisdiction,
    pub tax_code: &'static str,
    pub subgroup: Option<&'static str>,
    pub expressions: &'static [&'static str],
}

/// The ordered signature catalog.
///
/// Order is load-bearing: matching stops at the first hit, so variant codes
/// (`ICMS DIFAL`, `ICMS ST`) must stay ahead of their bare form (`ICMS`),
/// and prefixed guides (`DARF PIS`) ahead of the bare tax (`PIS`-less
/// entries like `IPI`). Keep new entries sorted most-specific-first.
pub fn signature_catalog() -> &'static [SignaturePattern] {
    SIGNATURES
}

/// Returns the first catalog entry whose expressions hit `normalized`.
pub(crate) fn match_signature(normalized: &str) -> Option<&'static SignaturePattern> {
    static COMPILED: OnceLock<Vec<Vec<Regex>>> = OnceLock::new();
    let compiled = COMPILED.get_or_init(|| {
        SIGNATURES
            .iter()
            .map(|pattern| {
                pattern
                    .expressions
                    .iter()
                    .map(|expr| Regex::new(expr).expect("catalog expressions are valid regexes"))
                    .collect()
            })
            .collect()
    });

    SIGNATURES
        .iter()
        .zip(compiled)
        .find(|(_, expressions)| expressions.iter().any(|rx| rx.is_match(normalized)))
        .map(|(pattern, _)| pattern)
}

const MONTHLY: Option<&str> = Some("MENSAL");
const MONTHLY_LP_LR: Option<&str> = Some("MENSAL LP/LR");
const QUARTERLY: Option<&str> = Some("TRIMESTRAL");
const QUARTERLY_LP: Option<&str> = Some("TRIMESTRAL LP");
const OCCASIONAL: Option<&str> = Some("OCASIONAL");

const fn obligation(
    name: &'static str,
    jurisdiction: Jurisdiction,
    tax_code: &'static str,
    subgroup: Option<&'static str>,
    expressions: &'static [&'static str],
) -> SignaturePattern {
    SignaturePattern {
        name,
        class: ObligationClass::Obligation,
        group: "Obrigações",
        jurisdiction,
        tax_code,
        subgroup,
        expressions,
    }
}

const fn ancillary(
    name: &'static str,
    jurisdiction: Jurisdiction,
    tax_code: &'static str,
    expressions: &'static [&'static str],
) -> SignaturePattern {
    SignaturePattern {
        name,
        class: ObligationClass::AncillaryFiling,
        group: "Acessórias",
        jurisdiction,
        tax_code,
        subgroup: None,
        expressions,
    }
}

static SIGNATURES: &[SignaturePattern] = &[
    obligation("ISSRF", Jurisdiction::Municipal, "ISSRF", None, &[r"\bISSRF\b"]),
    obligation("ISS", Jurisdiction::Municipal, "ISS", None, &[r"\bISS\b"]),
    obligation("GR ICMS", Jurisdiction::State, "ICMS", MONTHLY_LP_LR, &[r"\bGR\s+ICMS\b"]),
    obligation("GA ICMS", Jurisdiction::State, "ICMS", MONTHLY_LP_LR, &[r"\bGA\s+ICMS\b"]),
    obligation("DARE ICMS", Jurisdiction::State, "ICMS", MONTHLY_LP_LR, &[r"\bDARE\s+ICMS\b"]),
    obligation("DAE ICMS", Jurisdiction::State, "ICMS", MONTHLY_LP_LR, &[r"\bDAE\s+ICMS\b"]),
    obligation("DUA ICMS", Jurisdiction::State, "ICMS", MONTHLY_LP_LR, &[r"\bDUA\s+ICMS\b"]),
    obligation("ICMS DIFAL", Jurisdiction::State, "ICMS DIFAL", MONTHLY_LP_LR, &[r"ICMS\s+DIFAL"]),
    obligation("ICMS ST", Jurisdiction::State, "ICMS ST", MONTHLY_LP_LR, &[r"ICMS\s+ST"]),
    obligation("ICMS A", Jurisdiction::State, "ICMS A", MONTHLY_LP_LR, &[r"\bICMS\s+A\b"]),
    obligation("ICMS", Jurisdiction::State, "ICMS", MONTHLY_LP_LR, &[r"\bICMS\b"]),
    obligation("DARF PIS", Jurisdiction::Federal, "DARF PIS", MONTHLY, &[r"\bDARF\s+PIS\b"]),
    obligation("DARF COFINS", Jurisdiction::Federal, "DARF COFINS", MONTHLY, &[r"\bDARF\s+COFINS\b"]),
    obligation("DARF IPI", Jurisdiction::Federal, "DARF IPI", MONTHLY, &[r"\bDARF\s+IPI\b"]),
    obligation("DARF CSRF", Jurisdiction::Federal, "DARF CSRF", MONTHLY, &[r"\bDARF\s+CSRF\b"]),
    obligation("DARF IRRF", Jurisdiction::Federal, "DARF IRRF", MONTHLY, &[r"\bDARF\s+IRRF\b"]),
    obligation("DARF INSS", Jurisdiction::Federal, "DARF INSS", MONTHLY, &[r"\bDARF\s+INSS\b"]),
    obligation("DARF IRPJ", Jurisdiction::Federal, "DARF IRPJ", QUARTERLY, &[r"\bDARF\s+IRPJ\b"]),
    obligation("DARF CSLL", Jurisdiction::Federal, "DARF CSLL", QUARTERLY, &[r"\bDARF\s+CSLL\b"]),
    obligation("PIS/COFINS", Jurisdiction::Federal, "PIS/COFINS", MONTHLY_LP_LR, &[r"PIS\s+E\s+COFINS"]),
    obligation("IRPJ/CSLL", Jurisdiction::Federal, "IRPJ/CSLL", QUARTERLY_LP, &[r"IRPJ\s+E\s+CSLL"]),
    obligation("IRPJ", Jurisdiction::Federal, "IRPJ", QUARTERLY_LP, &[r"\bIRPJ\b"]),
    obligation("CSLL", Jurisdiction::Federal, "CSLL", QUARTERLY_LP, &[r"\bCSLL\b"]),
    obligation("IPI", Jurisdiction::Federal, "IPI", MONTHLY, &[r"\bIPI\b"]),
    obligation("CSRF", Jurisdiction::Federal, "CSRF", OCCASIONAL, &[r"\bCSRF\b"]),
    obligation("IRRF", Jurisdiction::Federal, "IRRF", OCCASIONAL, &[r"\bIRRF\b"]),
    obligation("INSS", Jurisdiction::Federal, "INSS", OCCASIONAL, &[r"\bINSS\b"]),
    ancillary("SPED FISCAL", Jurisdiction::State, "SPED FISCAL", &[r"SPED\s+FISCAL"]),
    ancillary("DESTDA", Jurisdiction::State, "DeSTDA", &[r"\bDESTDA\b"]),
    ancillary("DIME", Jurisdiction::State, "DIME", &[r"\bDIME\b"]),
    ancillary("DAPI", Jurisdiction::State, "DAPI", &[r"\bDAPI\b"]),
    ancillary("GIA", Jurisdiction::State, "GIA", &[r"\bGIA\b"]),
    ancillary(
        "SPED CONTRIBUIÇÕES",
        Jurisdiction::Federal,
        "SPED CONTRIBUIÇÕES",
        &[r"SPED\s+CONTRIBUICOES"],
    ),
    ancillary(
        "MIT - DCTFWEB",
        Jurisdiction::Federal,
        "MIT - DCTFWEB",
        &[r"\bMIT\b", r"\bDCTFWEB\b"],
    ),
    ancillary("REINF", Jurisdiction::Federal, "REINF", &[r"\bREINF\b"]),
];
