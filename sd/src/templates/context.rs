//! Render context built from a case snapshot
//!
//! All slot values are pre-formatted strings in German conventions
//! (comma decimals, dotted dates), so templates only place values and
//! never format them.

use chrono::{Days, Months, NaiveDate};
use serde_json::{Map, Value, json};

use crate::domain::Case;
use crate::plan::PLAN_DURATION_MONTHS;

/// Days a creditor has to answer the proposal letter
pub const RESPONSE_WINDOW_DAYS: u64 = 14;

/// Months between sending the plan and the first scheduled payment
pub const PLAN_START_OFFSET_MONTHS: u32 = 3;

pub fn format_date_de(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

pub fn format_percent_de(value: f64) -> String {
    format!("{value:.2}").replace('.', ",")
}

/// Build the full slot map for one case as of a given date.
///
/// The same snapshot and date always produce the same map; document
/// regeneration stays byte-identical.
pub fn build_context(case: &Case, as_of: NaiveDate) -> Value {
    let total_debt = case.total_debt();
    let plan = case.plan.as_ref();

    let mut slots = Map::new();
    slots.insert("aktenzeichen".into(), json!(case.reference));
    slots.insert("ort".into(), json!(case.debtor.city));
    slots.insert("datum_heute".into(), json!(format_date_de(as_of)));
    slots.insert("mandant_name".into(), json!(case.debtor.full_name));
    slots.insert("mandant_strasse".into(), json!(case.debtor.street));
    slots.insert("mandant_hausnummer".into(), json!(case.debtor.house_number));
    slots.insert("mandant_plz".into(), json!(case.debtor.postal_code));
    slots.insert("mandant_ort".into(), json!(case.debtor.city));
    slots.insert("gesamtschulden".into(), json!(total_debt.format_eur_de()));
    slots.insert("anzahl_glaeubiger".into(), json!(case.creditors.len()));

    let duration = plan.map(|p| p.duration_months).unwrap_or(PLAN_DURATION_MONTHS);
    slots.insert("laufzeit_monate".into(), json!(duration));
    slots.insert(
        "plan_beginn".into(),
        json!(format_date_de(as_of + Months::new(PLAN_START_OFFSET_MONTHS))),
    );
    slots.insert(
        "antwortfrist".into(),
        json!(format_date_de(as_of + Days::new(RESPONSE_WINDOW_DAYS))),
    );

    if let Some(plan) = plan {
        slots.insert(
            "pfaendbarer_betrag".into(),
            json!(plan.garnishable_amount.format_eur_de()),
        );
        slots.insert(
            "tilgungsquote".into(),
            json!(format_percent_de(plan.repayment_quota_percent())),
        );
    }

    let creditors: Vec<Value> = case
        .creditors
        .iter()
        .enumerate()
        .map(|(i, creditor)| {
            let mut row = Map::new();
            row.insert("laufende_nummer".into(), json!(i + 1));
            row.insert("name".into(), json!(creditor.name));
            row.insert("anschrift".into(), json!(creditor.address));
            row.insert("forderung".into(), json!(creditor.claim_amount.format_eur_de()));
            row.insert(
                "quote".into(),
                json!(format_percent_de(creditor.claim_amount.percentage_of(total_debt))),
            );
            if let Some(allocation) = plan.and_then(|p| p.allocations.iter().find(|a| a.creditor_id == creditor.id)) {
                let total_payment = crate::domain::Money::from_cents(
                    allocation.monthly_amount.cents() * i64::from(duration),
                );
                row.insert("monatsrate".into(), json!(allocation.monthly_amount.format_eur_de()));
                row.insert("gesamtzahlung".into(), json!(total_payment.format_eur_de()));
            }
            Value::Object(row)
        })
        .collect();
    slots.insert("glaeubiger".into(), Value::Array(creditors));

    Value::Object(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Creditor, Debtor, EmploymentStatus, FinancialSnapshot, Gender, MaritalStatus, Money,
    };

    fn test_case() -> Case {
        let mut case = Case::new(
            "MAND_2024_042",
            Debtor {
                full_name: "Mustermann, Max".to_string(),
                street: "Musterstrasse".to_string(),
                house_number: "12".to_string(),
                postal_code: "45127".to_string(),
                city: "Essen".to_string(),
                phone: None,
                email: None,
                gender: Gender::Maennlich,
                marital_status: MaritalStatus::Ledig,
                employment: EmploymentStatus::Angestellt,
                children: 0,
            },
            FinancialSnapshot {
                net_income: Money::from_eur(2500),
                dependents: 0,
            },
        );
        case.creditors.push(Creditor::new("Bank AG", "Bankstr. 1", Money::from_eur(7500)));
        case.creditors.push(Creditor::new("Versand GmbH", "Postweg 2", Money::from_eur(2500)));
        case
    }

    #[test]
    fn test_date_formatting() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        assert_eq!(format_date_de(date), "05.03.2026");
        assert_eq!(format_percent_de(12.5), "12,50");
    }

    #[test]
    fn test_context_without_plan() {
        let case = test_case();
        let ctx = build_context(&case, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());

        assert_eq!(ctx["gesamtschulden"], "10.000,00 EUR");
        assert_eq!(ctx["antwortfrist"], "29.01.2026");
        assert_eq!(ctx["plan_beginn"], "15.04.2026");
        assert_eq!(ctx["glaeubiger"][0]["quote"], "75,00");
        assert!(ctx.get("pfaendbarer_betrag").is_none());
    }

    #[test]
    fn test_context_with_plan_is_deterministic() {
        let mut case = test_case();
        case.plan = Some(crate::plan::calculate(&case.financials, &case.creditors).unwrap());
        let as_of = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();

        let a = build_context(&case, as_of);
        let b = build_context(&case, as_of);
        assert_eq!(a, b);
        assert!(a.get("pfaendbarer_betrag").is_some());
        assert!(a["glaeubiger"][0].get("monatsrate").is_some());
    }
}
