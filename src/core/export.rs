use serde::Serialize;

use super::types::{Debt, SimulationRun, StrategyComparison, debt_labels};

pub const DISCLAIMER: &str =
    "Educational estimate; ignores fees, changing rates, and statement timing nuances.";

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidOffEntry {
    pub debt: String,
    pub month: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySummary {
    pub name: &'static str,
    pub months: u32,
    pub converged: bool,
    pub total_interest: f64,
    pub paid_off_months: Vec<PaidOffEntry>,
}

impl StrategySummary {
    pub fn from_run(run: &SimulationRun) -> Self {
        Self {
            name: run.strategy.label(),
            months: run.outcome.months(),
            converged: run.outcome.converged(),
            total_interest: cents(run.outcome.total_interest()),
            paid_off_months: run
                .paid_off_months()
                .into_iter()
                .map(|(debt, month)| PaidOffEntry { debt, month })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInputs {
    pub debts: Vec<Debt>,
    pub monthly_budget: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonExport {
    pub inputs: ExportInputs,
    pub chosen_strategy: StrategySummary,
    pub other_strategy: StrategySummary,
    pub disclaimer: &'static str,
}

impl ComparisonExport {
    pub fn from_comparison(comparison: &StrategyComparison) -> Self {
        Self {
            inputs: ExportInputs {
                debts: comparison.debts.clone(),
                monthly_budget: comparison.monthly_budget,
            },
            chosen_strategy: StrategySummary::from_run(&comparison.chosen),
            other_strategy: StrategySummary::from_run(&comparison.other),
            disclaimer: DISCLAIMER,
        }
    }
}

pub fn comparison_json(comparison: &StrategyComparison) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ComparisonExport::from_comparison(comparison))
}

/// Month-by-month detail of one run, one row per snapshot.
pub fn run_csv(run: &SimulationRun) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "Month".to_string(),
        "Remaining Budget".to_string(),
        "Total Interest To Date".to_string(),
    ];
    for label in debt_labels(&run.debt_names) {
        header.push(format!("{label} Balance"));
        header.push(format!("{label} Paid This Month"));
    }
    writer.write_record(&header)?;

    for snapshot in &run.snapshots {
        let mut record = vec![
            snapshot.month.to_string(),
            format!("{:.2}", cents(snapshot.remaining_budget)),
            format!("{:.2}", cents(snapshot.cumulative_interest)),
        ];
        for debt in &snapshot.debts {
            record.push(format!("{:.2}", cents(debt.balance)));
            record.push(format!("{:.2}", cents(debt.paid)));
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
