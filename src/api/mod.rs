use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, ValueEnum, error::ErrorKind};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::core::export::{DISCLAIMER, StrategySummary, comparison_json, run_csv};
use crate::core::{
    Debt, HORIZON_MONTHS, MonthlySnapshot, SimulationRun, Strategy, StrategyComparison,
    TimelinePoint, compare_strategies,
};

const CSV_FILE_NAME: &str = "debt_payoff_chosen_strategy.csv";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliStrategy {
    Snowball,
    Avalanche,
}

impl From<CliStrategy> for Strategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::Snowball => Strategy::Snowball,
            CliStrategy::Avalanche => Strategy::Avalanche,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStrategy {
    #[serde(
        alias = "Snowball",
        alias = "smallest-balance",
        alias = "smallestBalance",
        alias = "smallest_balance"
    )]
    Snowball,
    #[serde(alias = "Avalanche", alias = "highest-apr", alias = "highestApr", alias = "highest_apr")]
    Avalanche,
}

impl From<ApiStrategy> for CliStrategy {
    fn from(value: ApiStrategy) -> Self {
        match value {
            ApiStrategy::Snowball => CliStrategy::Snowball,
            ApiStrategy::Avalanche => CliStrategy::Avalanche,
        }
    }
}

/// `NAME:BALANCE:APR:MIN`; the name may itself contain colons.
#[derive(Clone, Debug, PartialEq)]
struct CliDebt {
    name: String,
    balance: f64,
    apr_pct: f64,
    min_pay: f64,
}

impl FromStr for CliDebt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(4, ':');
        let (Some(min), Some(apr), Some(balance), Some(name)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("expected NAME:BALANCE:APR:MIN, got '{s}'"));
        };
        let number = |field: &str, raw: &str| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid {field} '{raw}' in '{s}'"))
        };
        Ok(Self {
            name: name.trim().to_string(),
            balance: number("balance", balance)?,
            apr_pct: number("APR", apr)?,
            min_pay: number("minimum payment", min)?,
        })
    }
}

impl From<CliDebt> for Debt {
    fn from(value: CliDebt) -> Self {
        Debt::new(value.name, value.balance, value.apr_pct, value.min_pay)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDebt {
    name: String,
    balance: f64,
    #[serde(alias = "apr")]
    apr_pct: f64,
    #[serde(alias = "minPayment", alias = "minimum")]
    min_pay: f64,
}

impl From<ApiDebt> for CliDebt {
    fn from(value: ApiDebt) -> Self {
        Self {
            name: value.name,
            balance: value.balance,
            apr_pct: value.apr_pct,
            min_pay: value.min_pay,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    debts: Option<Vec<ApiDebt>>,
    #[serde(alias = "budget")]
    monthly_budget: Option<f64>,
    strategy: Option<ApiStrategy>,
}

#[derive(Parser, Debug)]
#[command(
    name = "debtplan",
    about = "Compare Snowball (smallest balance first) and Avalanche (highest APR first) debt payoff plans"
)]
struct Cli {
    #[arg(
        long = "debt",
        value_name = "NAME:BALANCE:APR:MIN",
        required = true,
        help = "One debt: name, balance, APR in percent, minimum monthly payment"
    )]
    debts: Vec<CliDebt>,
    #[arg(long, help = "Total monthly payoff budget shared by all debts")]
    budget: f64,
    #[arg(long, value_enum, default_value_t = CliStrategy::Snowball)]
    strategy: CliStrategy,
    #[arg(long, help = "Write the chosen strategy's monthly detail as CSV")]
    csv: Option<PathBuf>,
    #[arg(long, help = "Write the comparison summary as JSON")]
    json: Option<PathBuf>,
}

#[derive(Debug)]
struct PlanInputs {
    debts: Vec<Debt>,
    monthly_budget: f64,
    strategy: Strategy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunResponse {
    strategy: Strategy,
    summary: StrategySummary,
    order: Vec<usize>,
    snapshots: Vec<MonthlySnapshot>,
}

impl RunResponse {
    fn from_run(run: &SimulationRun) -> Self {
        Self {
            strategy: run.strategy,
            summary: StrategySummary::from_run(run),
            order: run.order.clone(),
            snapshots: run.snapshots.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    monthly_budget: f64,
    horizon_months: u32,
    interest_saved: f64,
    months_saved: i64,
    chosen: RunResponse,
    other: RunResponse,
    timeline: Vec<TimelinePoint>,
    disclaimer: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: &Cli) -> PlanInputs {
    let debts = cli
        .debts
        .iter()
        .cloned()
        .map(Debt::from)
        .collect::<Vec<_>>();
    PlanInputs {
        debts,
        monthly_budget: cli.budget,
        strategy: cli.strategy.into(),
    }
}

fn run_comparison(inputs: &PlanInputs) -> Result<StrategyComparison, String> {
    debug!(
        debts = inputs.debts.len(),
        monthly_budget = inputs.monthly_budget,
        strategy = ?inputs.strategy,
        "comparing strategies"
    );
    compare_strategies(&inputs.debts, inputs.monthly_budget, inputs.strategy)
        .map_err(|e| e.to_string())
}

/// Entry point for `debtplan compare ...`. `args` starts with the program name.
pub fn run_cli<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{e}");
            return Ok(());
        }
        Err(e) => return Err(e.to_string()),
    };
    let inputs = build_inputs(&cli);
    let comparison = run_comparison(&inputs)?;

    print!("{}", render_summary(&comparison));

    if let Some(path) = &cli.csv {
        let csv = run_csv(&comparison.chosen).map_err(|e| format!("CSV export failed: {e}"))?;
        std::fs::write(path, csv)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        info!(path = %path.display(), "wrote monthly detail CSV");
    }
    if let Some(path) = &cli.json {
        let json =
            comparison_json(&comparison).map_err(|e| format!("JSON export failed: {e}"))?;
        std::fs::write(path, json)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        info!(path = %path.display(), "wrote comparison JSON");
    }
    Ok(())
}

fn render_summary(comparison: &StrategyComparison) -> String {
    let mut out = format!(
        "{:<36} {:>8} {:>16}\n",
        "Strategy", "Months", "Total Interest"
    );
    for run in [&comparison.chosen, &comparison.other] {
        let months = if run.outcome.converged() {
            run.outcome.months().to_string()
        } else {
            format!(">{HORIZON_MONTHS}")
        };
        out.push_str(&format!(
            "{:<36} {:>8} {:>16.2}\n",
            run.strategy.label(),
            months,
            run.outcome.total_interest()
        ));
    }

    out.push('\n');
    for run in [&comparison.chosen, &comparison.other] {
        out.push_str(&format!("{} payoff months:\n", run.strategy.label()));
        for (debt, month) in run.paid_off_months() {
            let month = month.map_or_else(|| "not paid off".to_string(), |m| m.to_string());
            out.push_str(&format!("  {debt:<30} {month}\n"));
        }
    }

    if !comparison.chosen.outcome.converged() {
        out.push_str(&format!(
            "\nPlan insufficient: debts remain after {HORIZON_MONTHS} months with this budget.\n"
        ));
    }
    out.push_str(&format!("\n{DISCLAIMER}\n"));
    out
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/compare", post(compare_post_handler))
        .route("/api/compare.csv", post(compare_csv_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("debt payoff HTTP API listening on http://{addr}");
    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn compare_post_handler(Json(payload): Json<ComparePayload>) -> Response {
    compare_handler_impl(payload).await
}

async fn compare_csv_handler(Json(payload): Json<ComparePayload>) -> Response {
    let comparison = match run_comparison(&plan_from_payload(payload)) {
        Ok(comparison) => comparison,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match run_csv(&comparison.chosen) {
        Ok(csv) => with_cache_control((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{CSV_FILE_NAME}\""),
                ),
            ],
            csv,
        )),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("CSV export failed: {e}"),
        ),
    }
}

async fn compare_handler_impl(payload: ComparePayload) -> Response {
    let comparison = match run_comparison(&plan_from_payload(payload)) {
        Ok(comparison) => comparison,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    json_response(StatusCode::OK, build_compare_response(&comparison))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn plan_from_json(json: &str) -> Result<PlanInputs, String> {
    let payload = serde_json::from_str::<ComparePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    Ok(plan_from_payload(payload))
}

fn plan_from_payload(payload: ComparePayload) -> PlanInputs {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.debts {
        cli.debts = v.into_iter().map(CliDebt::from).collect();
    }
    if let Some(v) = payload.monthly_budget {
        cli.budget = v;
    }
    if let Some(v) = payload.strategy {
        cli.strategy = v.into();
    }

    build_inputs(&cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        debts: vec![
            CliDebt {
                name: "Debt 1".to_string(),
                balance: 1_500.0,
                apr_pct: 19.9,
                min_pay: 45.0,
            },
            CliDebt {
                name: "Debt 2".to_string(),
                balance: 800.0,
                apr_pct: 12.5,
                min_pay: 30.0,
            },
            CliDebt {
                name: "Debt 3".to_string(),
                balance: 400.0,
                apr_pct: 8.9,
                min_pay: 25.0,
            },
        ],
        budget: 250.0,
        strategy: CliStrategy::Snowball,
        csv: None,
        json: None,
    }
}

fn build_compare_response(comparison: &StrategyComparison) -> CompareResponse {
    CompareResponse {
        monthly_budget: comparison.monthly_budget,
        horizon_months: HORIZON_MONTHS,
        interest_saved: comparison.interest_saved(),
        months_saved: comparison.months_saved(),
        chosen: RunResponse::from_run(&comparison.chosen),
        other: RunResponse::from_run(&comparison.other),
        timeline: comparison.timeline(),
        disclaimer: DISCLAIMER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn cli_debt_parses_name_with_colons() {
        let debt = "Visa: travel:1200.50:22.9:35".parse::<CliDebt>().expect("valid debt");
        assert_eq!(debt.name, "Visa: travel");
        assert_approx(debt.balance, 1_200.5);
        assert_approx(debt.apr_pct, 22.9);
        assert_approx(debt.min_pay, 35.0);
    }

    #[test]
    fn cli_debt_rejects_missing_fields_and_bad_numbers() {
        let err = "Card:100:5".parse::<CliDebt>().expect_err("too few fields");
        assert!(err.contains("NAME:BALANCE:APR:MIN"));
        let err = "Card:lots:5:10".parse::<CliDebt>().expect_err("bad balance");
        assert!(err.contains("invalid balance"));
    }

    #[test]
    fn cli_parses_repeated_debts_and_strategy() {
        let cli = Cli::try_parse_from([
            "debtplan",
            "--debt",
            "Card:1500:19.9:45",
            "--debt",
            "Loan:800:12.5:30",
            "--budget",
            "250",
            "--strategy",
            "avalanche",
        ])
        .expect("cli should parse");
        assert_eq!(cli.debts.len(), 2);
        assert_eq!(cli.strategy, CliStrategy::Avalanche);
        let inputs = build_inputs(&cli);
        assert_eq!(inputs.strategy, Strategy::Avalanche);
        assert_eq!(inputs.debts[1].name, "Loan");
    }

    fn compare_cli(cli: &Cli) -> Result<StrategyComparison, String> {
        run_comparison(&build_inputs(cli))
    }

    #[test]
    fn comparison_rejects_budget_below_minimums() {
        let mut cli = sample_cli();
        cli.budget = 90.0;
        let err = compare_cli(&cli).expect_err("minimums total 100");
        assert!(err.contains("less than total minimum payments"));
        assert!(err.contains("$90.00"));
        assert!(err.contains("$100.00"));
    }

    #[test]
    fn comparison_rejects_negative_balance() {
        let mut cli = sample_cli();
        cli.debts[0].balance = -5.0;
        let err = compare_cli(&cli).expect_err("negative balance");
        assert!(err.contains("non-negative"));
        assert!(err.contains("Debt 1"));
    }

    #[test]
    fn empty_payload_uses_default_plan() {
        let inputs = plan_from_json("{}").expect("defaults are valid");
        assert_eq!(inputs.debts.len(), 3);
        assert_approx(inputs.monthly_budget, 250.0);
        assert_eq!(inputs.strategy, Strategy::Snowball);
    }

    #[test]
    fn plan_from_json_parses_web_keys_and_aliases() {
        let json = r#"{
          "debts": [
            { "name": "Card", "balance": 2000, "apr": 24.9, "minPayment": 50 },
            { "name": "Loan", "balance": 5000, "aprPct": 6.5, "minPay": 90 }
          ],
          "budget": 400,
          "strategy": "highest-apr"
        }"#;
        let inputs = plan_from_json(json).expect("json should parse");
        assert_eq!(inputs.strategy, Strategy::Avalanche);
        assert_approx(inputs.monthly_budget, 400.0);
        assert_eq!(inputs.debts[0], Debt::new("Card", 2_000.0, 24.9, 50.0));
        assert_eq!(inputs.debts[1], Debt::new("Loan", 5_000.0, 6.5, 90.0));
    }

    #[test]
    fn compare_response_serialization_contains_expected_fields() {
        let inputs = plan_from_json("{}").expect("defaults are valid");
        let comparison = run_comparison(&inputs).expect("defaults converge");
        let response = build_compare_response(&comparison);
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"interestSaved\""));
        assert!(json.contains("\"monthsSaved\""));
        assert!(json.contains("\"timeline\""));
        assert!(json.contains("\"chosenTotalBalance\""));
        assert!(json.contains("\"snapshots\""));
        assert!(json.contains("\"cumulativeInterest\""));
        assert!(json.contains("\"remainingBudget\""));
        assert!(json.contains("\"paidOffMonths\""));
        assert!(json.contains("\"strategy\":\"snowball\""));
    }

    #[test]
    fn render_summary_lists_both_strategies() {
        let inputs = plan_from_json("{}").expect("defaults are valid");
        let comparison = run_comparison(&inputs).expect("defaults converge");
        let text = render_summary(&comparison);
        assert!(text.contains("Snowball (Smallest Balance First)"));
        assert!(text.contains("Avalanche (Highest APR First)"));
        assert!(text.contains("Debt 3"));
        assert!(!text.contains("Plan insufficient"));
    }

    #[tokio::test]
    async fn compare_handler_returns_bad_request_on_validation_error() {
        let payload = ComparePayload {
            debts: Some(vec![ApiDebt {
                name: "Card".to_string(),
                balance: 1_000.0,
                apr_pct: 10.0,
                min_pay: 50.0,
            }]),
            monthly_budget: Some(40.0),
            strategy: None,
        };
        let response = compare_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        let error = value["error"].as_str().expect("error string");
        assert!(error.contains("less than total minimum payments"));
    }

    #[test]
    fn strategy_accepts_kebab_camel_and_snake_aliases() {
        for (raw, expected) in [
            ("smallest-balance", Strategy::Snowball),
            ("smallestBalance", Strategy::Snowball),
            ("smallest_balance", Strategy::Snowball),
            ("highest-apr", Strategy::Avalanche),
            ("highestApr", Strategy::Avalanche),
            ("highest_apr", Strategy::Avalanche),
        ] {
            let json = format!(r#"{{ "strategy": "{raw}" }}"#);
            let inputs = plan_from_json(&json).expect("alias should parse");
            assert_eq!(inputs.strategy, expected, "alias {raw}");
        }
    }

    #[tokio::test]
    async fn compare_csv_handler_returns_attachment_with_header_row() {
        let response = compare_csv_handler(Json(ComparePayload::default())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers.get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"text/csv; charset=utf-8"[..])
        );
        let disposition = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .expect("content disposition");
        assert!(disposition.contains(CSV_FILE_NAME));
        assert_eq!(
            headers.get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let text = String::from_utf8(body.to_vec()).expect("utf-8 csv");
        let header_row = text.lines().next().expect("header row");
        assert!(header_row.starts_with("Month,Remaining Budget,Total Interest To Date,"));
        assert!(header_row.contains("Debt 1 Balance"));
        assert!(header_row.ends_with("Debt 3 Paid This Month"));
    }

    #[tokio::test]
    async fn compare_csv_handler_rejects_invalid_plan() {
        let payload = ComparePayload {
            monthly_budget: Some(0.0),
            ..ComparePayload::default()
        };
        let response = compare_csv_handler(Json(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_handler_reports_ok() {
        let response = health_handler().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(value["status"], "ok");
    }

    #[tokio::test]
    async fn compare_handler_returns_both_runs() {
        let response = compare_handler_impl(ComparePayload::default()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(value["chosen"]["strategy"], "snowball");
        assert_eq!(value["other"]["strategy"], "avalanche");
        assert_eq!(value["chosen"]["summary"]["converged"], true);
        assert_eq!(value["horizonMonths"], 1200);
    }
}
