use oracle_agents::{load_report, OracleConfig, Provider};
use std::io::Write;

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[optimist]
provider = "chat_completions"
name = "LocalOptimist"
url = "http://127.0.0.1:8080/v1"
model = "qwen-14b"
api_key = "local"

[debate]
max_rounds = 3
convergence_threshold = 1
"#
    )
    .unwrap();

    let config = OracleConfig::from_file(file.path()).unwrap();
    assert_eq!(config.optimist.provider, Provider::ChatCompletions);
    assert_eq!(config.optimist.name, "LocalOptimist");
    assert_eq!(config.optimist.model, "qwen-14b");
    assert_eq!(config.debate.max_rounds, 3);
    assert_eq!(config.debate.convergence_threshold, 1);
    assert_eq!(config.skeptic.name, "DeepSeek");
}

#[test]
fn test_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("oracle.toml");
    let err = OracleConfig::from_file(&missing).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));

    let err = OracleConfig::load(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("oracle.toml"));
}

#[test]
fn test_config_malformed_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[debate\nmax_rounds = ").unwrap();
    let err = OracleConfig::from_file(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse oracle TOML"));
}

#[test]
fn test_load_without_path_uses_defaults() {
    let config = OracleConfig::load(None).unwrap();
    assert_eq!(config.debate.validation_attempts, 3);
    assert!(!config.debate.strict_grounding);
}

#[test]
fn test_load_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    std::fs::write(
        &path,
        r#"{
            "company_name": "Tiny Co",
            "fiscal_year": 2022,
            "income_statement": {
                "Revenue": 1000.0, "CostOfGoodsSold": 600.0, "GrossProfit": 400.0,
                "OpEx": 200.0, "EBITDA": 200.0, "DepreciationAndAmortization": 50.0,
                "EBIT": 150.0, "InterestExpense": 10.0, "Taxes": 35.0, "NetIncome": 105.0
            },
            "balance_sheet": {
                "Assets": {"Cash": 500.0},
                "Liabilities": {"Debt": 200.0},
                "Equity": {"Total": 300.0}
            },
            "cash_flow": {
                "NetIncome": 105.0, "Depreciation": 50.0, "ChangeInWorkingCapital": 0.0,
                "CashFromOperations": 155.0, "CapEx": -40.0, "CashFromInvesting": -40.0,
                "NetChangeInCash": 115.0
            }
        }"#,
    )
    .unwrap();

    let report = load_report(&path).unwrap();
    assert_eq!(report.label(), "Tiny Co FY2022");
    assert_eq!(report.income_statement.revenue, 1000.0);
}

#[test]
fn test_load_report_rejects_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"income_statement\": ").unwrap();
    let err = load_report(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse report JSON"));
}
