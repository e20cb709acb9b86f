//! End-to-end runs from uploaded CSV tables to CSV downloads
use cbam_core::tabular::{read_factor_rows, read_records, write_results};
use cbam_core::{
    CalculationEngine, CarbonPrices, CoercionError, EmissionFactors, EngineConfig, FactorGranularity,
    InvalidOverrideFactors, ScenarioTemplate,
};

const RECORDS: &str = "\
Product,Quantity,Electricity,Fuel Type,Fuel Quantity,Purchased Materials,Transport Distance,Transport Mode,CN Code
Steel,10,5,None,0,0,0,None,7208
Cement,twenty,3,Coal,1,0,0,Truck,
Aluminium,2,40,Natural Gas,3,1,500,Ship,7601
Hydrogen,1,10,Peat,5,,,,
";

#[test]
fn test_bad_row_is_skipped_and_reported() {
    let records = read_records(RECORDS.as_bytes()).unwrap();
    let scenarios = vec![
        ScenarioTemplate::LowReduction.scenario(),
        ScenarioTemplate::MediumReduction.scenario(),
    ];
    let evaluation = CalculationEngine::default().evaluate(
        &records,
        &EmissionFactors::default(),
        &scenarios,
        &CarbonPrices::default(),
    );

    // Three usable rows under two scenarios
    assert_eq!(evaluation.rows.len(), 6);
    assert_eq!(evaluation.diagnostics.len(), 1);
    let diagnostic = &evaluation.diagnostics[0];
    assert_eq!(diagnostic.index, 1);
    assert_eq!(diagnostic.product, "Cement");
    assert_eq!(
        diagnostic.error,
        CoercionError::NotANumber {
            field: "Quantity",
            value: "twenty".to_string()
        }
    );
    assert!(evaluation.rows.iter().all(|r| r.record_index != 1));

    let best = evaluation.recommendation.as_ref().unwrap();
    let max_savings = evaluation
        .summaries
        .iter()
        .map(|s| *s.total_net_savings)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(*best.total_net_savings, max_savings);
}

#[test]
fn test_unknown_product_and_fuel_are_tolerated() {
    let records = read_records(RECORDS.as_bytes()).unwrap();
    let scenario = cbam_core::Scenario::new("Baseline", 0.0, 0.0, 0.0).unwrap();
    let evaluation = CalculationEngine::default().evaluate(
        &records,
        &EmissionFactors::default(),
        &[scenario],
        &CarbonPrices::default(),
    );

    let hydrogen = evaluation
        .rows
        .iter()
        .find(|r| r.record_index == 3)
        .expect("hydrogen row should be evaluated");
    // 1 * 1.0 default product factor, Peat omitted
    assert!((*hydrogen.scope1 - 1.0).abs() < 1e-9);
    // 10 * 0.7
    assert!((*hydrogen.scope2 - 7.0).abs() < 1e-9);
    assert_eq!(*hydrogen.scope3, 0.0);
}

#[test]
fn test_cn_code_override_changes_coded_rows_only() {
    let factors_csv = "\
Category,Subcategory,EmissionFactor
Product,Steel,1.8
Product,Aluminium,12.0
Fuel,Natural Gas,2.0
Electricity,,0.7
Transport,Ship,0.01
CN Code,7208,2.5
";
    let rows = read_factor_rows(factors_csv.as_bytes()).unwrap();
    let (factors, notice) = EmissionFactors::resolve_override(&rows);
    assert!(notice.is_none());

    let records = read_records(RECORDS.as_bytes()).unwrap();
    let scenario = cbam_core::Scenario::new("Baseline", 0.0, 0.0, 0.0).unwrap();
    let engine = CalculationEngine::new(EngineConfig {
        granularity: FactorGranularity::CnCode,
        ..EngineConfig::default()
    });
    let evaluation = engine.evaluate(&records, &factors, &[scenario], &CarbonPrices::default());

    let steel = evaluation.rows.iter().find(|r| r.record_index == 0).unwrap();
    assert!((*steel.scope1 - 25.0).abs() < 1e-9);

    // 7601 is not in the table, so aluminium keeps its product factor
    let aluminium = evaluation.rows.iter().find(|r| r.record_index == 2).unwrap();
    assert!((*aluminium.scope1 - (2.0 * 12.0 + 3.0 * 2.0)).abs() < 1e-9);
}

#[test]
fn test_malformed_override_falls_back_to_defaults() {
    let factors_csv = "\
Category,Subcategory,EmissionFactor
Product,Steel,1.5
Fuel,Coal,2.5
Electricity,,0.4
Electricity,,0.5
Transport,Truck,0.2
";
    let rows = read_factor_rows(factors_csv.as_bytes()).unwrap();
    let (factors, notice) = EmissionFactors::resolve_override(&rows);
    assert_eq!(factors, EmissionFactors::default());
    assert_eq!(
        notice.map(|n| n.reason),
        Some(InvalidOverrideFactors::AmbiguousElectricity { count: 2 })
    );
}

#[test]
fn test_results_csv_matches_download_format() {
    let records = read_records(RECORDS.as_bytes()).unwrap();
    let scenario = cbam_core::Scenario::new("Baseline", 0.0, 0.0, 0.0).unwrap();
    let evaluation = CalculationEngine::default().evaluate(
        &records,
        &EmissionFactors::default(),
        &[scenario],
        &CarbonPrices::new(100.0, 0.0).unwrap(),
    );

    let mut out = Vec::new();
    write_results(&mut out, &evaluation.rows).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines[0],
        "Scenario,Product,Scope 1 (tCO₂),Scope 2 (tCO₂),Scope 3 (tCO₂),Total Emissions (tCO₂),CBAM Fee (€),Investment (€),Net Savings (€)"
    );
    assert_eq!(lines[1], "Baseline,Steel,18.0,3.5,0.0,21.5,2150.0,0.0,2150.0");
    assert_eq!(lines.len(), 4);
}

#[test]
fn test_evaluation_serializes_to_json() {
    let records = read_records(RECORDS.as_bytes()).unwrap();
    let evaluation = CalculationEngine::default().evaluate(
        &records,
        &EmissionFactors::default(),
        &[ScenarioTemplate::HighReduction.scenario()],
        &CarbonPrices::default(),
    );

    let json = serde_json::to_value(&evaluation).unwrap();
    assert_eq!(json["rows"].as_array().unwrap().len(), 3);
    assert_eq!(json["rows"][0]["product_type"], "Steel");
    assert_eq!(json["recommendation"]["scenario_name"], "High Reduction");
    assert_eq!(json["diagnostics"][0]["index"], 1);
    assert_eq!(json["diagnostics"][0]["error"], "Quantity 'twenty' is not a number");
}

#[test]
fn test_override_applies_to_unlisted_product_in_any_case() {
    let factors_csv = "\
Category,Subcategory,EmissionFactor
Product,Hydrogen,5.0
Product,steel,2.0
Fuel,Coal,2.5
Electricity,,0.7
Transport,Truck,0.2
";
    let records_csv = "\
Product,Quantity,Electricity
hydrogen,2,0
STEEL,1,0
";
    let (factors, notice) = EmissionFactors::resolve_override(&read_factor_rows(factors_csv.as_bytes()).unwrap());
    assert!(notice.is_none());

    let records = read_records(records_csv.as_bytes()).unwrap();
    let scenario = cbam_core::Scenario::new("Baseline", 0.0, 0.0, 0.0).unwrap();
    let evaluation = CalculationEngine::default().evaluate(&records, &factors, &[scenario], &CarbonPrices::default());

    assert!((*evaluation.rows[0].scope1 - 10.0).abs() < 1e-9);
    assert!((*evaluation.rows[1].scope1 - 2.0).abs() < 1e-9);
    // Spelling from the upload is kept in the output
    assert_eq!(evaluation.rows[0].product_type.to_string(), "hydrogen");
}
