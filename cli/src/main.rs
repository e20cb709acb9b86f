use cbam_core::tabular::{read_factor_rows, read_records, write_results, write_summaries};
use cbam_core::{
    CalculationEngine, CarbonPrices, EfficiencyMode, EmissionFactors, EngineConfig, Evaluation, FactorGranularity,
    FactorNotice, Scenario, ScenarioTemplate,
};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CBAM fee estimation with scenario comparison
#[derive(Parser, Debug)]
#[command(name = "cbam")]
#[command(about = "Estimate CBAM fees and compare mitigation scenarios", long_about = None)]
struct Args {
    /// Production data CSV (Product, Quantity, Electricity, Fuel Type, ...)
    #[arg(short, long)]
    records: PathBuf,

    /// Custom emission factors CSV (Category, Subcategory, `EmissionFactor`)
    #[arg(short, long)]
    factors: Option<PathBuf>,

    /// EU ETS price in € per tonne CO₂ (static fallback of 100 when omitted)
    #[arg(long)]
    eu_price: Option<f64>,

    /// Carbon price already paid locally in € per tonne CO₂
    #[arg(long, default_value_t = 0.0)]
    local_price: f64,

    /// Scenario template to include (low, medium, high), repeatable
    #[arg(short, long = "template")]
    templates: Vec<String>,

    /// Custom scenario as NAME:RENEWABLE%:EFFICIENCY%:INVESTMENT, repeatable
    #[arg(short, long = "scenario")]
    scenarios: Vec<String>,

    /// Whether efficiency gains discount Scope 1 and Scope 3
    #[arg(long, value_enum, default_value_t = EfficiencyArg::Ignored)]
    efficiency: EfficiencyArg,

    /// Product-level or CN-code-level emission factors
    #[arg(long, value_enum, default_value_t = GranularityArg::Product)]
    granularity: GranularityArg,

    /// Evaluate scenarios in parallel
    #[arg(short, long)]
    parallel: bool,

    /// Write detailed results to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the scenario summary to this CSV file
    #[arg(long)]
    summary_output: Option<PathBuf>,

    /// Print the full evaluation as JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EfficiencyArg {
    Ignored,
    Discount,
}

impl From<EfficiencyArg> for EfficiencyMode {
    fn from(arg: EfficiencyArg) -> Self {
        match arg {
            EfficiencyArg::Ignored => EfficiencyMode::Ignored,
            EfficiencyArg::Discount => EfficiencyMode::DiscountDirect,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GranularityArg {
    Product,
    CnCode,
}

impl From<GranularityArg> for FactorGranularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Product => FactorGranularity::Product,
            GranularityArg::CnCode => FactorGranularity::CnCode,
        }
    }
}

/// Parse NAME:RENEWABLE:EFFICIENCY:INVESTMENT, splitting from the right so names may contain ':'
fn parse_custom_scenario(entry: &str) -> Result<Scenario, Box<dyn Error>> {
    let mut parts = entry.rsplitn(4, ':');
    let (Some(investment), Some(efficiency), Some(renewable), Some(name)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("custom scenario '{entry}' must be NAME:RENEWABLE:EFFICIENCY:INVESTMENT").into());
    };

    let number = |field: &str, text: &str| -> Result<f64, Box<dyn Error>> {
        text.trim()
            .parse::<f64>()
            .map_err(|e| format!("custom scenario '{entry}': {field} '{text}': {e}").into())
    };

    Ok(Scenario::new(
        name,
        number("renewable share", renewable)?,
        number("efficiency gain", efficiency)?,
        number("investment", investment)?,
    )?)
}

fn collect_scenarios(args: &Args) -> Result<Vec<Scenario>, Box<dyn Error>> {
    let mut scenarios = Vec::new();

    for label in &args.templates {
        let template = ScenarioTemplate::from_label(label).ok_or_else(|| {
            format!("unknown template '{label}' (expected low, medium or high)")
        })?;
        scenarios.push(template.scenario());
    }
    for entry in &args.scenarios {
        scenarios.push(parse_custom_scenario(entry)?);
    }

    // Same default selection as the dashboard
    if scenarios.is_empty() {
        scenarios.push(ScenarioTemplate::LowReduction.scenario());
    }
    Ok(scenarios)
}

/// Load the factor table, falling back to the defaults when the override is rejected
fn load_factors(path: Option<&Path>) -> Result<(EmissionFactors, Option<FactorNotice>), Box<dyn Error>> {
    let Some(path) = path else {
        return Ok((EmissionFactors::default(), None));
    };

    let rows = read_factor_rows(BufReader::new(File::open(path)?))?;
    let (factors, notice) = EmissionFactors::resolve_override(&rows);
    if notice.is_none() {
        info!("Using custom emission factors from {}", path.display());
    }
    Ok((factors, notice))
}

/// Document printed by `--json`
#[derive(Serialize)]
struct JsonReport<'a> {
    /// Why an uploaded factor table was rejected, if it was
    notice: Option<String>,
    evaluation: &'a Evaluation,
}

fn print_evaluation(out: &mut impl Write, evaluation: &Evaluation) -> io::Result<()> {
    writeln!(out, "\nDetailed Results")?;
    writeln!(
        out,
        "{:<20} | {:<12} | {:>10} | {:>10} | {:>10} | {:>12} | {:>14} | {:>12} | {:>14}",
        "Scenario", "Product", "Scope 1", "Scope 2", "Scope 3", "Total tCO₂", "CBAM Fee €", "Investment €", "Net Savings €"
    )?;
    writeln!(out, "{}", "-".repeat(146))?;
    for row in &evaluation.rows {
        writeln!(
            out,
            "{:<20} | {:<12} | {:>10.2} | {:>10.2} | {:>10.2} | {:>12.2} | {:>14.2} | {:>12.2} | {:>14.2}",
            row.scenario_name,
            row.product_type.name(),
            row.scope1.rounded(),
            row.scope2.rounded(),
            row.scope3.rounded(),
            row.total_emissions.rounded(),
            row.fee.rounded(),
            row.investment_cost.rounded(),
            row.net_savings.rounded()
        )?;
    }

    writeln!(out, "\nScenario Summary")?;
    writeln!(
        out,
        "{:<20} | {:>10} | {:>10} | {:>10} | {:>12} | {:>14} | {:>14}",
        "Scenario", "Scope 1", "Scope 2", "Scope 3", "Total tCO₂", "CBAM Fee €", "Net Savings €"
    )?;
    writeln!(out, "{}", "-".repeat(108))?;
    for summary in &evaluation.summaries {
        writeln!(
            out,
            "{:<20} | {:>10.2} | {:>10.2} | {:>10.2} | {:>12.2} | {:>14.2} | {:>14.2}",
            summary.scenario_name,
            summary.scope1.rounded(),
            summary.scope2.rounded(),
            summary.scope3.rounded(),
            summary.total_emissions.rounded(),
            summary.total_fee.rounded(),
            summary.total_net_savings.rounded()
        )?;
    }

    if !evaluation.diagnostics.is_empty() {
        writeln!(out, "\nSkipped rows:")?;
        for diagnostic in &evaluation.diagnostics {
            writeln!(out, "  {diagnostic}")?;
        }
    }

    match &evaluation.recommendation {
        Some(best) => writeln!(
            out,
            "\nRecommended Scenario: {} with Net Savings €{:.2}",
            best.scenario_name,
            best.total_net_savings.rounded()
        ),
        None => writeln!(out, "\nNo recommendation: add at least one product and one scenario."),
    }
}

/// Run one calculation; everything meant for the user goes to `out`, logs go to stderr
fn run(args: &Args, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let records = read_records(BufReader::new(File::open(&args.records)?))?;
    let (factors, notice) = load_factors(args.factors.as_deref())?;
    let prices = CarbonPrices::with_fallback(args.eu_price, args.local_price)?;
    let scenarios = collect_scenarios(args)?;

    let engine = CalculationEngine::new(EngineConfig {
        efficiency: args.efficiency.into(),
        granularity: args.granularity.into(),
        parallel: args.parallel,
    });
    info!(
        "Loaded {} records from {}, {} scenario(s), EU price {}, local price {}",
        records.len(),
        args.records.display(),
        scenarios.len(),
        prices.eu_price(),
        prices.local_price()
    );

    let evaluation = engine.evaluate(&records, &factors, &scenarios, &prices);

    if args.json {
        let report = JsonReport {
            notice: notice.as_ref().map(ToString::to_string),
            evaluation: &evaluation,
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
    } else {
        writeln!(out, "=== CBAM Fee Estimation ===")?;
        if let Some(notice) = &notice {
            writeln!(out, "Note: {notice}")?;
        }
        writeln!(
            out,
            "Price spread: {} (EU ETS {} - local {})",
            prices.spread(),
            prices.eu_price(),
            prices.local_price()
        )?;
        print_evaluation(out, &evaluation)?;
    }

    if let Some(path) = &args.output {
        write_results(BufWriter::new(File::create(path)?), &evaluation.rows)?;
        info!("Wrote detailed results to {}", path.display());
    }
    if let Some(path) = &args.summary_output {
        write_summaries(BufWriter::new(File::create(path)?), &evaluation.summaries)?;
        info!("Wrote scenario summary to {}", path.display());
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&args, &mut out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_custom_scenario() {
        let scenario = parse_custom_scenario("Solar Roof:25:5:2500").unwrap();
        assert_eq!(scenario.name(), "Solar Roof");
        assert_eq!(*scenario.renewable_share(), 25.0);
        assert_eq!(*scenario.efficiency_gain(), 5.0);
        assert_eq!(*scenario.investment_cost(), 2500.0);

        let scenario = parse_custom_scenario("Plan: B:10:0:0").unwrap();
        assert_eq!(scenario.name(), "Plan: B");
    }

    #[test]
    fn test_parse_custom_scenario_errors() {
        assert!(parse_custom_scenario("missing:fields").is_err());
        assert!(parse_custom_scenario("Bad:abc:0:0").is_err());
        assert!(parse_custom_scenario("Too Much:150:0:0").is_err());
    }

    #[test]
    fn test_default_scenario_selection() {
        let args = Args::parse_from(["cbam", "--records", "in.csv"]);
        let scenarios = collect_scenarios(&args).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].name(), "Low Reduction");

        let args = Args::parse_from(["cbam", "-r", "in.csv", "-t", "high", "-s", "Custom:50:10:3000"]);
        let names: Vec<String> = collect_scenarios(&args)
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["High Reduction", "Custom"]);
    }

    #[test]
    fn test_unknown_template_is_an_error() {
        let args = Args::parse_from(["cbam", "-r", "in.csv", "-t", "extreme"]);
        assert!(collect_scenarios(&args).is_err());
    }

    const RECORDS_CSV: &str = "\
Product,Quantity,Electricity,Fuel Type,Fuel Quantity,Purchased Materials,Transport Distance,Transport Mode
Steel,10,5,None,0,0,0,None
";

    /// Write input tables into a fresh directory under the system temp dir
    fn write_inputs(name: &str, factors_csv: &str) -> (String, String) {
        let dir = std::env::temp_dir().join(format!("cbam_cli_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let records = dir.join("records.csv");
        let factors = dir.join("factors.csv");
        std::fs::write(&records, RECORDS_CSV).unwrap();
        std::fs::write(&factors, factors_csv).unwrap();
        (records.display().to_string(), factors.display().to_string())
    }

    #[test]
    fn test_json_output_stays_parseable_when_override_is_rejected() {
        // No Fuel rows, so the override is rejected
        let (records, factors) = write_inputs(
            "rejected",
            "Category,Subcategory,EmissionFactor\nProduct,Steel,2.0\nElectricity,,0.5\nTransport,Truck,0.2\n",
        );
        let args = Args::parse_from([
            "cbam",
            "--records",
            records.as_str(),
            "--factors",
            factors.as_str(),
            "--json",
        ]);

        let mut out = Vec::new();
        run(&args, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

        let notice = json["notice"].as_str().unwrap();
        assert!(notice.contains("'Fuel' is missing"), "{notice}");
        assert!(notice.contains("using default factors"));
        // Defaults applied: 10 * 1.8 + 5 * 0.7 * 0.9
        let row = &json["evaluation"]["rows"][0];
        assert_eq!(row["scenario_name"], "Low Reduction");
        assert!((row["total_emissions"].as_f64().unwrap() - 21.15).abs() < 1e-9);
        assert_eq!(json["evaluation"]["recommendation"]["scenario_name"], "Low Reduction");
    }

    #[test]
    fn test_json_output_without_notice_for_valid_override() {
        let (records, factors) = write_inputs(
            "accepted",
            "Category,Subcategory,EmissionFactor\nProduct,Steel,2.0\nFuel,Coal,2.5\nElectricity,,0.5\nTransport,Truck,0.2\n",
        );
        let args = Args::parse_from([
            "cbam",
            "-r",
            records.as_str(),
            "-f",
            factors.as_str(),
            "--json",
        ]);

        let mut out = Vec::new();
        run(&args, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert!(json["notice"].is_null());
        let scope1 = json["evaluation"]["rows"][0]["scope1"].as_f64().unwrap();
        assert!((scope1 - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_output_carries_notice_and_recommendation() {
        let (records, factors) = write_inputs("text", "Category,Subcategory,EmissionFactor\n");
        let args = Args::parse_from([
            "cbam",
            "-r",
            records.as_str(),
            "-f",
            factors.as_str(),
        ]);

        let mut out = Vec::new();
        run(&args, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Note: custom emission factors rejected (override contains no rows)"));
        assert!(text.contains("Recommended Scenario: Low Reduction"));
    }
}
