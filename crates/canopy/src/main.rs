use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use canopy_calibrate::CalibrationConfig;
use canopy_formula::Formula;
use canopy_schemas::{
    FeatureRow, FittedModel, RasterPlan, TrainingRow, TreeSurvey,
    load_fitted_model,
};
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use itertools::Itertools;
use mimalloc::MiMalloc;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Compute tree biomass from allometric formulas and calibrate models that
/// predict above-ground biomass from satellite spectral features.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a formula in canonical syntax
    ///
    /// Rewrites `ln(` to `log(`, `^` to `**` and lowercases `exp` / `log`.
    /// A blank or missing formula prints the configured default formula.
    Normalize {
        /// Formula text
        formula: Option<String>,

        /// Calibration config (JSON) supplying the default formula
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Evaluate a formula against named values
    ///
    /// The formula is normalized first, so a blank formula evaluates the
    /// configured default formula.
    Eval {
        /// Formula text; normalized before compiling
        formula: String,

        /// Variable binding, e.g. `--var dbh=20`; may be repeated
        #[arg(
            long = "var",
            value_name = "NAME=VALUE",
            value_parser = parse_binding
        )]
        vars: Vec<(String, f64)>,

        /// Calibration config (JSON) supplying the default formula
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Compute per-tree biomass for a survey
    ///
    /// Reads a `TreeSurvey` JSON document and writes a JSON array of
    /// per-tree biomass values.
    Biomass {
        /// Input survey (reads stdin if not specified)
        input: Option<PathBuf>,

        /// Output file path (writes to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fit a linear AGB model on labeled sampling points
    ///
    /// Reads a JSON array of training rows and writes the fitted model as
    /// JSON. A training summary is printed to stderr.
    Train {
        /// Input training rows (reads stdin if not specified)
        input: Option<PathBuf>,

        /// Output file path (writes to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Calibration config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Minimum number of labeled rows, overriding the config
        #[arg(long)]
        min_samples: Option<usize>,

        /// Feature names in model order, overriding the config
        #[arg(long, value_delimiter = ',')]
        features: Option<Vec<String>>,
    },

    /// Apply a fitted model to feature rows
    Predict {
        /// Fitted model produced by `canopy train`
        #[arg(short, long)]
        model: PathBuf,

        /// Input feature rows (reads stdin if not specified)
        input: Option<PathBuf>,

        /// Output file path (writes to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restate a fitted model as a per-band plan for a raster engine
    RasterPlan {
        /// Fitted model (reads stdin if not specified)
        input: Option<PathBuf>,

        /// Output file path (writes to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the JSON Schema of a data format
    Schema {
        /// Which format to describe
        #[arg(value_enum)]
        format: SchemaFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaFormat {
    Model,
    TrainingRows,
    Survey,
    FeatureRows,
    RasterPlan,
}

fn parse_binding(arg: &str) -> Result<(String, f64), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{arg}`"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for `{name}`: {e}"))?;
    Ok((name.trim().to_string(), value))
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    Ok(match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(std::io::stdin().lock()),
    })
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path).with_context(|| {
                format!("failed to create {}", path.display())
            })?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    })
}

fn load_config(path: Option<&Path>) -> Result<CalibrationConfig> {
    match path {
        Some(path) => CalibrationConfig::load(path).with_context(|| {
            format!("failed to load config {}", path.display())
        }),
        None => Ok(CalibrationConfig::default()),
    }
}

/// Normalizes `formula` with the config's default and evaluates it.
fn eval_formula(
    formula: &str,
    vars: &[(String, f64)],
    config: &CalibrationConfig,
) -> Result<f64> {
    let text = config.normalizer().normalize(formula);
    let compiled = Formula::compile(&text)?;
    debug!(
        formula = %compiled,
        variables = ?compiled.variables().collect_vec(),
        "evaluating"
    );
    let env: Vec<(&str, f64)> = vars
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .collect();
    Ok(compiled.evaluate(env.as_slice())?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Output goes to stderr so JSON on stdout stays clean for piping.
    // Default to warn, allowlist our crates.
    const CRATES: &[&str] = &[
        "canopy",
        "canopy_calibrate",
        "canopy_formula",
        "canopy_regress",
        "canopy_schemas",
    ];
    let level = cli.verbose.tracing_level_filter();
    let allowlist = CRATES.iter().map(|c| format!("{c}={level}")).join(",");
    let filter = EnvFilter::new(format!("warn,{allowlist}"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
        .init();

    match cli.command {
        Commands::Normalize { formula, config } => {
            let config = load_config(config.as_deref())?;
            let text = config
                .normalizer()
                .normalize(formula.as_deref().unwrap_or_default());
            println!("{text}");
            Ok(())
        }
        Commands::Eval {
            formula,
            vars,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let value = eval_formula(&formula, &vars, &config)?;
            println!("{value}");
            Ok(())
        }
        Commands::Biomass { input, output } => {
            let reader = open_input(input.as_deref())?;
            let mut writer = open_output(output.as_deref())?;
            canopy_calibrate::run_biomass(reader, &mut writer)?;
            writer.flush()?;
            Ok(())
        }
        Commands::Train {
            input,
            output,
            config,
            min_samples,
            features,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(min_samples) = min_samples {
                config.min_samples = min_samples;
            }
            if let Some(features) = features {
                config.features = features;
            }
            debug!(?config, "resolved calibration config");

            let reader = open_input(input.as_deref())?;
            let mut writer = open_output(output.as_deref())?;
            let report =
                canopy_calibrate::run_train(reader, &mut writer, &config)?;
            writer.flush()?;
            report.write_report(std::io::stderr().lock())?;
            Ok(())
        }
        Commands::Predict {
            model,
            input,
            output,
        } => {
            let model = load_fitted_model(&model).with_context(|| {
                format!("failed to load model {}", model.display())
            })?;
            let reader = open_input(input.as_deref())?;
            let mut writer = open_output(output.as_deref())?;
            canopy_calibrate::run_predict(reader, &mut writer, &model)?;
            writer.flush()?;
            Ok(())
        }
        Commands::RasterPlan { input, output } => {
            let reader = open_input(input.as_deref())?;
            let mut writer = open_output(output.as_deref())?;
            canopy_calibrate::run_raster_plan(reader, &mut writer)?;
            writer.flush()?;
            Ok(())
        }
        Commands::Schema { format } => {
            let schema = match format {
                SchemaFormat::Model => schemars::schema_for!(FittedModel),
                SchemaFormat::TrainingRows => {
                    schemars::schema_for!(Vec<TrainingRow>)
                }
                SchemaFormat::Survey => schemars::schema_for!(TreeSurvey),
                SchemaFormat::FeatureRows => {
                    schemars::schema_for!(Vec<FeatureRow>)
                }
                SchemaFormat::RasterPlan => schemars::schema_for!(RasterPlan),
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}
