//! Network Fitting Binary
//!
//! Builds a network from a model string, assigns levels, fits it from a
//! delimited data file and prints the fitted tables as JSON on stdout.
//! Logs go to stderr.
//!
//! ## Configuration
//!
//! Every fit option is a flag that falls back to an environment variable:
//! - `--estimator` / `BAYESNET_ESTIMATOR`: "mle" or "bayes" (default: mle)
//! - `--iss` / `BAYESNET_ISS`: imaginary sample size for bayes (default: 10)
//! - `--unobserved` / `BAYESNET_UNOBSERVED`: "uniform" or "reject" (default: uniform)
//! - `--delimiter` / `BAYESNET_DELIMITER`: field delimiter of the data file (default: ,)
//!
//! Logging:
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! BAYESNET_ISS=20 cargo run --bin fit_network -- --estimator bayes \
//!     "A, S, E|A:S, O|E, R|E, T|O:R" \
//!     "A=young/adult/old; S=M/F; E=high/uni; O=emp/self; R=small/big; T=car/train/other" \
//!     survey.txt
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use discrete_bayesnet::{
    Dataset, DiscreteBayesianNetwork, Estimator, FitConfig, UnobservedPolicy, DEFAULT_ISS,
};

#[derive(Debug, Parser)]
#[command(name = "fit_network")]
#[command(version, about = "Fit the conditional tables of a discrete Bayesian network")]
struct Cli {
    /// Model string, e.g. "A, S, E|A:S".
    model: String,

    /// Levels per variable, e.g. "A=young/adult/old; S=M/F".
    levels: String,

    /// Delimited data file whose first row names the columns.
    data: PathBuf,

    /// Parameter estimator: mle or bayes.
    #[arg(long, env = "BAYESNET_ESTIMATOR", default_value = "mle")]
    estimator: Estimator,

    /// Imaginary sample size of the bayes prior.
    #[arg(long, env = "BAYESNET_ISS", default_value_t = DEFAULT_ISS, allow_negative_numbers = true)]
    iss: f64,

    /// Handling of unobserved parent configurations: uniform or reject.
    #[arg(long, env = "BAYESNET_UNOBSERVED", default_value = "uniform", value_parser = parse_unobserved)]
    unobserved: UnobservedPolicy,

    /// Field delimiter of the data file.
    #[arg(long, env = "BAYESNET_DELIMITER", default_value_t = ',')]
    delimiter: char,
}

impl Cli {
    /// Fit configuration from the parsed flags.
    fn config(&self) -> Result<FitConfig, discrete_bayesnet::FitError> {
        let config = FitConfig {
            estimator: self.estimator,
            iss: self.iss,
            unobserved: self.unobserved,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_unobserved(value: &str) -> Result<UnobservedPolicy, String> {
    UnobservedPolicy::from_str(value).ok_or_else(|| format!("unknown unobserved policy: {value}"))
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fit_network=info,discrete_bayesnet=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Parse `"A=young/adult/old; S=M/F"` into (variable, levels) pairs.
fn parse_levels(assignments: &str) -> Result<Vec<(String, Vec<String>)>, String> {
    assignments.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, levels) = entry
                .split_once('=')
                .ok_or_else(|| format!("Expected VARIABLE=level/level, got {entry:?}"))?;
            let levels = levels.split('/').map(|l| l.trim().to_string()).collect();
            Ok((name.trim().to_string(), levels))
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.config()?;

    let mut network = DiscreteBayesianNetwork::from_model_string(&cli.model)?;
    for (name, variable_levels) in parse_levels(&cli.levels)? {
        network.set_levels(&name, variable_levels)?;
    }
    info!(
        variables = network.len(),
        arcs = network.arcs().len(),
        avg_markov_blanket = network.average_markov_blanket_size(),
        avg_branching_factor = network.average_branching_factor(),
        "Network built"
    );

    let data = Dataset::from_path(&cli.data, cli.delimiter)?;
    let report = network.fit(data.rows(), &config)?;

    let tables: BTreeMap<&str, _> = network
        .variables()
        .filter_map(|(id, variable)| variable.table().map(|table| (id.as_str(), table)))
        .collect();

    let output = serde_json::json!({
        "report": report,
        "arcs": network.arcs().iter().map(ToString::to_string).collect::<Vec<_>>(),
        "tables": tables,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
