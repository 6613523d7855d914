//! Command line argument parsing for the jobcheck CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::storage::keys;

/// jobcheck - Fraudulent job posting detection
#[derive(Parser, Debug, Clone)]
#[command(name = "jobcheck")]
#[command(about = "Train, evaluate and serve fraudulent job posting classifiers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct JobCheckArgs {
    /// Verbosity level (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl JobCheckArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train, evaluate and persist every configured model
    Train(TrainArgs),

    /// Classify a single posting
    Predict(PredictArgs),

    /// Score a stored model against a labeled dataset
    Evaluate(EvaluateArgs),

    /// Print the cleaned form of a text
    Normalize(NormalizeArgs),

    /// Show metadata of stored artifacts
    Inspect(InspectArgs),
}

impl Command {
    /// The subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Train(_) => "train",
            Command::Predict(_) => "predict",
            Command::Evaluate(_) => "evaluate",
            Command::Normalize(_) => "normalize",
            Command::Inspect(_) => "inspect",
        }
    }
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Labeled dataset (CSV or JSONL)
    #[arg(short, long, value_name = "DATA_FILE")]
    pub data: PathBuf,

    /// Directory receiving the artifacts
    #[arg(short, long, value_name = "MODEL_DIR", env = "JOBCHECK_MODELS")]
    pub models: PathBuf,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Override the split and model seed
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for a single prediction
#[derive(Parser, Debug, Clone)]
pub struct PredictArgs {
    /// Artifact directory
    #[arg(short, long, value_name = "MODEL_DIR", env = "JOBCHECK_MODELS")]
    pub models: PathBuf,

    /// Job description
    #[arg(short, long)]
    pub description: String,

    /// Job requirements
    #[arg(short, long)]
    pub requirements: Option<String>,

    /// Job benefits
    #[arg(short, long)]
    pub benefits: Option<String>,

    /// Stored classifier to use
    #[arg(long, default_value = keys::BEST_MODEL)]
    pub model: String,

    /// Append the prediction to this JSON-lines log
    #[arg(long, value_name = "LOG_FILE")]
    pub log: Option<PathBuf>,
}

/// Arguments for evaluating a stored model
#[derive(Parser, Debug, Clone)]
pub struct EvaluateArgs {
    /// Labeled dataset (CSV or JSONL)
    #[arg(short, long, value_name = "DATA_FILE")]
    pub data: PathBuf,

    /// Artifact directory
    #[arg(short, long, value_name = "MODEL_DIR", env = "JOBCHECK_MODELS")]
    pub models: PathBuf,

    /// Stored classifier to evaluate
    #[arg(long, default_value = keys::BEST_MODEL)]
    pub model: String,

    /// Accuracy the model is expected to reach
    #[arg(long, default_value = "0.9")]
    pub target_accuracy: f64,
}

/// Arguments for normalizing text
#[derive(Parser, Debug, Clone)]
pub struct NormalizeArgs {
    /// Text to clean
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Keep stop words
    #[arg(long)]
    pub keep_stop_words: bool,
}

/// Arguments for inspecting artifacts
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// Artifact directory
    #[arg(short, long, value_name = "MODEL_DIR", env = "JOBCHECK_MODELS")]
    pub models: PathBuf,

    /// Include the vocabulary terms
    #[arg(long)]
    pub terms: bool,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
