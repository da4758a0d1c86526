use crate::adapters::{EmbeddedSource, HttpSource, LocalStorage};
use crate::domain::ports::DataSource;
use crate::utils::error;
use crate::utils::validation::{self, Validate};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List participants, group size bounds and the rating scale
    Roster,

    /// Show whether a participant has already submitted
    Status {
        #[arg(long)]
        evaluator: String,
    },

    /// Submit an evaluation for a group
    Submit {
        /// Your participant id
        #[arg(long)]
        evaluator: String,

        /// Group members besides yourself (repeat or comma-separate)
        #[arg(long = "member", value_delimiter = ',')]
        members: Vec<String>,

        /// Rating as ID=VALUE, one per group member including yourself
        #[arg(long = "rating", value_parser = parse_rating)]
        ratings: Vec<(String, f64)>,

        /// Optional comment as ID=TEXT
        #[arg(long = "comment", value_parser = parse_comment)]
        comments: Vec<(String, String)>,

        /// Also print a mailto: link addressed to the instructor
        #[arg(long)]
        email: bool,
    },

    /// Export evaluations as CSV (all, or one evaluator's latest submission)
    Export {
        #[arg(long)]
        evaluator: Option<String>,

        /// Write a ZIP with the aggregate and per-submission CSV files
        #[arg(long, conflicts_with = "evaluator")]
        archive: bool,

        /// Print the CSV instead of writing a file
        #[arg(long, conflicts_with = "archive")]
        stdout: bool,
    },

    /// Show submission statistics
    Stats,

    /// Print the instructor e-mail draft for an evaluator's latest submission
    Email {
        #[arg(long)]
        evaluator: String,
    },

    /// Delete all stored submissions
    Clear {
        /// Confirm the irreversible deletion
        #[arg(long)]
        yes: bool,
    },
}

fn split_pair(value: &str) -> Result<(&str, &str), String> {
    value
        .split_once('=')
        .map(|(id, rest)| (id.trim(), rest))
        .filter(|(id, _)| !id.is_empty())
        .ok_or_else(|| format!("expected ID=VALUE, got '{}'", value))
}

pub fn parse_rating(value: &str) -> Result<(String, f64), String> {
    let (id, rating) = split_pair(value)?;
    let rating = rating
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid rating '{}': {}", rating, e))?;
    Ok((id.to_string(), rating))
}

pub fn parse_comment(value: &str) -> Result<(String, String), String> {
    let (id, text) = split_pair(value)?;
    Ok((id.to_string(), text.to_string()))
}

#[derive(Debug, Clone, Parser)]
#[command(name = "peer-eval")]
#[command(about = "Peer evaluation of group work: rate your group, export CSV, view statistics")]
pub struct CliConfig {
    /// Directory or http(s) base URL holding students.csv and config.json
    #[arg(long, default_value = "./data")]
    pub source: String,

    /// Use the roster and configuration compiled into the binary
    #[arg(long, conflicts_with = "source")]
    pub embedded: bool,

    #[arg(long, default_value = "./ledger")]
    pub ledger_dir: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    fn source_is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }

    pub fn data_source(&self) -> error::Result<Box<dyn DataSource>> {
        if self.embedded {
            Ok(Box::new(EmbeddedSource))
        } else if self.source_is_remote() {
            Ok(Box::new(HttpSource::new(&self.source)?))
        } else {
            Ok(Box::new(LocalStorage::new(self.source.clone())))
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> error::Result<()> {
        if !self.embedded {
            if self.source_is_remote() {
                validation::validate_url("source", &self.source)?;
            } else {
                validation::validate_path("source", &self.source)?;
            }
        }
        validation::validate_path("ledger_dir", &self.ledger_dir)?;
        validation::validate_path("output_path", &self.output_path)?;
        Ok(())
    }
}
