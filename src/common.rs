/**
 * Definitions of data structures used by several modules, such as `DrillError` and the
 * various structs that hold command-line arguments.
 */
use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;


#[derive(Debug, Error)]
pub enum DrillError {
    /// For when the user names a bank file that does not exist.
    #[error("could not find bank '{}'", .0.to_string_lossy())]
    BankNotFound(PathBuf),
    #[error("no question with id '{0}' in bank")]
    QuestionNotFound(String),
    #[error("could not create directory '{}'", .0.to_string_lossy())]
    CannotMakeAppDir(PathBuf),
    /// The bank file is valid JSON but in neither of the known shapes.
    #[error("unrecognized bank format ({0})")]
    BankFormat(String),
    #[error("could not parse JSON ({0})")]
    Json(#[from] serde_json::Error),
    #[error("IO error ({0})")]
    Io(#[from] io::Error),
    #[error("database error ({0})")]
    Sqlite(#[from] rusqlite::Error),
    #[error("could not read input ({0})")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("")]
    ReadlineInterrupted,
    #[error("no questions found")]
    EmptyPool,
}

pub type Result<T> = ::std::result::Result<T, DrillError>;


/// Return `true` if `e` is a broken pipe, e.g. when output is piped into `head`.
pub fn is_broken_pipe(e: &DrillError) -> bool {
    if let DrillError::Io(e) = e {
        e.kind() == io::ErrorKind::BrokenPipe
    } else {
        false
    }
}


/// Holds the command-line configuration for the application.
#[derive(Parser)]
#[command(name = "adaptive-drill", about = "Adaptive question practice from the command line.")]
pub struct Options {
    /// Keep settings and progress in a particular directory.
    #[arg(short = 'd', long = "directory", global = true)]
    pub directory: Option<PathBuf>,
    /// Do not emit colorized output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Choose the next questions and print them.
    Draw(DrawOptions),
    /// Answer multiple-choice questions in the terminal.
    Take(TakeOptions),
    /// Record the outcome of a single question.
    Record(RecordOptions),
    /// Report accuracy, weights and difficulty for a bank's subject.
    Stats(BankOptions),
    /// Forget recorded outcomes and/or the questions already served.
    Reset(ResetOptions),
    /// Validate one or more bank files.
    Check(CheckOptions),
    /// List recent sessions for a bank's subject.
    Sessions(SessionsOptions),
}

/// Identifies a bank file. Shared by every subcommand that reads one bank.
#[derive(Args, Clone)]
pub struct BankOptions {
    /// Path to the bank JSON file.
    pub bank: PathBuf,
    /// Subject to read from a legacy two-subject bank.
    #[arg(long = "subject")]
    pub subject: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Practice,
    Exam,
    Daily,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DifficultyArg {
    Easy,
    Standard,
    Hard,
    Adaptive,
}

/// These selection options are shared between the `draw` and `take` subcommands.
#[derive(Args, Clone)]
pub struct SelectOptions {
    #[arg(short = 'm', long = "mode", value_enum, default_value = "practice")]
    pub mode: ModeArg,
    /// Number of questions. Defaults to the count configured for the mode.
    #[arg(short = 'n')]
    pub count: Option<usize>,
    /// Allow questions served in earlier sessions to come up again.
    #[arg(long = "allow-repeats")]
    pub allow_repeats: bool,
    /// Override the configured difficulty.
    #[arg(long = "difficulty", value_enum)]
    pub difficulty: Option<DifficultyArg>,
}

#[derive(Args)]
pub struct DrawOptions {
    #[command(flatten)]
    pub bank_opts: BankOptions,
    #[command(flatten)]
    pub select_opts: SelectOptions,
    /// Print the selected questions as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct TakeOptions {
    #[command(flatten)]
    pub bank_opts: BankOptions,
    #[command(flatten)]
    pub select_opts: SelectOptions,
}

#[derive(Args)]
pub struct RecordOptions {
    #[command(flatten)]
    pub bank_opts: BankOptions,
    /// Id of the question that was answered.
    pub id: String,
    /// Whether the answer was correct.
    #[arg(value_enum)]
    pub outcome: OutcomeArg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutcomeArg {
    Correct,
    Incorrect,
}

#[derive(Args)]
pub struct ResetOptions {
    #[command(flatten)]
    pub bank_opts: BankOptions,
    /// Forget recorded outcomes.
    #[arg(long = "history")]
    pub history: bool,
    /// Forget which questions have already been served.
    #[arg(long = "used")]
    pub used: bool,
}

#[derive(Args)]
pub struct CheckOptions {
    /// Bank files to validate.
    #[arg(required = true)]
    pub banks: Vec<PathBuf>,
    /// Subject to read from legacy two-subject banks.
    #[arg(long = "subject")]
    pub subject: Option<String>,
}

#[derive(Args)]
pub struct SessionsOptions {
    #[command(flatten)]
    pub bank_opts: BankOptions,
    /// Number of sessions to list.
    #[arg(short = 'n', default_value_t = 10)]
    pub count: usize,
}
