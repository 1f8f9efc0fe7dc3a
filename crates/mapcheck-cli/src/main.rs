//! Command-line fixture runner for payload-mapping verification.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mapcheck_protocol::{ExternalMessage, ProtocolMessage};
use mapcheck_script::{EntryPoint, MappingFunction, ScriptHost};
use mapcheck_testcase::{ComparatorConfig, Direction, Error as TestCaseError, MappingTestCase};
use tracing::{error, info};

/// MapCheck - Verify connector payload-mapping scripts against fixtures.
#[derive(Parser, Debug)]
#[command(name = "mapcheck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run a mapping script against an input fixture and verify the result.
    Verify {
        /// Path to the mapping script.
        #[arg(long)]
        script: PathBuf,
        /// Mapping direction.
        #[arg(long, value_enum)]
        direction: CliDirection,
        /// Input fixture: external-message JSON for incoming, protocol
        /// envelope JSON for outgoing.
        #[arg(long)]
        input: PathBuf,
        /// Expected output fixture.
        #[arg(long)]
        expected: PathBuf,
        /// Script execution budget in milliseconds.
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
        /// Treat missing fields and explicit nulls as different.
        #[arg(long)]
        strict_null: bool,
        /// Decode byte payloads as UTF-8 when compared against text.
        #[arg(long)]
        decode_payloads: bool,
    },
    /// Load a script and report which entry points it defines.
    Check {
        /// Path to the mapping script.
        #[arg(long)]
        script: PathBuf,
    },
}

/// Mapping direction flag.
#[derive(ValueEnum, Debug, Clone, Copy)]
enum CliDirection {
    Incoming,
    Outgoing,
}

impl From<CliDirection> for Direction {
    fn from(direction: CliDirection) -> Self {
        match direction {
            CliDirection::Incoming => Self::Incoming,
            CliDirection::Outgoing => Self::Outgoing,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunError::Verification(message)) => {
            error!("verification failed: {message}");
            ExitCode::from(1)
        }
        Err(RunError::Other(e)) => {
            error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

enum RunError {
    /// The fixtures genuinely disagree (or the mapping itself failed).
    Verification(String),
    /// Harness problem: unreadable files, malformed fixtures, bad usage.
    Other(anyhow::Error),
}

impl From<anyhow::Error> for RunError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e)
    }
}

fn run(command: Command) -> std::result::Result<(), RunError> {
    match command {
        Command::Verify {
            script,
            direction,
            input,
            expected,
            timeout_ms,
            strict_null,
            decode_payloads,
        } => {
            let host = ScriptHost::with_timeout(Duration::from_millis(timeout_ms));
            let source = read(&script)?;
            let function = MappingFunction::with_host(host, &source)
                .with_context(|| format!("failed to load {}", script.display()))?;

            let config = ComparatorConfig {
                distinguish_null_from_absent: strict_null,
                decode_payloads,
            };
            let outcome = match direction {
                CliDirection::Incoming => verify_case(
                    &function,
                    Direction::Incoming,
                    parse_external(&input)?,
                    parse_protocol(&expected)?,
                    config,
                ),
                CliDirection::Outgoing => verify_case(
                    &function,
                    Direction::Outgoing,
                    parse_protocol(&input)?,
                    parse_external(&expected)?,
                    config,
                ),
            };

            match outcome {
                Ok(()) => {
                    info!("verification passed");
                    Ok(())
                }
                Err(e @ (TestCaseError::Mapping(_) | TestCaseError::Mismatch { .. })) => {
                    Err(RunError::Verification(e.to_string()))
                }
                Err(e @ TestCaseError::Usage(_)) => {
                    Err(RunError::Other(anyhow::Error::new(e)))
                }
            }
        }
        Command::Check { script } => {
            let source = read(&script)?;
            let handle = ScriptHost::default()
                .load(&source)
                .with_context(|| format!("failed to load {}", script.display()))?;

            for entry in [EntryPoint::FromExternal, EntryPoint::ToExternal] {
                let status = if handle.defines(entry) {
                    "defined"
                } else {
                    "missing"
                };
                println!("{entry}: {status}");
            }
            Ok(())
        }
    }
}

fn verify_case(
    function: &MappingFunction,
    direction: Direction,
    input: impl Into<mapcheck_protocol::StructuredMessage>,
    expected: impl Into<mapcheck_protocol::StructuredMessage>,
    config: ComparatorConfig,
) -> std::result::Result<(), TestCaseError> {
    let mut case = MappingTestCase::new();
    case.with_comparator(config);
    case.given(input)?
        .mapped_by(function, direction)?
        .is_equal_to(expected)?
        .verify()
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn parse_external(path: &Path) -> Result<ExternalMessage> {
    let tree: serde_json::Value = serde_json::from_str(&read(path)?)
        .with_context(|| format!("malformed JSON in {}", path.display()))?;
    ExternalMessage::from_json_value(tree)
        .with_context(|| format!("{} is not an external message", path.display()))
}

fn parse_protocol(path: &Path) -> Result<ProtocolMessage> {
    let tree: serde_json::Value = serde_json::from_str(&read(path)?)
        .with_context(|| format!("malformed JSON in {}", path.display()))?;
    ProtocolMessage::from_json_value(tree)
        .with_context(|| format!("{} is not a protocol envelope", path.display()))
}
