// crates/update-harness-cli/src/main.rs
// ============================================================================
// Module: Update Harness CLI Entry Point
// Description: Command dispatcher for run validation and scenario reconciliation.
// Purpose: Gate runs on read-only credentials and keep recorded scenarios free of secrets.
// Dependencies: clap, tokio, update-harness-access, update-harness-config, update-harness-core
// ============================================================================

//! ## Overview
//! The `update-harness` binary wraps a dependency-update job with three steps:
//! a pre-flight credential scope check, secret expansion that records
//! placeholder credentials while materializing live ones, and post-run
//! ignore-condition synthesis. Exit codes: 0 on success, 1 on failure, and 3
//! when a credential grants write access.
//!
//! Security posture: run parameters are untrusted input; resolved secret
//! values are never printed or written to recorded scenarios.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use update_harness_access::AccessChecker;
use update_harness_access::AccessError;
use update_harness_access::AccessReport;
use update_harness_access::ProbeContext;
use update_harness_access::cancel_pair;
use update_harness_config::HarnessConfig;
use update_harness_core::ExpansionReport;
use update_harness_core::HarnessAuditEvent;
use update_harness_core::HarnessAuditSink;
use update_harness_core::MAX_SCENARIO_BYTES;
use update_harness_core::ProcessEnv;
use update_harness_core::RunParams;
use update_harness_core::Scenario;
use update_harness_core::expand_secrets;
use update_harness_core::generate_ignore_conditions;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum run-parameter file size in bytes.
const MAX_PARAMS_BYTES: usize = 1024 * 1024;
/// Exit code reported when a credential grants write access.
const WRITE_ACCESS_EXIT: u8 = 3;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "update-harness", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file (overrides `UPDATE_HARNESS_CONFIG`).
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Probe every credential and fail if any grants write access.
    CheckAccess(AccessArgs),
    /// Check access, expand secrets, and write the recorded scenario.
    Prepare(PrepareCommand),
    /// Append ignore conditions derived from a scenario's pull requests.
    IgnoreConditions(IgnoreConditionsCommand),
}

/// Arguments shared by commands that probe credentials.
#[derive(Args, Debug)]
struct AccessArgs {
    /// Run parameters file (YAML or JSON).
    #[arg(long, value_name = "FILE")]
    params: PathBuf,
    /// Overall deadline for the access check in milliseconds.
    #[arg(long, value_name = "MS")]
    deadline_ms: Option<u64>,
}

/// Arguments for the `prepare` command.
#[derive(Args, Debug)]
struct PrepareCommand {
    /// Access check arguments.
    #[command(flatten)]
    access: AccessArgs,
    /// Destination for the recorded scenario.
    #[arg(long, value_name = "FILE")]
    record: PathBuf,
}

/// Arguments for the `ignore-conditions` command.
#[derive(Args, Debug)]
struct IgnoreConditionsCommand {
    /// Scenario file to update.
    #[arg(long, value_name = "FILE")]
    scenario: PathBuf,
    /// Output identifier recorded as each condition's source.
    #[arg(long, value_name = "ID")]
    output_id: String,
    /// Rewrite the scenario file instead of printing it.
    #[arg(long)]
    in_place: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = HarnessConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let audit = config
        .audit
        .build_sink()
        .map_err(|err| CliError::new(format!("failed to open audit log: {err}")))?;

    match cli.command {
        Commands::CheckAccess(command) => command_check_access(&config, audit, &command).await,
        Commands::Prepare(command) => command_prepare(&config, audit, &command).await,
        Commands::IgnoreConditions(command) => command_ignore_conditions(audit.as_ref(), &command),
    }
}

// ============================================================================
// SECTION: Access Commands
// ============================================================================

/// Executes the `check-access` command.
async fn command_check_access(
    config: &HarnessConfig,
    audit: Arc<dyn HarnessAuditSink>,
    command: &AccessArgs,
) -> CliResult<ExitCode> {
    let mut params = read_params(&command.params)?;
    materialize(config, audit.as_ref(), &mut params)?;
    match run_access_check(config, audit, command, &params).await {
        Ok(report) => {
            write_access_summary(&report)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => access_failure(&err),
    }
}

/// Executes the `prepare` command.
async fn command_prepare(
    config: &HarnessConfig,
    audit: Arc<dyn HarnessAuditSink>,
    command: &PrepareCommand,
) -> CliResult<ExitCode> {
    let mut params = read_params(&command.access.params)?;
    let (recorder, report) = materialize(config, audit.as_ref(), &mut params)?;
    match run_access_check(config, audit, &command.access, &params).await {
        Ok(access) => write_access_summary(&access)?,
        Err(err) => return access_failure(&err),
    }

    let yaml = recorder
        .to_yaml_string()
        .map_err(|err| CliError::new(format!("failed to encode recorded scenario: {err}")))?;
    write_file(&command.record, yaml.as_bytes())?;
    write_stdout(&format!(
        "recorded {} credential(s) to {}; materialized {} value(s), {} unset",
        recorder.input.credentials.len(),
        command.record.display(),
        report.expanded.len(),
        report.missing.len()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Expands secret placeholders into the live credential set.
///
/// Returns the recorder holding the credentials as written.
fn materialize(
    config: &HarnessConfig,
    audit: &dyn HarnessAuditSink,
    params: &mut RunParams,
) -> CliResult<(Scenario, ExpansionReport)> {
    let mut recorder = Scenario::default();
    recorder.input.job = params.job.clone().unwrap_or_default();
    let report = expand_secrets(&mut recorder, params, &ProcessEnv, config.secrets.missing)
        .map_err(|err| CliError::new(format!("secret expansion failed: {err}")))?;
    audit.record(&HarnessAuditEvent::secret_expansion(&report));
    for missing in &report.missing {
        write_stderr(&format!(
            "warning: credential {} key {} references unset variable {}",
            missing.credential_index, missing.key, missing.variable
        ))?;
    }
    for unexpanded in &report.unexpanded {
        write_stderr(&format!(
            "warning: credential {} key {} starts with '$' but names no variable; used as written",
            unexpanded.credential_index, unexpanded.key
        ))?;
    }
    Ok((recorder, report))
}

/// Builds a checker from config and probes the run's credentials.
///
/// Ctrl-C cancels outstanding probes.
async fn run_access_check(
    config: &HarnessConfig,
    audit: Arc<dyn HarnessAuditSink>,
    command: &AccessArgs,
    params: &RunParams,
) -> Result<AccessReport, AccessError> {
    let checker = AccessChecker::new(config.access.clone())?.with_audit(audit);
    let (handle, token) = cancel_pair();
    let mut ctx = ProbeContext::new(token);
    if let Some(deadline_ms) = command.deadline_ms {
        ctx = ctx.with_timeout(Duration::from_millis(deadline_ms));
    }
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    let result = checker.check_access(&ctx, params.job.as_ref(), &params.credentials).await;
    interrupt.abort();
    result
}

/// Maps an access error to an exit code, reporting write access distinctly.
fn access_failure(err: &AccessError) -> CliResult<ExitCode> {
    match err {
        AccessError::WriteAccess {
            ..
        } => {
            write_stderr(&format!("write access rejected: {err}"))?;
            Ok(ExitCode::from(WRITE_ACCESS_EXIT))
        }
        _ => Err(CliError::new(format!("access check failed: {err}"))),
    }
}

/// Prints a one-line summary of a passed access check.
fn write_access_summary(report: &AccessReport) -> CliResult<()> {
    write_stdout(&format!(
        "access check passed: {} credential(s) read-only, {} without secret, {} excluded by type, endpoint {}",
        report.probed.len(),
        report.skipped.len(),
        report.excluded.len(),
        report.endpoint
    ))
}

// ============================================================================
// SECTION: Ignore Conditions Command
// ============================================================================

/// Executes the `ignore-conditions` command.
fn command_ignore_conditions(
    audit: &dyn HarnessAuditSink,
    command: &IgnoreConditionsCommand,
) -> CliResult<ExitCode> {
    let text = read_text(&command.scenario, MAX_SCENARIO_BYTES, "scenario")?;
    let mut scenario = Scenario::from_yaml_str(&text)
        .map_err(|err| CliError::new(format!("invalid scenario: {err}")))?;
    let params = RunParams::new(command.output_id.clone(), Vec::new());
    let report = generate_ignore_conditions(&params, &mut scenario)
        .map_err(|err| CliError::new(format!("invalid scenario: {err}")))?;
    audit.record(&HarnessAuditEvent::ignore_synthesis(&params.output, &report));
    for skipped in report.missing_versions() {
        write_stderr(&format!(
            "warning: output {} dependency {} has no version; no ignore condition added",
            skipped.output_index, skipped.name
        ))?;
    }

    let yaml = scenario
        .to_yaml_string()
        .map_err(|err| CliError::new(format!("failed to encode scenario: {err}")))?;
    if command.in_place {
        write_file(&command.scenario, yaml.as_bytes())?;
        write_stdout(&format!(
            "appended {} ignore condition(s) to {}",
            report.appended,
            command.scenario.display()
        ))?;
    } else {
        write_stdout(yaml.trim_end())?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads a bounded UTF-8 text file.
fn read_text(path: &Path, max_bytes: usize, kind: &str) -> CliResult<String> {
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {kind} {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{kind} {} is too large ({size} bytes, limit {limit})",
            path.display()
        )),
    })?;
    String::from_utf8(bytes)
        .map_err(|_| CliError::new(format!("{kind} {} must be utf-8", path.display())))
}

/// Reads run parameters; `.json` files are parsed as JSON, anything else as YAML.
fn read_params(path: &Path) -> CliResult<RunParams> {
    let text = read_text(path, MAX_PARAMS_BYTES, "params")?;
    parse_params(path, &text)
}

/// Parses run parameters according to the file extension.
fn parse_params(path: &Path, text: &str) -> CliResult<RunParams> {
    let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        serde_json::from_str(text).map_err(|err| err.to_string())
    } else {
        serde_yaml::from_str(text).map_err(|err| err.to_string())
    };
    parsed.map_err(|err| CliError::new(format!("invalid params {}: {err}", path.display())))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a file, replacing any existing content.
fn write_file(path: &Path, bytes: &[u8]) -> CliResult<()> {
    fs::write(path, bytes)
        .map_err(|err| CliError::new(format!("failed to write {}: {err}", path.display())))
}

/// Writes a line to stdout.
fn write_stdout(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stderr.
fn write_stderr(message: &str) -> CliResult<()> {
    write_stderr_line(message).map_err(|err| CliError::new(output_error("stderr", &err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
