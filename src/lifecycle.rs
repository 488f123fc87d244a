//! Program lifecycle: configure → parse/validate → resolve sink → execute →
//! finalize.
//!
//! A concrete program implements [`Program`]; every hook has a default, so
//! only the parts that differ need to be written. [`run`] drives one
//! invocation end to end.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use std::sync::Once;

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use color_eyre::Result;

use crate::constants;
use crate::sink::{ConsoleSink, Sink};

/// Parsed options plus positional arguments of one run.
#[derive(Debug, Clone)]
pub struct Invocation {
    matches: ArgMatches,
    args: Vec<String>,
}

impl Invocation {
    fn new(matches: ArgMatches) -> Self {
        let args = matches
            .get_many::<String>(constants::ARG_POSITIONAL)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        Self { matches, args }
    }

    /// All parsed options, keyed by argument id.
    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }

    /// Positional arguments in command-line order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Value of a boolean flag; `false` if `id` is unknown.
    pub fn flag(&self, id: &str) -> bool {
        self.matches
            .try_get_one::<bool>(id)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false)
    }

    /// Single string value of an option.
    pub fn value(&self, id: &str) -> Option<&str> {
        self.matches
            .try_get_one::<String>(id)
            .ok()
            .flatten()
            .map(String::as_str)
    }

    /// All string values of a repeatable option.
    pub fn values(&self, id: &str) -> Vec<&str> {
        self.matches
            .try_get_many::<String>(id)
            .ok()
            .flatten()
            .map(|values| values.map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// A semantically invalid command line, reported through clap's usage path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl UsageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::ValueValidation, message)
    }

    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for UsageError {}

/// Hooks of the program lifecycle.
pub trait Program {
    /// Command name shown in usage and help.
    fn name(&self) -> &str;

    fn usage(&self) -> Option<&str> {
        None
    }

    /// Register accepted flags.
    fn configure(&self, cmd: Command) -> Command {
        cmd
    }

    /// Reject command lines that parse but make no sense.
    ///
    /// # Errors
    ///
    /// A [`UsageError`] aborts the run before any output sink exists.
    fn validate(&self, _invocation: &Invocation) -> Result<(), UsageError> {
        Ok(())
    }

    /// Pick where output goes. `console` is the default sink.
    fn resolve_sink(&self, _invocation: &Invocation, console: ConsoleSink) -> Sink {
        Sink::Console(console)
    }

    /// Program logic. Returns whether the run succeeded.
    ///
    /// # Errors
    ///
    /// Any error is written into `out` and marks the run as failed.
    fn execute(&mut self, _invocation: &Invocation, _out: &mut Sink) -> Result<bool> {
        Ok(true)
    }

    /// Runs after [`Program::execute`], whatever its outcome. Owns the sink:
    /// dropping it unfinished discards its output.
    ///
    /// # Errors
    ///
    /// An error makes the run unsuccessful and is reported on stderr.
    fn finalize(&mut self, _invocation: &Invocation, _out: Sink, _failed: bool) -> Result<()> {
        Ok(())
    }
}

/// Build the clap command for `program`.
pub fn command<P: Program + ?Sized>(program: &P) -> Command {
    let mut cmd = Command::new(program.name().to_string()).arg(
        Arg::new(constants::ARG_POSITIONAL)
            .num_args(0..)
            .action(ArgAction::Append),
    );
    if let Some(usage) = program.usage() {
        cmd = cmd.override_usage(usage.to_string());
    }
    program.configure(cmd)
}

/// Parse `argv` (including the program name) and validate it.
///
/// # Errors
///
/// Returns a clap error for unparsable or invalid command lines, and for
/// `--help`.
pub fn parse<P, I, T>(program: &P, argv: I) -> Result<Invocation, clap::Error>
where
    P: Program + ?Sized,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut cmd = command(program);
    let invocation = Invocation::new(cmd.try_get_matches_from_mut(argv)?);
    program
        .validate(&invocation)
        .map_err(|err| cmd.error(err.kind, err.message))?;
    tracing::debug!(program = program.name(), args = ?invocation.args(), "parsed invocation");
    Ok(invocation)
}

/// Run one invocation with an explicit argv and console.
///
/// Returns `Ok(true)` only if execute returned `Ok(true)` and finalize
/// succeeded.
///
/// # Errors
///
/// Returns the usage error when parsing or validation fails; nothing else
/// has run in that case.
pub fn try_run<P, I, T>(program: &mut P, argv: I, console: ConsoleSink) -> Result<bool, clap::Error>
where
    P: Program + ?Sized,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let invocation = parse(program, argv)?;

    let mut sink = program.resolve_sink(&invocation, console);
    tracing::debug!(sink = ?sink, "resolved output sink");

    let succeeded = match execute_isolated(program, &invocation, &mut sink) {
        Ok(succeeded) => succeeded,
        Err(failure) => {
            tracing::warn!(error = %first_line(&failure), "execution failed");
            if let Err(e) = writeln!(sink, "{failure}") {
                tracing::error!(error = %e, "failed to write error into output");
            }
            false
        }
    };

    if let Err(err) = program.finalize(&invocation, sink, !succeeded) {
        tracing::error!(error = %err, "finalize failed");
        eprintln!("{}{err:?}", constants::MSG_FINALIZE_FAILED);
        return Ok(false);
    }

    Ok(succeeded)
}

/// Run `program` against the process arguments and stdout.
///
/// A usage error prints usage to stderr and exits the process.
pub fn run<P: Program + ?Sized>(program: &mut P) -> bool {
    match try_run(program, std::env::args_os(), ConsoleSink::stdout()) {
        Ok(succeeded) => succeeded,
        Err(usage) => usage.exit(),
    }
}

pub fn exit_code(succeeded: bool) -> ExitCode {
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

thread_local! {
    static CAPTURING_PANIC: Cell<bool> = const { Cell::new(false) };
    static CAPTURED_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Wrap the current panic hook once. While execute runs on this thread, a
/// panic's location and backtrace are stashed for the sink instead of being
/// printed; every other panic goes to the previous hook.
fn install_panic_capture() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !CAPTURING_PANIC.with(Cell::get) {
                previous(info);
                return;
            }
            let location = info
                .location()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string);
            let trace = format!(
                "at {location}\n\nStack backtrace:\n{}",
                Backtrace::force_capture()
            );
            CAPTURED_TRACE.with(|captured| *captured.borrow_mut() = Some(trace));
        }));
    });
}

/// Run execute, turning errors and panics into the text written to the sink.
fn execute_isolated<P: Program + ?Sized>(
    program: &mut P,
    invocation: &Invocation,
    sink: &mut Sink,
) -> Result<bool, String> {
    install_panic_capture();
    CAPTURING_PANIC.with(|capturing| capturing.set(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| program.execute(invocation, sink)));
    CAPTURING_PANIC.with(|capturing| capturing.set(false));

    match outcome {
        Ok(Ok(succeeded)) => Ok(succeeded),
        // Debug carries the cause chain and the captured backtrace.
        Ok(Err(err)) => Err(format!("{err:?}")),
        Err(payload) => {
            let trace = CAPTURED_TRACE
                .with(|captured| captured.borrow_mut().take())
                .unwrap_or_default();
            Err(format!(
                "{}{}\n{trace}",
                constants::MSG_EXECUTION_PANICKED,
                panic_message(payload.as_ref())
            ))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
