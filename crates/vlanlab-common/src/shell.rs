//! Kernel command construction and execution.
//!
//! Commands are built as typed argument vectors ([`ShellCommand`]) and run
//! without an intermediate shell, so interface and namespace names can never
//! be interpreted as shell syntax. [`shellquote`] is only used to render a
//! command for logs and dry-run listings.
//!
//! # Example
//!
//! ```ignore
//! use vlanlab_common::shell::{CommandRunner, ShellCommand, SystemRunner};
//!
//! let cmd = ShellCommand::ip_netns("h1").args(["link", "set", "lo", "up"]);
//! SystemRunner::new().run_checked(&cmd).await?;
//! ```

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use crate::error::{CommandError, CommandResult};

/// Path to the `ip` command (iproute2).
pub const IP_CMD: &str = "/sbin/ip";

/// Path to the Open vSwitch control utility.
pub const OVS_VSCTL_CMD: &str = "/usr/bin/ovs-vsctl";

/// Path to the `sysctl` command.
pub const SYSCTL_CMD: &str = "/sbin/sysctl";

/// Path to `sudo`, used when the orchestrator runs unprivileged.
pub const SUDO_CMD: &str = "/usr/bin/sudo";

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Arguments made only of these characters are rendered unquoted.
static PLAIN_ARG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_./:=,+@%-]+$").expect("Invalid regex pattern"));

/// Quotes a string for display in a shell command line.
///
/// Wraps the string in double quotes and escapes `$`, `` ` ``, `"`, `\`
/// and newline.
///
/// # Example
///
/// ```
/// use vlanlab_common::shell::shellquote;
///
/// assert_eq!(shellquote("simple"), "\"simple\"");
/// assert_eq!(shellquote("with$var"), "\"with\\$var\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

fn render_arg(arg: &str) -> String {
    if PLAIN_ARG_RE.is_match(arg) {
        arg.to_string()
    } else {
        shellquote(arg)
    }
}

/// A program invocation with its argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
}

impl ShellCommand {
    /// Starts a command for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// `ip ...` in the root namespace.
    pub fn ip() -> Self {
        Self::new(IP_CMD)
    }

    /// `ip -n <netns> ...`
    pub fn ip_netns(netns: &str) -> Self {
        Self::ip().arg("-n").arg(netns)
    }

    /// `ip ...` in `netns` when given, otherwise in the root namespace.
    pub fn ip_in(netns: Option<&str>) -> Self {
        match netns {
            Some(ns) => Self::ip_netns(ns),
            None => Self::ip(),
        }
    }

    /// `ovs-vsctl ...`
    pub fn ovs_vsctl() -> Self {
        Self::new(OVS_VSCTL_CMD)
    }

    /// `ip netns exec <netns> <program> ...`
    pub fn netns_exec(netns: &str, program: &str) -> Self {
        Self::ip().args(["netns", "exec", netns, program])
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The program path.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument vector (without the program).
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Returns true if any argument equals `arg`.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Rejects empty arguments and arguments containing whitespace or
    /// control characters.
    pub fn validate(&self) -> CommandResult<()> {
        for arg in &self.args {
            let reason = if arg.is_empty() {
                Some("empty argument")
            } else if arg.chars().any(|c| c.is_whitespace() || c.is_control()) {
                Some("whitespace or control character")
            } else {
                None
            };

            if let Some(reason) = reason {
                return Err(CommandError::InvalidArgument {
                    program: self.program.clone(),
                    argument: arg.clone(),
                    reason: reason.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_arg(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", render_arg(arg))?;
        }
        Ok(())
    }
}

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// The stdout output.
    pub stdout: String,
    /// The stderr output.
    pub stderr: String,
}

impl ExecResult {
    /// A successful result with no output.
    pub fn ok() -> Self {
        Self {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Executes [`ShellCommand`]s against the host.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command and returns its result, whatever the exit code.
    async fn run(&self, cmd: &ShellCommand) -> CommandResult<ExecResult>;

    /// Runs the command and turns a non-zero exit into
    /// [`CommandError::Failed`]. Returns stdout on success.
    async fn run_checked(&self, cmd: &ShellCommand) -> CommandResult<String> {
        let result = self.run(cmd).await?;
        if result.success() {
            Ok(result.stdout)
        } else {
            Err(CommandError::Failed {
                command: cmd.to_string(),
                exit_code: result.exit_code,
                output: result.combined_output(),
            })
        }
    }
}

#[async_trait]
impl<R: CommandRunner + ?Sized> CommandRunner for Arc<R> {
    async fn run(&self, cmd: &ShellCommand) -> CommandResult<ExecResult> {
        (**self).run(cmd).await
    }
}

/// Runs commands as child processes, optionally through `sudo`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    sudo: bool,
}

impl SystemRunner {
    /// Creates a runner that executes commands directly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes every command with `sudo` when `sudo` is true.
    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, cmd: &ShellCommand) -> CommandResult<ExecResult> {
        cmd.validate()?;
        tracing::debug!(command = %cmd, sudo = self.sudo, "Executing command");

        let mut process = if self.sudo {
            let mut process = Command::new(SUDO_CMD);
            process.arg(cmd.program());
            process
        } else {
            Command::new(cmd.program())
        };

        let output = process
            .args(cmd.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CommandError::Spawn {
                command: cmd.to_string(),
                source: e,
            })?;

        let exit_code = output.status.code().unwrap_or(-1);
        let result = ExecResult {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        if result.success() {
            tracing::trace!(command = %cmd, "Command succeeded");
        } else {
            tracing::warn!(
                command = %cmd,
                exit_code = exit_code,
                stderr = %result.stderr,
                "Command failed"
            );
        }

        Ok(result)
    }
}

type Matcher = Box<dyn Fn(&ShellCommand) -> bool + Send + Sync>;

struct FailureRule {
    matcher: Matcher,
    exit_code: i32,
    stderr: String,
    remaining: Option<usize>,
}

/// Records commands instead of executing them.
///
/// Every validated command is appended to an in-memory log and reported as
/// successful unless an injected failure rule matches it. Used for dry runs
/// and to test command sequencing without touching the kernel.
#[derive(Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<ShellCommand>>,
    rules: Mutex<Vec<FailureRule>>,
}

impl RecordingRunner {
    /// Creates a runner that accepts every command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every command matching `matcher` with exit code 1 and `stderr`.
    pub fn fail_when<F>(self, matcher: F, stderr: impl Into<String>) -> Self
    where
        F: Fn(&ShellCommand) -> bool + Send + Sync + 'static,
    {
        self.push_rule(Box::new(matcher), stderr.into(), None)
    }

    /// Fails only the first command matching `matcher`.
    pub fn fail_once_when<F>(self, matcher: F, stderr: impl Into<String>) -> Self
    where
        F: Fn(&ShellCommand) -> bool + Send + Sync + 'static,
    {
        self.push_rule(Box::new(matcher), stderr.into(), Some(1))
    }

    fn push_rule(self, matcher: Matcher, stderr: String, remaining: Option<usize>) -> Self {
        self.rules.lock().push(FailureRule {
            matcher,
            exit_code: 1,
            stderr,
            remaining,
        });
        self
    }

    /// All commands seen so far, in execution order.
    pub fn commands(&self) -> Vec<ShellCommand> {
        self.commands.lock().clone()
    }

    /// All commands seen so far, rendered as command lines.
    pub fn rendered(&self) -> Vec<String> {
        self.commands.lock().iter().map(|c| c.to_string()).collect()
    }

    /// Forgets recorded commands (failure rules are kept).
    pub fn clear(&self) {
        self.commands.lock().clear();
    }
}

impl fmt::Debug for RecordingRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingRunner")
            .field("commands", &self.commands.lock().len())
            .field("rules", &self.rules.lock().len())
            .finish()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, cmd: &ShellCommand) -> CommandResult<ExecResult> {
        cmd.validate()?;
        tracing::debug!(command = %cmd, "Recording command");
        self.commands.lock().push(cmd.clone());

        let mut rules = self.rules.lock();
        let rule = rules
            .iter_mut()
            .find(|rule| rule.remaining != Some(0) && (rule.matcher)(cmd));

        match rule {
            Some(rule) => {
                if let Some(remaining) = rule.remaining.as_mut() {
                    *remaining -= 1;
                }
                Ok(ExecResult {
                    exit_code: rule.exit_code,
                    stdout: String::new(),
                    stderr: rule.stderr.clone(),
                })
            }
            None => Ok(ExecResult::ok()),
        }
    }
}
