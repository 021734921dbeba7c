use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of one external command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal or by the timeout.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs shell-style command strings. The build validator only talks to this trait.
pub trait CommandRunner {
    /// An `Err` means the command could not be launched or waited on at all; a nonzero
    /// exit or an expired timeout is reported through [`CommandOutput`].
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> Result<CommandOutput>;

    /// Starts `program` directly, without a shell and without arguments.
    fn run_program(&mut self, program: &Path, timeout: Option<Duration>) -> Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> Result<CommandOutput> {
        (**self).run(command, timeout)
    }

    fn run_program(&mut self, program: &Path, timeout: Option<Duration>) -> Result<CommandOutput> {
        (**self).run_program(program, timeout)
    }
}

/// Runs commands through the platform shell from a fixed working directory.
pub struct ShellRunner {
    current_dir: PathBuf,
}

impl ShellRunner {
    pub fn new(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: current_dir.into(),
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> Result<CommandOutput> {
        let (program, flag) = shell();
        let mut cmd = Command::new(program);
        cmd.arg(flag).arg(command);
        self.execute(cmd, command, timeout)
    }

    fn run_program(&mut self, program: &Path, timeout: Option<Duration>) -> Result<CommandOutput> {
        let label = program.display().to_string();
        self.execute(Command::new(program), &label, timeout)
    }
}

impl ShellRunner {
    fn execute(&self, mut cmd: Command, label: &str, timeout: Option<Duration>) -> Result<CommandOutput> {
        // Output goes to unlinked temp files so a chatty child never blocks on a full pipe.
        let mut stdout = tempfile::tempfile().context("failed to create stdout capture file")?;
        let mut stderr = tempfile::tempfile().context("failed to create stderr capture file")?;

        cmd.current_dir(&self.current_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.try_clone()?))
            .stderr(Stdio::from(stderr.try_clone()?));
        // A timed command leads its own process group so the whole tree can be killed.
        // Untimed build steps stay in the foreground group and still receive Ctrl-C.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if timeout.is_some() {
                cmd.process_group(0);
            }
        }

        tracing::debug!(command = label, dir = %self.current_dir.display(), ?timeout, "spawning");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{label}`"))?;

        let status = match timeout {
            Some(limit) => wait_with_timeout(&mut child, limit)
                .with_context(|| format!("failed to wait for `{label}`"))?,
            None => Some(
                child
                    .wait()
                    .with_context(|| format!("failed to wait for `{label}`"))?,
            ),
        };

        Ok(CommandOutput {
            exit_code: status.and_then(|status| status.code()),
            stdout: read_capture(&mut stdout)?,
            stderr: read_capture(&mut stderr)?,
            timed_out: status.is_none(),
        })
    }
}

fn shell() -> (OsString, &'static str) {
    if cfg!(windows) {
        (
            std::env::var_os("COMSPEC").unwrap_or_else(|| OsString::from("cmd.exe")),
            "/C",
        )
    } else {
        (OsString::from("sh"), "-c")
    }
}

/// Returns `None` when the child outlived `limit`; the child is killed and reaped.
fn wait_with_timeout(child: &mut Child, limit: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= limit {
            tracing::debug!(pid = child.id(), ?limit, "timeout expired, killing process group");
            terminate(child);
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    // The child was spawned as group leader, so its pid is the group id.
    if let Err(err) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
        tracing::debug!(%err, "killpg failed, killing the child alone");
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}

fn read_capture(file: &mut File) -> Result<String> {
    file.seek(SeekFrom::Start(0))
        .context("failed to rewind capture file")?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .context("failed to read captured output")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
