//! Process supervision for a single service instance
//!
//! `ServiceProcess` owns at most one child process for its whole life. It is
//! started once, killed once, and never reused. Children are spawned with
//! kill-on-drop so a handle that goes away without `kill` still takes its
//! process down with it.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};

use shared::{instance_debug, instance_info, instance_warn};

use crate::environment::ProcessEnvironment;
use crate::error::{StarterError, StarterResult};

/// Debug-agent settings for a launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugSettings {
    pub port: u16,
    /// Block the service at startup until a debugger attaches
    pub suspend: bool,
}

impl DebugSettings {
    /// The `-agentlib` directive for these settings
    pub fn agent_directive(&self) -> String {
        format!(
            "-agentlib:jdwp=transport=dt_socket,server=y,suspend={},address={}",
            if self.suspend { "y" } else { "n" },
            self.port
        )
    }
}

/// Fully resolved command used to launch an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub artifact: PathBuf,
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// `<runtime> [agent] -jar <artifact>`
    pub fn for_artifact(runtime: &Path, artifact: &Path, debug: Option<&DebugSettings>) -> Self {
        let mut args = Vec::with_capacity(3);
        if let Some(debug) = debug {
            args.push(debug.agent_directive());
        }
        args.push("-jar".to_string());
        args.push(artifact.display().to_string());

        Self {
            program: runtime.to_path_buf(),
            artifact: artifact.to_path_buf(),
            args,
        }
    }

    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

enum ProcessState {
    NotStarted,
    FailedToStart,
    Running(Child),
    Exited(i32),
}

/// Opaque handle on the one OS process of a service instance
pub struct ServiceProcess {
    application: String,
    kill_grace: Duration,
    state: ProcessState,
}

impl ServiceProcess {
    pub fn new(application: impl Into<String>, kill_grace: Duration) -> Self {
        Self {
            application: application.into(),
            kill_grace,
            state: ProcessState::NotStarted,
        }
    }

    /// Spawn the child with `environment` overlaid on the inherited one and
    /// the parent's stdio
    ///
    /// Returns once the OS process exists, not once the service is ready. Must
    /// be called from within a tokio runtime.
    pub fn start(&mut self, command: &LaunchCommand, environment: &ProcessEnvironment) -> StarterResult<u32> {
        self.ensure_unused()?;

        let spawned = if command.artifact.is_file() {
            Command::new(&command.program)
                .args(&command.args)
                .envs(environment.properties())
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .kill_on_drop(true)
                .spawn()
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("artifact {} does not exist", command.artifact.display()),
            ))
        };

        let child = match spawned {
            Ok(child) => child,
            Err(source) => {
                self.state = ProcessState::FailedToStart;
                return Err(StarterError::ProcessStart {
                    application: self.application.clone(),
                    artifact: command.artifact.clone(),
                    source,
                });
            }
        };

        let pid = child.id().unwrap_or(0);
        instance_info!(self.application, "🚀 Spawned (PID: {}): {}", pid, command.command_line());
        self.state = ProcessState::Running(child);
        Ok(pid)
    }

    /// Fail with `AlreadyStarted` once any launch attempt has been made
    pub fn ensure_unused(&self) -> StarterResult<()> {
        match self.state {
            ProcessState::NotStarted => Ok(()),
            _ => Err(StarterError::AlreadyStarted {
                application: self.application.clone(),
            }),
        }
    }

    /// Record a launch attempt that failed before anything was spawned
    pub fn mark_failed(&mut self) {
        if matches!(self.state, ProcessState::NotStarted) {
            self.state = ProcessState::FailedToStart;
        }
    }

    /// OS process id while the child is running
    pub fn id(&self) -> Option<u32> {
        match &self.state {
            ProcessState::Running(child) => child.id(),
            _ => None,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self.state, ProcessState::Running(_) | ProcessState::Exited(_))
    }

    /// Check whether the child is still alive, recording its exit if not
    pub fn is_running(&mut self) -> bool {
        let ProcessState::Running(child) = &mut self.state else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                self.state = ProcessState::Exited(exit_code(status));
                false
            }
            Err(_) => false,
        }
    }

    /// Ask the child to terminate and wait for it to exit
    ///
    /// Returns the child's exit code. A child that already exited on its own
    /// reports its natural exit code without being signalled. A child that
    /// outlives the kill grace period is killed forcibly.
    ///
    /// # Errors
    /// - `NotStarted` if no process was ever started; nothing is touched.
    /// - `Interrupted` if waiting for the exit failed. Termination has already
    ///   been requested at that point.
    pub async fn kill(&mut self) -> StarterResult<i32> {
        let child = match &mut self.state {
            ProcessState::Running(child) => child,
            ProcessState::Exited(code) => return Ok(*code),
            ProcessState::NotStarted | ProcessState::FailedToStart => {
                return Err(StarterError::NotStarted {
                    application: self.application.clone(),
                })
            }
        };

        if let Ok(Some(status)) = child.try_wait() {
            let code = exit_code(status);
            instance_debug!(self.application, "Process had already exited with code {}", code);
            self.state = ProcessState::Exited(code);
            return Ok(code);
        }

        if let Err(e) = request_termination(child) {
            instance_warn!(self.application, "⚠️ Termination request failed: {}", e);
        }

        let status = match tokio::time::timeout(self.kill_grace, child.wait()).await {
            Ok(waited) => waited.map_err(|e| self.interrupted(e))?,
            Err(_) => {
                instance_warn!(
                    self.application,
                    "🔨 Still running after {:?}, force killing",
                    self.kill_grace
                );
                if let Err(e) = child.start_kill() {
                    instance_warn!(self.application, "⚠️ Force kill failed: {}", e);
                }
                child.wait().await.map_err(|e| self.interrupted(e))?
            }
        };

        let code = exit_code(status);
        instance_info!(self.application, "🛑 Process exited with code {}", code);
        self.state = ProcessState::Exited(code);
        Ok(code)
    }

    fn interrupted(&self, error: std::io::Error) -> StarterError {
        StarterError::Interrupted {
            application: self.application.clone(),
            message: error.to_string(),
        }
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}

/// Exit code as a shell would report it; death by signal `n` is `128 + n`
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
