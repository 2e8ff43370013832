// src/spawn/builder.rs

use std::collections::BTreeMap;
use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{ProcessError, Result};
use crate::process::ChildProcess;
use crate::spawn::pipes::PipeSet;
use crate::sys::{FileAction, Posix, RealPosix, SpawnAttributes, SpawnRequest};

/// Launch configuration plus the spawn protocol.
///
/// The command and the environment are copied on construction and on every
/// mutator call, so later changes to the caller's containers never leak into
/// a builder. [`environment`](Self::environment) is the one exception: it
/// hands out the builder's own map for in-place editing.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    command: Vec<OsString>,
    env: BTreeMap<OsString, OsString>,
    directory: Option<PathBuf>,
    process_group: bool,
    posix: Arc<dyn Posix>,
}

fn copy_command<I, S>(command: I) -> Result<Vec<OsString>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let command: Vec<OsString> = command
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect();
    if command.is_empty() {
        return Err(ProcessError::InvalidArgument(
            "command must contain at least the program name".to_string(),
        ));
    }
    Ok(command)
}

fn to_cstring(value: &OsStr, what: &str) -> Result<CString> {
    CString::new(value.as_bytes()).map_err(|_| {
        ProcessError::InvalidArgument(format!(
            "{what} contains a NUL byte: {}",
            value.to_string_lossy()
        ))
    })
}

fn env_entry(key: &OsStr, value: &OsStr) -> Result<CString> {
    let key_bytes = key.as_bytes();
    if key_bytes.is_empty() || key_bytes.contains(&b'=') {
        return Err(ProcessError::InvalidArgument(format!(
            "malformed environment variable name: {:?}",
            key.to_string_lossy()
        )));
    }
    let mut entry = Vec::with_capacity(key_bytes.len() + 1 + value.len());
    entry.extend_from_slice(key_bytes);
    entry.push(b'=');
    entry.extend_from_slice(value.as_bytes());
    CString::new(entry).map_err(|_| {
        ProcessError::InvalidArgument(format!(
            "environment variable {} contains a NUL byte",
            key.to_string_lossy()
        ))
    })
}

impl ProcessBuilder {
    /// Builder for `command` (program followed by its arguments) with a
    /// snapshot of the current environment. Fails with `InvalidArgument` if
    /// `command` is empty.
    pub fn new<I, S>(command: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self::with_posix(command, Arc::new(RealPosix))
    }

    /// Like [`new`](Self::new) but spawning through `posix`.
    pub fn with_posix<I, S>(command: I, posix: Arc<dyn Posix>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Ok(ProcessBuilder {
            command: copy_command(command)?,
            env: std::env::vars_os().collect(),
            directory: None,
            process_group: true,
            posix,
        })
    }

    /// A copy of the command.
    pub fn command(&self) -> Vec<OsString> {
        self.command.clone()
    }

    pub fn set_command<I, S>(&mut self, command: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command = copy_command(command)?;
        Ok(self)
    }

    /// The builder's live environment map, initialised from the current
    /// process environment. Edits apply to the next [`start`](Self::start);
    /// the map lives as long as the builder.
    pub fn environment(&mut self) -> &mut BTreeMap<OsString, OsString> {
        &mut self.env
    }

    pub fn get_env(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.env.get(key.as_ref()).map(OsString::as_os_str)
    }

    pub fn env(&mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> &mut Self {
        self.env
            .insert(key.as_ref().to_os_string(), value.as_ref().to_os_string());
        self
    }

    pub fn envs<I, K, V>(&mut self, vars: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        for (key, value) in vars {
            self.env(key, value);
        }
        self
    }

    pub fn env_remove(&mut self, key: impl AsRef<OsStr>) -> &mut Self {
        self.env.remove(key.as_ref());
        self
    }

    pub fn env_clear(&mut self) -> &mut Self {
        self.env.clear();
        self
    }

    /// Directory the child will start in: the configured one if set
    /// (no system call), otherwise the current working directory.
    pub fn directory(&self) -> Result<PathBuf> {
        match &self.directory {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.posix.current_dir()?),
        }
    }

    /// Start children in `dir`. Applied inside the spawn call; the parent's
    /// own working directory is never touched.
    pub fn set_directory(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.directory = Some(dir.into());
        self
    }

    pub fn clear_directory(&mut self) -> &mut Self {
        self.directory = None;
        self
    }

    /// Whether the child leads a new process group (default `true`), which
    /// is what makes [`ChildProcess::kill_process_group`] reach its
    /// descendants.
    pub fn process_group(&mut self, enabled: bool) -> &mut Self {
        self.process_group = enabled;
        self
    }

    /// Spawn the child.
    ///
    /// Creates the stdin, stdout and stderr pipes, spawns with `posix_spawnp`
    /// while remapping the child's ends onto descriptors 0, 1 and 2, closes
    /// those ends in the parent and wraps the remaining three in a
    /// [`ChildProcess`]. Nothing here waits for the child.
    ///
    /// On any error every descriptor created so far is closed.
    pub fn start(&self) -> Result<ChildProcess> {
        let program = self.command[0].to_string_lossy().into_owned();
        let argv = self
            .command
            .iter()
            .map(|arg| to_cstring(arg, "argument"))
            .collect::<Result<Vec<_>>>()?;
        let chdir = self
            .directory
            .as_ref()
            .map(|dir| to_cstring(dir.as_os_str(), "working directory"))
            .transpose()?;

        let envp = self
            .env
            .iter()
            .map(|(key, value)| env_entry(key, value))
            .collect::<Result<Vec<_>>>()?;

        let pipes = PipeSet::create(self.posix.as_ref()).map_err(|err| {
            warn!(program = %program, error = %err, "could not create stdio pipes");
            ProcessError::ResourceExhausted(err)
        })?;

        let mut actions = pipes.file_actions();
        actions.extend(chdir.map(FileAction::Chdir));

        let request = SpawnRequest {
            program: &argv[0],
            argv: &argv,
            envp: &envp,
            actions: &actions,
            attributes: SpawnAttributes {
                process_group: self.process_group,
                reset_signals: true,
            },
        };
        debug!(program = %program, ?actions, "spawning");

        let pid = match self.posix.spawnp(&request) {
            Ok(pid) => pid,
            Err(source) => {
                warn!(program = %program, error = %source, "spawn failed");
                drop(pipes);
                return Err(ProcessError::SpawnFailed { program, source });
            }
        };

        let ends = pipes.into_parent_ends();
        info!(pid, program = %program, "spawned child process");
        Ok(ChildProcess::new(
            Arc::clone(&self.posix),
            pid,
            self.process_group,
            ends,
        ))
    }
}
