//! Resolver process handle
//!
//! Owns one resolver subprocess and the pipe pair used to talk to it.
//! Requests and answers are strictly alternating, so every query holds the
//! pipe lock from the moment it writes until it has read both answer lines.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::Duration;

use super::config::ResolverConfig;
use super::protocol;
use super::record::ResultRecord;
use crate::domain::ResolverError;

/// Observable lifecycle of a [`ResolverHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running,
    Stopped,
}

enum Lifecycle {
    NotStarted,
    Running(Child),
    Stopped,
}

/// Where answer lines come from
enum AnswerReader {
    /// Read straight from the pipe; blocks until the resolver answers
    Blocking(BufReader<ChildStdout>),
    /// Lines forwarded by a reader thread, each awaited for at most `timeout`
    Deadline { lines: Receiver<io::Result<String>>, timeout: Duration },
}

impl AnswerReader {
    fn read_response(&mut self) -> Result<Option<(String, String)>, ResolverError> {
        match self {
            Self::Blocking(reader) => Ok(protocol::read_response(reader)?),
            Self::Deadline { lines, timeout } => {
                let Some(method) = Self::next_line(lines, *timeout)? else {
                    return Ok(None);
                };
                let Some(source) = Self::next_line(lines, *timeout)? else {
                    return Ok(None);
                };
                Ok(Some((method, source)))
            }
        }
    }

    fn next_line(
        lines: &Receiver<io::Result<String>>,
        timeout: Duration,
    ) -> Result<Option<String>, ResolverError> {
        match lines.recv_timeout(timeout) {
            Ok(Ok(line)) => Ok(Some(line)),
            Ok(Err(e)) => Err(e.into()),
            Err(RecvTimeoutError::Timeout) => Err(ResolverError::Timeout(timeout)),
            // Reader thread hit end of stream
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    /// Forward every line of `stdout` over a channel until the pipe closes
    fn spawn_deadline(stdout: ChildStdout, timeout: Duration) -> io::Result<Self> {
        let (tx, rx) = unbounded();
        thread::Builder::new().name("symbridge-reader".to_string()).spawn(move || {
            let mut reader = BufReader::new(stdout);
            loop {
                match protocol::read_line(&mut reader) {
                    Ok(Some(line)) => {
                        if tx.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        })?;
        Ok(Self::Deadline { lines: rx, timeout })
    }
}

/// The pipe pair of a running resolver
struct Channel {
    writer: BufWriter<ChildStdin>,
    reader: AnswerReader,
}

impl Channel {
    fn exchange(&mut self, addr: u64) -> Result<(String, String), ResolverError> {
        protocol::write_request(&mut self.writer, addr)?;
        self.reader.read_response()?.ok_or(ResolverError::EndOfStream)
    }
}

/// Handle on one running resolver process
///
/// Created with [`ResolverHandle::create`] (or [`ResolverHandle::spawn`] for
/// the failure reason); a returned handle is always running. Queries through
/// a shared handle are serialized. [`ResolverHandle::stop`] may be called
/// from any thread, and a query blocked on the resolver returns `None` once
/// the process is gone.
pub struct ResolverHandle {
    library: String,
    resolver: PathBuf,
    lifecycle: Mutex<Lifecycle>,
    channel: Mutex<Option<Channel>>,
}

impl ResolverHandle {
    /// Start a resolver for `library`, logging and discarding any failure
    pub fn create(library: impl Into<String>, config: &ResolverConfig) -> Option<Self> {
        let library = library.into();
        match Self::spawn(library.clone(), config) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(
                    "Error while trying to start {} process for library {library}: {e}",
                    config.resolver_path.display()
                );
                None
            }
        }
    }

    /// Start a resolver for `library`
    ///
    /// # Errors
    /// Returns [`ResolverError::EmptyLibrary`] for an empty identifier,
    /// [`ResolverError::Spawn`] if the resolver cannot be launched, and
    /// [`ResolverError::StreamUnavailable`] if its pipes cannot be captured.
    /// A partially started process is killed before returning.
    pub fn spawn(library: impl Into<String>, config: &ResolverConfig) -> Result<Self, ResolverError> {
        let library = library.into();
        if library.is_empty() {
            return Err(ResolverError::EmptyLibrary);
        }

        let handle = Self {
            library,
            resolver: config.resolver_path.clone(),
            lifecycle: Mutex::new(Lifecycle::NotStarted),
            channel: Mutex::new(None),
        };
        handle.start(config)?;
        Ok(handle)
    }

    fn start(&self, config: &ResolverConfig) -> Result<(), ResolverError> {
        let mut child = Command::new(&config.resolver_path)
            .args(config.command_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ResolverError::Spawn {
                resolver: config.resolver_path.clone(),
                source,
            })?;

        let Some(stdin) = child.stdin.take() else {
            terminate(&mut child);
            return Err(ResolverError::StreamUnavailable("stdin"));
        };
        let Some(stdout) = child.stdout.take() else {
            terminate(&mut child);
            return Err(ResolverError::StreamUnavailable("stdout"));
        };

        let reader = match config.read_timeout {
            None => AnswerReader::Blocking(BufReader::new(stdout)),
            Some(timeout) => match AnswerReader::spawn_deadline(stdout, timeout) {
                Ok(reader) => reader,
                Err(e) => {
                    terminate(&mut child);
                    return Err(e.into());
                }
            },
        };

        info!(
            "Started {} (pid {}) for {} against {}",
            self.resolver.display(),
            child.id(),
            self.library,
            config.target_path.display()
        );

        *self.channel.lock() = Some(Channel { writer: BufWriter::new(stdin), reader });
        *self.lifecycle.lock() = Lifecycle::Running(child);
        Ok(())
    }

    /// Resolve one address, logging failures
    ///
    /// Returns `None` once the handle is stopped, without touching the pipes.
    pub fn query(&self, addr: u64) -> Option<ResultRecord> {
        match self.try_query(addr) {
            Ok(record) => Some(record),
            Err(ResolverError::NotRunning) => None,
            Err(e) => {
                warn!(
                    "Error while trying to get information for addr: {} in library: {}: {e}",
                    protocol::format_address(addr),
                    self.library
                );
                None
            }
        }
    }

    /// Resolve one address
    ///
    /// # Errors
    /// - [`ResolverError::NotRunning`] if the handle was stopped, including
    ///   by a concurrent [`stop`](Self::stop) during this query
    /// - [`ResolverError::Io`] / [`ResolverError::EndOfStream`] if the
    ///   exchange fails; the handle keeps running
    /// - [`ResolverError::Timeout`] if a read deadline is configured and
    ///   exceeded; the handle is stopped because answers can no longer be
    ///   matched to requests
    pub fn try_query(&self, addr: u64) -> Result<ResultRecord, ResolverError> {
        if !self.is_running() {
            return Err(ResolverError::NotRunning);
        }

        let mut guard = self.channel.lock();
        if !self.is_running() {
            *guard = None;
            return Err(ResolverError::NotRunning);
        }
        let channel = guard.as_mut().ok_or(ResolverError::NotRunning)?;

        debug!("Resolving 0x{addr:x} in {}", self.library);
        match channel.exchange(addr) {
            Ok((method, source)) => Ok(ResultRecord::new(self.library.clone(), method, &source)),
            Err(e @ ResolverError::Timeout(_)) => {
                self.stop();
                *guard = None;
                Err(e)
            }
            Err(_) if !self.is_running() => {
                *guard = None;
                Err(ResolverError::NotRunning)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve addresses one after another, in order
    pub fn resolve_all<I>(&self, addrs: I) -> Vec<Option<ResultRecord>>
    where
        I: IntoIterator<Item = u64>,
    {
        addrs.into_iter().map(|addr| self.query(addr)).collect()
    }

    /// Kill the resolver; safe to call repeatedly and from any thread
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if let Lifecycle::Running(child) = &mut *lifecycle {
            info!("Stopping {} (pid {}) for {}", self.resolver.display(), child.id(), self.library);
            terminate(child);
        }
        *lifecycle = Lifecycle::Stopped;
        drop(lifecycle);

        // An in-flight query owns the pipes and releases them itself
        if let Some(mut channel) = self.channel.try_lock() {
            *channel = None;
        }
    }

    #[must_use]
    pub fn state(&self) -> ProcessState {
        match &*self.lifecycle.lock() {
            Lifecycle::NotStarted => ProcessState::NotStarted,
            Lifecycle::Running(_) => ProcessState::Running,
            Lifecycle::Stopped => ProcessState::Stopped,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ProcessState::Running
    }

    /// Process id of the resolver while it runs
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        match &*self.lifecycle.lock() {
            Lifecycle::Running(child) => Some(child.id()),
            _ => None,
        }
    }

    #[must_use]
    pub fn library(&self) -> &str {
        &self.library
    }
}

impl Drop for ResolverHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ResolverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverHandle")
            .field("library", &self.library)
            .field("resolver", &self.resolver)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Kill and reap a child; it may already have exited
fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("kill of pid {} failed: {e}", child.id());
    }
    if let Err(e) = child.wait() {
        debug!("wait on pid {} failed: {e}", child.id());
    }
}
