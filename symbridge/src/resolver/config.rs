//! Resolver configuration
//!
//! Which executable to launch, which binary it resolves against, and the
//! flags that shape its two-line answers.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolver looked up on `PATH` when none is given
pub const DEFAULT_RESOLVER: &str = "addr2line";

/// Settings for spawning one resolver process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Resolver executable (`addr2line`, `arm-none-eabi-addr2line`, ...)
    pub resolver_path: PathBuf,
    /// Binary whose addresses are resolved (`-e <target>`)
    pub target_path: PathBuf,
    /// Pass `-C` so the resolver demangles C++ symbols
    pub demangle: bool,
    /// Pass `-f` so each answer starts with a function-name line.
    ///
    /// Two-line framing depends on this. Without it the resolver answers
    /// with a single line per address and every query reads one answer ahead.
    pub function_names: bool,
    /// Upper bound on waiting for each answer line; `None` blocks forever
    pub read_timeout: Option<Duration>,
}

impl ResolverConfig {
    pub fn new(resolver_path: impl Into<PathBuf>, target_path: impl Into<PathBuf>) -> Self {
        Self {
            resolver_path: resolver_path.into(),
            target_path: target_path.into(),
            demangle: true,
            function_names: true,
            read_timeout: None,
        }
    }

    /// Config using [`DEFAULT_RESOLVER`] for the given target
    pub fn for_target(target_path: impl Into<PathBuf>) -> Self {
        Self::new(DEFAULT_RESOLVER, target_path)
    }

    #[must_use]
    pub fn with_demangle(mut self, demangle: bool) -> Self {
        self.demangle = demangle;
        self
    }

    #[must_use]
    pub fn with_function_names(mut self, function_names: bool) -> Self {
        self.function_names = function_names;
        self
    }

    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Arguments passed to the resolver, in order: `-C`, `-f`, `-e <target>`
    #[must_use]
    pub fn command_args(&self) -> Vec<OsString> {
        let mut args = Vec::with_capacity(4);
        if self.demangle {
            args.push(OsString::from("-C"));
        }
        if self.function_names {
            args.push(OsString::from("-f"));
        }
        args.push(OsString::from("-e"));
        args.push(self.target_path.clone().into_os_string());
        args
    }

    #[must_use]
    pub fn resolver(&self) -> &Path {
        &self.resolver_path
    }

    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target_path
    }
}
