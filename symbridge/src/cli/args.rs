//! CLI argument definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::resolver::{ResolverConfig, DEFAULT_RESOLVER};

#[derive(Parser, Debug)]
#[command(
    name = "symbridge",
    about = "Resolve addresses to function, file and line through addr2line",
    after_help = "\
EXAMPLES:
    symbridge --target fw.elf 0x080002c4                 Resolve one address
    symbridge --resolver arm-none-eabi-addr2line \\
              --target fw.elf 80002c4 80002d0            Cross toolchain resolver
    cat addrs.txt | symbridge --target ./app --json      Addresses from stdin
    symbridge --target fw.elf --trace trace.bin          Resolve a trace dump"
)]
pub struct Args {
    /// Addresses to resolve, in hex (read from stdin, one per line, if omitted)
    #[arg(value_name = "ADDRESS")]
    pub addresses: Vec<String>,

    /// Raw function-trace ring buffer dump; resolves each event's pc and lr
    #[arg(long, value_name = "DUMP", conflicts_with = "addresses")]
    pub trace: Option<PathBuf>,

    /// Binary whose addresses are resolved
    #[arg(short, long, env = "SYMBRIDGE_TARGET")]
    pub target: PathBuf,

    /// addr2line-compatible resolver executable
    #[arg(short, long, env = "SYMBRIDGE_RESOLVER", default_value = DEFAULT_RESOLVER)]
    pub resolver: PathBuf,

    /// Library name reported in results (defaults to the target's file name)
    #[arg(short, long)]
    pub library: Option<String>,

    /// Give up on an answer after this many milliseconds (0 = wait forever)
    #[arg(long, value_name = "MS", default_value = "0")]
    pub timeout_ms: u64,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, conflicts_with = "format")]
    pub json: bool,

    /// Do not pass -C to the resolver
    #[arg(long)]
    pub no_demangle: bool,

    /// Suppress pre-flight warnings
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One `Lib/Meth/Src/Line` block per address
    Text,
    /// One JSON object per line
    Json,
}

impl Args {
    /// Library identifier for results
    #[must_use]
    pub fn library_name(&self) -> String {
        if let Some(ref library) = self.library {
            return library.clone();
        }
        self.target.file_name().map_or_else(
            || self.target.to_string_lossy().into_owned(),
            |name| name.to_string_lossy().into_owned(),
        )
    }

    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }

    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Resolver configuration, using `resolver` in place of the raw argument
    #[must_use]
    pub fn resolver_config(&self, resolver: PathBuf) -> ResolverConfig {
        ResolverConfig::new(resolver, self.target.clone())
            .with_demangle(!self.no_demangle)
            .with_read_timeout(self.read_timeout())
    }
}
