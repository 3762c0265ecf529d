//! # Address Resolution Through an External Resolver
//!
//! This module turns raw instruction addresses into function names, source
//! files and line numbers by driving an `addr2line`-compatible executable
//! (GNU binutils `addr2line`, `arm-none-eabi-addr2line`, `llvm-addr2line`)
//! over its stdin/stdout.
//!
//! ## Why a Subprocess
//!
//! Cross toolchains ship a resolver that already understands their target's
//! debug info. Launching it once per binary and feeding it addresses keeps
//! the per-lookup cost to one pipe round trip, with no DWARF parsing on our
//! side.
//!
//! ## Protocol
//!
//! The resolver is started as:
//!
//! ```text
//! <resolver> -C -f -e <target>
//! ```
//!
//! - `-C`: demangle C++ symbol names
//! - `-f`: print the function name before the location
//! - `-e`: the binary to resolve against
//!
//! Each request is one line of lowercase hex, each answer is two lines:
//!
//! ```text
//! > 80002c4
//! < nanoprof_init
//! < /src/nanoprof.c:42
//! ```
//!
//! Unknown addresses come back as `??` and `??:0` (or `??:?`).
//!
//! ## Lifecycle
//!
//! ```text
//! NotStarted ──spawn──▶ Running ──stop / timeout / drop──▶ Stopped
//! ```
//!
//! Queries are only answered in `Running`; in `Stopped` they return `None`
//! without touching the process.
//!
//! ## Module Structure
//!
//! - **`config`**: resolver and target paths, flags, optional read deadline
//! - **`protocol`**: request/answer line framing over any `Read`/`Write`
//! - **`record`**: the parsed `(library, method, file, line)` answer
//! - **`handle`**: process ownership, query serialization, stop
//!
//! ## Example
//!
//! ```rust,ignore
//! let config = ResolverConfig::new("arm-none-eabi-addr2line", "build/firmware.elf");
//! let handle = ResolverHandle::create("firmware.elf", &config).expect("resolver started");
//!
//! if let Some(record) = handle.query(0x0800_02c4) {
//!     println!("{}", record.format());
//! }
//! handle.stop();
//! ```
//!
//! ## Limitations
//!
//! - **Blocking by default**: without a read timeout, a resolver that never
//!   answers blocks the querying thread until another thread calls `stop`
//! - **One request in flight**: the protocol carries no request ids
//! - **Requires `-f`**: framing assumes the function-name line is present

pub mod config;
pub mod handle;
pub mod protocol;
pub mod record;

pub use config::{ResolverConfig, DEFAULT_RESOLVER};
pub use handle::{ProcessState, ResolverHandle};
pub use protocol::{format_address, parse_address};
pub use record::{ResultRecord, LINE_UNKNOWN};
