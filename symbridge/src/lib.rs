//! # symbridge - addr2line over a pipe
//!
//! symbridge launches an external address-to-symbol resolver (an
//! `addr2line`-compatible executable) as a long-lived subprocess, writes it
//! one address at a time and parses each two-line answer into a
//! [`ResultRecord`](resolver::ResultRecord).
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────────┐  hex address + '\n'  ┌─────────────────────────────┐
//! │ ResolverHandle │ ───────────────────▶ │ addr2line -C -f -e <target> │
//! │  (this crate)  │ ◀─────────────────── │        (subprocess)         │
//! └───────┬────────┘  method \n file:line └─────────────────────────────┘
//!         │
//!         ▼
//!  ResultRecord { library, method, source_file, line }
//! ```
//!
//! ## Module Structure
//!
//! - [`resolver`]: configuration, wire framing, records and the process handle
//! - [`preflight`]: checks run before spawning (resolver on `PATH`, target
//!   binary present, debug info available)
//! - [`trace`]: decoding of `-finstrument-functions` ring-buffer dumps into
//!   events whose `pc`/`lr` are then resolved
//! - [`cli`]: command-line arguments for the `symbridge` binary
//! - [`domain`]: error taxonomy
//!
//! ## Typical Usage
//!
//! ```bash
//! # Resolve two addresses in a firmware image
//! symbridge --resolver arm-none-eabi-addr2line --target build/fw.elf 0x080002c4 80002d0
//!
//! # Stream addresses from another tool, one JSON record per line
//! cut -d' ' -f1 samples.txt | symbridge --target ./app --json
//! ```

pub mod cli;
pub mod domain;
pub mod preflight;
pub mod resolver;
pub mod trace;
