//! Scripted stand-ins for addr2line
//!
//! The resolver is `/bin/sh` and the target is a script: `sh -C -f -e <script>`
//! parses the resolver flags as shell options and runs the script, which then
//! plays the resolver's side of the protocol.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;
use symbridge::resolver::ResolverConfig;
use tempfile::TempDir;

/// Answers every address with `handler_<addr>` and `foo.c:42`
pub const ECHO_RESOLVER: &str = r#"
while read addr; do
    echo "handler_$addr"
    echo "foo.c:42"
done
"#;

/// Knows nothing about any address
pub const UNKNOWN_RESOLVER: &str = r#"
while read addr; do
    echo "??"
    echo "??:0"
done
"#;

/// Reads requests and never answers
pub const SILENT_RESOLVER: &str = r#"
while read addr; do
    :
done
"#;

/// Answers the first request with a single line, then exits
pub const TRUNCATED_RESOLVER: &str = r#"
read addr
echo "half_an_answer"
"#;

/// Answers the first request properly, then exits
pub const ONE_SHOT_RESOLVER: &str = r#"
read addr
echo "handler_$addr"
echo "foo.c:42"
"#;

pub struct FakeResolver {
    // Keeps the script alive for the test's duration
    _dir: TempDir,
    pub script: PathBuf,
}

impl FakeResolver {
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let script = dir.path().join("fake-addr2line.sh");
        std::fs::write(&script, body).expect("Failed to write fake resolver");
        Self { _dir: dir, script }
    }

    pub fn config(&self) -> ResolverConfig {
        ResolverConfig::new("/bin/sh", &self.script)
    }

    pub fn config_with_timeout(&self, timeout: Duration) -> ResolverConfig {
        self.config().with_read_timeout(Some(timeout))
    }
}
