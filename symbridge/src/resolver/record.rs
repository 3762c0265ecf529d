//! Parsed answer for one resolved address

use rustc_demangle::try_demangle;
use serde::Serialize;
use std::fmt;

/// Line number reported when the resolver gave none
pub const LINE_UNKNOWN: i64 = -1;

/// What the resolver prints for an address it knows nothing about
const UNKNOWN_MARKER: &str = "??";

/// Library, method, source file and line for one address
///
/// Built once from the resolver's two answer lines and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    library: String,
    method: String,
    source_file: String,
    line: Option<u32>,
}

impl ResultRecord {
    /// Build a record from the method line and the `file:line` line
    ///
    /// `source` is split on its last colon when everything after it is
    /// digits and something precedes it. Any other shape keeps the whole
    /// string as the file and leaves the line unknown.
    pub fn new(library: impl Into<String>, method: impl Into<String>, source: &str) -> Self {
        let (source_file, line) = split_source_line(source);
        Self { library: library.into(), method: method.into(), source_file, line }
    }

    #[must_use]
    pub fn library(&self) -> &str {
        &self.library
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    #[must_use]
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// Line number, or [`LINE_UNKNOWN`] when absent
    #[must_use]
    pub fn line_number(&self) -> i64 {
        self.line.map_or(LINE_UNKNOWN, i64::from)
    }

    /// The resolver had neither a symbol nor a source location
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.method == UNKNOWN_MARKER && self.source_file.starts_with(UNKNOWN_MARKER)
    }

    /// Method name with Rust mangling removed (hash suffix dropped)
    ///
    /// `-C` only understands the Itanium C++ scheme, so Rust v0 symbols and
    /// legacy hashes come back untouched. Anything that is not a Rust symbol
    /// is returned as-is.
    #[must_use]
    pub fn demangled_method(&self) -> String {
        match try_demangle(&self.method) {
            Ok(demangled) => format!("{demangled:#}"),
            Err(_) => self.method.clone(),
        }
    }

    /// Multi-line block for terminal output
    #[must_use]
    pub fn format(&self) -> String {
        format!(
            "Lib:  {}\nMeth: {}\nSrc:  {}\nLine: {}",
            self.library,
            self.method,
            self.source_file,
            self.line_number()
        )
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.method, self.source_file)?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        Ok(())
    }
}

fn split_source_line(source: &str) -> (String, Option<u32>) {
    if let Some((file, digits)) = source.rsplit_once(':') {
        if !file.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            // Lines past i32::MAX are unknown but still split the file
            let line = digits.parse::<i32>().ok().and_then(|n| u32::try_from(n).ok());
            return (file.to_string(), line);
        }
    }
    (source.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_and_line_split() {
        let record = ResultRecord::new("lib-hej.so", "main", "path:123");
        assert_eq!(record.library(), "lib-hej.so");
        assert_eq!(record.method(), "main");
        assert_eq!(record.source_file(), "path");
        assert_eq!(record.line(), Some(123));
        assert_eq!(record.line_number(), 123);
    }

    #[test]
    fn test_splits_on_last_colon() {
        let record = ResultRecord::new("fw", "isr", "C:/work/src/irq.c:88");
        assert_eq!(record.source_file(), "C:/work/src/irq.c");
        assert_eq!(record.line(), Some(88));
    }

    #[test]
    fn test_unmatched_shapes_keep_whole_string() {
        for source in [
            "foo.c",
            "foo.c:",
            ":42",
            "foo.c:12a",
            "foo.c:42 (discriminator 3)",
            "??:?",
            "",
        ] {
            let record = ResultRecord::new("fw", "f", source);
            assert_eq!(record.source_file(), source, "input {source:?}");
            assert_eq!(record.line(), None, "input {source:?}");
            assert_eq!(record.line_number(), LINE_UNKNOWN);
        }
    }

    #[test]
    fn test_zero_line_from_resolver() {
        let record = ResultRecord::new("fw", "??", "??:0");
        assert_eq!(record.source_file(), "??");
        assert_eq!(record.line(), Some(0));
        assert!(record.is_unknown());
    }

    #[test]
    fn test_overflowing_line_is_unknown() {
        let record = ResultRecord::new("fw", "f", "big.c:99999999999");
        assert_eq!(record.source_file(), "big.c");
        assert_eq!(record.line_number(), LINE_UNKNOWN);

        let record = ResultRecord::new("fw", "f", "f.c:3000000000");
        assert_eq!(record.source_file(), "f.c");
        assert_eq!(record.line(), None);
    }

    #[test]
    fn test_largest_line_number() {
        let record = ResultRecord::new("fw", "f", "f.c:2147483647");
        assert_eq!(record.line_number(), 2_147_483_647);
    }

    #[test]
    fn test_display() {
        assert_eq!(ResultRecord::new("fw", "main", "main.c:7").to_string(), "main at main.c:7");
        assert_eq!(ResultRecord::new("fw", "main", "main.c").to_string(), "main at main.c");
    }

    #[test]
    fn test_format_block() {
        let record = ResultRecord::new("lib-hej.so", "nanoprof_init", "nanoprof.c:42");
        assert_eq!(
            record.format(),
            "Lib:  lib-hej.so\nMeth: nanoprof_init\nSrc:  nanoprof.c\nLine: 42"
        );
    }

    #[test]
    fn test_demangled_method() {
        let record = ResultRecord::new("app", "_ZN4core3fmt5write17h0123456789abcdefE", "fmt.rs:1");
        assert_eq!(record.demangled_method(), "core::fmt::write");

        let plain = ResultRecord::new("app", "HAL_Init", "hal.c:1");
        assert_eq!(plain.demangled_method(), "HAL_Init");
    }

    #[test]
    fn test_serializes_missing_line_as_null() {
        let record = ResultRecord::new("fw", "f", "f.c");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source_file"], "f.c");
        assert!(json["line"].is_null());
    }
}
