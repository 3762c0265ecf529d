//! Line framing for the resolver's stdin/stdout
//!
//! One request is a line of lowercase hex digits. One response is exactly two
//! lines: the function name, then `file:line` (or a bare file name).

use std::io::{self, BufRead, Write};

use crate::domain::ResolverError;

/// Hex text of an address as the resolver expects it: lowercase, no `0x`
#[must_use]
pub fn format_address(addr: u64) -> String {
    format!("{addr:x}")
}

/// Write one request and flush it to the resolver
///
/// # Errors
/// Returns the underlying I/O error if the write or flush fails
pub fn write_request<W: Write>(writer: &mut W, addr: u64) -> io::Result<()> {
    writer.write_all(format_address(addr).as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Read one line without its terminator; `None` at end of stream
///
/// # Errors
/// Returns the underlying I/O error if the read fails
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Some(line))
}

/// Read the (method, source) pair answering one request
///
/// Returns `None` if the stream ends before both lines arrive.
///
/// # Errors
/// Returns the underlying I/O error if a read fails
pub fn read_response<R: BufRead>(reader: &mut R) -> io::Result<Option<(String, String)>> {
    let Some(method) = read_line(reader)? else {
        return Ok(None);
    };
    let Some(source) = read_line(reader)? else {
        return Ok(None);
    };
    Ok(Some((method, source)))
}

/// Parse a user-supplied address: hex, with or without a `0x` prefix
///
/// # Errors
/// Returns [`ResolverError::InvalidAddress`] if the text is not a 64-bit hex number
pub fn parse_address(text: &str) -> Result<u64, ResolverError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    // from_str_radix alone would also take a leading sign
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ResolverError::InvalidAddress(text.to_string()));
    }
    u64::from_str_radix(digits, 16).map_err(|_| ResolverError::InvalidAddress(text.to_string()))
}
