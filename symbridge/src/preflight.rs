//! Pre-flight checks for symbridge
//!
//! Validates the resolver and the target binary before a resolver process is
//! spawned. Provides clear, actionable error messages when something is off.

use anyhow::{bail, Context, Result};
use log::debug;
use object::{Object, ObjectSection};
use std::path::{Path, PathBuf};

/// Debug sections found in the target binary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugInfo {
    pub has_debug_info: bool,
    pub has_debug_line: bool,
    pub has_symtab: bool,
}

impl DebugInfo {
    /// Neither DWARF nor a symbol table: every answer will be `??`
    #[must_use]
    pub fn is_stripped(&self) -> bool {
        !self.has_debug_info && !self.has_symtab
    }
}

/// Run all pre-flight checks, returning the resolver's full path
///
/// # Errors
/// Returns an error if the resolver cannot be found or the target is missing
pub fn run_preflight_checks(resolver: &Path, target: &Path, quiet: bool) -> Result<PathBuf> {
    let resolver = locate_resolver(resolver)?;
    check_target_exists(target)?;
    if !quiet {
        warn_about_debug_info(target);
    }
    Ok(resolver)
}

/// Find the resolver executable
///
/// A bare name (`addr2line`) is searched on `PATH`; anything with a path
/// separator must exist as given.
///
/// # Errors
/// Returns an error if the resolver cannot be found
pub fn locate_resolver(resolver: &Path) -> Result<PathBuf> {
    if resolver.components().count() == 1 && !resolver.is_absolute() {
        return which::which(resolver).with_context(|| {
            format!(
                "Resolver '{}' not found on PATH.\n\n\
                 Install binutils or pass --resolver /path/to/addr2line",
                resolver.display()
            )
        });
    }
    if !resolver.is_file() {
        bail!(
            "Resolver not found: {}\n\n\
             --resolver must point to an addr2line-compatible executable.",
            resolver.display()
        );
    }
    Ok(resolver.to_path_buf())
}

/// Check that the target binary exists and is a regular file
///
/// # Errors
/// Returns an error if the path is missing or is not a file
pub fn check_target_exists(target: &Path) -> Result<()> {
    if !target.exists() {
        bail!(
            "Binary not found: {}\n\n\
             Make sure the path is correct and the binary exists.",
            target.display()
        );
    }
    if !target.is_file() {
        bail!(
            "Not a file: {}\n\n\
             --target must point to an executable file, not a directory.",
            target.display()
        );
    }
    Ok(())
}

/// Look for DWARF and symbol table sections in the target
///
/// # Errors
/// Returns an error if the file cannot be read or is not an object file
pub fn inspect_debug_info(target: &Path) -> Result<DebugInfo> {
    let file_data = std::fs::read(target)
        .with_context(|| format!("Failed to read binary: {}", target.display()))?;
    let obj = object::File::parse(&*file_data)
        .with_context(|| format!("Failed to parse object file: {}", target.display()))?;

    let non_empty = |name: &str| obj.section_by_name(name).is_some_and(|s| s.size() > 0);

    Ok(DebugInfo {
        has_debug_info: non_empty(".debug_info"),
        has_debug_line: non_empty(".debug_line"),
        has_symtab: non_empty(".symtab"),
    })
}

fn warn_about_debug_info(target: &Path) {
    let info = match inspect_debug_info(target) {
        Ok(info) => info,
        Err(e) => {
            // Not an object file we understand, the resolver will have its say
            debug!("{e:#}");
            eprintln!(
                "warning: {} is not an object file, addresses may not resolve",
                target.display()
            );
            return;
        }
    };

    if info.is_stripped() {
        eprintln!("warning: binary stripped, every address will resolve to ??");
    } else if !info.has_debug_line {
        eprintln!("warning: no DWARF line table, source locations will be ??:0");
    }
}
