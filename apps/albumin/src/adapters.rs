//! # Process-Backed Collaborators
//!
//! - [`ExifTool`] reads capture-date tags with `exiftool -json`
//! - [`AnnexAddresser`] keys files with `git annex calckey`
//! - [`files_in`] expands directory arguments

use albumin_core::{AlbuminError, ContentAddresser, ContentKey, EvidenceSource, RawEvidence};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use walkdir::WalkDir;

/// Tags requested from exiftool, in group-qualified form.
pub const EXIF_TAGS: [&str; 2] = ["EXIF:DateTimeOriginal", "EXIF:CreateDate"];

/// Files per exiftool invocation.
const EXIF_BATCH: usize = 256;

/// Directories never descended into.
const SKIPPED_DIRS: [&str; 1] = [".git"];

/// Run `argv` plus `extra`, returning stdout.
///
/// A failed exit is tolerated when `lenient` is set and stdout is not empty;
/// exiftool exits non-zero when only some of its files were unreadable.
fn run_tool(argv: &[String], extra: &[String], lenient: bool) -> Result<String, AlbuminError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| AlbuminError::ConfigError("empty command".to_string()))?;

    let output = Command::new(program)
        .args(args)
        .args(extra)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| AlbuminError::IoError(format!("Cannot run {}: {}", program, e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
        tracing::debug!(program = %program, "{}", line);
    }

    if output.status.success() || (lenient && !stdout.trim().is_empty()) {
        Ok(stdout)
    } else {
        Err(AlbuminError::IoError(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )))
    }
}

// =============================================================================
// EXIFTOOL
// =============================================================================

/// Evidence source backed by `exiftool`.
#[derive(Debug, Clone)]
pub struct ExifTool {
    command: Vec<String>,
}

impl ExifTool {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl EvidenceSource for ExifTool {
    fn gather(&mut self, files: &[PathBuf]) -> Result<RawEvidence, AlbuminError> {
        let mut raw = RawEvidence::new();
        for batch in files.chunks(EXIF_BATCH) {
            let mut extra = vec!["-json".to_string(), "-G".to_string()];
            extra.extend(EXIF_TAGS.iter().map(|tag| format!("-{tag}")));
            extra.push("--".to_string());
            extra.extend(batch.iter().map(|f| f.to_string_lossy().into_owned()));

            let stdout = run_tool(&self.command, &extra, true)?;
            raw.extend(parse_exiftool_output(&stdout)?);
        }
        tracing::debug!(files = files.len(), tagged = raw.len(), "read exif tags");
        Ok(raw)
    }
}

/// Turn `exiftool -json -G` output into raw evidence.
///
/// Every string-valued tag other than `SourceFile` becomes a pair; files
/// without such tags are absent.
pub fn parse_exiftool_output(json: &str) -> Result<RawEvidence, AlbuminError> {
    if json.trim().is_empty() {
        return Ok(RawEvidence::new());
    }
    let entries: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(json)
        .map_err(|e| AlbuminError::IoError(format!("Unreadable exiftool output: {}", e)))?;

    let mut raw = RawEvidence::new();
    for entry in entries {
        let Some(file) = entry.get("SourceFile").and_then(|v| v.as_str()) else {
            continue;
        };
        let pairs: Vec<(String, String)> = entry
            .iter()
            .filter(|(tag, _)| tag.as_str() != "SourceFile")
            .filter_map(|(tag, value)| value.as_str().map(|v| (tag.clone(), v.to_string())))
            .collect();
        if !pairs.is_empty() {
            raw.insert(PathBuf::from(file), pairs);
        }
    }
    Ok(raw)
}

// =============================================================================
// GIT ANNEX
// =============================================================================

/// Content addresser backed by `git annex calckey`.
#[derive(Debug, Clone)]
pub struct AnnexAddresser {
    command: Vec<String>,
}

impl AnnexAddresser {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl ContentAddresser for AnnexAddresser {
    fn key_for(&mut self, file: &Path) -> Result<ContentKey, AlbuminError> {
        let extra = ["calckey".to_string(), file.to_string_lossy().into_owned()];
        let stdout = run_tool(&self.command, &extra, false)?;
        parse_calckey_output(&stdout).ok_or_else(|| {
            AlbuminError::IoError(format!("No content key for {}", file.display()))
        })
    }
}

/// The key printed by `calckey`, if any.
pub fn parse_calckey_output(stdout: &str) -> Option<ContentKey> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ContentKey::new)
}

// =============================================================================
// FILES
// =============================================================================

/// Expand `paths` into regular files, walking directories recursively.
///
/// Symlinks to files count as files. Symlinked directories are not followed,
/// so a link back up the tree cannot loop. The result is sorted and free of duplicates.
pub fn files_in(paths: &[PathBuf]) -> Result<Vec<PathBuf>, AlbuminError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk(path, &mut files)?;
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(AlbuminError::IoError(format!(
                "Path '{}' does not exist",
                path.display()
            )));
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), AlbuminError> {
    let entries = WalkDir::new(dir).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !entry
                .file_name()
                .to_str()
                .is_some_and(|n| SKIPPED_DIRS.contains(&n))
    });
    for entry in entries {
        let entry = entry
            .map_err(|e| AlbuminError::IoError(format!("Cannot walk '{}': {}", dir.display(), e)))?;
        // Annexed files are symlinks into the object store; linked directories are not entered.
        let file_type = entry.file_type();
        if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
            files.push(entry.into_path());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calckey_takes_first_line() {
        let key = parse_calckey_output("SHA256E-s3--abc.jpg\n").expect("key");
        assert_eq!(key.as_str(), "SHA256E-s3--abc.jpg");
        assert!(parse_calckey_output("\n").is_none());
    }

    #[test]
    fn empty_exiftool_output_is_empty() {
        assert!(parse_exiftool_output("").expect("parse").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_reports_stderr() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "echo nope >&2; exit 3".to_string()];
        let err = run_tool(&argv, &[], false).expect_err("failure");
        assert!(err.to_string().contains("nope"));
    }
}
