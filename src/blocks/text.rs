use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BlockError;

/// Finds the line index closing the block that opens at 1-based line `start`.
///
/// Depth moves by at most one per line: +1 if the line contains any `{`,
/// -1 if it contains any `}`. The first line after which depth is back to
/// zero is returned, so a line without braces ends the block on the spot.
/// If depth never returns to zero the result is `lines.len()`.
pub fn find_closing_bracket(start: usize, lines: &[&str]) -> usize {
    if start == 0 {
        return lines.len();
    }

    let mut depth: i64 = 0;
    for (i, line) in lines.iter().enumerate().skip(start - 1) {
        if line.contains('{') {
            depth += 1;
        }
        if line.contains('}') {
            depth -= 1;
        }
        if depth == 0 {
            return i;
        }
    }

    lines.len()
}

/// Reads `file` and returns the verbatim text of the block declared at
/// 1-based line `start`.
///
/// An unreadable file is treated as empty and yields an empty string.
pub fn block_text(file: &Path, start: usize) -> Result<String, BlockError> {
    let source = read_source(file);
    slice_block(&source, file, start)
}

/// File contents read during one extraction, keyed by path.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: HashMap<PathBuf, String>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as [`block_text`], reading each file at most once.
    pub fn block_text(&mut self, file: &Path, start: usize) -> Result<String, BlockError> {
        let source = self
            .files
            .entry(file.to_path_buf())
            .or_insert_with(|| read_source(file));
        slice_block(source, file, start)
    }

    pub fn cached_files(&self) -> usize {
        self.files.len()
    }
}

fn read_source(file: &Path) -> String {
    match fs::read(file) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!("Could not read {}: {}", file.display(), e);
            String::new()
        }
    }
}

fn slice_block(source: &str, file: &Path, start: usize) -> Result<String, BlockError> {
    if start == 0 {
        return Err(BlockError::InvalidStart {
            file: file.to_path_buf(),
            line: start,
        });
    }

    let lines: Vec<&str> = source.split('\n').collect();
    let end = find_closing_bracket(start, &lines).min(lines.len() - 1);

    // The slice begins one line above the header; a header on line 1 is
    // clamped so the slice begins at the first line instead of before it.
    let mut startpos = start - 1;
    if startpos == 0 {
        startpos = 1;
    }
    let first = startpos - 1;

    if first > end {
        return Ok(String::new());
    }

    Ok(lines[first..=end].join("\n"))
}
