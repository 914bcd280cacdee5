use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

const COMMENT_START: char = '#';

/// Read one identifier per line, ignoring `#` comments and blank lines
pub fn read_identifiers<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut identifiers = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;
        let content = match line.find(COMMENT_START) {
            Some(comment_start) => &line[..comment_start],
            None => line.as_str(),
        };

        let content = content.trim();
        if !content.is_empty() {
            identifiers.push(content.to_string());
        }
    }

    Ok(identifiers)
}

pub fn read_identifiers_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open identifier file: {}", path.display()))?;

    read_identifiers(BufReader::new(file))
        .with_context(|| format!("Failed to parse identifier file: {}", path.display()))
}

// Helper to create a consistent spinner
pub fn create_spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}] {human_pos} rows ({per_sec})")?,
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}
