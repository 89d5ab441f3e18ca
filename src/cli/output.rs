//! Output writing for the extracted datasets
//!
//! The poster pipeline picks the file up by its timestamp-prefixed name.
//! User identifiers can be masked before anything leaves this process.

use std::fs;
use std::path::Path;

use chrono::Local;
use clap::ValueEnum;

use crate::domain::report::{ReportData, ReportRecord};

/// Column holding the user name or IP in both report tables.
const USER_FIELD: &str = "User__or_IP_";
/// Column holding raw byte counts in the top-users table.
const BANDWIDTH_FIELD: &str = "Bandwidth";

/// Output format for the written datasets
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON for the rendering pipeline (default)
    #[default]
    Json,
    /// Plain-text tables for a quick look
    Table,
}

/// Prefix a filename with a compact local timestamp, e.g.
/// `20260829T101500_report.json`.
pub fn timestamped_filename(name: &str) -> String {
    format!("{}_{}", Local::now().format("%Y%m%dT%H%M%S"), name)
}

/// Mask the middle of an identifier, keeping a 3-character prefix and a
/// 1-character suffix. Identifiers too short to keep both collapse to the
/// mask alone.
pub fn anonymize_text(text: &str) -> String {
    anonymize_with(text, 3, 1, 5)
}

pub fn anonymize_with(
    text: &str,
    prefix_len: usize,
    suffix_len: usize,
    asterisk_len: usize,
) -> String {
    let mask = "*".repeat(asterisk_len);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= prefix_len + suffix_len {
        return mask;
    }
    let prefix: String = chars[..prefix_len].iter().collect();
    let suffix: String = chars[chars.len() - suffix_len..].iter().collect();
    format!("{prefix}{mask}{suffix}")
}

/// Render a byte count human-readable in 1024 steps (bytes through TB).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["bytes", "kB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Writes the extracted datasets to disk.
pub struct OutputWriter {
    pub format: OutputFormat,
    pub anonymize: bool,
}

impl OutputWriter {
    pub fn write(&self, report: &ReportData, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render(report)?)?;
        Ok(())
    }

    pub fn render(&self, report: &ReportData) -> anyhow::Result<String> {
        let report = self.prepared(report);
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&report)?),
            OutputFormat::Table => Ok(Self::render_tables(&report)),
        }
    }

    fn prepared(&self, report: &ReportData) -> ReportData {
        let mut report = report.clone();
        if self.anonymize {
            for record in report
                .botnet_victims
                .iter_mut()
                .chain(report.top_users.iter_mut())
            {
                if let Some(user) = record.fields.get_mut(USER_FIELD) {
                    *user = anonymize_text(user);
                }
            }
        }
        report
    }

    fn render_tables(report: &ReportData) -> String {
        let mut out = String::new();
        Self::render_section(&mut out, "Botnet Victims", &report.botnet_victims);
        out.push('\n');
        Self::render_section(&mut out, "Top Users by Bandwidth", &report.top_users);
        out
    }

    fn render_section(out: &mut String, title: &str, records: &[ReportRecord]) {
        out.push_str(&format!("== {title} ==\n"));
        for record in records {
            out.push_str(&format!("{:>4}.", record.value));
            for (name, value) in &record.fields {
                if name == BANDWIDTH_FIELD {
                    if let Ok(bytes) = value.parse::<u64>() {
                        out.push_str(&format!("  {name}={}", format_bytes(bytes)));
                        continue;
                    }
                }
                out.push_str(&format!("  {name}={value}"));
            }
            out.push('\n');
        }
    }
}
