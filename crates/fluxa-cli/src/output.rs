use fluxa_core::validate::ValidationError;
use serde::Serialize;

/// Findings listed before the rest are summarised as a count.
pub const MAX_LISTED_FINDINGS: usize = 5;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// One line per finding, capped at [`MAX_LISTED_FINDINGS`].
pub fn finding_lines(findings: &[ValidationError]) -> Vec<String> {
    let mut lines: Vec<String> = findings
        .iter()
        .take(MAX_LISTED_FINDINGS)
        .map(|f| format!("  [{}] {}", f.severity(), f.message))
        .collect();
    if findings.len() > MAX_LISTED_FINDINGS {
        lines.push(format!(
            "  ... and {} more",
            findings.len() - MAX_LISTED_FINDINGS
        ));
    }
    lines
}
