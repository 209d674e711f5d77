//! Structured parsing of driver compile logs.
//!
//! GLSL drivers report compile failures as free text, but most of them agree
//! on a `ERROR: <column>:<line>: <message>` line shape. We pull the line
//! number and message out of every line that matches so callers can point at
//! the offending source line instead of dumping the whole log.

/// One line-addressed entry pulled out of a shader compile log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
}

/// Extracts line-addressed diagnostics from a raw compile log. Lines that do
/// not match the common `ERROR: c:l: msg` shape are skipped.
pub fn parse(log: &str) -> Vec<Diagnostic> {
    log.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<Diagnostic> {
    let rest = line.trim().strip_prefix("ERROR:")?.trim_start();

    let mut parts = rest.splitn(3, ':');
    let _column = parts.next()?.trim().parse::<u32>().ok()?;
    let row = parts.next()?.trim().parse::<u32>().ok()?;
    let message = parts.next()?.trim();

    Some(Diagnostic {
        line: row,
        message: message.to_string(),
    })
}
