//! Parsing of `brew list --versions` output
//!
//! brew sometimes emits informational text on stdout rather than stderr, so
//! known noise lines are filtered out before any line is treated as a
//! package record.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::types::PackageRecord;

static NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(==>.*|Tapped \d+ formulae.*)$").unwrap());

static NAME_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\S+)\s+(.+)").unwrap());

fn surviving_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines().filter(|line| !NOISE.is_match(line))
}

/// `<name><whitespace><rest>`, with `rest` taken verbatim as the version
/// field. brew reports multiple installed versions space-separated on one
/// line, so the rest is never split further.
fn name_version_split(line: &str) -> Option<PackageRecord> {
    match NAME_VERSION.captures(line) {
        Some(caps) => Some(PackageRecord {
            name: caps[1].to_string(),
            version: caps[2].to_string(),
        }),
        None => {
            warn!("Could not match {line}");
            None
        }
    }
}

/// Parse the full package listing. Unparseable lines are dropped with a
/// warning, never an error.
pub fn parse_list_output(raw: &str) -> Vec<PackageRecord> {
    surviving_lines(raw).filter_map(name_version_split).collect()
}

/// Parse the listing of a single-package query. More than one surviving
/// line is ambiguous; the first one wins, in output order.
pub fn parse_single_match(raw: &str, name: &str) -> Option<PackageRecord> {
    let lines: Vec<&str> = surviving_lines(raw).collect();
    match lines.as_slice() {
        [] => {
            debug!("Package {name} not installed");
            None
        }
        [line] => {
            debug!("Found package {line}");
            name_version_split(line)
        }
        [first, ..] => {
            warn!("Multiple matches for package {name} - using first one found");
            debug!("Found package {first}");
            name_version_split(first)
        }
    }
}
