//! Device-tree compatible-string scanner.
//!
//! Finds `compatible` values in C sources (`.compatible = "..."`
//! initializers), DTS sources (`compatible = "...", "...";` properties)
//! and binding documentation (bare `vendor,device` words). Results are
//! percent-encoded because compatible strings contain `,` and sometimes
//! `/`, and the encoded form is the index key.

use crate::family::Family;
use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::sync::LazyLock;

/// Keep the characters Python's `urllib.parse.quote` leaves alone
pub const QUOTE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

static C_COMPATIBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s*\{*\s*\.compatible\s*=\s*"(.+?)""#).expect("C compatible regex compiles"));

static DTS_PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*compatible").expect("DTS property regex compiles"));

static DTS_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(.+?)""#).expect("DTS string regex compiles"));

static BINDINGS_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\w-]+,?[\w-]+)").expect("bindings word regex compiles"));

/// Percent-encode a compatible string into its index key form
pub fn quote(ident: &str) -> String {
    percent_encode(ident.as_bytes(), QUOTE_SET).to_string()
}

/// Scan blob content for compatible strings.
/// Returns `(percent-encoded ident, 1-based line)` pairs in file order.
/// `family` selects the extraction rules: C, D, or B.
pub fn scan(family: Family, content: &[u8]) -> Vec<(String, u32)> {
    let mut found = vec![];
    for (num, line) in content.split(|&b| b == b'\n').enumerate() {
        let line = String::from_utf8_lossy(line);
        let line_no = num as u32 + 1;
        match family {
            Family::C => {
                for cap in C_COMPATIBLE.captures_iter(&line) {
                    found.push((quote(&cap[1]), line_no));
                }
            }
            Family::D => {
                if DTS_PROPERTY.is_match(&line) {
                    for cap in DTS_STRING.captures_iter(&line) {
                        found.push((quote(&cap[1]), line_no));
                    }
                }
            }
            Family::B => {
                for cap in BINDINGS_WORD.captures_iter(&line) {
                    found.push((quote(&cap[1]), line_no));
                }
            }
            _ => {}
        }
    }
    found
}
