//! Request-parameter validation.
//!
//! Applied at the CLI boundary; core APIs only ever see values that
//! already passed these checks.

use crate::error::InvalidParam;
use regex::Regex;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.,:/-]+$").expect("version regex compiles"));

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_,.+?#-]+$").expect("ident regex compiles"));

static PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_/.,+-]+$").expect("path regex compiles"));

fn check<'a>(re: &Regex, field: &'static str, value: &'a str) -> Result<&'a str, InvalidParam> {
    if re.is_match(value) {
        Ok(value)
    } else {
        Err(InvalidParam {
            field,
            value: value.into(),
        })
    }
}

pub fn version(value: &str) -> Result<&str, InvalidParam> {
    check(&VERSION_RE, "version", value)
}

pub fn ident(value: &str) -> Result<&str, InvalidParam> {
    check(&IDENT_RE, "ident", value)
}

pub fn path(value: &str) -> Result<&str, InvalidParam> {
    check(&PATH_RE, "path", value)
}
