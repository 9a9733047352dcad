use std::time::Duration;

/// Crate version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Synthetic blob id appended by sentinel iteration, greater than any real id
pub const SENTINEL_IDX: u32 = (1 << 30) - 1;

/// Kconfig symbols are stored under this prefix
pub const CONFIG_PREFIX: &[u8] = b"CONFIG_";

/// Path prefix of device-tree binding documentation
pub const DT_BINDINGS_PREFIX: &str = "/Documentation/devicetree/bindings/";

/// A definition/doc/compatible parser slower than this is logged and its
/// output discarded for that blob
pub const PARSER_TIMEOUT: Duration = Duration::from_secs(10);

/// Max number of identifiers returned by a prefix autocomplete
pub const AUTOCOMPLETE_LIMIT: usize = 10;

/// Per-table entry bound of the write-behind posting cache used by the
/// update pipeline
pub const POSTING_CACHE_ENTRIES: usize = 100_000;

/// Escape byte the tokenizer uses for newlines inside interstitial text
pub const TOKEN_NEWLINE_ESCAPE: u8 = 0x01;

/// ANSI markers wrapped around known identifiers in tokenized file output
pub const IDENT_MARK_OPEN: &[u8] = b"\x1b[31m";
pub const IDENT_MARK_CLOSE: &[u8] = b"\x1b[0m";
