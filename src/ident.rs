//! Identifier acceptance filter.
//!
//! Tokens that are too short, blacklisted, or `~`-prefixed never become
//! index keys. The blacklist covers very frequent variable names and
//! keywords that would bloat the reference index without being useful
//! lookup targets.

// TODO: allow per-project blacklists
const BLACKLIST: &[&[u8]] = &[
    b"NULL",
    b"__",
    b"adapter",
    b"addr",
    b"arg",
    b"attr",
    b"base",
    b"bp",
    b"buf",
    b"buffer",
    b"c",
    b"card",
    b"char",
    b"chip",
    b"cmd",
    b"codec",
    b"const",
    b"count",
    b"cpu",
    b"ctx",
    b"data",
    b"default",
    b"define",
    b"desc",
    b"dev",
    b"driver",
    b"else",
    b"end",
    b"endif",
    b"entry",
    b"err",
    b"error",
    b"event",
    b"extern",
    b"failed",
    b"flags",
    b"h",
    b"host",
    b"hw",
    b"i",
    b"id",
    b"idx",
    b"if",
    b"index",
    b"info",
    b"inline",
    b"int",
    b"irq",
    b"j",
    b"len",
    b"length",
    b"list",
    b"lock",
    b"long",
    b"mask",
    b"mode",
    b"msg",
    b"n",
    b"name",
    b"net",
    b"next",
    b"offset",
    b"ops",
    b"out",
    b"p",
    b"pdev",
    b"port",
    b"priv",
    b"ptr",
    b"q",
    b"r",
    b"rc",
    b"rdev",
    b"reg",
    b"regs",
    b"req",
    b"res",
    b"result",
    b"ret",
    b"return",
    b"retval",
    b"root",
    b"s",
    b"sb",
    b"size",
    b"sizeof",
    b"sk",
    b"skb",
    b"spec",
    b"start",
    b"state",
    b"static",
    b"status",
    b"struct",
    b"t",
    b"tmp",
    b"tp",
    b"type",
    b"val",
    b"value",
    b"vcpu",
    b"x",
];

/// Is this token a candidate for cross-referencing?
pub fn is_ident(token: &[u8]) -> bool {
    token.len() >= 2 && !token.starts_with(b"~") && !BLACKLIST.contains(&token)
}
