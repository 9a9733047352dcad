//! Definition posting lists.

use super::{take_u32, take_u8, Codec};
use crate::family::Family;
use anyhow::{bail, Result};
use std::fmt;

/// What kind of thing a definition record points at.
/// Stored as the one-letter codes of the definition parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefKind {
    Config,
    Define,
    Enum,
    Enumerator,
    Function,
    Label,
    Macro,
    Member,
    Prototype,
    Struct,
    Typedef,
    Union,
    Variable,
    Externvar,
}

impl DefKind {
    pub fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'c' => Some(Self::Config),
            b'd' => Some(Self::Define),
            b'e' => Some(Self::Enum),
            b'E' => Some(Self::Enumerator),
            b'f' => Some(Self::Function),
            b'l' => Some(Self::Label),
            b'M' => Some(Self::Macro),
            b'm' => Some(Self::Member),
            b'p' => Some(Self::Prototype),
            b's' => Some(Self::Struct),
            b't' => Some(Self::Typedef),
            b'u' => Some(Self::Union),
            b'v' => Some(Self::Variable),
            b'x' => Some(Self::Externvar),
            _ => None,
        }
    }

    pub fn letter(&self) -> u8 {
        match self {
            Self::Config => b'c',
            Self::Define => b'd',
            Self::Enum => b'e',
            Self::Enumerator => b'E',
            Self::Function => b'f',
            Self::Label => b'l',
            Self::Macro => b'M',
            Self::Member => b'm',
            Self::Prototype => b'p',
            Self::Struct => b's',
            Self::Typedef => b't',
            Self::Union => b'u',
            Self::Variable => b'v',
            Self::Externvar => b'x',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Define => "define",
            Self::Enum => "enum",
            Self::Enumerator => "enumerator",
            Self::Function => "function",
            Self::Label => "label",
            Self::Macro => "macro",
            Self::Member => "member",
            Self::Prototype => "prototype",
            Self::Struct => "struct",
            Self::Typedef => "typedef",
            Self::Union => "union",
            Self::Variable => "variable",
            Self::Externvar => "externvar",
        }
    }
}

impl fmt::Display for DefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One definition occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefEntry {
    pub idx: u32,
    pub kind: DefKind,
    pub line: u32,
    pub family: Family,
}

/// All definition occurrences of one identifier, plus the set of families
/// the identifier is defined in (kept separately for fast family tests).
///
/// Packed layout:
/// ```text
/// {nfam: u8}{nfam family letters}
/// followed by repeated {idx: u32 BE}{kind letter: u8}{line: u32 BE}{family letter: u8}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefList {
    families: Vec<Family>,
    entries: Vec<DefEntry>,
}

impl DefList {
    pub fn append(&mut self, idx: u32, kind: DefKind, line: u32, family: Family) {
        self.entries.push(DefEntry {
            idx,
            kind,
            line,
            family,
        });
        self.add_family(family);
    }

    pub fn add_family(&mut self, family: Family) {
        if !self.families.contains(&family) {
            self.families.push(family);
        }
    }

    /// Families this identifier is defined in, in first-seen order
    pub fn families(&self) -> &[Family] {
        &self.families
    }

    /// Families of the macro definitions, for the macro-compatibility rule
    pub fn get_macros(&self) -> Vec<Family> {
        self.entries
            .iter()
            .filter(|e| e.kind == DefKind::Macro)
            .map(|e| e.family)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries sorted by blob id. Append order is usually already
    /// ascending, but postings are treated as potentially unsorted.
    pub fn iter(&self) -> impl Iterator<Item = DefEntry> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|e| e.idx);
        entries.into_iter()
    }
}

impl Codec for DefList {
    fn parse(mut bytes: &[u8]) -> Result<Self> {
        let nfam = take_u8(&mut bytes)? as usize;
        let mut families = Vec::with_capacity(nfam);
        for _ in 0..nfam {
            let letter = take_u8(&mut bytes)?;
            let Some(family) = Family::from_letter(letter) else {
                bail!("bad family letter {letter:#04x} in definition record");
            };
            families.push(family);
        }

        let mut entries = Vec::new();
        while !bytes.is_empty() {
            let idx = take_u32(&mut bytes)?;
            let kind_letter = take_u8(&mut bytes)?;
            let Some(kind) = DefKind::from_letter(kind_letter) else {
                bail!("bad kind letter {kind_letter:#04x} in definition record");
            };
            let line = take_u32(&mut bytes)?;
            let fam_letter = take_u8(&mut bytes)?;
            let Some(family) = Family::from_letter(fam_letter) else {
                bail!("bad family letter {fam_letter:#04x} in definition record");
            };
            entries.push(DefEntry {
                idx,
                kind,
                line,
                family,
            });
        }
        Ok(Self { families, entries })
    }

    fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.families.len() + self.entries.len() * 10);
        out.push(self.families.len() as u8);
        out.extend(self.families.iter().map(Family::letter));
        for e in &self.entries {
            out.extend_from_slice(&e.idx.to_be_bytes());
            out.push(e.kind.letter());
            out.extend_from_slice(&e.line.to_be_bytes());
            out.push(e.family.letter());
        }
        out
    }
}
