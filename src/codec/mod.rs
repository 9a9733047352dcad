//! On-disk record codecs.
//!
//! Each posting table stores one packed record per key. The layouts are
//! binary, big-endian, and append-oriented: `parse(pack(v)) == v` for any
//! value constructible through the `append` APIs.

pub mod def_list;
pub mod path_list;
pub mod ref_list;

pub use def_list::{DefEntry, DefKind, DefList};
pub use path_list::{PathEntry, PathList};
pub use ref_list::{RefEntry, RefList};

use anyhow::{bail, Result};

/// A value with a packed byte representation
pub trait Codec: Sized + Default {
    fn parse(bytes: &[u8]) -> Result<Self>;
    fn pack(&self) -> Vec<u8>;
}

/// Big-endian u32 at the front of `bytes`; advances the slice
pub(crate) fn take_u32(bytes: &mut &[u8]) -> Result<u32> {
    let Some((head, rest)) = bytes.split_first_chunk::<4>() else {
        bail!("truncated record: expected 4 more bytes, found {}", bytes.len());
    };
    *bytes = rest;
    Ok(u32::from_be_bytes(*head))
}

/// Big-endian u16 at the front of `bytes`; advances the slice
pub(crate) fn take_u16(bytes: &mut &[u8]) -> Result<u16> {
    let Some((head, rest)) = bytes.split_first_chunk::<2>() else {
        bail!("truncated record: expected 2 more bytes, found {}", bytes.len());
    };
    *bytes = rest;
    Ok(u16::from_be_bytes(*head))
}

pub(crate) fn take_u8(bytes: &mut &[u8]) -> Result<u8> {
    let Some((&head, rest)) = bytes.split_first() else {
        bail!("truncated record: expected 1 more byte");
    };
    *bytes = rest;
    Ok(head)
}

/// `len` raw bytes at the front of `bytes`; advances the slice
pub(crate) fn take_bytes<'a>(bytes: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if bytes.len() < len {
        bail!("truncated record: expected {len} more bytes, found {}", bytes.len());
    }
    let (head, rest) = bytes.split_at(len);
    *bytes = rest;
    Ok(head)
}
