//! Repository adapter.
//!
//! Every operation shells out to the repository helper executable and
//! parses its line-oriented stdout. Raw bytes never leak above this
//! module: each sub-command has a typed wrapper.

use crate::{
    config::{Settings, DATA_DIR_ENV, REPO_DIR_ENV},
    family::Family,
};
use anyhow::{bail, Context, Result};
use log::error;
use std::{path::PathBuf, process::Command};

/// One `<hash> <name-or-path>` line of `list-blobs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLine {
    pub hash: String,
    /// Basename with `-f`, full path (leading `/`) with `-p`
    pub name: String,
}

/// One `<ident> <kind-letter> <line>` line of `parse-defs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefLine {
    pub ident: Vec<u8>,
    pub kind_letter: u8,
    pub line: u32,
}

/// One `<ident> <line>` line of `parse-docs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocLine {
    pub ident: Vec<u8>,
    pub line: u32,
}

/// One `<type> <name> <size> <mode>` line of `get-dir`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub entry_type: String,
    pub name: String,
    pub size: String,
    pub mode: String,
}

/// One line of `list-tags -h`: 1-3 space-separated fields, missing menu
/// levels reported as `FIXME`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMenuLine {
    pub topmenu: String,
    pub submenu: String,
    pub tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Blob,
    Tree,
}

#[derive(Debug, Clone)]
pub struct Repo {
    script: PathBuf,
    repo_dir: PathBuf,
    data_dir: PathBuf,
}

impl Repo {
    pub fn new(script: PathBuf, repo_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            script,
            repo_dir,
            data_dir,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.script.clone(),
            settings.repo_dir.clone(),
            settings.data_dir.clone(),
        )
    }

    /// Run one helper sub-command and capture stdout.
    /// Stderr output is logged; only spawn failures are errors.
    fn output(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = Command::new(&self.script)
            .args(args)
            .env(REPO_DIR_ENV, &self.repo_dir)
            .env(DATA_DIR_ENV, &self.data_dir)
            .output()
            .with_context(|| format!("failed to run {:?} {args:?}", self.script))?;
        if !output.stderr.is_empty() {
            error!(
                "command {args:?} printed to stderr:\n{}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(output.stdout)
    }

    /// Stdout split on `\n`, discarding the trailing empty line
    fn lines(&self, args: &[&str]) -> Result<Vec<Vec<u8>>> {
        let mut out = self.output(args)?;
        if out.last() == Some(&b'\n') {
            out.pop();
        }
        if out.is_empty() {
            return Ok(vec![]);
        }
        Ok(out.split(|&b| b == b'\n').map(<[u8]>::to_vec).collect())
    }

    fn text_lines(&self, args: &[&str]) -> Result<Vec<String>> {
        self.lines(args)?
            .into_iter()
            .map(|l| String::from_utf8(l).with_context(|| format!("non-UTF-8 output from {args:?}")))
            .collect()
    }

    /// All tags, in the order the repository reports them
    pub fn list_tags(&self) -> Result<Vec<String>> {
        self.text_lines(&["list-tags"])
    }

    /// Tags with their menu placement
    pub fn list_tags_with_menus(&self) -> Result<Vec<TagMenuLine>> {
        self.text_lines(&["list-tags", "-h"])?
            .into_iter()
            .map(|line| {
                let fields: Vec<&str> = line.split(' ').collect();
                match fields.as_slice() {
                    [tag] => Ok(TagMenuLine {
                        topmenu: "FIXME".into(),
                        submenu: "FIXME".into(),
                        tag: tag.to_string(),
                    }),
                    [submenu, tag] => Ok(TagMenuLine {
                        topmenu: "FIXME".into(),
                        submenu: submenu.to_string(),
                        tag: tag.to_string(),
                    }),
                    [topmenu, submenu, tag] => Ok(TagMenuLine {
                        topmenu: topmenu.to_string(),
                        submenu: submenu.to_string(),
                        tag: tag.to_string(),
                    }),
                    _ => bail!("bad list-tags -h line {line:?}"),
                }
            })
            .collect()
    }

    /// Tags sorted newest-first, release candidates excluded
    pub fn latest_tags(&self) -> Result<Vec<String>> {
        self.text_lines(&["get-latest-tags"])
    }

    /// `<hash> <basename>` per blob of a tag
    pub fn list_blob_files(&self, tag: &str) -> Result<Vec<BlobLine>> {
        self.blob_lines(&["list-blobs", "-f", tag])
    }

    /// `<hash> <path>` per blob of a tag; paths begin with `/`
    pub fn list_blob_paths(&self, tag: &str) -> Result<Vec<BlobLine>> {
        self.blob_lines(&["list-blobs", "-p", tag])
    }

    fn blob_lines(&self, args: &[&str]) -> Result<Vec<BlobLine>> {
        self.text_lines(args)?
            .into_iter()
            .map(|line| {
                let (hash, name) = line
                    .split_once(' ')
                    .with_context(|| format!("bad list-blobs line {line:?}"))?;
                Ok(BlobLine {
                    hash: hash.to_string(),
                    name: name.to_string(),
                })
            })
            .collect()
    }

    pub fn get_type(&self, tag: &str, path: &str) -> Result<ObjectType> {
        let out = self.output(&["get-type", tag, path])?;
        match out.trim_ascii() {
            b"blob" => Ok(ObjectType::Blob),
            b"tree" => Ok(ObjectType::Tree),
            other => bail!("bad get-type output {:?}", String::from_utf8_lossy(other)),
        }
    }

    pub fn get_dir(&self, tag: &str, path: &str) -> Result<Vec<DirEntry>> {
        self.text_lines(&["get-dir", tag, path])?
            .into_iter()
            .map(|line| {
                let fields: Vec<&str> = line.splitn(4, ' ').collect();
                let [entry_type, name, size, mode] = fields.as_slice() else {
                    bail!("bad get-dir line {line:?}");
                };
                Ok(DirEntry {
                    entry_type: entry_type.to_string(),
                    name: name.to_string(),
                    size: size.to_string(),
                    mode: mode.to_string(),
                })
            })
            .collect()
    }

    pub fn get_file(&self, tag: &str, path: &str) -> Result<Vec<u8>> {
        self.output(&["get-file", tag, path])
    }

    pub fn get_blob(&self, hash: &str) -> Result<Vec<u8>> {
        self.output(&["get-blob", hash])
    }

    /// Token stream of a blob: interstitial text and candidate
    /// identifiers alternate, starting with interstitial text. Newlines
    /// inside interstitial text arrive as `0x01`.
    pub fn tokenize_blob(&self, hash: &str, family: Family) -> Result<Vec<Vec<u8>>> {
        self.lines(&["tokenize-file", "-b", hash, &family.to_string()])
    }

    /// Token stream of a path at a tag, same shape as [Self::tokenize_blob]
    pub fn tokenize_path(&self, tag: &str, path: &str, family: Family) -> Result<Vec<Vec<u8>>> {
        self.lines(&["tokenize-file", tag, path, &family.to_string()])
    }

    pub fn parse_defs(&self, hash: &str, filename: &str, family: Family) -> Result<Vec<DefLine>> {
        self.lines(&["parse-defs", hash, filename, &family.to_string()])?
            .into_iter()
            .map(|line| {
                let mut fields = line.splitn(3, |&b| b == b' ');
                let (Some(ident), Some(kind), Some(line_no)) =
                    (fields.next(), fields.next(), fields.next())
                else {
                    bail!("bad parse-defs line {:?}", String::from_utf8_lossy(&line));
                };
                let &[kind_letter] = kind else {
                    bail!("bad parse-defs kind {:?}", String::from_utf8_lossy(kind));
                };
                Ok(DefLine {
                    ident: ident.to_vec(),
                    kind_letter,
                    line: parse_line_number(line_no)?,
                })
            })
            .collect()
    }

    pub fn parse_docs(&self, hash: &str, filename: &str) -> Result<Vec<DocLine>> {
        self.lines(&["parse-docs", hash, filename])?
            .into_iter()
            .map(|line| {
                let mut fields = line.splitn(2, |&b| b == b' ');
                let (Some(ident), Some(line_no)) = (fields.next(), fields.next()) else {
                    bail!("bad parse-docs line {:?}", String::from_utf8_lossy(&line));
                };
                Ok(DocLine {
                    ident: ident.to_vec(),
                    line: parse_line_number(line_no)?,
                })
            })
            .collect()
    }

    /// Is DT-compatible indexing enabled for this repository?
    pub fn dts_comp(&self) -> Result<bool> {
        Ok(self.output(&["dts-comp"])?.trim_ascii() == b"1")
    }
}

fn parse_line_number(bytes: &[u8]) -> Result<u32> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .with_context(|| format!("bad line number {:?}", String::from_utf8_lossy(bytes)))
}
