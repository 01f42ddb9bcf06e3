//! Filesystem confinement for caller-supplied paths.
//!
//! A remote caller never sees or sends an absolute path. Every path it
//! exchanges is relative to one of three configured roots:
//!
//! | Tag      | Purpose                      | Files selectable |
//! |----------|------------------------------|------------------|
//! | `input`  | source decks to pick from    | yes              |
//! | `output` | where notes are written      | no (dirs only)   |
//! | `copy`   | where source copies go       | no (dirs only)   |
//!
//! [`SandboxRoot::resolve_inside`] is the only way from a relative path to
//! an absolute one. It normalizes `.`/`..` lexically first (a `..` that
//! would climb above the root fails before the filesystem is touched), then
//! canonicalizes the longest existing ancestor so that symlinks are followed
//! and checked: a link pointing outside the root is a [`NoteError::PathEscape`],
//! whether or not its target exists yet.

use crate::config::NoteConfig;
use crate::error::NoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Media type of downloaded notes.
pub const NOTE_MEDIA_TYPE: &str = "text/markdown";

/// Symlinks followed while resolving one path before giving up.
const MAX_LINK_HOPS: u32 = 40;

/// Which of the configured roots a path is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootTag {
    Input,
    Output,
    Copy,
}

impl RootTag {
    pub const ALL: [RootTag; 3] = [RootTag::Input, RootTag::Output, RootTag::Copy];

    pub fn as_str(self) -> &'static str {
        match self {
            RootTag::Input => "input",
            RootTag::Output => "output",
            RootTag::Copy => "copy",
        }
    }

    /// Only the input root lets a caller pick individual files.
    pub fn allows_files(self) -> bool {
        matches!(self, RootTag::Input)
    }
}

impl fmt::Display for RootTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RootTag {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "input" => Ok(RootTag::Input),
            "output" => Ok(RootTag::Output),
            "copy" => Ok(RootTag::Copy),
            other => Err(NoteError::NotFound {
                path: PathBuf::from(other),
            }),
        }
    }
}

/// Kind of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    /// Root-relative path with `/` separators.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// Result of [`SandboxRoot::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub root: RootTag,
    pub root_path: String,
    pub allow_files: bool,
    /// `""` at the root itself.
    pub current_path: String,
    /// `""` when there is no parent inside the root.
    pub parent_path: String,
    pub entries: Vec<DirEntry>,
}

/// A configured directory that caller paths are confined to.
#[derive(Debug, Clone)]
pub struct SandboxRoot {
    tag: RootTag,
    path: PathBuf,
}

impl SandboxRoot {
    /// Open a root at `path`, which must already exist.
    pub fn open(tag: RootTag, path: impl AsRef<Path>) -> Result<Self, NoteError> {
        let path = path.as_ref();
        let canonical = path.canonicalize().map_err(|_| NoteError::NotFound {
            path: path.to_path_buf(),
        })?;
        if !canonical.is_dir() {
            return Err(NoteError::NotFound { path: canonical });
        }
        debug!("Sandbox root {}: {}", tag, canonical.display());
        Ok(Self {
            tag,
            path: canonical,
        })
    }

    /// Create the directory (and ancestors) if needed, then open it.
    pub fn create(tag: RootTag, path: impl AsRef<Path>) -> Result<Self, NoteError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|source| NoteError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::open(tag, path)
    }

    pub fn tag(&self) -> RootTag {
        self.tag
    }

    /// Canonical absolute path of the root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn allows_files(&self) -> bool {
        self.tag.allows_files()
    }

    /// Resolve `relative` to an absolute path at or below this root.
    pub fn resolve_inside(&self, relative: &str) -> Result<PathBuf, NoteError> {
        let normalized = normalize(relative).ok_or_else(|| self.escape(relative))?;
        let joined = self.path.join(&normalized);

        let resolved = resolve_links(&joined, 0).ok_or_else(|| self.escape(relative))?;
        if !resolved.starts_with(&self.path) {
            return Err(self.escape(relative));
        }
        Ok(resolved)
    }

    /// Root-relative form of an absolute path inside this root, `/`-separated.
    pub fn relative_of(&self, absolute: &Path) -> String {
        absolute
            .strip_prefix(&self.path)
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }

    /// List the direct children of a directory inside this root.
    ///
    /// Hidden entries are skipped. Directories come first, then files, each
    /// group sorted case-insensitively. Files are included only when asked
    /// for and when the root allows file selection.
    pub fn list(&self, relative: &str, include_files: bool) -> Result<DirectoryListing, NoteError> {
        let dir = self.resolve_inside(relative)?;
        if !dir.is_dir() {
            return Err(NoteError::NotFound { path: dir });
        }
        let allow_files = include_files && self.allows_files();

        let read = std::fs::read_dir(&dir).map_err(|_| NoteError::NotFound { path: dir.clone() })?;
        let mut entries: Vec<DirEntry> = Vec::new();
        for entry in read {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let abs = entry.path();
            let kind = if abs.is_dir() {
                EntryKind::Directory
            } else if abs.is_file() && allow_files {
                EntryKind::File
            } else {
                continue;
            };
            entries.push(DirEntry {
                path: self.relative_of(&abs),
                name,
                kind,
            });
        }
        entries.sort_by(|a, b| {
            (a.kind != EntryKind::Directory)
                .cmp(&(b.kind != EntryKind::Directory))
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });

        let current_path = self.relative_of(&dir);
        let parent_path = if current_path.is_empty() {
            String::new()
        } else {
            dir.parent().map(|p| self.relative_of(p)).unwrap_or_default()
        };

        Ok(DirectoryListing {
            root: self.tag,
            root_path: self.path.display().to_string(),
            allow_files,
            current_path,
            parent_path,
            entries,
        })
    }

    fn escape(&self, requested: &str) -> NoteError {
        NoteError::PathEscape {
            root: self.tag.to_string(),
            requested: requested.to_string(),
        }
    }
}

/// Resolve every symlink along an absolute `path` whose tail may not exist.
///
/// The longest prefix that exists (a dangling link counts) is canonicalized
/// and the missing components are appended as-is. A dangling link is
/// followed to its target, which is resolved the same way. `None` when the
/// path cannot be resolved or links loop.
fn resolve_links(path: &Path, hops: u32) -> Option<PathBuf> {
    if hops > MAX_LINK_HOPS {
        return None;
    }

    let mut existing = path;
    let mut missing: Vec<&std::ffi::OsStr> = Vec::new();
    while existing.symlink_metadata().is_err() {
        missing.push(existing.file_name()?);
        existing = existing.parent()?;
    }

    let mut resolved = match existing.canonicalize() {
        Ok(canonical) => canonical,
        Err(_) => {
            let target = std::fs::read_link(existing).ok()?;
            let parent = existing.parent()?.canonicalize().ok()?;
            let absolute = lexical_clean(&parent.join(target))?;
            debug!("Following dangling link {} -> {}", existing.display(), absolute.display());
            resolve_links(&absolute, hops + 1)?
        }
    };
    resolved.extend(missing.iter().rev());
    Some(resolved)
}

/// Fold `.` and `..` in an absolute path without touching the filesystem.
fn lexical_clean(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other),
        }
    }
    Some(out)
}

/// Lexically normalize a root-relative path.
///
/// A leading `/` is ignored. Returns `None` for a Windows drive or UNC
/// prefix, or when `..` would climb above the root.
fn normalize(relative: &str) -> Option<PathBuf> {
    let bytes = relative.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return None;
    }
    if relative.starts_with("\\\\") {
        return None;
    }

    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Prefix(_) => return None,
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::Normal(part) => parts.push(part),
        }
    }
    Some(parts.iter().collect())
}

/// A note read back from the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDownload {
    pub file_name: String,
    pub content: String,
    pub media_type: &'static str,
}

/// The three roots of one deployment.
#[derive(Debug, Clone)]
pub struct Sandbox {
    pub input: SandboxRoot,
    pub output: SandboxRoot,
    pub copy: SandboxRoot,
}

impl Sandbox {
    /// Open the roots named in `config`.
    ///
    /// The input root must exist; output and copy roots are created.
    pub fn from_config(config: &NoteConfig) -> Result<Self, NoteError> {
        Ok(Self {
            input: SandboxRoot::open(RootTag::Input, &config.input_root)?,
            output: SandboxRoot::create(RootTag::Output, &config.output_root)?,
            copy: SandboxRoot::create(RootTag::Copy, &config.copy_root)?,
        })
    }

    pub fn root(&self, tag: RootTag) -> &SandboxRoot {
        match tag {
            RootTag::Input => &self.input,
            RootTag::Output => &self.output,
            RootTag::Copy => &self.copy,
        }
    }

    /// Resolve a bare note filename inside the output root.
    pub fn download_guard(&self, note_name: &str) -> Result<PathBuf, NoteError> {
        self.download_guard_in("", note_name)
    }

    /// Resolve a bare note filename inside `dir`, a directory relative to
    /// the output root.
    ///
    /// The name itself must not carry separators or `..`; only `dir` goes
    /// through [`SandboxRoot::resolve_inside`] as a relative path.
    pub fn download_guard_in(&self, dir: &str, note_name: &str) -> Result<PathBuf, NoteError> {
        if note_name.is_empty()
            || note_name.contains('/')
            || note_name.contains('\\')
            || note_name.contains("..")
        {
            return Err(NoteError::InvalidFilename {
                name: note_name.to_string(),
            });
        }
        let dir = self.output.relative_of(&self.output.resolve_inside(dir)?);
        let path = if dir.is_empty() {
            self.output.resolve_inside(note_name)?
        } else {
            self.output.resolve_inside(&format!("{dir}/{note_name}"))?
        };
        if !path.is_file() {
            return Err(NoteError::NotFound { path });
        }
        Ok(path)
    }

    /// Read a generated note for download.
    pub async fn read_note(&self, note_name: &str) -> Result<NoteDownload, NoteError> {
        self.read_note_in("", note_name).await
    }

    /// Read a generated note from a directory below the output root.
    pub async fn read_note_in(&self, dir: &str, note_name: &str) -> Result<NoteDownload, NoteError> {
        let path = self.download_guard_in(dir, note_name)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| NoteError::NotFound { path: path.clone() })?;
        Ok(NoteDownload {
            file_name: note_name.to_string(),
            content,
            media_type: NOTE_MEDIA_TYPE,
        })
    }
}
