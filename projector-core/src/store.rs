//! Directory-backed view of the HLS output
//!
//! The encoder writes a rolling playlist and numbered `.ts` segments into a
//! single directory. This module resolves request names to files inside that
//! directory and nothing else: names arrive straight from HTTP requests, so
//! every lookup is checked lexically and again after canonicalization.
//!
//! The muxer runs with `temp_file`, writing each file under a `.tmp` name and
//! renaming it when complete. `.tmp` names are never served, so readers only
//! ever see finished files.

use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::MANIFEST_NAME;
use crate::error::{ProjectorError, Result};

/// Leading part of every segment name the muxer writes (`seg%03d.ts`)
const SEGMENT_PREFIX: &str = "seg";

/// Request name that always maps to the playlist
pub const MANIFEST_ALIAS: &str = "manifest";

/// What a stream file is, which decides how it is served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// HLS playlist, rewritten by the muxer after every segment
    Manifest,
    /// MPEG-TS media segment, immutable once renamed into place
    MediaSegment,
    /// Anything else the muxer leaves in the directory
    Other,
}

impl SegmentKind {
    /// Classify by file extension
    pub fn from_name(name: &str) -> Self {
        match Path::new(name).extension().and_then(|e| e.to_str()) {
            Some("m3u8") => Self::Manifest,
            Some("ts") => Self::MediaSegment,
            _ => Self::Other,
        }
    }

    /// Content-Type header value
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Manifest => "application/vnd.apple.mpegurl",
            Self::MediaSegment => "video/mp2t",
            Self::Other => "application/octet-stream",
        }
    }

    /// Cache-Control header value
    pub fn cache_control(&self) -> &'static str {
        match self {
            Self::MediaSegment => "max-age=60",
            Self::Manifest | Self::Other => "no-cache, no-store, must-revalidate",
        }
    }
}

/// A file read out of the stream directory
#[derive(Debug, Clone)]
pub struct StreamFile {
    /// File contents
    pub bytes: Bytes,
    /// File classification
    pub kind: SegmentKind,
}

/// Read-only view of the stream directory
///
/// Only [`CaptureSession`](crate::session::CaptureSession) resets the
/// directory; everything else just resolves and reads.
#[derive(Debug, Clone)]
pub struct SegmentStore {
    root: PathBuf,
}

impl SegmentStore {
    /// Create a store over `root`. The directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The managed directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the playlist, if it has been written
    pub async fn manifest_path(&self) -> Result<PathBuf> {
        self.segment_path(MANIFEST_NAME).await
    }

    /// Path of a file inside the stream directory
    ///
    /// Fails with `NotFound` when the file does not exist or the name could
    /// refer to anything outside the directory.
    pub async fn segment_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;

        let candidate = self.root.join(name);
        let metadata = fs::metadata(&candidate)
            .await
            .map_err(|_| ProjectorError::not_found(name))?;
        if !metadata.is_file() {
            return Err(ProjectorError::not_found(name));
        }

        // Symlinks inside the directory must not lead out of it
        let root = fs::canonicalize(&self.root)
            .await
            .map_err(|_| ProjectorError::not_found(name))?;
        let resolved = fs::canonicalize(&candidate)
            .await
            .map_err(|_| ProjectorError::not_found(name))?;
        if !resolved.starts_with(&root) {
            warn!("Rejected stream file escaping {:?}: {}", root, name);
            return Err(ProjectorError::not_found(name));
        }

        Ok(resolved)
    }

    /// Resolve a request name, honouring the `manifest` alias
    pub async fn resolve(&self, requested: &str) -> Result<(PathBuf, SegmentKind)> {
        let name = if requested == MANIFEST_ALIAS {
            MANIFEST_NAME
        } else {
            requested
        };
        let path = self.segment_path(name).await?;
        Ok((path, SegmentKind::from_name(name)))
    }

    /// Read a stream file by request name
    pub async fn read(&self, requested: &str) -> Result<StreamFile> {
        let (path, kind) = self.resolve(requested).await?;
        match fs::read(&path).await {
            Ok(data) => Ok(StreamFile {
                bytes: Bytes::from(data),
                kind,
            }),
            // Rotated away by the muxer between resolve and read
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ProjectorError::not_found(requested)),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the muxer output of a previous session, creating the
    /// directory if needed
    ///
    /// Only playlist, segment and in-progress `.tmp` files are removed.
    /// Anything else in the directory is left alone.
    pub(crate) async fn reset(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;

        let mut entries = fs::read_dir(&self.root).await?;
        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_muxer_output(name) || !entry.file_type().await?.is_file() {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        debug!("Cleared {} stream files from {:?}", removed, self.root);
        Ok(())
    }
}

/// Whether `name` is something the HLS muxer writes
fn is_muxer_output(name: &str) -> bool {
    let name = name.strip_suffix(".tmp").unwrap_or(name);
    name == MANIFEST_NAME || (name.starts_with(SEGMENT_PREFIX) && name.ends_with(".ts"))
}

/// Lexical checks on a request name, before touching the filesystem
fn validate_name(name: &str) -> Result<()> {
    let rejected = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.ends_with(".tmp");

    if rejected {
        debug!("Rejected stream file name {:?}", name);
        return Err(ProjectorError::not_found(name));
    }
    Ok(())
}
