//! Streaming conversion of tar and gzip-compressed tar archives into zip archives.
//!
//! Entries are copied one at a time from the decoder into a zip written to a temporary file, so
//! the payload is never held in memory. When the first entry of the tarball is a directory it is
//! treated as a wrapper folder (the usual `name-version/` prefix of release tarballs): it is not
//! written, and it is removed from the front of every later entry inside it. Entries outside the
//! wrapper folder keep their full name. pax header entries never count as the first entry.

use std::io::Read;

use flate2::read::GzDecoder;
use tar::EntryType;

use crate::Error;
use crate::archive::{self, ZipArtefact, ZipBuilder};

pub(crate) const DEFAULT_FILE_MODE: u32 = 0o644;
pub(crate) const DEFAULT_DIR_MODE: u32 = 0o755;

/// The container format of an incoming tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Tar,
    TarGz,
}

impl Encoding {
    /// The encoding implied by the extension of `path`, if it names a tarball.
    pub fn from_path(path: &str) -> Option<Self> {
        if archive::is_tar_gz_ext(path) {
            Some(Encoding::TarGz)
        } else if archive::is_tar_ext(path) {
            Some(Encoding::Tar)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Tar => write!(f, "tar"),
            Encoding::TarGz => write!(f, "tar.gz"),
        }
    }
}

/// Re-encode `reader`, a stream in the given `encoding`, as a zip archive.
///
/// Any failure aborts the conversion and is reported as [`Error::Transcode`]. The partly written
/// temporary archive is removed before returning.
pub fn transcode<R: Read>(reader: R, encoding: Encoding) -> Result<ZipArtefact, Error> {
    let result = match encoding {
        Encoding::Tar => tar_to_zip(reader),
        Encoding::TarGz => tar_to_zip(GzDecoder::new(reader)),
    };
    result.map_err(|err| Error::Transcode {
        encoding,
        source: Box::new(err),
    })
}

fn tar_to_zip<R: Read>(reader: R) -> Result<ZipArtefact, Error> {
    let mut tarball = tar::Archive::new(reader);
    let mut zip = ZipBuilder::new()?;
    let mut seen_content = false;
    let mut root: Option<String> = None;

    for entry in tarball.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        if matches!(kind, EntryType::XGlobalHeader | EntryType::XHeader) {
            continue;
        }
        let path = entry.path()?.to_string_lossy().into_owned();
        let mut name = normalize(&path);
        if name.is_empty() {
            continue;
        }

        if !seen_content {
            seen_content = true;
            if kind.is_dir() {
                tracing::debug!(root = %name, "stripping root folder from tarball");
                root = Some(name);
                continue;
            }
        }
        if let Some(root) = &root {
            match name.split_once('/') {
                Some((first, rest)) if first == root => name = rest.to_string(),
                _ if name == *root => continue,
                _ => tracing::debug!(entry = %name, "entry outside root folder kept as-is"),
            }
        }

        let mode = entry.header().mode().ok().map(|mode| mode & 0o7777);
        match kind {
            EntryType::Directory => {
                zip.add_directory(&name, mode.unwrap_or(DEFAULT_DIR_MODE))?;
            }
            EntryType::Regular | EntryType::Continuous => {
                let size = entry.size();
                zip.add_file(&name, mode.unwrap_or(DEFAULT_FILE_MODE), Some(size), &mut entry)?;
            }
            EntryType::Symlink => {
                let target = entry
                    .link_name()?
                    .map(|target| target.to_string_lossy().into_owned())
                    .unwrap_or_default();
                zip.add_symlink(&name, &target, mode.unwrap_or(0o777))?;
            }
            other => {
                tracing::debug!(entry = %name, kind = ?other, "skipping unsupported tar entry");
            }
        }
    }

    tracing::debug!(entries = zip.entries(), strip_root = root.is_some(), "transcoded tarball");
    zip.finish()
}

/// Forward slashes only, with no leading `./`, empty or `.` segments.
fn normalize(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}
