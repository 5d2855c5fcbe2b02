//! Directories and files on the local filesystem.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::Error;
use crate::archive::{self, ZipArtefact, ZipBuilder};
use crate::fingerprint::fingerprint;
use crate::handler::Handler;
use crate::ignore::IgnoreRules;
use crate::source::Source;
use crate::transcode::{self, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, Encoding};

/// Default name of the ignore file read from the root of an archived directory.
pub const DEFAULT_IGNORE_FILE: &str = ".zipignore";

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Name of the ignore file looked up at the root of an archived directory.
    pub ignore_file: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            ignore_file: DEFAULT_IGNORE_FILE.to_string(),
        }
    }
}

/// Archives an existing path.
///
/// A directory is walked in lexical order, skipping whatever its ignore file excludes. A zip file
/// is returned as-is, a tarball is transcoded and any other file becomes the only entry of a new
/// archive.
#[derive(Debug, Clone, Default)]
pub struct LocalHandler {
    config: LocalConfig,
}

impl LocalHandler {
    pub const NAME: &'static str = "local";

    pub fn new(config: LocalConfig) -> Self {
        Self { config }
    }

    /// Rules for the tree at `root`: the defaults, then the root's ignore file if there is one,
    /// then the ignore file itself.
    pub fn rules_for(&self, root: &Path) -> Result<IgnoreRules, Error> {
        let ignore_path = root.join(&self.config.ignore_file);
        let mut text = match fs::read_to_string(&ignore_path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(Error::path(ignore_path, err)),
        };
        text.push_str("\n/");
        text.push_str(&self.config.ignore_file);
        Ok(IgnoreRules::parse(&text))
    }

    /// Write every non-ignored entry below `root` into a new archive.
    ///
    /// A directory is only written once a file or symlink below it is, so directories that are
    /// empty after ignoring never appear in the archive.
    pub fn archive_dir(&self, root: &Path) -> Result<ZipArtefact, Error> {
        let rules = self.rules_for(root)?;
        let mut zip = ZipBuilder::new()?;
        // Unwritten ancestors of the current entry: (depth, name, mode)
        let mut pending: Vec<(usize, String, u32)> = Vec::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !rules.is_ignored(&relative_name(root, entry.path())));

        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            let name = relative_name(root, path);
            let metadata = entry.metadata()?;
            let file_type = entry.file_type();
            while pending.last().is_some_and(|(depth, ..)| *depth >= entry.depth()) {
                pending.pop();
            }
            if file_type.is_dir() {
                pending.push((entry.depth(), name, mode(&metadata, DEFAULT_DIR_MODE)));
                continue;
            }
            for (_, dir, dir_mode) in pending.drain(..) {
                zip.add_directory(&dir, dir_mode)?;
            }
            if file_type.is_symlink() {
                let target = fs::read_link(path).map_err(|err| Error::path(path, err))?;
                zip.add_symlink(&name, &target.to_string_lossy(), mode(&metadata, 0o777))?;
            } else {
                let mut file = fs::File::open(path).map_err(|err| Error::path(path, err))?;
                let mode = mode(&metadata, DEFAULT_FILE_MODE);
                zip.add_file(&name, mode, Some(metadata.len()), &mut file)?;
            }
        }

        if zip.entries() == 0 {
            return Err(Error::EmptyDirectory {
                path: root.to_path_buf(),
            });
        }
        tracing::debug!(root = %root.display(), entries = zip.entries(), "archived directory");
        zip.finish()
    }

    fn archive_file(&self, path: &Path, metadata: &fs::Metadata) -> Result<ZipArtefact, Error> {
        let file = fs::File::open(path).map_err(|err| Error::path(path, err))?;
        if let Some(encoding) = Encoding::from_path(&path.to_string_lossy()) {
            return transcode::transcode(file, encoding);
        }
        let (head, mut content) = archive::sniff(file).map_err(|err| Error::path(path, err))?;
        if archive::is_zip_magic(&head) {
            return Ok(ZipArtefact::new(content, metadata.len()));
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| crate::handler::http::DEFAULT_FILE_NAME.to_string());
        let mut zip = ZipBuilder::new()?;
        zip.add_file(
            &name,
            mode(metadata, DEFAULT_FILE_MODE),
            Some(metadata.len()),
            &mut content,
        )?;
        zip.finish()
    }
}

impl Handler for LocalHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn detect(&self, source: &Source) -> bool {
        Path::new(source.path()).exists()
    }

    fn zip(&self, source: &Source) -> Result<ZipArtefact, Error> {
        let path = Path::new(source.path());
        let metadata = fs::metadata(path).map_err(|err| Error::path(path, err))?;
        if metadata.is_dir() {
            self.archive_dir(path)
        } else {
            self.archive_file(path, &metadata)
        }
    }

    fn fingerprint(&self, source: &Source) -> Result<String, Error> {
        Ok(fingerprint(self.zip(source)?)?)
    }
}

/// `path` relative to `root`, with `/` separators.
fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn mode(metadata: &fs::Metadata, _default: u32) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode(metadata: &fs::Metadata, default: u32) -> u32 {
    if metadata.permissions().readonly() {
        default & !0o222
    } else {
        default
    }
}
