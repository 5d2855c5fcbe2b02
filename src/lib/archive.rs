//! The zip archive handed back by every handler, plus helpers for building one and for
//! recognising archive formats by name or content.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::{NamedTempFile, TempPath};
use zip::write::SimpleFileOptions;

use crate::Error;

/// Largest entry size a zip entry can record without the ZIP64 extension.
pub const ZIP32_LIMIT: u64 = u32::MAX as u64;

/// Prefix of the temporary files backing built archives.
pub const TEMP_PREFIX: &str = "fetch-zip-";

pub const ZIP_EXTENSIONS: &[&str] = &[".zip", ".jar", ".war"];
pub const TAR_EXTENSIONS: &[&str] = &[".tar"];
pub const GZIP_EXTENSIONS: &[&str] = &[".gz", ".gzip"];
pub const TAR_GZ_EXTENSIONS: &[&str] = &[".tgz"];

/// A readable zip archive of known size.
///
/// When the archive was written to temporary storage, that storage is removed exactly once: by
/// [`ZipArtefact::close`], or when the artefact is dropped without being closed.
pub struct ZipArtefact {
    reader: Box<dyn Read + Send>,
    size: u64,
    backing: Option<TempPath>,
}

impl ZipArtefact {
    /// Wrap a stream which is already a zip archive and needs no cleanup.
    pub fn new<R: Read + Send + 'static>(reader: R, size: u64) -> Self {
        Self {
            reader: Box::new(reader),
            size,
            backing: None,
        }
    }

    /// Reopen a finished temporary file for reading. The file is deleted on release.
    pub(crate) fn from_temp(mut file: NamedTempFile) -> Result<Self, Error> {
        file.as_file_mut().flush()?;
        let size = file.as_file().metadata()?.len();
        file.seek(SeekFrom::Start(0))?;
        let (file, path) = file.into_parts();
        tracing::debug!(path = %path.display(), size, "zip archive ready");
        Ok(Self {
            reader: Box::new(file),
            size,
            backing: Some(path),
        })
    }

    /// Copy a stream of unknown length to a temporary file so its size is known.
    pub(crate) fn spool<R: Read>(mut reader: R) -> Result<Self, Error> {
        let mut file = temp_file()?;
        io::copy(&mut reader, &mut file)?;
        Self::from_temp(file)
    }

    /// Total size of the archive in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether the archive is backed by a temporary file which will be removed on release.
    pub fn is_temporary(&self) -> bool {
        self.backing.is_some()
    }

    /// Release the archive, removing any backing temporary file.
    pub fn close(mut self) -> io::Result<()> {
        self.release()
    }

    /// Write the whole archive to `dest` and release it. Returns the number of bytes written.
    pub fn persist<P: AsRef<Path>>(mut self, dest: P) -> Result<u64, Error> {
        let dest = dest.as_ref();
        let mut out = std::fs::File::create(dest).map_err(|err| Error::path(dest, err))?;
        let written = io::copy(&mut self, &mut out)?;
        out.flush()?;
        self.release()?;
        Ok(written)
    }

    fn release(&mut self) -> io::Result<()> {
        // The reader holds the file open, which must be closed before the file can be removed
        drop(std::mem::replace(&mut self.reader, Box::new(io::empty())));
        match self.backing.take() {
            Some(path) => path.close(),
            None => Ok(()),
        }
    }
}

impl Read for ZipArtefact {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Drop for ZipArtefact {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!("failed to remove temporary archive: {err}");
        }
    }
}

impl std::fmt::Debug for ZipArtefact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArtefact")
            .field("size", &self.size)
            .field("backing", &self.backing.as_deref())
            .finish()
    }
}

pub(crate) fn temp_file() -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".zip")
        .tempfile()
}

/// Writes entries into a zip archive backed by a temporary file.
pub(crate) struct ZipBuilder {
    writer: zip::ZipWriter<NamedTempFile>,
    entries: usize,
}

impl ZipBuilder {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            writer: zip::ZipWriter::new(temp_file()?),
            entries: 0,
        })
    }

    /// Number of entries written so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Add a directory entry. The name is stored with a trailing `/`.
    pub fn add_directory(&mut self, name: &str, mode: u32) -> Result<(), Error> {
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(mode);
        self.writer
            .add_directory(format!("{}/", name.trim_end_matches('/')), options)?;
        self.entries += 1;
        Ok(())
    }

    /// Add a deflated file entry with the bytes of `content`. `size` is the declared uncompressed
    /// size, if known: an unknown or oversized entry is written with ZIP64 sizes.
    pub fn add_file<R: Read + ?Sized>(
        &mut self,
        name: &str,
        mode: u32,
        size: Option<u64>,
        content: &mut R,
    ) -> Result<u64, Error> {
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(mode)
            .large_file(size.is_none_or(|size| size > ZIP32_LIMIT));
        self.writer.start_file(name, options)?;
        let written = io::copy(content, &mut self.writer)?;
        self.entries += 1;
        Ok(written)
    }

    pub fn add_symlink(&mut self, name: &str, target: &str, mode: u32) -> Result<(), Error> {
        let options = SimpleFileOptions::default().unix_permissions(mode);
        self.writer.add_symlink(name, target, options)?;
        self.entries += 1;
        Ok(())
    }

    /// Write the central directory and reopen the archive for reading.
    pub fn finish(self) -> Result<ZipArtefact, Error> {
        ZipArtefact::from_temp(self.writer.finish()?)
    }
}

/// Whether `path` is an `http://` or `https://` URL.
pub fn is_web_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// The lowercase extension of the last path component, including the leading dot.
fn extension(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rfind('.').map(|dot| name[dot..].to_lowercase())
}

/// Whether the final extension of `path` is one of `extensions`.
pub fn has_ext(path: &str, extensions: &[&str]) -> bool {
    extension(path).is_some_and(|ext| extensions.contains(&ext.as_str()))
}

pub fn is_zip_ext(path: &str) -> bool {
    has_ext(path, ZIP_EXTENSIONS)
}

pub fn is_tar_ext(path: &str) -> bool {
    has_ext(path, TAR_EXTENSIONS)
}

/// `.tgz`, or a gzip extension directly preceded by `.tar` (`.tar.gz`, `.tar.gzip`).
pub fn is_tar_gz_ext(path: &str) -> bool {
    if has_ext(path, TAR_GZ_EXTENSIONS) {
        return true;
    }
    if !has_ext(path, GZIP_EXTENSIONS) {
        return false;
    }
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.rfind('.').is_some_and(|dot| is_tar_ext(&path[..dot]))
}

/// Whether `path` names any archive format this crate can normalise.
pub fn is_archive_ext(path: &str) -> bool {
    is_zip_ext(path) || is_tar_ext(path) || is_tar_gz_ext(path)
}

/// Local file header, end of central directory (empty archive) or spanning marker.
pub fn is_zip_magic(head: &[u8]) -> bool {
    matches!(
        head,
        [b'P', b'K', 3, 4, ..] | [b'P', b'K', 5, 6, ..] | [b'P', b'K', 7, 8, ..]
    )
}

/// ELF, PE, Mach-O (thin or fat) or a `#!` script.
pub fn is_executable_magic(head: &[u8]) -> bool {
    matches!(
        head,
        [0x7f, b'E', b'L', b'F', ..]
            | [b'M', b'Z', ..]
            | [b'#', b'!', ..]
            | [0xfe, 0xed, 0xfa, 0xce, ..]
            | [0xfe, 0xed, 0xfa, 0xcf, ..]
            | [0xce, 0xfa, 0xed, 0xfe, ..]
            | [0xcf, 0xfa, 0xed, 0xfe, ..]
            | [0xca, 0xfe, 0xba, 0xbe, ..]
    )
}

/// Number of leading bytes read by [`sniff`].
pub const SNIFF_LEN: u64 = 512;

/// Read the first bytes of `reader` for content sniffing, returning them together with a reader
/// which yields the whole stream again from the start.
pub fn sniff<R: Read>(mut reader: R) -> io::Result<(Vec<u8>, io::Chain<io::Cursor<Vec<u8>>, R>)> {
    let mut head = Vec::new();
    (&mut reader).take(SNIFF_LEN).read_to_end(&mut head)?;
    Ok((head.clone(), io::Cursor::new(head).chain(reader)))
}
