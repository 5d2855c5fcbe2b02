//! Fixtures shared by the unit tests.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::Mutex;

use url::Url;

use crate::archive::ZipArtefact;
use crate::transport::{Credentials, Response, Transport};

/// Builds an in-memory tarball.
pub(crate) struct TarFixture {
    builder: tar::Builder<Vec<u8>>,
}

impl TarFixture {
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    fn header(kind: tar::EntryType, size: u64, mode: u32) -> tar::Header {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_size(size);
        header.set_mode(mode);
        header
    }

    pub fn dir(mut self, path: &str) -> Self {
        let mut header = Self::header(tar::EntryType::Directory, 0, 0o755);
        self.builder
            .append_data(&mut header, path, io::empty())
            .unwrap();
        self
    }

    pub fn file(mut self, path: &str, content: &[u8], mode: u32) -> Self {
        let mut header = Self::header(tar::EntryType::Regular, content.len() as u64, mode);
        self.builder.append_data(&mut header, path, content).unwrap();
        self
    }

    /// A pax global header entry, as `git archive` writes before the first file.
    pub fn pax_global_header(mut self, records: &[u8]) -> Self {
        let mut header =
            Self::header(tar::EntryType::XGlobalHeader, records.len() as u64, 0o644);
        self.builder
            .append_data(&mut header, "pax_global_header", records)
            .unwrap();
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        let mut header = Self::header(tar::EntryType::Symlink, 0, 0o777);
        self.builder.append_link(&mut header, path, target).unwrap();
        self
    }

    pub fn tar(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }

    pub fn tar_gz(self) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&self.tar()).unwrap();
        encoder.finish().unwrap()
    }
}

#[derive(Debug)]
pub(crate) struct ZipEntry {
    pub name: String,
    pub mode: u32,
}

/// Every entry of the archive in central-directory order.
pub(crate) fn zip_entries(mut artefact: ZipArtefact) -> Vec<ZipEntry> {
    let mut bytes = Vec::new();
    artefact.read_to_end(&mut bytes).unwrap();
    let mut zip = zip::ZipArchive::new(io::Cursor::new(bytes)).unwrap();
    (0..zip.len())
        .map(|i| {
            let file = zip.by_index(i).unwrap();
            ZipEntry {
                name: file.name().to_string(),
                mode: file.unix_mode().unwrap_or(0),
            }
        })
        .collect()
}

pub(crate) fn zip_file_content(mut artefact: ZipArtefact, name: &str) -> Vec<u8> {
    let mut bytes = Vec::new();
    artefact.read_to_end(&mut bytes).unwrap();
    let mut zip = zip::ZipArchive::new(io::Cursor::new(bytes)).unwrap();
    let mut content = Vec::new();
    zip.by_name(name).unwrap().read_to_end(&mut content).unwrap();
    content
}

#[derive(Debug, Clone)]
struct Canned {
    status: u16,
    body: Vec<u8>,
    content_length: bool,
}

/// A [`Transport`] serving canned responses keyed by URL path. Unknown paths get a 404.
#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    responses: HashMap<String, Canned>,
    requests: Mutex<Vec<(String, Option<Credentials>)>>,
}

impl FakeTransport {
    pub fn respond(mut self, path: &str, status: u16, body: &[u8]) -> Self {
        self.responses.insert(
            path.to_string(),
            Canned {
                status,
                body: body.to_vec(),
                content_length: true,
            },
        );
        self
    }

    /// Like [`FakeTransport::respond`], but without announcing a `Content-Length`.
    pub fn respond_chunked(mut self, path: &str, body: &[u8]) -> Self {
        self.responses.insert(
            path.to_string(),
            Canned {
                status: 200,
                body: body.to_vec(),
                content_length: false,
            },
        );
        self
    }

    /// URLs requested so far, with the credentials sent alongside.
    pub fn requests(&self) -> Vec<(String, Option<Credentials>)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &Url, credentials: Option<&Credentials>) -> Result<Response, crate::Error> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), credentials.cloned()));
        let canned = self.responses.get(url.path()).cloned().unwrap_or(Canned {
            status: 404,
            body: b"not found".to_vec(),
            content_length: true,
        });
        Ok(Response {
            status: canned.status,
            content_length: canned.content_length.then_some(canned.body.len() as u64),
            body: Box::new(io::Cursor::new(canned.body)),
        })
    }
}
