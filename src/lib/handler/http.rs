//! Archives and plain files served over HTTP(S).

use std::io::Read;

use url::Url;

use crate::Error;
use crate::archive::{self, ZipArtefact, ZipBuilder};
use crate::fingerprint::fingerprint;
use crate::handler::Handler;
use crate::source::Source;
use crate::transcode::{self, DEFAULT_FILE_MODE, Encoding};
use crate::transport::{Credentials, Response};

const EXECUTABLE_MODE: u32 = 0o755;

/// Entry name used for a downloaded file when the URL has no final path segment.
pub const DEFAULT_FILE_NAME: &str = "download";

/// Fetches `http://` and `https://` URLs through the transport attached to the source.
///
/// A zip body is passed through untouched, a tarball is transcoded, and anything else becomes the
/// only entry of a new archive.
#[derive(Debug, Default, Clone)]
pub struct HttpHandler;

impl HttpHandler {
    pub const NAME: &'static str = "http";

    /// Send the GET for `source`, failing on a non-2xx status. Credentials embedded in the URL
    /// are sent as basic authentication and removed from the request URL.
    fn request(&self, source: &Source) -> Result<(Url, Response), Error> {
        let mut url = Url::parse(source.path())?;
        let credentials = Credentials::take_from(&mut url);
        let transport = source.transport().ok_or_else(|| Error::NoTransport {
            url: url.to_string(),
        })?;
        tracing::debug!(%url, "downloading");
        let response = transport.get(&url, credentials.as_ref())?.error_for_status()?;
        Ok((url, response))
    }

    fn file_name(url: &Url) -> String {
        url.path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                percent_encoding::percent_decode_str(segment)
                    .decode_utf8_lossy()
                    .into_owned()
            })
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
    }

    fn wrap_file<R: Read>(
        name: &str,
        head: &[u8],
        size: Option<u64>,
        mut body: R,
    ) -> Result<ZipArtefact, Error> {
        let mode = if archive::is_executable_magic(head) {
            EXECUTABLE_MODE
        } else {
            DEFAULT_FILE_MODE
        };
        tracing::debug!(name, mode = format_args!("{mode:o}"), "wrapping file in zip archive");
        let mut zip = ZipBuilder::new()?;
        zip.add_file(name, mode, size, &mut body)?;
        zip.finish()
    }
}

impl Handler for HttpHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn detect(&self, source: &Source) -> bool {
        let path = source.path();
        if !archive::is_web_url(path) {
            return false;
        }
        if archive::is_archive_ext(path) {
            return true;
        }
        if source.transport().is_none() {
            return false;
        }
        let sniffed = self
            .request(source)
            .and_then(|(_, response)| archive::sniff(response.body).map_err(Error::from));
        match sniffed {
            Ok((head, _)) => archive::is_zip_magic(&head),
            Err(err) => {
                tracing::debug!(path, "content sniffing failed: {err}");
                false
            }
        }
    }

    fn zip(&self, source: &Source) -> Result<ZipArtefact, Error> {
        let (url, response) = self.request(source)?;
        if let Some(encoding) = Encoding::from_path(url.path()) {
            return transcode::transcode(response.body, encoding);
        }
        let size = response.content_length;
        let (head, body) = archive::sniff(response.body)?;
        if archive::is_zip_magic(&head) {
            return match size {
                Some(size) => Ok(ZipArtefact::new(body, size)),
                None => ZipArtefact::spool(body),
            };
        }
        Self::wrap_file(&Self::file_name(&url), &head, size, body)
    }

    fn fingerprint(&self, source: &Source) -> Result<String, Error> {
        let (_, response) = self.request(source)?;
        Ok(fingerprint(response.body)?)
    }
}
