//! Cheap change-detection tokens.

use std::io::{self, Read};

use sha1::{Digest, Sha1};

/// Number of leading bytes hashed by [`fingerprint`].
pub const FINGERPRINT_CHUNK: u64 = 5 * 1024;

/// Hex SHA-1 of at most the first [`FINGERPRINT_CHUNK`] bytes of `reader`.
///
/// Only the head of the stream is read, so large remote payloads are never downloaded in full.
/// The reader is consumed and dropped (closing it) once the bounded read finishes, whether or not
/// more data was available.
pub fn fingerprint<R: Read>(reader: R) -> io::Result<String> {
    let mut hasher = Sha1::new();
    io::copy(&mut reader.take(FINGERPRINT_CHUNK), &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
