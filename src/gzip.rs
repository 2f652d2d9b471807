//! Deterministic gzip for gzip-enabled remotes.
//!
//! When a remote serves pre-compressed assets, the bytes that live there
//! are gzip output, so local hashing and uploading must apply the same
//! transform. The encoder pins mtime to 0 and the level to 6 so identical
//! input always produces identical output, keeping content hashes stable
//! across runs and machines.

use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use std::io::{self, Read, Write};
use std::path::Path;

/// Matches the default content-type allowlist of gzip-enabled remotes:
/// stylesheets, scripts, and SVG. Everything else uploads verbatim.
const COMPRESSIBLE_EXTENSIONS: &[&str] = &["css", "js", "mjs", "svg"];

/// Whether the gzip transform applies to this file when gzip is enabled
pub fn is_compressible(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_lowercase();
            COMPRESSIBLE_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Gzip data with fixed settings so output is byte-for-byte reproducible
pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .write(Vec::new(), Compression::new(6));
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inverse of `compress`, mostly useful in tests
pub fn decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut output = Vec::new();
    decoder.read_to_end(&mut output)?;
    Ok(output)
}
