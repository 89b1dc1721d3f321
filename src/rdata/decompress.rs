//! Whole-file decompression for `.rda` payloads.
//!
//! `save()` and `tools::resaveRdaFiles()` emit gzip, bzip2 or xz streams;
//! the codec is sniffed from the leading magic bytes.

use super::error::{RDataError, Result};
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Gzip,
    Bzip2,
    Xz,
    Plain,
}

impl Codec {
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(&[0x1f, 0x8b]) {
            Codec::Gzip
        } else if data.starts_with(b"BZh") {
            Codec::Bzip2
        } else if data.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
            Codec::Xz
        } else {
            Codec::Plain
        }
    }
}

/// Return the decompressed stream, or the input unchanged if it is not compressed.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    match Codec::sniff(data) {
        Codec::Gzip => decompress_gzip(data),
        Codec::Bzip2 => decompress_bzip2(data),
        Codec::Xz => decompress_xz(data),
        Codec::Plain => Ok(data.to_vec()),
    }
}

fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::MultiGzDecoder;

    let mut out = Vec::with_capacity(data.len() * 4);
    MultiGzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| RDataError::Decompression(format!("gzip: {}", e)))?;
    Ok(out)
}

fn decompress_bzip2(data: &[u8]) -> Result<Vec<u8>> {
    use bzip2::read::MultiBzDecoder;

    let mut out = Vec::with_capacity(data.len() * 4);
    MultiBzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| RDataError::Decompression(format!("bzip2: {}", e)))?;
    Ok(out)
}

fn decompress_xz(data: &[u8]) -> Result<Vec<u8>> {
    let mut input = std::io::BufReader::new(data);
    let mut out = Vec::with_capacity(data.len() * 4);
    lzma_rs::xz_decompress(&mut input, &mut out)
        .map_err(|e| RDataError::Decompression(format!("xz: {}", e)))?;
    Ok(out)
}
