use std::io::Read;

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{encoding} decode failed: {source}")]
    Corrupt {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("decoded body exceeds {0} bytes")]
    TooLarge(usize),
}

/// `Content-Encoding` values the buffering path can undo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Identity,
    Gzip,
    Deflate,
    Brotli,
}

impl Encoding {
    /// `None` for encodings that cannot be decoded (stacked or unknown)
    pub fn parse(header: Option<&str>) -> Option<Self> {
        let Some(value) = header.map(str::trim).filter(|v| !v.is_empty()) else {
            return Some(Encoding::Identity);
        };
        match value.to_ascii_lowercase().as_str() {
            "identity" => Some(Encoding::Identity),
            "gzip" | "x-gzip" => Some(Encoding::Gzip),
            "deflate" => Some(Encoding::Deflate),
            "br" => Some(Encoding::Brotli),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Identity => "identity",
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
            Encoding::Brotli => "br",
        }
    }
}

/// Decode a complete body, refusing to inflate beyond `limit` bytes.
pub fn decode(body: &[u8], encoding: Encoding, limit: usize) -> Result<Vec<u8>, DecodeError> {
    match encoding {
        Encoding::Identity => Ok(body.to_vec()),
        Encoding::Gzip => read_limited(GzDecoder::new(body), "gzip", limit),
        // "deflate" is zlib-wrapped per RFC 9110, but raw deflate is common
        Encoding::Deflate => read_limited(ZlibDecoder::new(body), "deflate", limit)
            .or_else(|_| read_limited(DeflateDecoder::new(body), "deflate", limit)),
        Encoding::Brotli => read_limited(brotli::Decompressor::new(body, 4096), "br", limit),
    }
}

fn read_limited<R: Read>(reader: R, encoding: &'static str, limit: usize) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    reader
        .take(cap)
        .read_to_end(&mut out)
        .map_err(|source| DecodeError::Corrupt { encoding, source })?;
    if out.len() > limit {
        return Err(DecodeError::TooLarge(limit));
    }
    Ok(out)
}
