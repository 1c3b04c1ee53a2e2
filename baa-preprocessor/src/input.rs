//! Reading and decoding source files.
//!
//! This is the only place in the front end that touches raw bytes. Files
//! may start with a UTF-8 BOM (EF BB BF), a UTF-16LE BOM (FF FE), or no
//! BOM at all, in which case UTF-8 is assumed. Anything else is rejected.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("تعذر قراءة الملف: {0}")]
    Io(#[from] std::io::Error),
    #[error("ترميز UTF-8 غير صالح في الملف")]
    InvalidUtf8,
    #[error("ترميز UTF-16LE غير صالح في الملف")]
    InvalidUtf16,
    #[error("ترميز غير مدعوم (UTF-16BE)")]
    UnsupportedEncoding,
}

/// Reads a source file, detecting the encoding from its BOM.
pub fn read_source_file(path: &Path) -> Result<String, DecodeError> {
    decode_source_bytes(&std::fs::read(path)?)
}

pub fn decode_source_bytes(bytes: &[u8]) -> Result<String, DecodeError> {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        // UTF-16 big-endian is deliberately not supported.
        Err(DecodeError::UnsupportedEncoding)
    } else if bytes.starts_with(&[0xFF, 0xFE]) {
        // UTF-16 little-endian.
        let payload = &bytes[2..];
        if payload.len() % 2 != 0 {
            return Err(DecodeError::InvalidUtf16);
        }
        let words: Vec<u16> = payload
            .chunks_exact(2)
            .map(|pair| pair[0] as u16 | (pair[1] as u16) << 8)
            .collect();
        String::from_utf16(&words).map_err(|_| DecodeError::InvalidUtf16)
    } else {
        // UTF-8, with or without a BOM.
        let payload = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
        std::str::from_utf8(payload)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8)
    }
}
