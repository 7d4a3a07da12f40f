//! Key/value text encoding
//!
//! Keys and values cross the command line and the dump stream either as raw
//! text or as `0x`-prefixed hexadecimal. The encoding only affects how bytes
//! are presented; stored bytes are always the decoded form.

use std::borrow::Cow;

use crate::error::{LdbError, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// How one side (key or value) of a pair is written as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingMode {
    #[default]
    Raw,
    Hex,
}

/// Encoding modes for keys and values, chosen independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Encoding {
    pub key: EncodingMode,
    pub value: EncodingMode,
}

impl Encoding {
    /// Same mode for keys and values
    pub fn uniform(mode: EncodingMode) -> Self {
        Self {
            key: mode,
            value: mode,
        }
    }

    /// Combine `--hex`, `--key_hex` and `--value_hex`
    pub fn from_flags(hex: bool, key_hex: bool, value_hex: bool) -> Self {
        let pick = |on: bool| {
            if hex || on {
                EncodingMode::Hex
            } else {
                EncodingMode::Raw
            }
        };
        Self {
            key: pick(key_hex),
            value: pick(value_hex),
        }
    }
}

/// Decode command-line text into bytes
pub fn decode(text: &str, mode: EncodingMode) -> Result<Vec<u8>> {
    decode_bytes(text.as_bytes(), mode)
}

/// Decode raw input bytes (e.g. one half of a dump line)
pub fn decode_bytes(input: &[u8], mode: EncodingMode) -> Result<Vec<u8>> {
    match mode {
        EncodingMode::Raw => Ok(input.to_vec()),
        EncodingMode::Hex => decode_hex(input),
    }
}

/// Encode bytes for an output stream; raw mode passes bytes through untouched
pub fn encode_bytes(bytes: &[u8], mode: EncodingMode) -> Cow<'_, [u8]> {
    match mode {
        EncodingMode::Raw => Cow::Borrowed(bytes),
        EncodingMode::Hex => Cow::Owned(encode_hex(bytes).into_bytes()),
    }
}

/// Lowercase `0x`-prefixed hex; the empty sequence is `0x`
pub fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for &b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Parse `0x` followed by an even number of hex digits (either case)
pub fn decode_hex(input: &[u8]) -> Result<Vec<u8>> {
    let digits = match input {
        [b'0', b'x' | b'X', rest @ ..] => rest,
        _ => {
            return Err(LdbError::InvalidEncoding(format!(
                "hex value must start with 0x: {}",
                String::from_utf8_lossy(input)
            )))
        }
    };

    if digits.len() % 2 != 0 {
        return Err(LdbError::InvalidEncoding(format!(
            "hex value has an odd number of digits: {}",
            String::from_utf8_lossy(input)
        )));
    }

    digits
        .chunks_exact(2)
        .map(|pair| match (nibble(pair[0]), nibble(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(LdbError::InvalidEncoding(format!(
                "invalid hex digit in {}",
                String::from_utf8_lossy(input)
            ))),
        })
        .collect()
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
