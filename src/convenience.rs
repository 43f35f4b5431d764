//
// Copyright 2024 tbf Contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Thin wrappers over `encode`/`decode` for callers who want an in-memory
//! byte buffer or a `String` rather than a `Write`/`&[u8]` pair.

use crate::document::Document;
use crate::error::{Error, Result};

/// Encodes `document` into a freshly allocated byte buffer.
pub fn encode_to_bytes(document: &Document) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    crate::encode::encode(document, &mut buffer)?;
    Ok(buffer)
}

/// Decodes a complete document from `bytes`.
pub fn decode_from_bytes(bytes: &[u8]) -> Result<Document> {
    crate::decode::decode(bytes)
}

/// Encodes `document` to bytes, then maps those bytes losslessly onto a
/// `String` by treating each byte as a Latin-1 (ISO-8859-1) codepoint. This
/// lets arbitrary encoded bytes -- including attribute values that are not
/// valid under the header's declared encoding -- survive a textual medium.
pub fn encode_to_text(document: &Document) -> Result<String> {
    let bytes = encode_to_bytes(document)?;
    Ok(bytes.into_iter().map(char::from).collect())
}

/// Inverts `encode_to_text`: maps each `char` back onto the single byte it
/// was built from and decodes the result. Fails if `text` contains any
/// character outside the Latin-1 range, since such a string could not have
/// come from `encode_to_text`.
pub fn decode_from_text(text: &str) -> Result<Document> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        let codepoint = c as u32;
        if codepoint > 0xFF {
            return Err(Error::BadTextEncoding { encoding: "iso-8859-1".to_owned() });
        }
        bytes.push(codepoint as u8);
    }
    decode_from_bytes(&bytes)
}
