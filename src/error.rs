//
// Copyright 2024 tbf Contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// tbf encoding and decoding error.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
    /// A marker byte did not match what the grammar expected at this position.
    #[error("unexpected marker: expected {expected:#04x}, got {got:#04x}")]
    UnexpectedMarker { expected: u8, got: u8 },

    /// The byte peeked to select a chunk layout was neither CHUNK_FULL_START nor CHUNK_LINKED_START.
    #[error("unexpected chunk marker: {got:#04x}")]
    UnexpectedChunkMarker { got: u8 },

    /// Read past the end of input inside a fixed-width field or a declared count.
    #[error("truncated stream")]
    TruncatedStream,

    /// A string could not be decoded under the declared header encoding.
    #[error("could not decode bytes as {encoding}")]
    BadTextEncoding { encoding: String },

    /// A relation or linked-chunk entry referenced an object index outside the materialized layer.
    #[error("object id {object_id} out of range for layer {layer_id}")]
    OutOfRangeObjectId { layer_id: u32, object_id: u32 },

    /// A relation or chunk referenced a layer id not declared in the layers section.
    #[error("unknown layer id {0}")]
    UnknownLayerId(u32),

    /// An encoded string contained the reserved separator byte.
    #[error("string contains the separator byte and cannot be framed: {0:?}")]
    SeparatorInString(String),

    /// The header's declared encoding name does not name a supported text encoding.
    #[error("unsupported encoding name: {0}")]
    BadEncoding(String),

    /// A count or id exceeded the 32-bit range the wire format can represent.
    #[error("integer overflow encoding a count or id")]
    IntegerOverflow,

    /// A child reference targeted an object whose layer is not present in this document.
    #[error("dangling child reference to layer {layer_id} object {object_id}")]
    DanglingChild { layer_id: u32, object_id: u32 },

    /// The underlying byte sink or source failed. Not part of the wire grammar;
    /// surfaced as-is since the core treats the sink/source as an opaque channel.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
