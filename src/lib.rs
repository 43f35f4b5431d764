//
// Copyright 2024 tbf Contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! A native Rust encoder and decoder for tbf, a compact binary container
//! format for interlinear glossed text (IGT) documents.
//!
//! A [`Document`] is an ordered set of named [`Layer`]s, each holding an
//! ordered sequence of [`LayerObject`]s with string attributes and
//! cross-layer child relations. [`encode`] and [`decode`] move a `Document`
//! to and from a single contiguous byte stream; [`encode_to_bytes`],
//! [`decode_from_bytes`], [`encode_to_text`] and [`decode_from_text`] are
//! convenience wrappers over the two core functions.

mod convenience;
mod decode;
mod document;
mod encode;
mod error;

pub use convenience::{decode_from_bytes, decode_from_text, encode_to_bytes, encode_to_text};
pub use decode::decode;
pub use document::{AttributeValue, ChildRef, Document, Header, Layer, LayerObject};
pub use encode::encode;
pub use error::{Error, Result};
