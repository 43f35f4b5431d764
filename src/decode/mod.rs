//
// Copyright 2024 tbf Contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Parses a complete tbf byte stream into a `Document`.
//!
//! Sections are consumed in the fixed order the format mandates: header,
//! layers, relations, attributes. Layers are materialized up front with
//! pre-sized object arrays (ids `0..object_count`) so relations and
//! attribute chunks can address objects directly by id. There is no
//! back-edge in the grammar and no lookahead beyond a single peeked byte
//! (used to disambiguate the two attribute chunk layouts).

mod parser;

use encoding_rs::Encoding;

use crate::document::{
    ChildRef, Document, Header, Layer, LayerObject, ATTRS_END, ATTRS_START, CHUNK_END,
    CHUNK_FULL_START, CHUNK_LINKED_START, HEADER_END, HEADER_START, LAYERS_END, LAYERS_START,
    LAYER_END, LAYER_START, RELATIONS_END, RELATIONS_START, RELATION_END, RELATION_START,
};
use crate::error::{Error, Result};

/// Parses exactly one document from `source`. The entire input must already
/// be in memory; the format has no internal delimiter marking its own end.
pub fn decode(source: &[u8]) -> Result<Document> {
    let mut decoder = Decoder::new(source);
    decoder.parse_document()
}

struct Decoder<'a> {
    input: &'a [u8],
}

impl<'a> Decoder<'a> {
    fn new(input: &'a [u8]) -> Self {
        Decoder { input }
    }

    fn marker(&mut self) -> Result<u8> {
        let (rest, value) = parser::primitives::marker(self.input).map_err(|_| Error::TruncatedStream)?;
        self.input = rest;
        Ok(value)
    }

    fn peek_byte(&self) -> Result<u8> {
        self.input.first().copied().ok_or(Error::TruncatedStream)
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        let got = self.marker()?;
        if got == expected {
            Ok(())
        } else {
            Err(Error::UnexpectedMarker { expected, got })
        }
    }

    fn u32(&mut self) -> Result<u32> {
        let (rest, value) = parser::primitives::u32_be(self.input).map_err(|_| Error::TruncatedStream)?;
        self.input = rest;
        Ok(value)
    }

    fn until_separator(&mut self) -> Result<&'a [u8]> {
        let (rest, value) =
            parser::primitives::until_separator(self.input).map_err(|_| Error::TruncatedStream)?;
        self.input = rest;
        Ok(value)
    }

    fn text(&mut self, encoding: &'static Encoding, encoding_name: &str) -> Result<String> {
        let bytes = self.until_separator()?;
        decode_text(encoding, bytes, encoding_name)
    }

    fn parse_document(&mut self) -> Result<Document> {
        let (encoding_name, encoding) = self.parse_header()?;
        let mut document = Document::with_header(Header::new(encoding_name.clone()));
        self.parse_layers(&mut document, encoding, &encoding_name)?;
        self.parse_relations(&mut document)?;
        self.parse_attrs(&mut document, encoding, &encoding_name)?;
        Ok(document)
    }

    /// Consumes `HEADER_START`, the encoding name, `SEPARATOR` and `HEADER_END`,
    /// and resolves the declared name to a concrete text encoding.
    fn parse_header(&mut self) -> Result<(String, &'static Encoding)> {
        self.expect(HEADER_START)?;
        let name_bytes = self.until_separator()?;
        let name = String::from_utf8(name_bytes.to_vec())
            .map_err(|_| Error::BadTextEncoding { encoding: "<header>".to_owned() })?;
        let encoding = Encoding::for_label(name_bytes)
            .ok_or_else(|| Error::BadTextEncoding { encoding: name.clone() })?;
        self.expect(HEADER_END)?;
        Ok((name, encoding))
    }

    /// Consumes the layer-definitions section, materializing each `Layer` with
    /// `object_count` pre-allocated `LayerObject`s (ids `0..object_count`).
    fn parse_layers(
        &mut self,
        document: &mut Document,
        encoding: &'static Encoding,
        encoding_name: &str,
    ) -> Result<()> {
        self.expect(LAYERS_START)?;
        let layer_count = self.u32()?;
        for layer_id in 0..layer_count {
            self.expect(LAYER_START)?;
            let name = self.text(encoding, encoding_name)?;
            let object_count = self.u32()?;
            self.expect(LAYER_END)?;

            let mut layer = Layer::new(layer_id, name);
            layer.add_objects((0..object_count).map(|object_id| LayerObject::new(object_id, layer_id)));
            document.add_layer(layer);
        }
        self.expect(LAYERS_END)?;
        Ok(())
    }

    /// Consumes the relations section, attaching each decoded child reference
    /// to the parent object it names.
    fn parse_relations(&mut self, document: &mut Document) -> Result<()> {
        self.expect(RELATIONS_START)?;
        let group_count = self.u32()?;
        for _ in 0..group_count {
            self.expect(RELATION_START)?;
            let parent_layer_id = self.u32()?;
            let child_layer_id = self.u32()?;
            let pair_count = self.u32()?;

            let parent_layer_len = layer_object_count(document, parent_layer_id)?;
            let child_layer_len = layer_object_count(document, child_layer_id)?;

            for _ in 0..pair_count {
                let parent_id = self.u32()?;
                let child_id = self.u32()?;
                if parent_id as usize >= parent_layer_len {
                    return Err(Error::OutOfRangeObjectId { layer_id: parent_layer_id, object_id: parent_id });
                }
                if child_id as usize >= child_layer_len {
                    return Err(Error::OutOfRangeObjectId { layer_id: child_layer_id, object_id: child_id });
                }
                let parent_layer = document.layer_by_id_mut(parent_layer_id).expect("checked above");
                parent_layer.objects[parent_id as usize]
                    .add_child(ChildRef::new(child_layer_id, child_id));
            }
            self.expect(RELATION_END)?;
        }
        self.expect(RELATIONS_END)?;
        Ok(())
    }

    /// Consumes the attributes section, peeking one byte per chunk to select
    /// between the full and linked layouts.
    fn parse_attrs(
        &mut self,
        document: &mut Document,
        encoding: &'static Encoding,
        encoding_name: &str,
    ) -> Result<()> {
        self.expect(ATTRS_START)?;
        let chunk_count = self.u32()?;
        for _ in 0..chunk_count {
            match self.peek_byte()? {
                CHUNK_FULL_START => self.parse_full_chunk(document, encoding, encoding_name)?,
                CHUNK_LINKED_START => self.parse_linked_chunk(document, encoding, encoding_name)?,
                got => return Err(Error::UnexpectedChunkMarker { got }),
            }
        }
        self.expect(ATTRS_END)?;
        Ok(())
    }

    fn parse_full_chunk(
        &mut self,
        document: &mut Document,
        encoding: &'static Encoding,
        encoding_name: &str,
    ) -> Result<()> {
        self.expect(CHUNK_FULL_START)?;
        let layer_id = self.u32()?;
        let attr_name = self.text(encoding, encoding_name)?;
        let object_count = layer_object_count(document, layer_id)?;

        for index in 0..object_count {
            let value = self.until_separator()?.to_vec();
            let layer = document.layer_by_id_mut(layer_id).expect("checked above");
            layer.objects[index].set_attr(attr_name.clone(), value);
        }
        self.expect(CHUNK_END)?;
        Ok(())
    }

    fn parse_linked_chunk(
        &mut self,
        document: &mut Document,
        encoding: &'static Encoding,
        encoding_name: &str,
    ) -> Result<()> {
        self.expect(CHUNK_LINKED_START)?;
        let layer_id = self.u32()?;
        let attr_name = self.text(encoding, encoding_name)?;
        let entry_count = self.u32()?;
        let object_count = layer_object_count(document, layer_id)?;

        for _ in 0..entry_count {
            let object_id = self.u32()?;
            let value = self.until_separator()?.to_vec();
            if object_id as usize >= object_count {
                return Err(Error::OutOfRangeObjectId { layer_id, object_id });
            }
            let layer = document.layer_by_id_mut(layer_id).expect("checked above");
            layer.objects[object_id as usize].set_attr(attr_name.clone(), value);
        }
        self.expect(CHUNK_END)?;
        Ok(())
    }
}

fn layer_object_count(document: &Document, layer_id: u32) -> Result<usize> {
    document
        .layer_by_id(layer_id)
        .map(|layer| layer.objects.len())
        .ok_or(Error::UnknownLayerId(layer_id))
}

fn decode_text(encoding: &'static Encoding, bytes: &[u8], encoding_name: &str) -> Result<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|cow| cow.into_owned())
        .ok_or_else(|| Error::BadTextEncoding { encoding: encoding_name.to_owned() })
}
