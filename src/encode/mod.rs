//
// Copyright 2024 tbf Contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Walks a `Document` and writes it as a single contiguous tbf byte stream.
//!
//! Cross-layer child relations and per-layer attributes are each grouped
//! once up front (`BTreeMap`s give deterministic iteration order, so two
//! encodes of the same document produce byte-identical output), then each
//! attribute group picks a full or linked chunk layout by the overhead
//! heuristic before anything is written.

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::io::Write;

use encoding_rs::Encoding;

use crate::document::{
    AttributeValue, Document, LayerObject, ATTRS_END, ATTRS_START, CHUNK_END,
    CHUNK_FULL_START, CHUNK_LINKED_START, HEADER_END, HEADER_START, LAYERS_END, LAYERS_START,
    LAYER_END, LAYER_START, RELATIONS_END, RELATIONS_START, RELATION_END, RELATION_START,
    SEPARATOR,
};
use crate::error::{Error, Result};

/// Writes `document` to `sink` as a single contiguous tbf byte stream.
///
/// `document` is read but never mutated; the same document may safely be
/// encoded more than once, including concurrently from multiple threads,
/// since encoding takes only a shared view of it.
pub fn encode(document: &Document, sink: &mut impl Write) -> Result<()> {
    let encoding = resolve_encoding(&document.header.encoding)?;

    write_header(document, sink)?;
    write_layers(document, encoding, sink)?;
    write_relations(document, sink)?;
    write_attrs(document, encoding, sink)?;
    Ok(())
}

fn resolve_encoding(name: &str) -> Result<&'static Encoding> {
    Encoding::for_label(name.as_bytes()).ok_or_else(|| Error::BadEncoding(name.to_owned()))
}

fn to_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::IntegerOverflow)
}

fn write_marker(sink: &mut impl Write, marker: u8) -> Result<()> {
    sink.write_all(&[marker]).map_err(Error::from)
}

fn write_separator(sink: &mut impl Write) -> Result<()> {
    write_marker(sink, SEPARATOR)
}

fn write_u32(sink: &mut impl Write, value: u32) -> Result<()> {
    sink.write_all(&value.to_be_bytes()).map_err(Error::from)
}

/// Encodes `s` under `encoding` and rejects it if the result contains the
/// reserved separator byte or cannot be represented in the encoding at all.
fn encode_text(encoding: &'static Encoding, s: &str) -> Result<Vec<u8>> {
    let (cow, _, had_errors) = encoding.encode(s);
    if had_errors {
        return Err(Error::BadEncoding(format!(
            "{:?} is not representable in {}",
            s,
            encoding.name()
        )));
    }
    let bytes = cow.into_owned();
    if bytes.contains(&SEPARATOR) {
        return Err(Error::SeparatorInString(s.to_owned()));
    }
    Ok(bytes)
}

/// Resolves an attribute value to the raw bytes written to the wire,
/// rejecting raw byte values that themselves contain the separator byte.
fn resolve_attr_bytes(encoding: &'static Encoding, value: &AttributeValue) -> Result<Vec<u8>> {
    if let AttributeValue::Text(s) = value {
        return encode_text(encoding, s);
    }
    let bytes = value.as_bytes().expect("AttributeValue is Bytes here");
    if bytes.contains(&SEPARATOR) {
        return Err(Error::SeparatorInString(String::from_utf8_lossy(bytes).into_owned()));
    }
    Ok(bytes.to_vec())
}

fn write_header(document: &Document, sink: &mut impl Write) -> Result<()> {
    let name = &document.header.encoding;
    if name.as_bytes().contains(&SEPARATOR) {
        return Err(Error::SeparatorInString(name.clone()));
    }
    write_marker(sink, HEADER_START)?;
    sink.write_all(name.as_bytes()).map_err(Error::from)?;
    write_separator(sink)?;
    write_marker(sink, HEADER_END)?;
    Ok(())
}

fn write_layers(document: &Document, encoding: &'static Encoding, sink: &mut impl Write) -> Result<()> {
    write_marker(sink, LAYERS_START)?;
    write_u32(sink, to_u32(document.layers().len())?)?;
    for layer in document.layers() {
        write_marker(sink, LAYER_START)?;
        let name_bytes = encode_text(encoding, &layer.name)?;
        sink.write_all(&name_bytes).map_err(Error::from)?;
        write_separator(sink)?;
        write_u32(sink, to_u32(layer.objects.len())?)?;
        write_marker(sink, LAYER_END)?;
    }
    write_marker(sink, LAYERS_END)?;
    Ok(())
}

/// Groups every parent-to-child edge in the document by `(parent_layer_id,
/// child_layer_id)`. Iteration order over the resulting map is by that key,
/// so two encodes of the same document emit relation groups in the same
/// order. Fails with `DanglingChild` if a child names a layer absent from
/// this document.
fn group_relations(document: &Document) -> Result<BTreeMap<(u32, u32), Vec<(u32, u32)>>> {
    let mut groups: BTreeMap<(u32, u32), Vec<(u32, u32)>> = BTreeMap::new();
    for object in document.all_objects() {
        for child in &object.children {
            if document.layer_by_id(child.layer_id).is_none() {
                return Err(Error::DanglingChild { layer_id: child.layer_id, object_id: child.object_id });
            }
            groups
                .entry((object.layer_id, child.layer_id))
                .or_default()
                .push((object.id, child.object_id));
        }
    }
    Ok(groups)
}

fn write_relations(document: &Document, sink: &mut impl Write) -> Result<()> {
    let groups = group_relations(document)?;

    write_marker(sink, RELATIONS_START)?;
    write_u32(sink, to_u32(groups.len())?)?;
    for ((parent_layer_id, child_layer_id), pairs) in &groups {
        write_marker(sink, RELATION_START)?;
        write_u32(sink, *parent_layer_id)?;
        write_u32(sink, *child_layer_id)?;
        write_u32(sink, to_u32(pairs.len())?)?;
        for (parent_id, child_id) in pairs {
            write_u32(sink, *parent_id)?;
            write_u32(sink, *child_id)?;
        }
        write_marker(sink, RELATION_END)?;
    }
    write_marker(sink, RELATIONS_END)?;
    Ok(())
}

type AttrValuesByObject = BTreeMap<u32, Vec<u8>>;

/// Groups every attribute value in the document by `(layer_id, attribute_name)`.
/// Resolves each value to its wire bytes here so the chunk-selection
/// heuristic and the writers below never need to re-touch `AttributeValue`.
fn group_attrs(
    document: &Document,
    encoding: &'static Encoding,
) -> Result<BTreeMap<(u32, String), AttrValuesByObject>> {
    let mut groups: BTreeMap<(u32, String), AttrValuesByObject> = BTreeMap::new();
    for layer in document.layers() {
        for object in &layer.objects {
            for (name, value) in &object.attrs {
                let bytes = resolve_attr_bytes(encoding, value)?;
                groups.entry((layer.id, name.clone())).or_default().insert(object.id, bytes);
            }
        }
    }
    Ok(groups)
}

/// Linked overhead: one 4-byte id plus one separator per present value.
fn linked_chunk_overhead(present_count: usize) -> usize {
    present_count * (4 + 1)
}

/// Full overhead: one separator per object in the layer, present or not.
fn full_chunk_overhead(layer_object_count: usize) -> usize {
    layer_object_count
}

fn write_attrs(document: &Document, encoding: &'static Encoding, sink: &mut impl Write) -> Result<()> {
    let groups = group_attrs(document, encoding)?;

    write_marker(sink, ATTRS_START)?;
    write_u32(sink, to_u32(groups.len())?)?;
    for ((layer_id, attr_name), values) in &groups {
        let layer = document.layer_by_id(*layer_id).expect("attribute group layer always exists");
        if linked_chunk_overhead(values.len()) < full_chunk_overhead(layer.objects.len()) {
            write_linked_chunk(sink, *layer_id, attr_name, values, encoding)?;
        } else {
            write_full_chunk(sink, *layer_id, attr_name, values, &layer.objects, encoding)?;
        }
    }
    write_marker(sink, ATTRS_END)?;
    Ok(())
}

fn write_full_chunk(
    sink: &mut impl Write,
    layer_id: u32,
    attr_name: &str,
    values: &AttrValuesByObject,
    objects: &[LayerObject],
    encoding: &'static Encoding,
) -> Result<()> {
    write_marker(sink, CHUNK_FULL_START)?;
    write_u32(sink, layer_id)?;
    let name_bytes = encode_text(encoding, attr_name)?;
    sink.write_all(&name_bytes).map_err(Error::from)?;
    write_separator(sink)?;

    for object in objects {
        if let Some(value) = values.get(&object.id) {
            sink.write_all(value).map_err(Error::from)?;
        }
        write_separator(sink)?;
    }
    write_marker(sink, CHUNK_END)?;
    Ok(())
}

fn write_linked_chunk(
    sink: &mut impl Write,
    layer_id: u32,
    attr_name: &str,
    values: &AttrValuesByObject,
    encoding: &'static Encoding,
) -> Result<()> {
    write_marker(sink, CHUNK_LINKED_START)?;
    write_u32(sink, layer_id)?;
    let name_bytes = encode_text(encoding, attr_name)?;
    sink.write_all(&name_bytes).map_err(Error::from)?;
    write_separator(sink)?;
    write_u32(sink, to_u32(values.len())?)?;

    for (object_id, value) in values {
        write_u32(sink, *object_id)?;
        sink.write_all(value).map_err(Error::from)?;
        write_separator(sink)?;
    }
    write_marker(sink, CHUNK_END)?;
    Ok(())
}
