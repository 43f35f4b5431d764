//
// Copyright 2024 tbf Contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The tbf document format.
//!
//! Constants and structures defined in this module represent the wire
//! framing and in-memory document model of a tbf container.
//!
//! A tbf document is organized into four sections, written in this order:
//!
//! 1. Header
//! 2. Layer definitions
//! 3. Relations
//! 4. Attributes
//!
//! # References
//!
//! Ported from the `tbf.core.models` / `tbf.core.parsing` Python modules.

use std::collections::HashMap;

/// Terminates a variable-length byte run (string, header-encoding field, value run).
pub const SEPARATOR: u8 = 0x00;
/// Brackets the header section.
pub const HEADER_START: u8 = 0x01;
pub const HEADER_END: u8 = 0x02;
/// Brackets the layer-definitions section.
pub const LAYERS_START: u8 = 0x03;
pub const LAYERS_END: u8 = 0x04;
/// Brackets one layer definition.
pub const LAYER_START: u8 = 0x05;
pub const LAYER_END: u8 = 0x06;
/// Brackets the relations section.
pub const RELATIONS_START: u8 = 0x07;
pub const RELATIONS_END: u8 = 0x08;
/// Brackets one relation group.
pub const RELATION_START: u8 = 0x09;
pub const RELATION_END: u8 = 0x0A;
/// Brackets the attributes section.
pub const ATTRS_START: u8 = 0x0B;
pub const ATTRS_END: u8 = 0x0C;
/// Brackets a full (positional, dense) attribute chunk.
pub const CHUNK_FULL_START: u8 = 0x0D;
/// Brackets a linked (id, value) attribute chunk.
pub const CHUNK_LINKED_START: u8 = 0x0E;
pub const CHUNK_END: u8 = 0x0F;

/// The default textual encoding declared by a `Header` with no explicit value.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// A single attribute value as seen by the public API.
///
/// Callers may set either text (encoded under the header's declared encoding
/// at encode time) or raw bytes (passed through unchanged). The decoder only
/// ever produces `Bytes`, since the wire format carries no type tag for
/// attribute values.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum AttributeValue {
    /// Text to be encoded under the document's header encoding.
    Text(String),
    /// Raw bytes, written to the wire unchanged.
    Bytes(Vec<u8>),
}

impl AttributeValue {
    /// Returns the raw bytes this value already holds, if it is the `Bytes` variant.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::Bytes(b) => Some(b),
            AttributeValue::Text(_) => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Bytes(value)
    }
}

/// A reference to a `LayerObject` elsewhere in the same `Document`.
///
/// Child links are non-owning: they name an object by its layer and its id
/// within that layer rather than holding a pointer to it, so the object
/// graph never needs cycle collection.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ChildRef {
    pub layer_id: u32,
    pub object_id: u32,
}

impl ChildRef {
    pub fn new(layer_id: u32, object_id: u32) -> Self {
        ChildRef { layer_id, object_id }
    }
}

/// One unit within a `Layer`, identified by an id unique within that layer.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct LayerObject {
    pub id: u32,
    pub layer_id: u32,
    pub children: Vec<ChildRef>,
    pub attrs: HashMap<String, AttributeValue>,
}

impl LayerObject {
    /// Creates an object with the given id, to be added to the layer with `layer_id`.
    pub fn new(id: u32, layer_id: u32) -> Self {
        LayerObject {
            id,
            layer_id,
            children: Vec::new(),
            attrs: HashMap::new(),
        }
    }

    /// Appends a child relation from this object to another object elsewhere in the document.
    pub fn add_child(&mut self, child: ChildRef) {
        self.children.push(child);
    }

    /// Sets the value of an attribute, overwriting any existing value under the same name.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attrs.insert(key.into(), value.into());
    }
}

/// A named, ordered collection of objects at one annotation tier.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Layer {
    pub id: u32,
    pub name: String,
    pub objects: Vec<LayerObject>,
}

impl Layer {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Layer {
            id,
            name: name.into(),
            objects: Vec::new(),
        }
    }

    /// Appends an object to the layer, setting its `layer_id` to match.
    pub fn add_object(&mut self, mut object: LayerObject) {
        object.layer_id = self.id;
        self.objects.push(object);
    }

    /// Appends many objects to the layer, in order.
    pub fn add_objects(&mut self, objects: impl IntoIterator<Item = LayerObject>) {
        for object in objects {
            self.add_object(object);
        }
    }

    /// Returns the index of the object with the given id within this layer's object list.
    pub fn index_of(&self, object_id: u32) -> Option<usize> {
        self.objects.iter().position(|o| o.id == object_id)
    }

    pub fn object(&self, object_id: u32) -> Option<&LayerObject> {
        self.index_of(object_id).map(|i| &self.objects[i])
    }

    pub fn object_mut(&mut self, object_id: u32) -> Option<&mut LayerObject> {
        self.index_of(object_id).map(move |i| &mut self.objects[i])
    }
}

/// The header of a tbf document: the textual encoding governing every
/// string field that follows it in the stream.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Header {
    pub encoding: String,
}

impl Default for Header {
    fn default() -> Self {
        Header { encoding: DEFAULT_ENCODING.to_owned() }
    }
}

impl Header {
    pub fn new(encoding: impl Into<String>) -> Self {
        Header { encoding: encoding.into() }
    }
}

/// An ordered set of named layers, each holding an ordered sequence of
/// identified objects with string attributes and cross-layer child relations.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Document {
    pub header: Header,
    layers: Vec<Layer>,
    layers_by_id: HashMap<u32, usize>,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            header: Header::default(),
            layers: Vec::new(),
            layers_by_id: HashMap::new(),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn with_header(header: Header) -> Self {
        Document { header, layers: Vec::new(), layers_by_id: HashMap::new() }
    }

    /// Appends a layer to the document and registers it in the id index.
    pub fn add_layer(&mut self, layer: Layer) {
        let position = self.layers.len();
        self.layers_by_id.insert(layer.id, position);
        self.layers.push(layer);
    }

    /// Appends many layers to the document, in order.
    pub fn add_layers(&mut self, layers: impl IntoIterator<Item = Layer>) {
        for layer in layers {
            self.add_layer(layer);
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_by_id(&self, id: u32) -> Option<&Layer> {
        self.layers_by_id.get(&id).map(|&i| &self.layers[i])
    }

    pub fn layer_by_id_mut(&mut self, id: u32) -> Option<&mut Layer> {
        let index = *self.layers_by_id.get(&id)?;
        Some(&mut self.layers[index])
    }

    /// Iterates all objects across all layers in stable (layer-order, object-order) sequence.
    pub fn all_objects(&self) -> impl Iterator<Item = &LayerObject> {
        self.layers.iter().flat_map(|layer| layer.objects.iter())
    }

    /// Adds a child relation from `parent` to `child`. Returns `None` if the
    /// parent object cannot be found; the child is not required to exist yet.
    pub fn add_relation(&mut self, parent: ChildRef, child: ChildRef) -> Option<()> {
        let layer = self.layer_by_id_mut(parent.layer_id)?;
        let object = layer.object_mut(parent.object_id)?;
        object.add_child(child);
        Some(())
    }
}
