use tbf::{AttributeValue, ChildRef, Document, Header, Layer, LayerObject};

fn layer_with_objects(id: u32, name: &str, object_count: u32) -> Layer {
    let mut layer = Layer::new(id, name);
    layer.add_objects((0..object_count).map(|object_id| LayerObject::new(object_id, id)));
    layer
}

#[test]
fn minimal_header_round_trips() {
    let document = Document::with_header(Header::new("utf-8"));

    let bytes = tbf::encode_to_bytes(&document).unwrap();
    assert_eq!(
        bytes,
        vec![
            0x01, b'u', b't', b'f', b'-', b'8', 0x00, 0x02, // header
            0x03, 0x00, 0x00, 0x00, 0x00, 0x04, // layers
            0x07, 0x00, 0x00, 0x00, 0x00, 0x08, // relations
            0x0B, 0x00, 0x00, 0x00, 0x00, 0x0C, // attrs
        ]
    );

    let decoded = tbf::decode_from_bytes(&bytes).unwrap();
    assert_eq!(decoded.header.encoding, "utf-8");
    assert!(decoded.layers().is_empty());
}

#[test]
fn two_layers_with_relations_round_trip() {
    let mut document = Document::new();
    document.add_layer(layer_with_objects(0, "Layer 1", 4));
    document.add_layer(layer_with_objects(1, "Layer 2", 4));

    document.add_relation(ChildRef::new(0, 0), ChildRef::new(1, 1));
    document.add_relation(ChildRef::new(0, 1), ChildRef::new(1, 0));
    document.add_relation(ChildRef::new(0, 2), ChildRef::new(1, 3));
    document.add_relation(ChildRef::new(0, 3), ChildRef::new(1, 2));

    let bytes = tbf::encode_to_bytes(&document).unwrap();
    let decoded = tbf::decode_from_bytes(&bytes).unwrap();

    let l0 = decoded.layer_by_id(0).unwrap();
    assert_eq!(l0.object(0).unwrap().children, vec![ChildRef::new(1, 1)]);
    assert_eq!(l0.object(1).unwrap().children, vec![ChildRef::new(1, 0)]);
    assert_eq!(l0.object(2).unwrap().children, vec![ChildRef::new(1, 3)]);
    assert_eq!(l0.object(3).unwrap().children, vec![ChildRef::new(1, 2)]);
}

#[test]
fn re_encoding_a_decoded_document_is_byte_identical() {
    // Exercises three distinct (parent_layer, child_layer) relation groups
    // and two reverse-ordered ones, so the BTreeMap-keyed grouping in
    // group_relations/group_attrs has more than one key to sort.
    let mut document = Document::new();
    document.add_layer(layer_with_objects(0, "Layer 1", 4));
    document.add_layer(layer_with_objects(1, "Layer 2", 4));
    document.add_layer(layer_with_objects(2, "Layer 3", 2));

    document.add_relation(ChildRef::new(0, 0), ChildRef::new(1, 1));
    document.add_relation(ChildRef::new(0, 1), ChildRef::new(2, 0));
    document.add_relation(ChildRef::new(1, 2), ChildRef::new(0, 3));
    document.add_relation(ChildRef::new(2, 1), ChildRef::new(1, 3));

    document.layer_by_id_mut(0).unwrap().objects[0].set_attr("pos", "NOUN");
    document.layer_by_id_mut(1).unwrap().objects[1].set_attr("gloss", "run.PST");
    document.layer_by_id_mut(2).unwrap().objects[0].set_attr("gloss", "1SG");

    let bytes = tbf::encode_to_bytes(&document).unwrap();
    let decoded = tbf::decode_from_bytes(&bytes).unwrap();
    let re_encoded = tbf::encode_to_bytes(&decoded).unwrap();

    assert_eq!(bytes, re_encoded);
}

#[test]
fn mixed_attributes_prefer_full_chunks() {
    let mut document = Document::new();

    let mut l0 = layer_with_objects(0, "L0", 1);
    l0.objects[0].set_attr("key1", "val2");
    document.add_layer(l0);

    let mut l1 = layer_with_objects(1, "L1", 2);
    l1.objects[0].set_attr("key3", "val");
    l1.objects[1].set_attr("key4", "val2");
    document.add_layer(l1);

    let bytes = tbf::encode_to_bytes(&document).unwrap();
    // Each of the three (layer, attribute) groups is small enough that a
    // full chunk's overhead beats a linked chunk's, so every chunk marker
    // in the attrs section should be CHUNK_FULL_START (0x0D).
    let full_chunks = bytes.iter().filter(|&&b| b == 0x0D).count();
    let linked_chunks = bytes.iter().filter(|&&b| b == 0x0E).count();
    assert_eq!(full_chunks, 3);
    assert_eq!(linked_chunks, 0);

    let decoded = tbf::decode_from_bytes(&bytes).unwrap();
    assert_eq!(
        decoded.layer_by_id(0).unwrap().object(0).unwrap().attrs.get("key1"),
        Some(&AttributeValue::Bytes(b"val2".to_vec()))
    );
    assert_eq!(
        decoded.layer_by_id(1).unwrap().object(1).unwrap().attrs.get("key4"),
        Some(&AttributeValue::Bytes(b"val2".to_vec()))
    );
}

#[test]
fn sparse_attribute_picks_linked_chunk() {
    let mut document = Document::new();
    let mut layer = layer_with_objects(0, "tokens", 100);
    layer.objects[5].set_attr("tag", "NOUN");
    layer.objects[40].set_attr("tag", "VERB");
    layer.objects[99].set_attr("tag", "PUNCT");
    document.add_layer(layer);

    let bytes = tbf::encode_to_bytes(&document).unwrap();
    assert!(bytes.contains(&0x0E), "expected a linked chunk marker in the encoded stream");
    assert!(!bytes.contains(&0x0D), "a full chunk would have been more expensive here");

    let decoded = tbf::decode_from_bytes(&bytes).unwrap();
    let layer = decoded.layer_by_id(0).unwrap();
    assert_eq!(layer.object(5).unwrap().attrs.get("tag"), Some(&AttributeValue::Bytes(b"NOUN".to_vec())));
    assert_eq!(layer.object(40).unwrap().attrs.get("tag"), Some(&AttributeValue::Bytes(b"VERB".to_vec())));
    assert_eq!(layer.object(99).unwrap().attrs.get("tag"), Some(&AttributeValue::Bytes(b"PUNCT".to_vec())));
    assert!(layer.object(0).unwrap().attrs.get("tag").is_none());
}

#[test]
fn malformed_layers_marker_is_rejected() {
    let document = Document::with_header(Header::new("utf-8"));
    let mut bytes = tbf::encode_to_bytes(&document).unwrap();

    // The byte right after the header section is LAYERS_START (0x03).
    let layers_start_index = bytes.iter().position(|&b| b == 0x03).unwrap();
    bytes[layers_start_index] = 0xFF;

    let err = tbf::decode_from_bytes(&bytes).unwrap_err();
    assert_eq!(err, tbf::Error::UnexpectedMarker { expected: 0x03, got: 0xFF });
}

#[test]
fn separator_in_layer_name_is_rejected() {
    let mut document = Document::new();
    document.add_layer(Layer::new(0, "bad\u{0}name"));

    let err = tbf::encode_to_bytes(&document).unwrap_err();
    match err {
        tbf::Error::SeparatorInString(_) => {}
        other => panic!("expected SeparatorInString, got {:?}", other),
    }
}

#[test]
fn dangling_child_reference_is_rejected() {
    let mut document = Document::new();
    document.add_layer(layer_with_objects(0, "L0", 1));
    // Layer 1 is never added to the document.
    document.layer_by_id_mut(0).unwrap().objects[0].add_child(ChildRef::new(1, 0));

    let err = tbf::encode_to_bytes(&document).unwrap_err();
    assert_eq!(err, tbf::Error::DanglingChild { layer_id: 1, object_id: 0 });
}

#[test]
fn text_adapter_round_trips_through_a_string() {
    let mut document = Document::new();
    let mut layer = layer_with_objects(0, "morphemes", 2);
    layer.objects[0].set_attr("gloss", "run.PST");
    layer.objects[1].set_attr("gloss", "run.PRS");
    document.add_layer(layer);

    let text = tbf::encode_to_text(&document).unwrap();
    let decoded = tbf::decode_from_text(&text).unwrap();

    assert_eq!(decoded.header.encoding, document.header.encoding);
    let layer = decoded.layer_by_id(0).unwrap();
    assert_eq!(layer.object(0).unwrap().attrs.get("gloss"), Some(&AttributeValue::Bytes(b"run.PST".to_vec())));
}

#[test]
fn text_adapter_rejects_non_latin1_characters() {
    let err = tbf::decode_from_text("\u{1F600}").unwrap_err();
    match err {
        tbf::Error::BadTextEncoding { .. } => {}
        other => panic!("expected BadTextEncoding, got {:?}", other),
    }
}

#[test]
fn empty_layer_has_no_relations_or_attrs() {
    let mut document = Document::new();
    document.add_layer(layer_with_objects(0, "empty", 0));

    let bytes = tbf::encode_to_bytes(&document).unwrap();
    let decoded = tbf::decode_from_bytes(&bytes).unwrap();
    assert_eq!(decoded.layer_by_id(0).unwrap().objects.len(), 0);
}
