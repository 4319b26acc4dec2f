//! Property-based tests for frame encoding/decoding
//!
//! Every variant built from its public constructor must survive a round trip
//! through the plaintext encoding, report an encoded length that matches the
//! bytes produced, and pass its own validation.

use proptest::prelude::*;
use sigframe_proto::{
    AttachmentFrame, AvatarFrame, DatabaseVersionFrame, EndFrame, FieldList, Frame, HeaderFrame,
    KeyValue, KeyValueFrame, ProtocolError, RawField, SharedPrefFrame, SqlParameter,
    SqlStatementFrame, StickerFrame, body_len_for_frame_size, decode_varint, encode_varint,
    frame_size, varint_len,
};

/// Strategy for statement parameters (doubles restricted to finite values so
/// equality is meaningful)
fn arbitrary_parameter() -> impl Strategy<Value = SqlParameter> {
    prop_oneof![
        "[a-z' ]{0,16}".prop_map(SqlParameter::Text),
        any::<u64>().prop_map(SqlParameter::Integer),
        (-1.0e12f64..1.0e12).prop_map(SqlParameter::Double),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(SqlParameter::Blob),
        Just(SqlParameter::Null),
    ]
}

fn arbitrary_key_value_frame() -> impl Strategy<Value = KeyValueFrame> {
    let key = "[a-z_.]{1,24}";
    prop_oneof![
        (key, prop::collection::vec(any::<u8>(), 0..32))
            .prop_map(|(k, v)| KeyValueFrame::new(&k, KeyValue::Blob(&v))),
        (key, any::<bool>()).prop_map(|(k, v)| KeyValueFrame::new(&k, KeyValue::Boolean(v))),
        (key, -1.0e6f32..1.0e6).prop_map(|(k, v)| KeyValueFrame::new(&k, KeyValue::Float(v))),
        (key, any::<i32>()).prop_map(|(k, v)| KeyValueFrame::new(&k, KeyValue::Integer(v))),
        (key, any::<i64>()).prop_map(|(k, v)| KeyValueFrame::new(&k, KeyValue::Long(v))),
        (key, "\\PC{0,24}").prop_map(|(k, v)| KeyValueFrame::new(&k, KeyValue::String(&v))),
    ]
}

/// Strategy covering every frame variant
fn arbitrary_frame() -> impl Strategy<Value = Frame> {
    prop_oneof![
        (any::<[u8; 16]>(), prop::collection::vec(any::<u8>(), 32), prop::option::of(any::<u32>()))
            .prop_map(|(iv, salt, version)| Frame::Header(HeaderFrame::new(iv, &salt, version))),
        any::<u32>().prop_map(|v| Frame::DatabaseVersion(DatabaseVersionFrame::new(v))),
        ("[a-z_]{1,16}", "[a-z_]{1,16}", "\\PC{0,32}").prop_map(|(file, key, value)| {
            Frame::SharedPreference(SharedPrefFrame::new(&file, &key, &value))
        }),
        ("[a-z_]{1,16}", "[a-z_]{1,16}", any::<bool>()).prop_map(|(file, key, value)| {
            Frame::SharedPreference(SharedPrefFrame::new_bool(&file, &key, value))
        }),
        arbitrary_key_value_frame().prop_map(Frame::KeyValue),
        ("[A-Z ?(),a-z]{1,64}", prop::collection::vec(arbitrary_parameter(), 0..8)).prop_map(
            |(statement, params)| {
                Frame::SqlStatement(SqlStatementFrame::with_parameters(&statement, &params))
            }
        ),
        (any::<u64>(), any::<u64>(), any::<u32>())
            .prop_map(|(row, id, len)| Frame::Attachment(AttachmentFrame::new(row, id, len))),
        (any::<u64>(), 0u32..(1 << 20))
            .prop_map(|(row, len)| Frame::Sticker(StickerFrame::new(row, len))),
        ("[0-9]{1,8}", any::<u32>())
            .prop_map(|(recipient, len)| Frame::Avatar(AvatarFrame::for_recipient(&recipient, len))),
        ("\\+[0-9]{6,14}", any::<u32>())
            .prop_map(|(name, len)| Frame::Avatar(AvatarFrame::named(&name, len))),
        Just(Frame::End(EndFrame::new())),
    ]
}

#[test]
fn prop_frame_encode_decode_roundtrip() {
    proptest!(|(frame in arbitrary_frame())| {
        let bytes = frame.to_bytes();
        let decoded = Frame::decode(&bytes).expect("decode should succeed");

        // PROPERTY: Round-trip must be identity
        prop_assert_eq!(&decoded, &frame);
        prop_assert_eq!(decoded.kind(), frame.kind());

        // PROPERTY: Re-encoding reproduces the original bytes
        prop_assert_eq!(decoded.to_bytes(), bytes);
    });
}

#[test]
fn prop_encoded_len_matches_bytes() {
    proptest!(|(frame in arbitrary_frame())| {
        prop_assert_eq!(frame.to_bytes().len(), frame.encoded_len());
    });
}

#[test]
fn prop_constructed_frames_validate() {
    proptest!(|(frame in arbitrary_frame())| {
        prop_assert!(frame.validate().is_ok(), "constructed {} frame failed validation", frame.kind());
    });
}

#[test]
fn prop_truncated_frame_rejected() {
    proptest!(|(frame in arbitrary_frame(), cut in any::<prop::sample::Index>())| {
        let bytes = frame.to_bytes();
        let keep = cut.index(bytes.len());

        // PROPERTY: Any strict prefix fails to decode
        prop_assert!(Frame::decode(&bytes[..keep]).is_err());
    });
}

#[test]
fn prop_trailing_bytes_rejected() {
    proptest!(|(frame in arbitrary_frame(), extra in prop::collection::vec(any::<u8>(), 1..8))| {
        let mut bytes = frame.to_bytes();
        bytes.extend_from_slice(&extra);
        prop_assert!(Frame::decode(&bytes).is_err());
    });
}

#[test]
fn prop_decode_arbitrary_bytes_never_panics() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..256))| {
        let _ = Frame::decode(&bytes);
    });
}

#[test]
fn prop_varint_roundtrip() {
    proptest!(|(value in any::<u64>())| {
        let mut buf = Vec::new();
        encode_varint(value, &mut buf);
        prop_assert_eq!(buf.len(), varint_len(value));
        prop_assert_eq!(decode_varint(&buf, 0), Ok((value, buf.len())));
    });
}

#[test]
fn prop_frame_size_inverse() {
    proptest!(|(body in 0usize..10_000_000)| {
        prop_assert_eq!(body_len_for_frame_size(frame_size(body)), Some(body));
    });
}

#[test]
fn prop_parameters_roundtrip() {
    proptest!(|(params in prop::collection::vec(arbitrary_parameter(), 0..16))| {
        let frame = SqlStatementFrame::with_parameters("SELECT 1", &params);
        prop_assert_eq!(frame.parameters().expect("parameters decode"), params);
    });
}

#[test]
fn prop_build_statement_consumes_every_placeholder() {
    proptest!(|(params in prop::collection::vec(arbitrary_parameter(), 1..8))| {
        let placeholders = vec!["?"; params.len()].join(", ");
        let statement = format!("INSERT INTO t VALUES ({placeholders})");
        let frame = SqlStatementFrame::with_parameters(&statement, &params);

        let built = frame.build_statement().expect("counts match");
        prop_assert!(built.starts_with("INSERT INTO t VALUES ("));
        prop_assert!(built.ends_with(')'));
    });
}

#[test]
fn unknown_field_in_attachment_fails_validation_but_decodes() {
    let mut fields = FieldList::new();
    fields.push(RawField::varint(AttachmentFrame::FIELD_ROW_ID, 1));
    fields.push(RawField::varint(AttachmentFrame::FIELD_ATTACHMENT_ID, 2));
    fields.push(RawField::varint(AttachmentFrame::FIELD_LENGTH, 3));
    fields.push(RawField::varint(9, 0));

    let mut body = Vec::new();
    fields.encode(&mut body);
    let mut bytes = vec![0x22];
    encode_varint(body.len() as u64, &mut bytes);
    bytes.extend_from_slice(&body);

    let frame = Frame::decode(&bytes).expect("structurally sound");
    let err = frame.validate().expect_err("unknown field");
    assert!(!err.is_fatal());
    assert!(matches!(err, ProtocolError::ValidationFailed { .. }));
}

#[test]
fn end_marker_with_wrong_value_decodes_but_fails_validation() {
    let frame = Frame::decode(&[0x30, 0x02]).expect("structurally sound");
    assert!(!frame.is_valid());
}
