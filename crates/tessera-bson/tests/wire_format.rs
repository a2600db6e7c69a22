//! 与 `bson` crate 的逐字节对照

use bson::spec::BinarySubtype as RefSubtype;
use bson::Bson;
use tessera_bson::{
    decode, doc, encode, Binary, BsonValue, CodeWithScope, DateTime, DbRef, DecodeOptions,
    Document, EncodeOptions, ObjectId, RegexValue, Timestamp,
};
use uuid::Uuid;

fn reference_bytes(doc: &bson::Document) -> Vec<u8> {
    let mut buf = Vec::new();
    doc.to_writer(&mut buf).unwrap();
    buf
}

fn native_document() -> Document {
    let mut doc = Document::new();
    doc.insert("_id", ObjectId::from_bytes([0x5F; 12]));
    doc.insert("double", 1.25);
    doc.insert("string", "héllo");
    doc.insert("nested", doc! { "a": [1, "two", null] });
    doc.insert("binary", Binary::new(0x80u8, vec![0xDE, 0xAD]));
    doc.insert("uuid", Uuid::from_bytes([0x11; 16]));
    doc.insert("bool", false);
    doc.insert("date", DateTime::from_millis(1_600_000_000_123));
    doc.insert("regex", RegexValue::new("^a.*", "mi"));
    doc.insert("ref", DbRef::new("users", 42).with_database("app"));
    doc.insert("code", BsonValue::Code("f()".into()));
    doc.insert(
        "scoped",
        CodeWithScope {
            code: "x + 1".into(),
            scope: doc! { "x": 1 },
        },
    );
    doc.insert("symbol", BsonValue::Symbol("sym".into()));
    doc.insert("int32", -7);
    doc.insert("ts", Timestamp::new(1_700_000_000, 9));
    doc.insert("int64", BsonValue::Int64(7));
    doc.insert("min", BsonValue::MinKey);
    doc.insert("max", BsonValue::MaxKey);
    doc
}

fn reference_document() -> bson::Document {
    bson::doc! {
        "_id": bson::oid::ObjectId::from_bytes([0x5F; 12]),
        "double": 1.25,
        "string": "héllo",
        "nested": { "a": [1, "two", Bson::Null] },
        "binary": bson::Binary { subtype: RefSubtype::UserDefined(0x80), bytes: vec![0xDE, 0xAD] },
        "uuid": bson::Binary { subtype: RefSubtype::UuidOld, bytes: vec![0x11; 16] },
        "bool": false,
        "date": bson::DateTime::from_millis(1_600_000_000_123),
        "regex": Bson::RegularExpression(bson::Regex { pattern: "^a.*".into(), options: "im".into() }),
        "ref": { "$ref": "users", "$id": 42, "$db": "app" },
        "code": Bson::JavaScriptCode("f()".into()),
        "scoped": Bson::JavaScriptCodeWithScope(bson::JavaScriptCodeWithScope {
            code: "x + 1".into(),
            scope: bson::doc! { "x": 1 },
        }),
        "symbol": Bson::Symbol("sym".into()),
        "int32": -7,
        "ts": bson::Timestamp { time: 1_700_000_000, increment: 9 },
        "int64": 7_i64,
        "min": Bson::MinKey,
        "max": Bson::MaxKey,
    }
}

#[test]
fn every_element_type_matches_reference_bytes() {
    let native = encode(&native_document(), &EncodeOptions::default()).unwrap();
    assert_eq!(native, reference_bytes(&reference_document()));
}

#[test]
fn reference_bytes_decode_to_native_document() {
    let bytes = reference_bytes(&reference_document());
    let decoded = decode(&bytes, &DecodeOptions::default()).unwrap();
    assert_eq!(decoded, native_document());
}

#[test]
fn id_moves_to_front_unlike_insertion_order() {
    let native = encode(&doc! { "a": 1, "_id": 2 }, &EncodeOptions::default()).unwrap();
    assert_eq!(native, reference_bytes(&bson::doc! { "_id": 2, "a": 1 }));
}

#[test]
fn rust_i64_narrows_when_it_fits() {
    let native = encode(&doc! { "small": (5_i64), "big": (1_i64 << 40) }, &EncodeOptions::default())
        .unwrap();
    assert_eq!(
        native,
        reference_bytes(&bson::doc! { "small": 5_i32, "big": 1_i64 << 40 })
    );
}

#[test]
fn uuid_subtype_four_matches_reference() {
    let mut options = EncodeOptions::default();
    options.config.uuid_subtype = 4;
    let mut doc = Document::new();
    doc.insert("u", Uuid::from_bytes([0x22; 16]));
    let native = encode(&doc, &options).unwrap();
    assert_eq!(
        native,
        reference_bytes(&bson::doc! {
            "u": bson::Binary { subtype: RefSubtype::Uuid, bytes: vec![0x22; 16] }
        })
    );
}

#[test]
fn simple_document_golden_bytes() {
    let bytes = encode(&doc! { "hello": "world" }, &EncodeOptions::default()).unwrap();
    assert_eq!(
        bytes,
        hex::decode("160000000268656c6c6f0006000000776f726c640000").unwrap()
    );
}
