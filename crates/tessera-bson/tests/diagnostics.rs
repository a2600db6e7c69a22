//! 有损解码路径的日志与扩展 JSON 诊断输出

use tessera_bson::json::{from_json_string, to_json_string};
use tessera_bson::{decode, doc, BsonValue, DecodeOptions, Document};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("tessera_bson=trace"))
        .with_test_writer()
        .try_init();
}

/// {"a": [ "0": 1, "2": 3 ]} 以数组标记编码但索引有缺口
const GAPPED_ARRAY: [u8; 27] = [
    0x1B, 0x00, 0x00, 0x00, // 文档长度 27
    0x04, b'a', 0x00, // 数组 "a"
    0x13, 0x00, 0x00, 0x00, // 数组长度 19
    0x10, b'0', 0x00, 0x01, 0x00, 0x00, 0x00, // "0": 1
    0x10, b'2', 0x00, 0x03, 0x00, 0x00, 0x00, // "2": 3
    0x00, // 数组结束
    0x00, // 文档结束
];

#[test]
fn gapped_array_keeps_leading_run() {
    init_tracing();
    let decoded = decode(&GAPPED_ARRAY, &DecodeOptions::default()).unwrap();
    assert_eq!(decoded, doc! { "a": [1] });
}

#[test]
fn decoded_document_renders_as_extended_json() {
    init_tracing();
    let decoded = decode(&GAPPED_ARRAY, &DecodeOptions::default()).unwrap();
    assert_eq!(decoded.to_json_string().unwrap(), r#"{"a":[1]}"#);

    let value = BsonValue::Document(decoded);
    let rendered = to_json_string(&value).unwrap();
    let parsed = from_json_string(&rendered).unwrap();
    assert_eq!(parsed, value);
}

#[test]
fn infer_sequences_is_opt_in() {
    init_tracing();
    let mut inner = Document::new();
    inner.insert("0", "x");
    inner.insert("1", "y");
    let mut doc = Document::new();
    doc.insert("m", inner.clone());
    let bytes = tessera_bson::encode(&doc, &Default::default()).unwrap();

    assert_eq!(
        decode(&bytes, &DecodeOptions::default()).unwrap(),
        doc
    );
    let options = DecodeOptions {
        infer_sequences: true,
        ..Default::default()
    };
    assert_eq!(decode(&bytes, &options).unwrap(), doc! { "m": ["x", "y"] });
}
