//! 基于 `bson` crate 的参考编解码后端
//!
//! 先在 [`BsonValue`] 与 `bson::Bson` 之间转换，再交给 `bson` crate 的
//! 读写器处理线格式。键校验、顶层 `_id` 排序、转换链、引用识别、
//! UUID 识别与序列推断都在转换阶段完成，因此与本地实现的行为一致。

use crate::codec::Codec;
use crate::config::DecodeOptions;
use crate::document::Document;
use crate::encoder::{validate_cstring, validate_key, EncodeOptions};
use crate::spec::{BinarySubtype, ID_KEY};
use crate::value::{Binary, BsonValue, CodeWithScope, DateTime, DbRef, RegexFlags, RegexValue, Timestamp};
use crate::{BsonError, BsonResult};
use bson::{Bson, Document as RefDocument};
use compact_str::CompactString;
use tessera_common::ObjectId;

/// 参考实现后端
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceCodec;

impl Codec for ReferenceCodec {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn encode(&self, doc: &Document, options: &EncodeOptions) -> BsonResult<Vec<u8>> {
        let converted = Encoding { options }.document(doc, true, options.config.check_keys, 1)?;
        let mut bytes = Vec::new();
        converted
            .to_writer(&mut bytes)
            .map_err(|e| BsonError::InvalidDocument(format!("BSON serialization failed: {}", e)))?;
        Ok(bytes)
    }

    fn decode(&self, data: &[u8], options: &DecodeOptions) -> BsonResult<Document> {
        let mut reader = data;
        let doc = RefDocument::from_reader(&mut reader).map_err(map_read_error)?;
        if !reader.is_empty() {
            return Err(BsonError::InvalidBson(format!(
                "{} trailing bytes after document",
                reader.len()
            )));
        }
        Decoding { options }.document(&doc, 1)
    }
}

/// 按 `bson` crate 的错误归类
///
/// 非法 UTF-8 在读取器中以 `utf-8 encoding error` 消息的反序列化错误出现，
/// 需按消息识别才能与本地实现一样报告为 `InvalidStringData`。
fn map_read_error(err: bson::de::Error) -> BsonError {
    let message = err.to_string();
    let invalid_utf8 = matches!(err, bson::de::Error::InvalidUtf8String(_))
        || message.to_ascii_lowercase().contains("utf-8");
    if invalid_utf8 {
        BsonError::InvalidStringData(format!("invalid UTF-8 in document: {}", message))
    } else {
        BsonError::InvalidBson(format!("BSON deserialization failed: {}", message))
    }
}

/// BsonValue → bson::Bson
struct Encoding<'a> {
    options: &'a EncodeOptions,
}

impl Encoding<'_> {
    fn enter(&self, depth: usize) -> BsonResult<()> {
        if depth > self.options.config.max_depth {
            return Err(BsonError::InvalidDocument(format!(
                "maximum nesting depth {} exceeded",
                self.options.config.max_depth
            )));
        }
        Ok(())
    }

    fn document(
        &self,
        doc: &Document,
        top_level: bool,
        check_keys: bool,
        depth: usize,
    ) -> BsonResult<RefDocument> {
        self.enter(depth)?;
        let mut out = RefDocument::new();
        if top_level {
            if let Some(id) = doc.id() {
                out.insert(ID_KEY, self.value(id, false, depth)?);
            }
        }
        for (key, value) in doc.iter() {
            if top_level && key == ID_KEY {
                continue;
            }
            validate_key(key, check_keys)?;
            out.insert(key, self.value(value, check_keys, depth)?);
        }
        Ok(out)
    }

    fn value(&self, value: &BsonValue, check_keys: bool, depth: usize) -> BsonResult<Bson> {
        Ok(match value {
            BsonValue::Double(n) => Bson::Double(*n),
            BsonValue::String(s) => Bson::String(s.to_string()),
            BsonValue::Document(doc) => Bson::Document(self.document(doc, false, check_keys, depth + 1)?),
            BsonValue::Array(items) => {
                self.enter(depth + 1)?;
                let converted: BsonResult<Vec<_>> = items
                    .iter()
                    .map(|item| self.value(item, check_keys, depth + 1))
                    .collect();
                Bson::Array(converted?)
            }
            BsonValue::Binary(b) => Bson::Binary(bson::Binary {
                subtype: b.subtype.into(),
                bytes: b.bytes.clone(),
            }),
            BsonValue::Uuid(u) => Bson::Binary(bson::Binary {
                subtype: self.options.config.uuid_subtype().into(),
                bytes: u.as_bytes().to_vec(),
            }),
            BsonValue::ObjectId(oid) => Bson::ObjectId(bson::oid::ObjectId::from_bytes(oid.bytes())),
            BsonValue::Boolean(b) => Bson::Boolean(*b),
            BsonValue::DateTime(dt) => Bson::DateTime(bson::DateTime::from_millis(dt.timestamp_millis())),
            BsonValue::Null => Bson::Null,
            BsonValue::Regex(r) => {
                validate_cstring(&r.pattern, "regex patterns")?;
                Bson::RegularExpression(bson::Regex {
                    pattern: r.pattern.to_string(),
                    options: r.flags.to_string(),
                })
            }
            BsonValue::DbRef(r) => Bson::Document(self.document(&r.as_document(), false, false, depth + 1)?),
            BsonValue::Code(code) => Bson::JavaScriptCode(code.to_string()),
            BsonValue::CodeWithScope(c) => Bson::JavaScriptCodeWithScope(bson::JavaScriptCodeWithScope {
                code: c.code.to_string(),
                scope: self.document(&c.scope, false, false, depth + 1)?,
            }),
            BsonValue::Symbol(s) => Bson::Symbol(s.to_string()),
            BsonValue::Int32(n) => Bson::Int32(*n),
            BsonValue::Timestamp(ts) => Bson::Timestamp(bson::Timestamp {
                time: ts.time,
                increment: ts.increment,
            }),
            BsonValue::Int64(n) => Bson::Int64(*n),
            BsonValue::MinKey => Bson::MinKey,
            BsonValue::MaxKey => Bson::MaxKey,
            BsonValue::Object(obj) => {
                let state = self.options.chain.resolve(obj.state())?;
                self.enter(depth + 1)?;
                self.value(&state, check_keys, depth + 1)?
            }
        })
    }
}

/// bson::Bson → BsonValue
struct Decoding<'a> {
    options: &'a DecodeOptions,
}

impl Decoding<'_> {
    fn enter(&self, depth: usize) -> BsonResult<()> {
        if depth > self.options.max_depth {
            return Err(BsonError::InvalidBson(format!(
                "maximum nesting depth {} exceeded",
                self.options.max_depth
            )));
        }
        Ok(())
    }

    fn document(&self, doc: &RefDocument, depth: usize) -> BsonResult<Document> {
        self.enter(depth)?;
        let mut out = Document::with_capacity(doc.len());
        for (key, value) in doc {
            out.insert(key.as_str(), self.value(key, value, depth)?);
        }
        Ok(out)
    }

    fn value(&self, key: &str, value: &Bson, depth: usize) -> BsonResult<BsonValue> {
        Ok(match value {
            Bson::Double(n) => BsonValue::Double(*n),
            Bson::String(s) => BsonValue::String(CompactString::from(s.as_str())),
            Bson::Array(items) => {
                self.enter(depth + 1)?;
                let converted: BsonResult<Vec<_>> = items
                    .iter()
                    .map(|item| self.value(key, item, depth + 1))
                    .collect();
                BsonValue::Array(converted?)
            }
            Bson::Document(doc) => {
                let doc = self.document(doc, depth + 1)?;
                match DbRef::from_document(doc) {
                    Ok(dbref) => BsonValue::DbRef(dbref),
                    Err(doc) if self.options.infer_sequences && !doc.is_empty() && doc.is_sequence_like() => {
                        BsonValue::Array(doc.into_sequence().0)
                    }
                    Err(doc) => BsonValue::Document(doc),
                }
            }
            Bson::Boolean(b) => BsonValue::Boolean(*b),
            Bson::Null | Bson::Undefined => BsonValue::Null,
            Bson::RegularExpression(r) => BsonValue::Regex(RegexValue {
                pattern: CompactString::from(r.pattern.as_str()),
                flags: RegexFlags::parse(&r.options),
            }),
            Bson::JavaScriptCode(code) => BsonValue::Code(CompactString::from(code.as_str())),
            Bson::JavaScriptCodeWithScope(c) => BsonValue::CodeWithScope(CodeWithScope {
                code: CompactString::from(c.code.as_str()),
                scope: self.document(&c.scope, depth + 1)?,
            }),
            Bson::Int32(n) => BsonValue::Int32(*n),
            Bson::Int64(n) => BsonValue::Int64(*n),
            Bson::Timestamp(ts) => BsonValue::Timestamp(Timestamp {
                time: ts.time,
                increment: ts.increment,
            }),
            Bson::Binary(b) => {
                let binary = Binary::new(u8::from(b.subtype), b.bytes.clone());
                match binary.as_uuid() {
                    Some(uuid) if self.options.decode_uuids => BsonValue::Uuid(uuid),
                    _ => BsonValue::Binary(binary),
                }
            }
            Bson::ObjectId(oid) => BsonValue::ObjectId(ObjectId::from_bytes(oid.bytes())),
            Bson::DateTime(dt) => BsonValue::DateTime(DateTime::from_millis(dt.timestamp_millis())),
            Bson::Symbol(s) => BsonValue::Symbol(CompactString::from(s.as_str())),
            Bson::MinKey => BsonValue::MinKey,
            Bson::MaxKey => BsonValue::MaxKey,
            // DbPointer 的字段不公开，经扩展 JSON 取出
            Bson::DbPointer(_) => {
                let json = value.clone().into_relaxed_extjson();
                let pointer = &json["$dbPointer"];
                let namespace = pointer["$ref"].as_str();
                let oid = pointer["$id"]["$oid"].as_str();
                match (namespace, oid) {
                    (Some(ns), Some(hex)) => BsonValue::DbRef(DbRef::new(ns, ObjectId::from_hex(hex)?)),
                    _ => {
                        return Err(BsonError::InvalidBson(format!(
                            "malformed DBPointer for key '{}'",
                            key
                        )))
                    }
                }
            }
            Bson::Decimal128(_) => {
                return Err(BsonError::InvalidBson(format!(
                    "unknown element type 0x13 for key '{}'",
                    key
                )))
            }
        })
    }
}

impl From<BinarySubtype> for bson::spec::BinarySubtype {
    fn from(subtype: BinarySubtype) -> Self {
        u8::from(subtype).into()
    }
}
