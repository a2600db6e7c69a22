//! BSON 解码模块
//!
//! 单遍游标解码：每进入一层文档就把可读范围收紧到该文档的结束符之前，
//! 因此任何读取都不会越过所在文档的边界。
//!
//! 每个文档的状态机:
//! `读长度 → 校验缓冲区 → 循环{读标记 → 读键 → 读负载} → 校验结束符 → 完成`
//! 任一步失败即终止整个文档，不返回部分结果。

use crate::config::DecodeOptions;
use crate::document::{Document, DocumentClass};
use crate::spec::*;
use crate::value::{Binary, BsonValue, CodeWithScope, DateTime, DbRef, RegexFlags, RegexValue, Timestamp};
use crate::{BsonError, BsonResult};
use compact_str::CompactString;
use std::io::{ErrorKind, Read};
use tessera_common::ObjectId;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// 解码单个文档
///
/// # Brief
/// 缓冲区必须恰好包含一个完整文档
///
/// # Arguments
/// * `data` - BSON 字节
/// * `options` - 解码配置
///
/// # Returns
/// 成功返回文档，结构违规返回 `InvalidBson`，非法 UTF-8 返回 `InvalidStringData`
pub fn decode(data: &[u8], options: &DecodeOptions) -> BsonResult<Document> {
    decode_with::<Document>(data, options)
}

/// 解码单个文档到调用方选择的顶层映射类型
///
/// 嵌套文档始终解码为 [`Document`]。
pub fn decode_with<D: DocumentClass>(data: &[u8], options: &DecodeOptions) -> BsonResult<D> {
    let (doc, rest) = decode_prefix_with::<D>(data, options)?;
    if !rest.is_empty() {
        return Err(BsonError::InvalidBson(format!(
            "{} trailing bytes after document",
            rest.len()
        )));
    }
    Ok(doc)
}

/// 解码缓冲区开头的一个文档
///
/// # Returns
/// (文档, 文档之后的剩余字节)
pub fn decode_prefix<'a>(data: &'a [u8], options: &DecodeOptions) -> BsonResult<(Document, &'a [u8])> {
    decode_prefix_with::<Document>(data, options)
}

fn decode_prefix_with<'a, D: DocumentClass>(
    data: &'a [u8],
    options: &DecodeOptions,
) -> BsonResult<(D, &'a [u8])> {
    let mut decoder = Decoder::new(data, options);
    let doc = decoder.decode_document::<D>()?;
    trace!("Decoded document: {} bytes", decoder.pos);
    Ok((doc, &data[decoder.pos..]))
}

/// 解码首尾相接的多个文档
///
/// # Brief
/// 按每个文档声明的长度推进，直到缓冲区耗尽；残留的不完整文档视为分帧错误
pub fn decode_all(data: &[u8], options: &DecodeOptions) -> BsonResult<Vec<Document>> {
    let mut docs = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let (doc, next) = decode_prefix(rest, options)?;
        docs.push(doc);
        rest = next;
    }
    Ok(docs)
}

/// 缓冲区是否恰好是一个有效文档
pub fn is_valid(data: &[u8]) -> bool {
    decode(data, &DecodeOptions::default()).is_ok()
}

/// BSON 解码器
///
/// 内部结构，`limit` 是当前文档中元素可读范围的结束位置(不含)
struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    limit: usize,
    depth: usize,
    options: &'a DecodeOptions,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8], options: &'a DecodeOptions) -> Self {
        Self {
            data,
            pos: 0,
            limit: data.len(),
            depth: 0,
            options,
        }
    }

    /// 解码一个带长度前缀的文档
    fn decode_document<D: DocumentClass>(&mut self) -> BsonResult<D> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(BsonError::InvalidBson(format!(
                "maximum nesting depth {} exceeded",
                self.options.max_depth
            )));
        }

        let start = self.pos;
        let declared = self.read_i32()?;
        if declared < MIN_DOCUMENT_SIZE as i32 {
            return Err(BsonError::InvalidBson(format!(
                "invalid document length {}",
                declared
            )));
        }
        let end = start + declared as usize;
        if end > self.limit {
            return Err(BsonError::InvalidBson(format!(
                "objsize too large: document declares {} bytes, {} available",
                declared,
                self.limit - start
            )));
        }
        let terminator = end - 1;
        if self.data[terminator] != TERMINATOR {
            return Err(BsonError::InvalidBson("bad eoo".to_string()));
        }

        let outer_limit = self.limit;
        self.limit = terminator;
        let mut doc = D::default();
        while self.pos < terminator {
            let tag = self.read_u8()?;
            let key = self.read_cstring()?;
            let value = self.decode_value(tag, &key)?;
            doc.insert_element(key, value);
        }
        self.limit = outer_limit;
        self.pos = end;
        self.depth -= 1;
        Ok(doc)
    }

    fn decode_value(&mut self, tag: u8, key: &str) -> BsonResult<BsonValue> {
        let Some(element_type) = ElementType::from_u8(tag) else {
            return Err(BsonError::InvalidBson(format!(
                "unknown element type 0x{:02X} for key '{}'",
                tag, key
            )));
        };

        let value = match element_type {
            ElementType::Double => BsonValue::Double(self.read_f64()?),
            ElementType::String => BsonValue::String(self.read_string()?),
            ElementType::EmbeddedDocument => {
                let doc = self.decode_document::<Document>()?;
                self.interpret_document(doc)
            }
            ElementType::Array => {
                let doc = self.decode_document::<Document>()?;
                let (values, dropped) = doc.into_sequence();
                if dropped > 0 {
                    warn!(
                        "Array '{}' has {} entries without contiguous indices, dropped",
                        key, dropped
                    );
                }
                BsonValue::Array(values)
            }
            ElementType::Binary => self.read_binary()?,
            ElementType::Undefined | ElementType::Null => BsonValue::Null,
            ElementType::ObjectId => BsonValue::ObjectId(self.read_object_id()?),
            ElementType::Boolean => match self.read_u8()? {
                0 => BsonValue::Boolean(false),
                1 => BsonValue::Boolean(true),
                b => {
                    return Err(BsonError::InvalidBson(format!(
                        "invalid boolean value 0x{:02X}",
                        b
                    )))
                }
            },
            ElementType::DateTime => BsonValue::DateTime(DateTime::from_millis(self.read_i64()?)),
            ElementType::Regex => {
                let pattern = self.read_cstring()?;
                let raw_flags = self.read_cstring()?;
                let flags = RegexFlags::parse(&raw_flags);
                if flags.to_string().len() != raw_flags.len() {
                    debug!("Regex '{}' flags '{}' normalized to '{}'", key, raw_flags, flags);
                }
                BsonValue::Regex(RegexValue { pattern, flags })
            }
            ElementType::DbPointer => {
                let collection = self.read_string()?;
                let oid = self.read_object_id()?;
                BsonValue::DbRef(DbRef::new(collection, oid))
            }
            ElementType::Code => BsonValue::Code(self.read_string()?),
            ElementType::Symbol => BsonValue::Symbol(self.read_string()?),
            ElementType::CodeWithScope => self.read_code_with_scope()?,
            ElementType::Int32 => BsonValue::Int32(self.read_i32()?),
            ElementType::Timestamp => {
                let increment = self.read_u32()?;
                let time = self.read_u32()?;
                BsonValue::Timestamp(Timestamp { time, increment })
            }
            ElementType::Int64 => BsonValue::Int64(self.read_i64()?),
            ElementType::MinKey => BsonValue::MinKey,
            ElementType::MaxKey => BsonValue::MaxKey,
        };
        Ok(value)
    }

    /// 嵌入文档的后处理：引用识别与可选的序列推断
    fn interpret_document(&self, doc: Document) -> BsonValue {
        let doc = match DbRef::from_document(doc) {
            Ok(dbref) => return BsonValue::DbRef(dbref),
            Err(doc) => doc,
        };
        if self.options.infer_sequences && !doc.is_empty() && doc.is_sequence_like() {
            let (values, _) = doc.into_sequence();
            return BsonValue::Array(values);
        }
        BsonValue::Document(doc)
    }

    /// 二进制: int32 len | u8 subtype | bytes
    fn read_binary(&mut self) -> BsonResult<BsonValue> {
        let declared = self.read_i32()?;
        let mut len = to_len(declared, "binary")?;
        let subtype = BinarySubtype::from(self.read_u8()?);
        if subtype == BinarySubtype::BinaryOld {
            let inner = self.read_i32()?;
            if inner != declared - 4 {
                return Err(BsonError::InvalidBson(
                    "invalid binary (st 2) - lengths don't match!".to_string(),
                ));
            }
            len = to_len(inner, "binary")?;
        }
        let bytes = self.read_bytes(len)?;
        if self.options.decode_uuids && subtype.is_uuid() && len == 16 {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(bytes);
            return Ok(BsonValue::Uuid(Uuid::from_bytes(raw)));
        }
        Ok(BsonValue::Binary(Binary::new(subtype, bytes.to_vec())))
    }

    /// 带作用域代码: int32 total | string code | document scope
    fn read_code_with_scope(&mut self) -> BsonResult<BsonValue> {
        let start = self.pos;
        let total = to_len(self.read_i32()?, "code with scope")?;
        if start + total > self.limit {
            return Err(BsonError::InvalidBson(
                "code with scope length exceeds its document".to_string(),
            ));
        }
        let code = self.read_string()?;
        let scope = self.decode_document::<Document>()?;
        if self.pos - start != total {
            return Err(BsonError::InvalidBson(format!(
                "code with scope declares {} bytes but spans {}",
                total,
                self.pos - start
            )));
        }
        Ok(BsonValue::CodeWithScope(CodeWithScope { code, scope }))
    }

    fn read_u8(&mut self) -> BsonResult<u8> {
        if self.pos >= self.limit {
            return Err(unexpected_end());
        }
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, len: usize) -> BsonResult<&'a [u8]> {
        if len > self.limit - self.pos {
            return Err(unexpected_end());
        }
        let data: &'a [u8] = self.data;
        let bytes = &data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> BsonResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    fn read_i32(&mut self) -> BsonResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    fn read_u32(&mut self) -> BsonResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_i64(&mut self) -> BsonResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    fn read_f64(&mut self) -> BsonResult<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    fn read_object_id(&mut self) -> BsonResult<ObjectId> {
        Ok(ObjectId::from_bytes(self.read_array()?))
    }

    /// NUL 结尾的字符串，结束符必须在当前文档范围内
    fn read_cstring(&mut self) -> BsonResult<CompactString> {
        let remaining = &self.data[self.pos..self.limit];
        let Some(nul) = remaining.iter().position(|&b| b == 0) else {
            return Err(BsonError::InvalidBson(
                "cstring is missing its terminator".to_string(),
            ));
        };
        let text = utf8(&remaining[..nul])?;
        self.pos += nul + 1;
        Ok(text)
    }

    /// 长度前缀字符串: int32 (字节数 + 1) | UTF-8 字节 | 0x00
    fn read_string(&mut self) -> BsonResult<CompactString> {
        let declared = self.read_i32()?;
        if declared < 1 {
            return Err(BsonError::InvalidBson(format!(
                "invalid string length {}",
                declared
            )));
        }
        let bytes = self.read_bytes(declared as usize)?;
        let (content, last) = bytes.split_at(bytes.len() - 1);
        if last[0] != TERMINATOR {
            return Err(BsonError::InvalidBson(
                "string is missing its terminator".to_string(),
            ));
        }
        utf8(content)
    }
}

fn to_len(declared: i32, what: &str) -> BsonResult<usize> {
    usize::try_from(declared)
        .map_err(|_| BsonError::InvalidBson(format!("negative {} length {}", what, declared)))
}

fn utf8(bytes: &[u8]) -> BsonResult<CompactString> {
    std::str::from_utf8(bytes)
        .map(CompactString::from)
        .map_err(|e| BsonError::InvalidStringData(format!("invalid UTF-8 in document: {}", e)))
}

fn unexpected_end() -> BsonError {
    BsonError::InvalidBson("unexpected end of document".to_string())
}

/// 从字节流中逐个读取文档
///
/// 每次读取 4 字节长度，再读取文档其余部分并解码。
/// 流在文档边界处结束时迭代正常结束；在文档中途结束视为 `InvalidBson`。
/// 出现错误后迭代器不再产生元素。
pub struct DocumentReader<R: Read> {
    reader: R,
    options: DecodeOptions,
    finished: bool,
}

impl<R: Read> DocumentReader<R> {
    pub fn new(reader: R, options: DecodeOptions) -> Self {
        Self {
            reader,
            options,
            finished: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_next(&mut self) -> BsonResult<Option<Document>> {
        let mut header = [0u8; 4];
        let mut filled = 0;
        while filled < header.len() {
            match self.reader.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(BsonError::InvalidBson("truncated document length".to_string())),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let declared = i32::from_le_bytes(header);
        if declared < MIN_DOCUMENT_SIZE as i32 {
            return Err(BsonError::InvalidBson(format!(
                "invalid document length {}",
                declared
            )));
        }
        // 缓冲区随实际读到的数据增长，不按声明长度预先分配
        let body_len = declared as u64 - header.len() as u64;
        let mut buf = header.to_vec();
        let read = (&mut self.reader).take(body_len).read_to_end(&mut buf)?;
        if (read as u64) < body_len {
            return Err(BsonError::InvalidBson(
                "truncated document in stream".to_string(),
            ));
        }
        decode(&buf, &self.options).map(Some)
    }
}

impl<R: Read> Iterator for DocumentReader<R> {
    type Item = BsonResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_next() {
            Ok(Some(doc)) => Some(Ok(doc)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use std::collections::BTreeMap;

    fn opts() -> DecodeOptions {
        DecodeOptions::default()
    }

    const SIMPLE: [u8; 12] = [0x0C, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0];

    #[test]
    fn test_decode_simple() {
        assert_eq!(decode(&SIMPLE, &opts()).unwrap(), doc! { "a": 1 });
    }

    #[test]
    fn test_decode_into_btreemap() {
        let map: BTreeMap<String, BsonValue> = decode_with(&SIMPLE, &opts()).unwrap();
        assert_eq!(map.get("a"), Some(&BsonValue::Int32(1)));
    }

    #[test]
    fn test_short_buffer() {
        assert!(matches!(decode(&SIMPLE[..11], &opts()), Err(BsonError::InvalidBson(_))));
        assert!(matches!(decode(&SIMPLE[..3], &opts()), Err(BsonError::InvalidBson(_))));
        assert!(matches!(decode(&[], &opts()), Err(BsonError::InvalidBson(_))));
    }

    #[test]
    fn test_bad_terminator() {
        let mut bytes = SIMPLE;
        bytes[11] = 0x01;
        assert!(matches!(decode(&bytes, &opts()), Err(BsonError::InvalidBson(_))));
    }

    #[test]
    fn test_unknown_tag() {
        let mut bytes = SIMPLE;
        bytes[4] = 0x13;
        let err = decode(&bytes, &opts()).unwrap_err();
        assert!(matches!(err, BsonError::InvalidBson(ref msg) if msg.contains("0x13")));
    }

    #[test]
    fn test_length_below_minimum() {
        assert!(matches!(
            decode(&[0x04, 0, 0, 0, 0], &opts()),
            Err(BsonError::InvalidBson(_))
        ));
        assert!(matches!(
            decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0], &opts()),
            Err(BsonError::InvalidBson(_))
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = SIMPLE.to_vec();
        bytes.push(0);
        assert!(decode(&bytes, &opts()).is_err());
        let (doc, rest) = decode_prefix(&bytes, &opts()).unwrap();
        assert_eq!(doc, doc! { "a": 1 });
        assert_eq!(rest, &[0]);
    }

    #[test]
    fn test_element_overruns_document() {
        // int32 负载被声明长度截断，结束符之前只剩 3 字节
        let bytes = [0x0B, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0];
        assert!(matches!(decode(&bytes, &opts()), Err(BsonError::InvalidBson(_))));
    }

    #[test]
    fn test_nested_overrun_rejected() {
        // 内层文档声明 10 字节，超出外层剩余范围
        let bytes = [0x0D, 0, 0, 0, 0x03, b'd', 0, 0x0A, 0, 0, 0, 0, 0];
        assert!(matches!(decode(&bytes, &opts()), Err(BsonError::InvalidBson(_))));
    }

    #[test]
    fn test_string_validation() {
        // 长度 0
        let zero = [0x0E, 0, 0, 0, 0x02, b's', 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(decode(&zero, &opts()), Err(BsonError::InvalidBson(_))));
        // 缺少 NUL
        let unterminated = [0x0F, 0, 0, 0, 0x02, b's', 0, 2, 0, 0, 0, b'x', b'y', 0, 0];
        assert!(matches!(decode(&unterminated, &opts()), Err(BsonError::InvalidBson(_))));
        // 非法 UTF-8
        let invalid = [0x0F, 0, 0, 0, 0x02, b's', 0, 2, 0, 0, 0, 0xFF, 0, 0, 0];
        assert!(matches!(decode(&invalid, &opts()), Err(BsonError::InvalidStringData(_))));
    }

    #[test]
    fn test_boolean_validation() {
        let bytes = [0x09, 0, 0, 0, 0x08, b'b', 0, 0x02, 0];
        assert!(matches!(decode(&bytes, &opts()), Err(BsonError::InvalidBson(_))));
    }

    #[test]
    fn test_binary_old_length_mismatch() {
        let bytes = [
            0x13, 0, 0, 0, 0x05, b'b', 0, 6, 0, 0, 0, 2, 3, 0, 0, 0, 0xAA, 0xBB, 0,
        ];
        let err = decode(&bytes, &opts()).unwrap_err();
        assert!(matches!(err, BsonError::InvalidBson(ref msg) if msg.contains("st 2")));
    }

    #[test]
    fn test_binary_old_roundtrip() {
        let bytes = [
            0x13, 0, 0, 0, 0x05, b'b', 0, 6, 0, 0, 0, 2, 2, 0, 0, 0, 0xAA, 0xBB, 0,
        ];
        let doc = decode(&bytes, &opts()).unwrap();
        assert_eq!(
            doc.get("b"),
            Some(&BsonValue::Binary(Binary::new(BinarySubtype::BinaryOld, vec![0xAA, 0xBB])))
        );
    }

    #[test]
    fn test_array_stops_at_gap() {
        // 数组文档键为 "0","2"
        let bytes = [
            0x1B, 0, 0, 0, 0x04, b'a', 0, 0x13, 0, 0, 0, 0x10, b'0', 0, 1, 0, 0, 0, 0x10, b'2', 0, 3,
            0, 0, 0, 0, 0,
        ];
        let doc = decode(&bytes, &opts()).unwrap();
        assert_eq!(doc.get("a"), Some(&BsonValue::Array(vec![BsonValue::Int32(1)])));
    }

    #[test]
    fn test_dbref_reinterpretation() {
        let inner = doc! { "$ref": "users", "$id": 7, "$db": "app", "note": "x" };
        let mut outer = Document::new();
        outer.insert("r", inner);
        let bytes = crate::encode(&outer, &Default::default()).unwrap();
        let decoded = decode(&bytes, &opts()).unwrap();
        let Some(BsonValue::DbRef(r)) = decoded.get("r") else {
            panic!("expected DbRef, got {:?}", decoded.get("r"));
        };
        assert_eq!(r.collection, "users");
        assert_eq!(*r.id, BsonValue::Int32(7));
        assert_eq!(r.database.as_deref(), Some("app"));
        assert_eq!(r.extra, doc! { "note": "x" });
    }

    #[test]
    fn test_ref_without_id_stays_document() {
        let bytes = crate::encode(&doc! { "r": { "$ref": "users" } }, &Default::default()).unwrap();
        let decoded = decode(&bytes, &opts()).unwrap();
        assert!(matches!(decoded.get("r"), Some(BsonValue::Document(_))));
    }

    #[test]
    fn test_infer_sequences() {
        let bytes = crate::encode(&doc! { "m": { "1": "b", "0": "a" } }, &Default::default()).unwrap();
        let plain = decode(&bytes, &opts()).unwrap();
        assert!(matches!(plain.get("m"), Some(BsonValue::Document(_))));

        let inferred = decode(
            &bytes,
            &DecodeOptions {
                infer_sequences: true,
                ..opts()
            },
        )
        .unwrap();
        assert_eq!(inferred.get("m"), Some(&crate::bson!(["a", "b"])));
    }

    #[test]
    fn test_uuid_decoding() {
        let uuid = Uuid::from_bytes([5; 16]);
        let mut doc = Document::new();
        doc.insert("u", uuid);
        let bytes = crate::encode(&doc, &Default::default()).unwrap();
        assert_eq!(decode(&bytes, &opts()).unwrap().get("u"), Some(&BsonValue::Uuid(uuid)));

        let raw = decode(
            &bytes,
            &DecodeOptions {
                decode_uuids: false,
                ..opts()
            },
        )
        .unwrap();
        assert_eq!(
            raw.get("u"),
            Some(&BsonValue::Binary(Binary::new(BinarySubtype::UuidOld, vec![5; 16])))
        );
    }

    #[test]
    fn test_legacy_db_pointer() {
        let mut bytes = vec![0, 0, 0, 0, 0x0C, b'p', 0, 2, 0, 0, 0, b'c', 0];
        bytes.extend_from_slice(&[1; 12]);
        bytes.push(0);
        let len = bytes.len() as i32;
        bytes[..4].copy_from_slice(&len.to_le_bytes());
        let doc = decode(&bytes, &opts()).unwrap();
        assert_eq!(
            doc.get("p"),
            Some(&BsonValue::DbRef(DbRef::new("c", ObjectId::from_bytes([1; 12]))))
        );
    }

    #[test]
    fn test_code_with_scope_length_mismatch() {
        let mut doc = Document::new();
        doc.insert(
            "c",
            CodeWithScope {
                code: "x".into(),
                scope: Document::new(),
            },
        );
        let mut bytes = crate::encode(&doc, &Default::default()).unwrap();
        assert!(decode(&bytes, &opts()).is_ok());
        // total 字段位于 tag + "c\0" 之后
        bytes[7] += 1;
        assert!(matches!(decode(&bytes, &opts()), Err(BsonError::InvalidBson(_))));
    }

    #[test]
    fn test_decode_all() {
        let mut stream = SIMPLE.to_vec();
        stream.extend_from_slice(&[0x05, 0, 0, 0, 0]);
        let docs = decode_all(&stream, &opts()).unwrap();
        assert_eq!(docs, vec![doc! { "a": 1 }, Document::new()]);

        stream.extend_from_slice(&[0x05, 0]);
        assert!(matches!(decode_all(&stream, &opts()), Err(BsonError::InvalidBson(_))));
    }

    #[test]
    fn test_document_reader() {
        let mut stream = SIMPLE.to_vec();
        stream.extend_from_slice(&SIMPLE);
        let docs: Vec<Document> = DocumentReader::new(stream.as_slice(), opts())
            .collect::<BsonResult<_>>()
            .unwrap();
        assert_eq!(docs.len(), 2);

        stream.extend_from_slice(&SIMPLE[..6]);
        let results: Vec<_> = DocumentReader::new(stream.as_slice(), opts()).collect();
        assert_eq!(results.len(), 3);
        assert!(matches!(results[2], Err(BsonError::InvalidBson(_))));
    }

    #[test]
    fn test_document_reader_oversized_header() {
        // 声明接近 2 GiB，实际只有几个字节
        let mut stream = i32::MAX.to_le_bytes().to_vec();
        stream.extend_from_slice(&[0x0A, b'a', 0x00, 0x00]);
        let mut reader = DocumentReader::new(stream.as_slice(), opts());
        assert!(matches!(reader.next(), Some(Err(BsonError::InvalidBson(_)))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid(&SIMPLE));
        assert!(!is_valid(&SIMPLE[1..]));
    }

    #[test]
    fn test_depth_limit() {
        let options = DecodeOptions {
            max_depth: 2,
            ..opts()
        };
        let bytes = crate::encode(&doc! { "a": { "b": { "c": 1 } } }, &Default::default()).unwrap();
        assert!(matches!(decode(&bytes, &options), Err(BsonError::InvalidBson(_))));
        assert!(decode(&bytes, &opts()).is_ok());
    }
}
