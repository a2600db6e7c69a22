//! BSON 编码模块
//!
//! 将 [`Document`] 序列化为 BSON 线格式：
//!
//! ```text
//! document := int32 total_len | element* | 0x00
//! element  := u8 tag | cstring key | payload
//! ```
//!
//! 容器先写 4 字节占位长度，写完元素与结束符后回填实际长度。
//! 编码失败时输出缓冲区恢复到调用前的状态，不留下部分结果。

use crate::config::{CodecConfig, EncodeConfig};
use crate::document::Document;
use crate::spec::*;
use crate::state::{ConversionChain, ElementState, StateStrategy};
use crate::value::{Binary, BsonValue, CodeWithScope};
use crate::{BsonError, BsonResult};
use bytes::{BufMut, BytesMut};
use std::sync::Arc;
use tracing::trace;

/// 一次编码调用所需的全部输入
///
/// 编码配置与已解析好的转换链，作为普通的值传入每次编码。
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub config: EncodeConfig,
    pub chain: ConversionChain,
}

impl EncodeOptions {
    pub fn new(config: EncodeConfig, chain: ConversionChain) -> Self {
        Self { config, chain }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self {
            config: config.encode.clone(),
            chain: ConversionChain::from_config(&config.conversion),
        }
    }

    /// 启用或关闭 `$` / `.` 键检查
    pub fn check_keys(mut self, on: bool) -> Self {
        self.config.check_keys = on;
        self
    }

    pub fn with_chain(mut self, chain: ConversionChain) -> Self {
        self.chain = chain;
        self
    }

    /// 在转换链尾追加自定义策略
    pub fn with_strategy(mut self, strategy: Arc<dyn StateStrategy>) -> Self {
        self.chain = self.chain.with_strategy(strategy);
        self
    }
}

/// 编码文档为字节向量
///
/// # Brief
/// 按线格式序列化文档；顶层 `_id` 总是最先写出
///
/// # Arguments
/// * `doc` - 要编码的文档
/// * `options` - 编码配置与转换链
///
/// # Returns
/// 成功返回编码后的字节，失败返回 `InvalidDocument` / `InvalidStringData` / `Overflow`
pub fn encode(doc: &Document, options: &EncodeOptions) -> BsonResult<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(256);
    encode_to(doc, &mut buf, options)?;
    Ok(buf.to_vec())
}

/// 编码文档并追加到缓冲区
///
/// # Brief
/// 失败时缓冲区被截断回调用前的长度
///
/// # Arguments
/// * `doc` - 要编码的文档
/// * `buf` - 目标缓冲区
/// * `options` - 编码配置与转换链
pub fn encode_to(doc: &Document, buf: &mut BytesMut, options: &EncodeOptions) -> BsonResult<()> {
    let start = buf.len();
    let result = Encoder::new(buf, options).encode_document(doc, true, options.config.check_keys);
    match result {
        Ok(()) => {
            trace!("Encoded document: {} bytes", buf.len() - start);
            Ok(())
        }
        Err(e) => {
            buf.truncate(start);
            Err(e)
        }
    }
}

/// 编码顶层调用方对象
///
/// # Brief
/// 先经转换链求得状态，状态必须是文档
///
/// # Arguments
/// * `value` - 没有直接线格式映射的对象
/// * `options` - 编码配置与转换链
pub fn encode_state(value: &dyn ElementState, options: &EncodeOptions) -> BsonResult<Vec<u8>> {
    encode(&options.chain.resolve_document(value)?, options)
}

/// BSON 编码器
///
/// 内部结构，持有输出缓冲区与当前嵌套深度
struct Encoder<'a> {
    buf: &'a mut BytesMut,
    options: &'a EncodeOptions,
    depth: usize,
}

impl<'a> Encoder<'a> {
    fn new(buf: &'a mut BytesMut, options: &'a EncodeOptions) -> Self {
        Self {
            buf,
            options,
            depth: 0,
        }
    }

    fn enter(&mut self) -> BsonResult<()> {
        self.depth += 1;
        if self.depth > self.options.config.max_depth {
            return Err(BsonError::InvalidDocument(format!(
                "maximum nesting depth {} exceeded",
                self.options.config.max_depth
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// 编码一个文档(含长度前缀与结束符)
    ///
    /// # Arguments
    /// * `doc` - 文档
    /// * `top_level` - 是否顶层；顶层的 `_id` 最先写出且免于键检查
    /// * `check_keys` - 是否对本层及子树执行 `$` / `.` 检查
    fn encode_document(&mut self, doc: &Document, top_level: bool, check_keys: bool) -> BsonResult<()> {
        self.enter()?;
        let start = self.begin_frame();

        if top_level {
            if let Some(id) = doc.id() {
                self.encode_element(ID_KEY, id, false)?;
            }
        }
        for (key, value) in doc.iter() {
            if top_level && key == ID_KEY {
                continue;
            }
            self.encode_element(key, value, check_keys)?;
        }

        self.buf.put_u8(TERMINATOR);
        self.end_frame(start)?;
        self.leave();
        Ok(())
    }

    /// 序列以 "0","1",… 为键的文档形式编码
    fn encode_array(&mut self, items: &[BsonValue], check_keys: bool) -> BsonResult<()> {
        self.enter()?;
        let start = self.begin_frame();
        for (index, item) in items.iter().enumerate() {
            self.encode_element(&index.to_string(), item, check_keys)?;
        }
        self.buf.put_u8(TERMINATOR);
        self.end_frame(start)?;
        self.leave();
        Ok(())
    }

    fn encode_element(&mut self, key: &str, value: &BsonValue, check_keys: bool) -> BsonResult<()> {
        if let BsonValue::Object(obj) = value {
            let state = self.options.chain.resolve(obj.state())?;
            self.enter()?;
            self.encode_element(key, &state, check_keys)?;
            self.leave();
            return Ok(());
        }
        let Some(tag) = value.element_type() else {
            return Err(BsonError::InvalidDocument(format!(
                "cannot convert value of type {} to bson",
                value.type_name()
            )));
        };

        self.buf.put_u8(tag.as_u8());
        self.encode_key(key, check_keys)?;

        match value {
            BsonValue::Double(n) => self.buf.put_f64_le(*n),
            BsonValue::String(s) | BsonValue::Code(s) | BsonValue::Symbol(s) => {
                self.encode_string(s)?
            }
            BsonValue::Document(doc) => self.encode_document(doc, false, check_keys)?,
            BsonValue::Array(items) => self.encode_array(items, check_keys)?,
            BsonValue::Binary(b) => self.encode_binary(b)?,
            BsonValue::Uuid(u) => {
                let binary = Binary::new(self.options.config.uuid_subtype(), u.as_bytes().to_vec());
                self.encode_binary(&binary)?
            }
            BsonValue::ObjectId(oid) => self.buf.put_slice(oid.as_bytes()),
            BsonValue::Boolean(b) => self.buf.put_u8(u8::from(*b)),
            BsonValue::DateTime(dt) => self.buf.put_i64_le(dt.timestamp_millis()),
            BsonValue::Null | BsonValue::MinKey | BsonValue::MaxKey => {}
            BsonValue::Regex(r) => {
                self.encode_cstring(&r.pattern, "regex patterns")?;
                self.encode_cstring(&r.flags.to_string(), "regex flags")?;
            }
            // 引用以等价的嵌入文档写出，子树免于键检查
            BsonValue::DbRef(r) => self.encode_document(&r.as_document(), false, false)?,
            BsonValue::CodeWithScope(c) => self.encode_code_with_scope(c)?,
            BsonValue::Int32(n) => self.buf.put_i32_le(*n),
            BsonValue::Timestamp(ts) => {
                self.buf.put_u32_le(ts.increment);
                self.buf.put_u32_le(ts.time);
            }
            BsonValue::Int64(n) => self.buf.put_i64_le(*n),
            BsonValue::Object(_) => {}
        }
        Ok(())
    }

    fn encode_key(&mut self, key: &str, check_keys: bool) -> BsonResult<()> {
        validate_key(key, check_keys)?;
        self.encode_cstring(key, "keys")
    }

    fn encode_cstring(&mut self, s: &str, what: &str) -> BsonResult<()> {
        validate_cstring(s, what)?;
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(TERMINATOR);
        Ok(())
    }

    /// 字符串: int32 (字节数 + 1) | UTF-8 字节 | 0x00
    fn encode_string(&mut self, s: &str) -> BsonResult<()> {
        let len = checked_len(s.len() + 1)?;
        self.buf.put_i32_le(len);
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(TERMINATOR);
        Ok(())
    }

    /// 二进制: int32 len | u8 subtype | bytes
    ///
    /// 子类型 2 在负载前再写一次内部长度，外部长度因此多出 4 字节。
    fn encode_binary(&mut self, binary: &Binary) -> BsonResult<()> {
        let len = checked_len(binary.bytes.len())?;
        if binary.subtype == BinarySubtype::BinaryOld {
            self.buf.put_i32_le(checked_len(binary.bytes.len() + 4)?);
            self.buf.put_u8(binary.subtype.into());
            self.buf.put_i32_le(len);
        } else {
            self.buf.put_i32_le(len);
            self.buf.put_u8(binary.subtype.into());
        }
        self.buf.put_slice(&binary.bytes);
        Ok(())
    }

    /// 带作用域代码: int32 total | string code | document scope
    fn encode_code_with_scope(&mut self, code: &CodeWithScope) -> BsonResult<()> {
        let start = self.begin_frame();
        self.encode_string(&code.code)?;
        self.encode_document(&code.scope, false, false)?;
        self.end_frame(start)
    }

    fn begin_frame(&mut self) -> usize {
        let start = self.buf.len();
        self.buf.put_i32_le(0);
        start
    }

    fn end_frame(&mut self, start: usize) -> BsonResult<()> {
        let len = checked_len(self.buf.len() - start)?;
        self.buf[start..start + 4].copy_from_slice(&len.to_le_bytes());
        Ok(())
    }
}

/// 校验元素键
///
/// NUL 总是非法；`check_keys` 时另外拒绝 `$` 开头或包含 `.` 的键
pub(crate) fn validate_key(key: &str, check_keys: bool) -> BsonResult<()> {
    if check_keys {
        if key.starts_with('$') {
            return Err(BsonError::InvalidDocument(format!(
                "key '{}' must not start with '$'",
                key
            )));
        }
        if key.contains('.') {
            return Err(BsonError::InvalidDocument(format!(
                "key '{}' must not contain '.'",
                key
            )));
        }
    }
    validate_cstring(key, "keys")
}

pub(crate) fn validate_cstring(s: &str, what: &str) -> BsonResult<()> {
    if s.as_bytes().contains(&0) {
        return Err(BsonError::InvalidDocument(format!(
            "BSON {} must not contain a NUL character",
            what
        )));
    }
    Ok(())
}

fn checked_len(len: usize) -> BsonResult<i32> {
    i32::try_from(len).map_err(|_| {
        BsonError::InvalidDocument(format!("value of {} bytes exceeds the int32 length field", len))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{DateTime, DbRef, RegexValue, Timestamp};
    use crate::{doc, ObjectId};

    fn opts() -> EncodeOptions {
        EncodeOptions::default()
    }

    #[test]
    fn test_simple_document_bytes() {
        let bytes = encode(&doc! { "a": 1 }, &opts()).unwrap();
        assert_eq!(
            bytes,
            [0x0C, 0x00, 0x00, 0x00, 0x10, b'a', 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_empty_document() {
        let bytes = encode(&Document::new(), &opts()).unwrap();
        assert_eq!(bytes, [0x05, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_id_first() {
        let bytes = encode(&doc! { "a": 1, "_id": 2 }, &opts()).unwrap();
        assert_eq!(&bytes[4..9], &[0x10, b'_', b'i', b'd', 0x00]);
    }

    #[test]
    fn test_nested_id_keeps_position() {
        let bytes = encode(&doc! { "n": { "a": 1, "_id": 2 } }, &opts()).unwrap();
        // n 子文档: 长度(4) 之后第一个元素是 "a"
        assert_eq!(&bytes[11..14], &[0x10, b'a', 0x00]);
    }

    #[test]
    fn test_integer_tags() {
        let doc = doc! { "small": (i32::MAX as i64), "big": (i32::MAX as i64 + 1) };
        let bytes = encode(&doc, &opts()).unwrap();
        assert_eq!(bytes[4], 0x10);
        // 4 + 1 + "small\0" + 4 = 15
        assert_eq!(bytes[15], 0x12);
    }

    #[test]
    fn test_explicit_int64_keeps_tag() {
        let mut doc = Document::new();
        doc.insert("n", BsonValue::Int64(1));
        let bytes = encode(&doc, &opts()).unwrap();
        assert_eq!(bytes[4], 0x12);
        assert_eq!(bytes.len(), 4 + 1 + 2 + 8 + 1);
    }

    #[test]
    fn test_bool_not_integer() {
        let bytes = encode(&doc! { "b": true }, &opts()).unwrap();
        assert_eq!(bytes, [0x09, 0, 0, 0, 0x08, b'b', 0, 0x01, 0]);
    }

    #[test]
    fn test_check_keys() {
        let doc = doc! { "a.b": 1 };
        assert!(encode(&doc, &opts()).is_ok());
        assert!(matches!(
            encode(&doc, &opts().check_keys(true)),
            Err(BsonError::InvalidDocument(_))
        ));
        assert!(matches!(
            encode(&doc! { "$set": 1 }, &opts().check_keys(true)),
            Err(BsonError::InvalidDocument(_))
        ));
        assert!(matches!(
            encode(&doc! { "x": { "y.z": 1 } }, &opts().check_keys(true)),
            Err(BsonError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_check_keys_exemptions() {
        let checked = opts().check_keys(true);
        let dbref = DbRef::new("users", ObjectId::from_bytes([1; 12]));
        let mut doc = Document::new();
        doc.insert("ref", dbref);
        doc.insert("_id", doc! { "$oid": "x" });
        assert!(encode(&doc, &checked).is_ok());
    }

    #[test]
    fn test_nul_in_key_rejected() {
        let mut doc = Document::new();
        doc.insert("a\0b", 1);
        assert!(matches!(encode(&doc, &opts()), Err(BsonError::InvalidDocument(_))));
    }

    #[test]
    fn test_nul_in_regex_rejected() {
        let mut doc = Document::new();
        doc.insert("r", RegexValue::new("a\0", "i"));
        assert!(matches!(encode(&doc, &opts()), Err(BsonError::InvalidDocument(_))));
    }

    #[test]
    fn test_binary_old_inner_length() {
        let mut doc = Document::new();
        doc.insert("b", Binary::new(BinarySubtype::BinaryOld, vec![0xAA, 0xBB]));
        let bytes = encode(&doc, &opts()).unwrap();
        // tag, "b\0", outer len 6, subtype 2, inner len 2, payload
        assert_eq!(
            &bytes[4..],
            &[0x05, b'b', 0, 6, 0, 0, 0, 2, 2, 0, 0, 0, 0xAA, 0xBB, 0]
        );
    }

    #[test]
    fn test_uuid_subtype() {
        let uuid = uuid::Uuid::from_bytes([9; 16]);
        let mut doc = Document::new();
        doc.insert("u", uuid);
        let bytes = encode(&doc, &opts()).unwrap();
        assert_eq!(&bytes[7..12], &[16, 0, 0, 0, 3]);

        let mut config = EncodeConfig::default();
        config.uuid_subtype = 4;
        let bytes = encode(&doc, &EncodeOptions::new(config, ConversionChain::default())).unwrap();
        assert_eq!(bytes[11], 4);
    }

    #[test]
    fn test_timestamp_increment_first() {
        let mut doc = Document::new();
        doc.insert("t", Timestamp::new(1, 2));
        let bytes = encode(&doc, &opts()).unwrap();
        assert_eq!(&bytes[7..15], &[2, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_code_with_scope_frame() {
        let mut doc = Document::new();
        doc.insert(
            "c",
            CodeWithScope {
                code: "x".into(),
                scope: doc! { "x": 1 },
            },
        );
        let bytes = encode(&doc, &opts()).unwrap();
        // total = 4 + (4 + 2) + 12
        assert_eq!(&bytes[7..11], &[22, 0, 0, 0]);
        assert_eq!(bytes.len(), 4 + 3 + 22 + 1);
    }

    #[test]
    fn test_datetime_and_regex_layout() {
        let mut doc = Document::new();
        doc.insert("d", DateTime::from_millis(-1));
        doc.insert("r", RegexValue::new("^a", "mi"));
        let bytes = encode(&doc, &opts()).unwrap();
        assert_eq!(&bytes[4..15], &[0x09, b'd', 0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[15..], &[0x0B, b'r', 0, b'^', b'a', 0, b'i', b'm', 0, 0]);
    }

    #[test]
    fn test_depth_limit() {
        let mut value = BsonValue::Document(Document::new());
        for _ in 0..MAX_NESTING_DEPTH + 1 {
            let mut doc = Document::new();
            doc.insert("n", value);
            value = BsonValue::Document(doc);
        }
        let Some(doc) = value.as_document() else { unreachable!() };
        assert!(matches!(encode(doc, &opts()), Err(BsonError::InvalidDocument(_))));
    }

    #[test]
    fn test_failed_encode_leaves_buffer_untouched() {
        let mut buf = BytesMut::from(&b"prefix"[..]);
        let result = encode_to(&doc! { "a": { "$bad": 1 } }, &mut buf, &opts().check_keys(true));
        assert!(result.is_err());
        assert_eq!(&buf[..], b"prefix");
    }
}
