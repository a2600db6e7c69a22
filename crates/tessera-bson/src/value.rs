//! BSON 值类型定义模块
//!
//! 定义线格式支持的所有值类型，以及没有直接线格式映射、需要经转换链
//! 处理的调用方对象 [`ObjectValue`]。使用 `CompactString` 优化短字符串。

use crate::document::Document;
use crate::spec::{BinarySubtype, ElementType, DBREF_DB_KEY, DBREF_ID_KEY, DBREF_REF_KEY, MAX_INT32, MIN_INT32};
use crate::state::ElementState;
use crate::{BsonError, BsonResult};
use chrono::{TimeZone, Utc};
use compact_str::CompactString;
use std::fmt;
use std::sync::Arc;
use tessera_common::ObjectId;
use uuid::Uuid;

/// BSON 值的枚举类型
///
/// # 支持的类型
///
/// - **数值**: Double, Int32, Int64
/// - **文本**: String, Symbol, Code, CodeWithScope, Regex
/// - **复合**: Document, Array, DbRef
/// - **二进制**: Binary, Uuid (子类型 3/4)
/// - **标识与时间**: ObjectId, DateTime, Timestamp
/// - **哨兵**: Null, MinKey, MaxKey
/// - **调用方对象**: Object (编码时经转换链求得状态)
///
/// 整数从 Rust 原生类型转换时按取值范围选择 Int32 / Int64,
/// 显式构造的 `Int64` 变体始终以 64 位标记编码。
#[derive(Debug, Clone, PartialEq)]
pub enum BsonValue {
    /// IEEE-754 双精度浮点数
    Double(f64),
    /// UTF-8 字符串
    String(CompactString),
    /// 嵌入文档
    Document(Document),
    /// 有序序列
    Array(Vec<BsonValue>),
    /// 带子类型的二进制数据
    Binary(Binary),
    /// 128 位 UUID，编码为子类型 3 或 4 的二进制
    Uuid(Uuid),
    /// 12 字节对象标识符
    ObjectId(ObjectId),
    /// 布尔值
    Boolean(bool),
    /// UTC 时间(毫秒)
    DateTime(DateTime),
    /// 空值
    Null,
    /// 正则表达式
    Regex(RegexValue),
    /// 跨文档引用
    DbRef(DbRef),
    /// JavaScript 代码
    Code(CompactString),
    /// 带作用域的 JavaScript 代码
    CodeWithScope(CodeWithScope),
    /// 符号
    Symbol(CompactString),
    /// 32 位有符号整数
    Int32(i32),
    /// 复制协议时间戳
    Timestamp(Timestamp),
    /// 64 位有符号整数
    Int64(i64),
    MinKey,
    MaxKey,
    /// 没有直接线格式映射的调用方对象
    Object(ObjectValue),
}

/// 二进制数据
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    pub subtype: BinarySubtype,
    pub bytes: Vec<u8>,
}

impl Binary {
    pub fn new(subtype: impl Into<BinarySubtype>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            subtype: subtype.into(),
            bytes: bytes.into(),
        }
    }

    pub fn generic(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(BinarySubtype::Generic, bytes)
    }

    /// 是否应解释为 UUID(子类型 3/4 且恰好 16 字节)
    pub fn as_uuid(&self) -> Option<Uuid> {
        if !self.subtype.is_uuid() {
            return None;
        }
        let bytes: [u8; 16] = self.bytes.as_slice().try_into().ok()?;
        Some(Uuid::from_bytes(bytes))
    }
}

/// 正则表达式标志
///
/// 线格式上只承认固定字母集 `i l m s u x`，并总以这个顺序输出。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegexFlags(u8);

impl RegexFlags {
    pub const IGNORE_CASE: Self = Self(1 << 0);
    pub const LOCALE: Self = Self(1 << 1);
    pub const MULTILINE: Self = Self(1 << 2);
    pub const DOT_ALL: Self = Self(1 << 3);
    pub const UNICODE: Self = Self(1 << 4);
    pub const VERBOSE: Self = Self(1 << 5);

    const LETTERS: [(char, RegexFlags); 6] = [
        ('i', Self::IGNORE_CASE),
        ('l', Self::LOCALE),
        ('m', Self::MULTILINE),
        ('s', Self::DOT_ALL),
        ('u', Self::UNICODE),
        ('x', Self::VERBOSE),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    /// 解析标志字符串，忽略未知字母
    pub fn parse(flags: &str) -> Self {
        let mut result = Self::empty();
        for c in flags.chars() {
            if let Some((_, flag)) = Self::LETTERS.iter().find(|(l, _)| *l == c) {
                result = result | *flag;
            }
        }
        result
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for RegexFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for RegexFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, flag) in Self::LETTERS {
            if self.contains(flag) {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

/// 正则表达式值
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegexValue {
    /// 正则表达式模式
    pub pattern: CompactString,
    /// 正则表达式标志
    pub flags: RegexFlags,
}

impl RegexValue {
    pub fn new(pattern: impl Into<CompactString>, flags: &str) -> Self {
        Self {
            pattern: pattern.into(),
            flags: RegexFlags::parse(flags),
        }
    }

    /// 编译为 `regex::Regex`
    ///
    /// # Brief
    /// 按标志配置构建器；`l` (locale) 没有对应项，直接忽略
    ///
    /// # Returns
    /// 成功返回编译后的正则，模式不被 `regex` 支持时返回其错误
    pub fn compile(&self) -> Result<regex::Regex, regex::Error> {
        regex::RegexBuilder::new(&self.pattern)
            .case_insensitive(self.flags.contains(RegexFlags::IGNORE_CASE))
            .multi_line(self.flags.contains(RegexFlags::MULTILINE))
            .dot_matches_new_line(self.flags.contains(RegexFlags::DOT_ALL))
            .ignore_whitespace(self.flags.contains(RegexFlags::VERBOSE))
            .build()
    }
}

/// UTC 时间，以自纪元起的毫秒数存储
///
/// 直接保存 i64 毫秒值，因此线格式上的任意取值都能无损往返；
/// 与 `chrono` 的互转只在需要日历语义时进行。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DateTime(i64);

impl DateTime {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub const fn timestamp_millis(self) -> i64 {
        self.0
    }

    /// 转换为 chrono 时间，超出 chrono 可表示范围时返回 `None`
    pub fn to_chrono(self) -> Option<chrono::DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

impl From<chrono::DateTime<Utc>> for DateTime {
    fn from(dt: chrono::DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_chrono() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// 复制协议时间戳，线格式上先写 increment 再写 time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    pub time: u32,
    pub increment: u32,
}

impl Timestamp {
    pub const fn new(time: u32, increment: u32) -> Self {
        Self { time, increment }
    }
}

/// 带作用域的代码
#[derive(Debug, Clone, PartialEq)]
pub struct CodeWithScope {
    pub code: CompactString,
    pub scope: Document,
}

/// 跨文档引用
///
/// 编码为含保留键 `$ref`、`$id`、`$db` 的嵌入文档，其余键原样附在后面。
#[derive(Debug, Clone, PartialEq)]
pub struct DbRef {
    pub collection: CompactString,
    pub id: Box<BsonValue>,
    pub database: Option<CompactString>,
    pub extra: Document,
}

impl DbRef {
    pub fn new(collection: impl Into<CompactString>, id: impl Into<BsonValue>) -> Self {
        Self {
            collection: collection.into(),
            id: Box::new(id.into()),
            database: None,
            extra: Document::new(),
        }
    }

    pub fn with_database(mut self, database: impl Into<CompactString>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// 转换为等价的嵌入文档结构
    ///
    /// # Returns
    /// 依次包含 `$ref`、`$id`、可选的 `$db` 以及附加字段的文档
    pub fn as_document(&self) -> Document {
        let mut doc = Document::with_capacity(3 + self.extra.len());
        doc.insert(DBREF_REF_KEY, BsonValue::String(self.collection.clone()));
        doc.insert(DBREF_ID_KEY, (*self.id).clone());
        if let Some(db) = &self.database {
            doc.insert(DBREF_DB_KEY, BsonValue::String(db.clone()));
        }
        for (k, v) in self.extra.iter() {
            doc.insert(k, v.clone());
        }
        doc
    }

    /// 从解码出的文档识别引用
    ///
    /// # Brief
    /// `$ref` 必须是字符串且 `$id` 必须存在；否则原样返回文档
    pub fn from_document(mut doc: Document) -> Result<Self, Document> {
        let is_ref = matches!(doc.get(DBREF_REF_KEY), Some(BsonValue::String(_)))
            && doc.contains_key(DBREF_ID_KEY);
        if !is_ref {
            return Err(doc);
        }
        let collection = match doc.remove(DBREF_REF_KEY) {
            Some(BsonValue::String(s)) => s,
            _ => return Err(doc),
        };
        let id = doc.remove(DBREF_ID_KEY).unwrap_or(BsonValue::Null);
        // 非字符串的 $db 留在附加字段中
        let database = match doc.get(DBREF_DB_KEY) {
            Some(BsonValue::String(db)) => {
                let db = db.clone();
                doc.remove(DBREF_DB_KEY);
                Some(db)
            }
            _ => None,
        };
        Ok(Self {
            collection,
            id: Box::new(id),
            database,
            extra: doc,
        })
    }
}

/// 没有直接线格式映射的调用方对象
///
/// 以共享指针持有，相等性按对象身份判断。
#[derive(Clone)]
pub struct ObjectValue(Arc<dyn ElementState>);

impl ObjectValue {
    pub fn new(value: impl ElementState + 'static) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc(value: Arc<dyn ElementState>) -> Self {
        Self(value)
    }

    pub fn state(&self) -> &dyn ElementState {
        self.0.as_ref()
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({}: {:?})", self.0.class_name(), self.0)
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }
}

impl BsonValue {
    /// 从任意宽度整数构造值
    ///
    /// # Brief
    /// 32 位范围内编码为 Int32，64 位范围内编码为 Int64，超出则溢出
    ///
    /// # Arguments
    /// * `value` - 整数值
    ///
    /// # Returns
    /// 成功返回整数值，超出 64 位有符号范围返回 `BsonError::Overflow`
    pub fn from_integer(value: i128) -> BsonResult<Self> {
        if value >= MIN_INT32 as i128 && value <= MAX_INT32 as i128 {
            Ok(BsonValue::Int32(value as i32))
        } else if let Ok(v) = i64::try_from(value) {
            Ok(BsonValue::Int64(v))
        } else {
            Err(BsonError::Overflow(format!(
                "BSON can only handle up to 8-byte ints, got {}",
                value
            )))
        }
    }

    /// 从原始字节构造字符串值
    ///
    /// # Returns
    /// 字节是有效 UTF-8 时返回字符串，否则返回 `BsonError::InvalidStringData`
    pub fn from_utf8(bytes: Vec<u8>) -> BsonResult<Self> {
        String::from_utf8(bytes)
            .map(|s| BsonValue::String(CompactString::from(s)))
            .map_err(|e| {
                BsonError::InvalidStringData(format!(
                    "strings in documents must be valid UTF-8: {:?}",
                    e.as_bytes()
                ))
            })
    }

    /// 对应的线格式类型标记；`Object` 需要先经转换链处理，没有标记
    pub fn element_type(&self) -> Option<ElementType> {
        Some(match self {
            BsonValue::Double(_) => ElementType::Double,
            BsonValue::String(_) => ElementType::String,
            BsonValue::Document(_) | BsonValue::DbRef(_) => ElementType::EmbeddedDocument,
            BsonValue::Array(_) => ElementType::Array,
            BsonValue::Binary(_) | BsonValue::Uuid(_) => ElementType::Binary,
            BsonValue::ObjectId(_) => ElementType::ObjectId,
            BsonValue::Boolean(_) => ElementType::Boolean,
            BsonValue::DateTime(_) => ElementType::DateTime,
            BsonValue::Null => ElementType::Null,
            BsonValue::Regex(_) => ElementType::Regex,
            BsonValue::Code(_) => ElementType::Code,
            BsonValue::CodeWithScope(_) => ElementType::CodeWithScope,
            BsonValue::Symbol(_) => ElementType::Symbol,
            BsonValue::Int32(_) => ElementType::Int32,
            BsonValue::Timestamp(_) => ElementType::Timestamp,
            BsonValue::Int64(_) => ElementType::Int64,
            BsonValue::MinKey => ElementType::MinKey,
            BsonValue::MaxKey => ElementType::MaxKey,
            BsonValue::Object(_) => return None,
        })
    }

    /// 获取值的类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            BsonValue::Double(_) => "double",
            BsonValue::String(_) => "string",
            BsonValue::Document(_) => "document",
            BsonValue::Array(_) => "array",
            BsonValue::Binary(_) => "binary",
            BsonValue::Uuid(_) => "uuid",
            BsonValue::ObjectId(_) => "objectId",
            BsonValue::Boolean(_) => "bool",
            BsonValue::DateTime(_) => "date",
            BsonValue::Null => "null",
            BsonValue::Regex(_) => "regex",
            BsonValue::DbRef(_) => "dbRef",
            BsonValue::Code(_) => "javascript",
            BsonValue::CodeWithScope(_) => "javascriptWithScope",
            BsonValue::Symbol(_) => "symbol",
            BsonValue::Int32(_) => "int",
            BsonValue::Timestamp(_) => "timestamp",
            BsonValue::Int64(_) => "long",
            BsonValue::MinKey => "minKey",
            BsonValue::MaxKey => "maxKey",
            BsonValue::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BsonValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BsonValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            BsonValue::Int32(n) => Some(*n),
            _ => None,
        }
    }

    /// 整数类型(Int32 或 Int64)统一读取为 i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BsonValue::Int32(n) => Some(*n as i64),
            BsonValue::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            BsonValue::Double(n) => Some(*n),
            BsonValue::Int32(n) => Some(*n as f64),
            BsonValue::Int64(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BsonValue::String(s) | BsonValue::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<BsonValue>> {
        match self {
            BsonValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            BsonValue::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            BsonValue::ObjectId(oid) => Some(*oid),
            _ => None,
        }
    }

    /// 从文档中获取键，或从数组中按下标字符串获取元素
    pub fn get(&self, key: &str) -> Option<&BsonValue> {
        match self {
            BsonValue::Document(doc) => doc.get(key),
            BsonValue::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
            _ => None,
        }
    }

    /// 按点分隔路径获取嵌套值，如 "user.tags.0"
    pub fn get_path(&self, path: &str) -> Option<&BsonValue> {
        let mut current = self;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }
}

impl fmt::Display for BsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BsonValue::Double(n) => write!(f, "{:?}", n),
            BsonValue::String(s) => write!(f, "\"{}\"", s),
            BsonValue::Document(doc) => write!(f, "{}", doc),
            BsonValue::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            BsonValue::Binary(b) => {
                write!(f, "Binary({}, <{} bytes>)", u8::from(b.subtype), b.bytes.len())
            }
            BsonValue::Uuid(u) => write!(f, "UUID(\"{}\")", u),
            BsonValue::ObjectId(id) => write!(f, "ObjectId(\"{}\")", id),
            BsonValue::Boolean(b) => write!(f, "{}", b),
            BsonValue::DateTime(dt) => write!(f, "DateTime(\"{}\")", dt),
            BsonValue::Null => write!(f, "null"),
            BsonValue::Regex(r) => write!(f, "/{}/{}", r.pattern, r.flags),
            BsonValue::DbRef(r) => match &r.database {
                Some(db) => write!(f, "DBRef(\"{}\", {}, \"{}\")", r.collection, r.id, db),
                None => write!(f, "DBRef(\"{}\", {})", r.collection, r.id),
            },
            BsonValue::Code(code) => write!(f, "Code({})", code),
            BsonValue::CodeWithScope(c) => write!(f, "Code({}, {})", c.code, c.scope),
            BsonValue::Symbol(s) => write!(f, "Symbol(\"{}\")", s),
            BsonValue::Int32(n) => write!(f, "{}", n),
            BsonValue::Timestamp(ts) => write!(f, "Timestamp({}, {})", ts.time, ts.increment),
            BsonValue::Int64(n) => write!(f, "NumberLong({})", n),
            BsonValue::MinKey => write!(f, "MinKey"),
            BsonValue::MaxKey => write!(f, "MaxKey"),
            BsonValue::Object(obj) => write!(f, "<{}>", obj.state().class_name()),
        }
    }
}

// ============================================================================
// From 特征实现 - 支持从各种 Rust 类型转换为 BsonValue
// ============================================================================

impl From<bool> for BsonValue {
    fn from(v: bool) -> Self {
        BsonValue::Boolean(v)
    }
}

impl From<i8> for BsonValue {
    fn from(v: i8) -> Self {
        BsonValue::Int32(v as i32)
    }
}

impl From<i16> for BsonValue {
    fn from(v: i16) -> Self {
        BsonValue::Int32(v as i32)
    }
}

impl From<i32> for BsonValue {
    fn from(v: i32) -> Self {
        BsonValue::Int32(v)
    }
}

impl From<u16> for BsonValue {
    fn from(v: u16) -> Self {
        BsonValue::Int32(v as i32)
    }
}

impl From<u32> for BsonValue {
    fn from(v: u32) -> Self {
        if v <= i32::MAX as u32 {
            BsonValue::Int32(v as i32)
        } else {
            BsonValue::Int64(v as i64)
        }
    }
}

impl From<i64> for BsonValue {
    fn from(v: i64) -> Self {
        if v >= MIN_INT32 && v <= MAX_INT32 {
            BsonValue::Int32(v as i32)
        } else {
            BsonValue::Int64(v)
        }
    }
}

impl TryFrom<u64> for BsonValue {
    type Error = BsonError;

    fn try_from(v: u64) -> BsonResult<Self> {
        BsonValue::from_integer(v as i128)
    }
}

impl TryFrom<i128> for BsonValue {
    type Error = BsonError;

    fn try_from(v: i128) -> BsonResult<Self> {
        BsonValue::from_integer(v)
    }
}

impl From<f32> for BsonValue {
    fn from(v: f32) -> Self {
        BsonValue::Double(v as f64)
    }
}

impl From<f64> for BsonValue {
    fn from(v: f64) -> Self {
        BsonValue::Double(v)
    }
}

impl From<&str> for BsonValue {
    fn from(v: &str) -> Self {
        BsonValue::String(CompactString::from(v))
    }
}

impl From<String> for BsonValue {
    fn from(v: String) -> Self {
        BsonValue::String(CompactString::from(v))
    }
}

impl From<CompactString> for BsonValue {
    fn from(v: CompactString) -> Self {
        BsonValue::String(v)
    }
}

impl From<Document> for BsonValue {
    fn from(v: Document) -> Self {
        BsonValue::Document(v)
    }
}

impl From<Binary> for BsonValue {
    fn from(v: Binary) -> Self {
        BsonValue::Binary(v)
    }
}

impl From<Uuid> for BsonValue {
    fn from(v: Uuid) -> Self {
        BsonValue::Uuid(v)
    }
}

impl From<ObjectId> for BsonValue {
    fn from(v: ObjectId) -> Self {
        BsonValue::ObjectId(v)
    }
}

impl From<DateTime> for BsonValue {
    fn from(v: DateTime) -> Self {
        BsonValue::DateTime(v)
    }
}

impl From<chrono::DateTime<Utc>> for BsonValue {
    fn from(v: chrono::DateTime<Utc>) -> Self {
        BsonValue::DateTime(v.into())
    }
}

impl From<RegexValue> for BsonValue {
    fn from(v: RegexValue) -> Self {
        BsonValue::Regex(v)
    }
}

impl From<DbRef> for BsonValue {
    fn from(v: DbRef) -> Self {
        BsonValue::DbRef(v)
    }
}

impl From<CodeWithScope> for BsonValue {
    fn from(v: CodeWithScope) -> Self {
        BsonValue::CodeWithScope(v)
    }
}

impl From<Timestamp> for BsonValue {
    fn from(v: Timestamp) -> Self {
        BsonValue::Timestamp(v)
    }
}

impl From<ObjectValue> for BsonValue {
    fn from(v: ObjectValue) -> Self {
        BsonValue::Object(v)
    }
}

impl<T: Into<BsonValue>> From<Option<T>> for BsonValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(BsonValue::Null)
    }
}

impl<T: Into<BsonValue>> From<Vec<T>> for BsonValue {
    fn from(v: Vec<T>) -> Self {
        BsonValue::Array(v.into_iter().map(Into::into).collect())
    }
}

/// 构造 BsonValue 的便捷宏
///
/// # 示例
///
/// ```rust,ignore
/// use tessera_bson::bson;
///
/// let null = bson!(null);
/// let array = bson!([1, "two", 3.0]);
/// let doc = bson!({ "name": "test", "tags": ["a", "b"] });
/// ```
#[macro_export]
macro_rules! bson {
    (null) => {
        $crate::BsonValue::Null
    };
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::BsonValue::Array(vec![ $($crate::bson!($elem)),* ])
    };
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::BsonValue::Document($crate::doc! { $($key : $value),* })
    };
    ($e:expr) => {
        $crate::BsonValue::from($e)
    };
}
