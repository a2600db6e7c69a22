//! BSON 类型语法
//!
//! 元素类型标记、二进制子类型以及编解码双方共享的数值常量。

pub const MAX_INT32: i64 = i32::MAX as i64;
pub const MIN_INT32: i64 = i32::MIN as i64;
pub const MAX_INT64: i128 = i64::MAX as i128;
pub const MIN_INT64: i128 = i64::MIN as i128;

/// 最小文档: 4 字节长度 + 结束符
pub const MIN_DOCUMENT_SIZE: usize = 5;
pub const MAX_NESTING_DEPTH: usize = 100;

/// 顶层文档中总是最先序列化的保留键
pub const ID_KEY: &str = "_id";

pub const DBREF_REF_KEY: &str = "$ref";
pub const DBREF_ID_KEY: &str = "$id";
pub const DBREF_DB_KEY: &str = "$db";

pub const TERMINATOR: u8 = 0x00;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Double = 0x01,
    String = 0x02,
    EmbeddedDocument = 0x03,
    Array = 0x04,
    Binary = 0x05,
    Undefined = 0x06,
    ObjectId = 0x07,
    Boolean = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    Regex = 0x0B,
    DbPointer = 0x0C,
    Code = 0x0D,
    Symbol = 0x0E,
    CodeWithScope = 0x0F,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    MaxKey = 0x7F,
    MinKey = 0xFF,
}

impl ElementType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Double),
            0x02 => Some(Self::String),
            0x03 => Some(Self::EmbeddedDocument),
            0x04 => Some(Self::Array),
            0x05 => Some(Self::Binary),
            0x06 => Some(Self::Undefined),
            0x07 => Some(Self::ObjectId),
            0x08 => Some(Self::Boolean),
            0x09 => Some(Self::DateTime),
            0x0A => Some(Self::Null),
            0x0B => Some(Self::Regex),
            0x0C => Some(Self::DbPointer),
            0x0D => Some(Self::Code),
            0x0E => Some(Self::Symbol),
            0x0F => Some(Self::CodeWithScope),
            0x10 => Some(Self::Int32),
            0x11 => Some(Self::Timestamp),
            0x12 => Some(Self::Int64),
            0x7F => Some(Self::MaxKey),
            0xFF => Some(Self::MinKey),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// 二进制子类型
///
/// 子类型 2 (`BinaryOld`) 是旧版格式遗留：负载前重复一次 4 字节长度。
/// 为兼容旧数据仍按原样读写，新数据不应主动使用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinarySubtype {
    Generic,
    Function,
    BinaryOld,
    UuidOld,
    Uuid,
    Md5,
    UserDefined(u8),
    Other(u8),
}

impl BinarySubtype {
    pub fn is_uuid(self) -> bool {
        matches!(self, BinarySubtype::UuidOld | BinarySubtype::Uuid)
    }
}

impl From<u8> for BinarySubtype {
    fn from(byte: u8) -> Self {
        match byte {
            0x00 => Self::Generic,
            0x01 => Self::Function,
            0x02 => Self::BinaryOld,
            0x03 => Self::UuidOld,
            0x04 => Self::Uuid,
            0x05 => Self::Md5,
            b if b >= 0x80 => Self::UserDefined(b),
            b => Self::Other(b),
        }
    }
}

impl From<BinarySubtype> for u8 {
    fn from(subtype: BinarySubtype) -> Self {
        match subtype {
            BinarySubtype::Generic => 0x00,
            BinarySubtype::Function => 0x01,
            BinarySubtype::BinaryOld => 0x02,
            BinarySubtype::UuidOld => 0x03,
            BinarySubtype::Uuid => 0x04,
            BinarySubtype::Md5 => 0x05,
            BinarySubtype::UserDefined(b) | BinarySubtype::Other(b) => b,
        }
    }
}
