//! # tessera-bson - BSON 文档编解码器
//!
//! 将有序键值文档(嵌套文档、数组、标量与一组固定的领域类型)编码为
//! 紧凑的、带长度前缀的二进制格式,并无损地解码回来。
//!
//! - **逐字节兼容**：严格遵循 BSON 线格式(小端、长度前缀、0x00 结束符)
//! - **确定性拒绝**：畸形输入一律报错，绝不越界读取或静默截断
//! - **可注入的转换链**：无法直接映射的值通过 [`state::ConversionChain`] 转换
//! - **无全局状态**：配置以值的形式传入每次调用
//!
//! ## 快速开始
//!
//! ```rust,ignore
//! use tessera_bson::{doc, decode, encode, DecodeOptions, EncodeOptions};
//!
//! let doc = doc! { "a": 1 };
//! let bytes = encode(&doc, &EncodeOptions::default()).unwrap();
//! assert_eq!(bytes, [0x0C, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0]);
//!
//! let back = decode(&bytes, &DecodeOptions::default()).unwrap();
//! assert_eq!(back, doc);
//! ```

pub mod codec;
pub mod config;
pub mod de;
pub mod decoder;
pub mod document;
pub mod encoder;
pub mod json;
pub mod raw;
pub mod reference;
pub mod ser;
pub mod spec;
pub mod state;
pub mod value;

pub use codec::{codec_for, Codec, CodecContext, NativeCodec};
pub use config::{Backend, CodecConfig, ConversionConfig, DecodeOptions, EncodeConfig};
pub use de::{from_bson_value, from_document};
pub use decoder::{decode, decode_all, decode_prefix, decode_with, is_valid, DocumentReader};
pub use document::{Document, DocumentClass};
pub use encoder::{encode, encode_state, encode_to, EncodeOptions};
pub use raw::BsonBytes;
pub use reference::ReferenceCodec;
pub use ser::{to_bson_value, to_document, SerdeState};
pub use state::{ConversionChain, ElementState, StateStrategy};
pub use tessera_common::ObjectId;
pub use value::{
    Binary, BsonValue, CodeWithScope, DateTime, DbRef, ObjectValue, RegexFlags, RegexValue,
    Timestamp,
};

use thiserror::Error;

/// 编解码操作的错误类型
///
/// 前四种对应编解码核心的错误分类，其余来自 IO、Serde 桥接与扩展 JSON 层。
/// 任何错误都意味着整个文档未被处理，不存在部分结果。
#[derive(Error, Debug)]
pub enum BsonError {
    /// 文档结构无效(键非法、值无法转换、嵌套过深)
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// 字符串数据不是有效的 UTF-8
    #[error("Invalid string data: {0}")]
    InvalidStringData(String),

    /// 二进制数据结构违规(长度、结束符、未知类型标记、截断)
    #[error("Invalid BSON: {0}")]
    InvalidBson(String),

    /// 整数超出 64 位有符号范围
    #[error("Overflow: {0}")]
    Overflow(String),

    /// IO 操作错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化过程错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 反序列化过程错误
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl From<tessera_common::CommonError> for BsonError {
    fn from(err: tessera_common::CommonError) -> Self {
        BsonError::InvalidDocument(err.to_string())
    }
}

/// 编解码操作的 Result 类型别名
pub type BsonResult<T> = Result<T, BsonError>;
