//! 编解码后端
//!
//! [`Codec`] 是编解码实现的策略接口，有两种实现：
//! - [`NativeCodec`] - 本 crate 的编码器与解码器
//! - [`ReferenceCodec`](crate::reference::ReferenceCodec) - 基于 `bson` crate 的参考实现
//!
//! [`CodecContext`] 是组合根：按配置选择后端、构建转换链，
//! 之后所有调用都经由它完成，不存在全局或线程级的后端开关。

use crate::config::{Backend, CodecConfig, DecodeOptions};
use crate::decoder;
use crate::document::Document;
use crate::encoder::{self, EncodeOptions};
use crate::reference::ReferenceCodec;
use crate::spec::MIN_DOCUMENT_SIZE;
use crate::state::{ElementState, StateStrategy};
use crate::value::BsonValue;
use crate::{BsonError, BsonResult};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 编解码策略接口
pub trait Codec: fmt::Debug + Send + Sync {
    /// 后端名称
    fn name(&self) -> &'static str;

    fn encode(&self, doc: &Document, options: &EncodeOptions) -> BsonResult<Vec<u8>>;

    /// 解码恰好一个文档
    fn decode(&self, data: &[u8], options: &DecodeOptions) -> BsonResult<Document>;

    /// 解码首尾相接的多个文档
    ///
    /// 默认实现按每个文档声明的长度切分缓冲区，再逐个调用 [`Codec::decode`]。
    fn decode_all(&self, data: &[u8], options: &DecodeOptions) -> BsonResult<Vec<Document>> {
        let mut docs = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let len = frame_len(rest)?;
            let (frame, next) = rest.split_at(len);
            docs.push(self.decode(frame, options)?);
            rest = next;
        }
        Ok(docs)
    }
}

/// 读取缓冲区开头文档的声明长度并校验其不超出缓冲区
fn frame_len(data: &[u8]) -> BsonResult<usize> {
    let Some(header) = data.get(..4) else {
        return Err(BsonError::InvalidBson(format!(
            "{} trailing bytes do not form a document",
            data.len()
        )));
    };
    let mut raw = [0u8; 4];
    raw.copy_from_slice(header);
    let declared = i32::from_le_bytes(raw);
    if declared < MIN_DOCUMENT_SIZE as i32 || declared as usize > data.len() {
        return Err(BsonError::InvalidBson(format!(
            "invalid document length {} with {} bytes remaining",
            declared,
            data.len()
        )));
    }
    Ok(declared as usize)
}

/// 本 crate 的编解码实现
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl Codec for NativeCodec {
    fn name(&self) -> &'static str {
        "native"
    }

    fn encode(&self, doc: &Document, options: &EncodeOptions) -> BsonResult<Vec<u8>> {
        encoder::encode(doc, options)
    }

    fn decode(&self, data: &[u8], options: &DecodeOptions) -> BsonResult<Document> {
        decoder::decode(data, options)
    }

    fn decode_all(&self, data: &[u8], options: &DecodeOptions) -> BsonResult<Vec<Document>> {
        decoder::decode_all(data, options)
    }
}

/// 按后端类型创建编解码器
pub fn codec_for(backend: Backend) -> Box<dyn Codec> {
    match backend {
        Backend::Native => Box::new(NativeCodec),
        Backend::Reference => Box::new(ReferenceCodec),
    }
}

/// 编解码上下文
///
/// 持有配置、选定的后端与转换链。可在线程间共享，所有方法只读。
#[derive(Debug)]
pub struct CodecContext {
    config: CodecConfig,
    codec: Box<dyn Codec>,
    encode_options: EncodeOptions,
}

impl CodecContext {
    /// 创建上下文
    ///
    /// # Arguments
    /// * `config` - 编解码配置，决定后端、键检查、UUID 子类型与转换链
    pub fn new(config: CodecConfig) -> Self {
        let codec = codec_for(config.backend);
        debug!("Using {} codec backend", codec.name());
        let encode_options = EncodeOptions::from_config(&config);
        Self {
            config,
            codec,
            encode_options,
        }
    }

    /// 从 JSON 配置创建上下文
    pub fn from_json_str(json: &str) -> BsonResult<Self> {
        Ok(Self::new(CodecConfig::from_json_str(json)?))
    }

    /// 在转换链中插入调用方回调
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&dyn ElementState) -> BsonResult<BsonValue> + Send + Sync + 'static,
    {
        self.encode_options.chain = self.encode_options.chain.with_callback(callback);
        self
    }

    /// 在转换链尾追加自定义策略
    pub fn with_strategy(mut self, strategy: Arc<dyn StateStrategy>) -> Self {
        self.encode_options = self.encode_options.with_strategy(strategy);
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn backend(&self) -> Backend {
        self.config.backend
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    pub fn encode_options(&self) -> &EncodeOptions {
        &self.encode_options
    }

    pub fn encode(&self, doc: &Document) -> BsonResult<Vec<u8>> {
        self.codec.encode(doc, &self.encode_options)
    }

    /// 编码顶层调用方对象，其状态必须是文档
    pub fn encode_state(&self, value: &dyn ElementState) -> BsonResult<Vec<u8>> {
        self.encode(&self.encode_options.chain.resolve_document(value)?)
    }

    pub fn decode(&self, data: &[u8]) -> BsonResult<Document> {
        self.codec.decode(data, &self.config.decode)
    }

    pub fn decode_all(&self, data: &[u8]) -> BsonResult<Vec<Document>> {
        self.codec.decode_all(data, &self.config.decode)
    }

    pub fn is_valid(&self, data: &[u8]) -> bool {
        self.decode(data).is_ok()
    }
}

impl Default for CodecContext {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}
