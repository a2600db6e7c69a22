//! 已编码文档的不可变字节容器

use crate::config::DecodeOptions;
use crate::decoder;
use crate::document::Document;
use crate::encoder::{self, EncodeOptions};
use crate::BsonResult;
use bytes::Bytes;
use std::ops::Deref;

/// 一个已编码的 BSON 文档
///
/// 以 `Bytes` 持有数据，克隆只增加引用计数。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BsonBytes(Bytes);

impl BsonBytes {
    /// 编码文档
    pub fn encode(doc: &Document, options: &EncodeOptions) -> BsonResult<Self> {
        encoder::encode(doc, options).map(|bytes| Self(Bytes::from(bytes)))
    }

    /// 解码为文档
    pub fn decode(&self, options: &DecodeOptions) -> BsonResult<Document> {
        decoder::decode(&self.0, options)
    }

    /// 不做校验地包装字节
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        decoder::is_valid(&self.0)
    }
}

impl Deref for BsonBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for BsonBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<BsonBytes> for Vec<u8> {
    fn from(b: BsonBytes) -> Self {
        b.0.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_encode_decode() {
        let doc = doc! { "a": 1 };
        let raw = BsonBytes::encode(&doc, &EncodeOptions::default()).unwrap();
        assert_eq!(raw.len(), 12);
        assert!(raw.is_valid());
        assert_eq!(raw.decode(&DecodeOptions::default()).unwrap(), doc);
    }

    #[test]
    fn test_unchecked_wrap() {
        let raw = BsonBytes::from_bytes(vec![1, 2, 3]);
        assert!(!raw.is_valid());
        assert!(raw.decode(&DecodeOptions::default()).is_err());
    }
}
