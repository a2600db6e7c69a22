//! 编解码配置模块
//!
//! 本模块定义编解码器的所有配置选项:
//! - 后端选择(本地实现 / 参考实现)
//! - 编码配置(键检查、UUID 子类型、嵌套深度)
//! - 解码配置(UUID 识别、序列推断、嵌套深度)
//! - 对象转换配置(getstate、字段、类名标注与包装)
//!
//! 配置总是以值的形式传入每次调用，不存在进程级或线程级的全局配置。
//! 支持从 JSON 加载。

use crate::spec::{BinarySubtype, MAX_NESTING_DEPTH};
use crate::{BsonError, BsonResult};
use serde::{Deserialize, Serialize};

/// 编解码主配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// 编解码后端
    pub backend: Backend,
    /// 编码配置
    pub encode: EncodeConfig,
    /// 解码配置
    pub decode: DecodeOptions,
    /// 对象转换配置
    pub conversion: ConversionConfig,
}

impl CodecConfig {
    /// 从 JSON 字符串加载配置
    ///
    /// # Arguments
    /// * `json` - JSON 格式的配置，缺省字段取默认值
    ///
    /// # Returns
    /// 成功返回配置，解析失败返回 `BsonError::Deserialization`
    pub fn from_json_str(json: &str) -> BsonResult<Self> {
        let config: CodecConfig = serde_json::from_str(json)
            .map_err(|e| BsonError::Deserialization(format!("Invalid codec config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BsonResult<()> {
        self.encode.validate()
    }
}

/// 编解码后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// 本 crate 的编解码实现
    #[default]
    Native,
    /// 基于 `bson` crate 的参考实现
    Reference,
}

/// 编码配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// 是否拒绝以 `$` 开头或包含 `.` 的键 (默认: false)
    pub check_keys: bool,
    /// UUID 值使用的二进制子类型，3 或 4 (默认: 3)
    pub uuid_subtype: u8,
    /// 最大嵌套深度 (默认: 100)
    pub max_depth: usize,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            check_keys: false,
            uuid_subtype: 3,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

impl EncodeConfig {
    pub fn uuid_subtype(&self) -> BinarySubtype {
        BinarySubtype::from(self.uuid_subtype)
    }

    fn validate(&self) -> BsonResult<()> {
        if !self.uuid_subtype().is_uuid() {
            return Err(BsonError::Deserialization(format!(
                "uuid_subtype must be 3 or 4, got {}",
                self.uuid_subtype
            )));
        }
        Ok(())
    }
}

/// 解码配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// 子类型 3/4 且长度为 16 的二进制是否解码为 UUID (默认: true)
    pub decode_uuids: bool,
    /// 键恰为 "0".."n-1" 的嵌入文档是否解释为序列 (默认: false)
    pub infer_sequences: bool,
    /// 最大嵌套深度 (默认: 100)
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            decode_uuids: true,
            infer_sequences: false,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

/// 对象转换配置
///
/// 控制没有直接线格式映射的对象如何求得可编码的状态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// 启用对象自身提供的状态 (默认: false)
    pub enable_getstate: bool,
    /// 启用对象字段表作为状态 (默认: false)
    pub enable_dict: bool,
    /// 在状态文档中写入类名 (默认: false)
    pub enable_annotate: bool,
    /// 类名标注使用的键 (默认: "_$class")
    pub annotate_key: String,
    /// 将状态包装为 {类名, 状态} 文档 (默认: false)
    pub enable_wrap: bool,
    /// 包装文档中类名的键 (默认: "_$class")
    pub wrap_class_key: String,
    /// 包装文档中状态的键 (默认: "_$state")
    pub wrap_state_key: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            enable_getstate: false,
            enable_dict: false,
            enable_annotate: false,
            annotate_key: "_$class".to_string(),
            enable_wrap: false,
            wrap_class_key: "_$class".to_string(),
            wrap_state_key: "_$state".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert_eq!(config.backend, Backend::Native);
        assert!(!config.encode.check_keys);
        assert_eq!(config.encode.uuid_subtype(), BinarySubtype::UuidOld);
        assert!(config.decode.decode_uuids);
        assert!(!config.decode.infer_sequences);
        assert_eq!(config.conversion.annotate_key, "_$class");
        assert_eq!(config.conversion.wrap_state_key, "_$state");
    }

    #[test]
    fn test_partial_json() {
        let config = CodecConfig::from_json_str(
            r#"{"backend": "reference", "encode": {"check_keys": true}, "conversion": {"enable_dict": true}}"#,
        )
        .unwrap();
        assert_eq!(config.backend, Backend::Reference);
        assert!(config.encode.check_keys);
        assert_eq!(config.encode.uuid_subtype, 3);
        assert!(config.conversion.enable_dict);
        assert!(!config.conversion.enable_getstate);
    }

    #[test]
    fn test_invalid_uuid_subtype() {
        let result = CodecConfig::from_json_str(r#"{"encode": {"uuid_subtype": 0}}"#);
        assert!(result.is_err());
    }
}
