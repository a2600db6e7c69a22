//! 错误类型定义模块
//!
//! 定义公共类型的错误 CommonError 和 Result 别名。

use thiserror::Error;

/// 公共类型错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// ObjectId 无效
    #[error("Invalid ObjectId: {0}")]
    InvalidObjectId(String),
}

/// 公共 Result 类型别名
pub type CommonResult<T> = Result<T, CommonError>;
