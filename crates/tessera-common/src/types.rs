//! 公共类型定义模块
//!
//! 定义 tessera 的核心标识类型:
//! - ObjectId: 12 字节唯一标识符

use crate::error::{CommonError, CommonResult};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// 计数器最大值(3 字节)
const COUNTER_MASK: u32 = 0x00FF_FFFF;

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

/// ObjectId - 12 字节唯一标识符
///
/// 格式:
/// - 前 4 字节: 时间戳(秒,大端)
/// - 中间 5 字节: 进程级随机数(进程内固定)
/// - 后 3 字节: 自增计数器(大端,随机起点)
///
/// 编解码器只搬运这 12 个原始字节,不解释其内部结构。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// 生成新的 ObjectId
    ///
    /// # Brief
    /// 以当前时间、进程随机数和自增计数器生成新 ID
    ///
    /// # Returns
    /// 新的 ObjectId
    pub fn new() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        Self::with_timestamp(timestamp)
    }

    /// 使用指定时间戳生成 ObjectId
    ///
    /// # Arguments
    /// * `timestamp` - 自纪元起的秒数
    pub fn with_timestamp(timestamp: u32) -> Self {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(process_unique());
        let counter = next_counter();
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// 时间戳部分(秒,大端解码)
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// 获取生成时间
    ///
    /// # Brief
    /// 将前 4 字节时间戳转换为 UTC 时间
    ///
    /// # Returns
    /// UTC 时间(秒级精度)
    pub fn generation_time(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.timestamp() as i64, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// 从 24 位十六进制字符串解析
    ///
    /// # Arguments
    /// * `s` - 十六进制字符串
    ///
    /// # Returns
    /// 成功返回 ObjectId,长度或字符非法返回 `CommonError::InvalidObjectId`
    pub fn from_hex(s: &str) -> CommonResult<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| CommonError::InvalidObjectId(format!("Invalid hex: {}", e)))?;
        let arr: [u8; 12] = bytes.try_into().map_err(|_| {
            CommonError::InvalidObjectId("ObjectId must be 12 bytes".to_string())
        })?;
        Ok(Self(arr))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for ObjectId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 12]> for ObjectId {
    fn from(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }
}

fn process_unique() -> &'static [u8; 5] {
    PROCESS_UNIQUE.get_or_init(rand_bytes::<5>)
}

fn next_counter() -> u32 {
    let counter = COUNTER.get_or_init(|| {
        let seed = rand_bytes::<4>();
        AtomicU32::new(u32::from_be_bytes(seed) & COUNTER_MASK)
    });
    counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK
}

fn rand_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    #[cfg(target_os = "linux")]
    {
        use std::fs::File;
        use std::io::Read;
        if let Ok(mut f) = File::open("/dev/urandom") {
            if f.read_exact(&mut bytes).is_ok() {
                return bytes;
            }
        }
    }
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    let state = RandomState::new();
    for chunk in bytes.chunks_mut(8) {
        let mut hasher = state.build_hasher();
        hasher.write_u128(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
        );
        let hash = hasher.finish().to_le_bytes();
        let len = chunk.len();
        chunk.copy_from_slice(&hash[..len]);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let oid = ObjectId::with_timestamp(0x01020304);
        let bytes = oid.bytes();
        assert_eq!(&bytes[0..4], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(oid.timestamp(), 0x01020304);
        assert_eq!(&bytes[4..9], process_unique());
    }

    #[test]
    fn test_counter_increments() {
        let a = ObjectId::with_timestamp(7);
        let b = ObjectId::with_timestamp(7);
        assert_ne!(a, b);
        assert_eq!(a.0[..9], b.0[..9]);
        assert_ne!(a.0[9..], b.0[9..]);
    }

    #[test]
    fn test_hex_roundtrip() {
        let oid = ObjectId::from_hex("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(oid.to_hex(), "507f1f77bcf86cd799439011");
        assert_eq!(oid.to_string().parse::<ObjectId>().unwrap(), oid);
    }

    #[test]
    fn test_invalid_hex() {
        assert!(ObjectId::from_hex("zz").is_err());
        assert!(ObjectId::from_hex("507f1f77").is_err());
    }

    #[test]
    fn test_generation_time() {
        let oid = ObjectId::with_timestamp(1_000_000_000);
        assert_eq!(oid.generation_time().timestamp(), 1_000_000_000);
    }

    #[test]
    fn test_serde_transparent_bytes() {
        let oid = ObjectId::from_bytes([1; 12]);
        let json = serde_json::to_string(&oid).unwrap();
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(oid, back);
    }
}
