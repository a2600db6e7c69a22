//! BSON 文档结构模块
//!
//! 提供有序键值文档 [`Document`]，以及解码时用于承载顶层结果的
//! [`DocumentClass`] 抽象。

use crate::spec::ID_KEY;
use crate::value::BsonValue;
use compact_str::CompactString;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tessera_common::ObjectId;

/// BSON 文档结构
///
/// 有序键值对序列，使用 `IndexMap` 保持字段插入顺序。
/// 相等性按映射语义比较(与顺序无关)，线格式上的顺序由编码器决定：
/// 顶层的 `_id` 总是最先写出，其余键保持插入顺序。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: IndexMap<CompactString, BsonValue>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: IndexMap::with_capacity(capacity),
        }
    }

    /// 插入字段
    ///
    /// # Brief
    /// 插入或更新一个字段；更新已有键时保留其原有位置
    ///
    /// # Arguments
    /// * `key` - 字段名
    /// * `value` - 字段值
    ///
    /// # Returns
    /// 若键已存在，返回旧值
    pub fn insert(
        &mut self,
        key: impl Into<CompactString>,
        value: impl Into<BsonValue>,
    ) -> Option<BsonValue> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&BsonValue> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut BsonValue> {
        self.fields.get_mut(key)
    }

    /// 移除字段，后续字段保持相对顺序
    pub fn remove(&mut self, key: &str) -> Option<BsonValue> {
        self.fields.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &BsonValue> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BsonValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// 保留键 `_id` 的值
    pub fn id(&self) -> Option<&BsonValue> {
        self.fields.get(ID_KEY)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(|v| v.as_i32())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<BsonValue>> {
        self.get(key).and_then(|v| v.as_array())
    }

    pub fn get_document(&self, key: &str) -> Option<&Document> {
        self.get(key).and_then(|v| v.as_document())
    }

    pub fn get_object_id(&self, key: &str) -> Option<ObjectId> {
        self.get(key).and_then(|v| v.as_object_id())
    }

    /// 按路径获取嵌套值
    ///
    /// # Arguments
    /// * `path` - 点分隔的路径，如 "user.address.city"
    ///
    /// # Returns
    /// `Some(&BsonValue)` 如果路径存在，否则 `None`
    pub fn get_path(&self, path: &str) -> Option<&BsonValue> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// 合并另一个文档，同名字段被覆盖
    pub fn merge(&mut self, other: Document) {
        self.fields.extend(other.fields);
    }

    /// 键是否恰好为连续的十进制下标 "0","1","2",…
    ///
    /// 顺序无关：只要求键集合等于 0..len 的十进制表示。
    pub fn is_sequence_like(&self) -> bool {
        (0..self.fields.len()).all(|i| self.fields.contains_key(i.to_string().as_str()))
    }

    /// 按下标顺序取出所有值
    ///
    /// # Brief
    /// 依次查找 "0","1",… 直到第一个缺失的下标为止
    ///
    /// # Returns
    /// (按下标排序的值, 未被取到而丢弃的条目数)
    pub fn into_sequence(mut self) -> (Vec<BsonValue>, usize) {
        let mut values = Vec::with_capacity(self.fields.len());
        let mut index = 0usize;
        while let Some(value) = self.fields.swap_remove(index.to_string().as_str()) {
            values.push(value);
            index += 1;
        }
        (values, self.fields.len())
    }

    pub fn into_inner(self) -> IndexMap<CompactString, BsonValue> {
        self.fields
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{}\": {}", k, v)?;
        }
        write!(f, "}}")
    }
}

impl From<IndexMap<CompactString, BsonValue>> for Document {
    fn from(fields: IndexMap<CompactString, BsonValue>) -> Self {
        Self { fields }
    }
}

impl<K: Into<CompactString>, V: Into<BsonValue>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        doc.extend(iter);
        doc
    }
}

impl<K: Into<CompactString>, V: Into<BsonValue>> Extend<(K, V)> for Document {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for Document {
    type Item = (CompactString, BsonValue);
    type IntoIter = indexmap::map::IntoIter<CompactString, BsonValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a CompactString, &'a BsonValue);
    type IntoIter = indexmap::map::Iter<'a, CompactString, BsonValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// 解码结果的顶层文档类型
///
/// 由调用方选择顶层映射的具体类型；嵌套文档始终是 [`Document`]。
pub trait DocumentClass: Default {
    fn insert_element(&mut self, key: CompactString, value: BsonValue);
}

impl DocumentClass for Document {
    fn insert_element(&mut self, key: CompactString, value: BsonValue) {
        self.fields.insert(key, value);
    }
}

impl DocumentClass for IndexMap<String, BsonValue> {
    fn insert_element(&mut self, key: CompactString, value: BsonValue) {
        self.insert(key.into(), value);
    }
}

impl DocumentClass for BTreeMap<String, BsonValue> {
    fn insert_element(&mut self, key: CompactString, value: BsonValue) {
        self.insert(key.into(), value);
    }
}

impl DocumentClass for HashMap<String, BsonValue> {
    fn insert_element(&mut self, key: CompactString, value: BsonValue) {
        self.insert(key.into(), value);
    }
}

/// 构造 Document 的便捷宏
///
/// # 示例
///
/// ```rust,ignore
/// use tessera_bson::doc;
///
/// let empty = doc!();
/// let doc = doc! {
///     "name": "test",
///     "value": 123
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut doc = $crate::Document::new();
            $(
                doc.insert($key, $crate::bson!($value));
            )*
            doc
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_insert_keeps_position() {
        let mut doc = doc! { "a": 1, "b": 2 };
        assert_eq!(doc.insert("a", 3), Some(BsonValue::Int32(1)));
        let keys: Vec<&str> = doc.keys().collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn test_remove_shifts() {
        let mut doc = doc! { "a": 1, "b": 2, "c": 3 };
        doc.remove("a");
        let keys: Vec<&str> = doc.keys().collect();
        assert_eq!(keys, ["b", "c"]);
    }

    #[test]
    fn test_typed_getters() {
        let doc = doc! { "name": "miku", "age": 16, "score": 99.5, "ok": true };
        assert_eq!(doc.get_str("name"), Some("miku"));
        assert_eq!(doc.get_i64("age"), Some(16));
        assert_eq!(doc.get_f64("score"), Some(99.5));
        assert_eq!(doc.get_bool("ok"), Some(true));
    }

    #[test]
    fn test_sequence_detection() {
        let doc = doc! { "1": "b", "0": "a", "2": "c" };
        assert!(doc.is_sequence_like());
        let (values, dropped) = doc.into_sequence();
        assert_eq!(values, vec![BsonValue::from("a"), BsonValue::from("b"), BsonValue::from("c")]);
        assert_eq!(dropped, 0);

        let gap = doc! { "0": 1, "2": 3 };
        assert!(!gap.is_sequence_like());
        let (values, dropped) = gap.into_sequence();
        assert_eq!(values, vec![BsonValue::Int32(1)]);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_get_path() {
        let doc = doc! { "user": { "address": { "city": "Tokyo" } } };
        assert_eq!(doc.get_path("user.address.city"), Some(&BsonValue::from("Tokyo")));
        assert_eq!(doc.get_path("user.phone"), None);
    }

    #[test]
    fn test_equality_ignores_order() {
        assert_eq!(doc! { "a": 1, "b": 2 }, doc! { "b": 2, "a": 1 });
    }
}
