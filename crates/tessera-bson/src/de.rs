//! Serde 反序列化模块
//!
//! 实现 Serde Deserializer trait,将 BsonValue 反序列化为 Rust 数据结构。
//!
//! 支持所有标准 Rust 类型的反序列化:
//! - 基本类型: bool, 整数, 浮点数, 字符串
//! - 复合类型: 结构体, 枚举, 数组, 元组, HashMap
//! - 自动类型转换: Int32 -> i64, Int64 -> i32 (如果在范围内)
//! - 领域类型: ObjectId / UUID 作为字符串, DateTime 作为毫秒数

use crate::document::Document;
use crate::value::BsonValue;
use crate::{BsonError, BsonResult};
use serde::de::{self, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::{forward_to_deserialize_any, Deserialize};
use std::fmt;

pub struct Deserializer<'de> {
    input: &'de BsonValue,
}

impl<'de> Deserializer<'de> {
    pub fn from_bson_value(input: &'de BsonValue) -> Self {
        Deserializer { input }
    }

    fn unexpected(&self, expected: &str) -> BsonError {
        BsonError::Deserialization(format!(
            "Expected {}, got {}",
            expected,
            self.input.type_name()
        ))
    }
}

/// 从 BsonValue 反序列化
pub fn from_bson_value<'a, T: Deserialize<'a>>(value: &'a BsonValue) -> BsonResult<T> {
    T::deserialize(Deserializer::from_bson_value(value))
}

/// 从文档反序列化，文档被视为映射
pub fn from_document<'a, T: Deserialize<'a>>(doc: &'a Document) -> BsonResult<T> {
    T::deserialize(DocumentDeserializer { doc })
}

impl de::Error for BsonError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BsonError::Deserialization(msg.to_string())
    }
}

impl<'de> de::Deserializer<'de> for Deserializer<'de> {
    type Error = BsonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Null => visitor.visit_unit(),
            BsonValue::Boolean(b) => visitor.visit_bool(*b),
            BsonValue::Int32(n) => visitor.visit_i32(*n),
            BsonValue::Int64(n) => visitor.visit_i64(*n),
            BsonValue::Double(n) => visitor.visit_f64(*n),
            BsonValue::String(s) | BsonValue::Symbol(s) | BsonValue::Code(s) => {
                visitor.visit_borrowed_str(s.as_str())
            }
            BsonValue::Binary(b) => visitor.visit_borrowed_bytes(&b.bytes),
            BsonValue::ObjectId(oid) => visitor.visit_string(oid.to_hex()),
            BsonValue::Uuid(u) => visitor.visit_string(u.to_string()),
            BsonValue::DateTime(dt) => visitor.visit_i64(dt.timestamp_millis()),
            BsonValue::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr.iter())),
            BsonValue::Document(doc) => visitor.visit_map(MapDeserializer::new(doc.iter())),
            _ => Err(BsonError::Deserialization(format!(
                "Cannot deserialize {} as any",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Boolean(b) => visitor.visit_bool(*b),
            _ => Err(self.unexpected("boolean")),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_i32(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_i32(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) => visitor.visit_i32(*n),
            BsonValue::Int64(n) => visitor.visit_i64(*n),
            _ => Err(self.unexpected("integer")),
        }
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) => visitor.visit_i64(*n as i64),
            BsonValue::Int64(n) => visitor.visit_i64(*n),
            BsonValue::DateTime(dt) => visitor.visit_i64(dt.timestamp_millis()),
            _ => Err(self.unexpected("integer")),
        }
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) => visitor.visit_i128(*n as i128),
            BsonValue::Int64(n) => visitor.visit_i128(*n as i128),
            _ => Err(self.unexpected("integer")),
        }
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_u32(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_u32(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let n = match self.input {
            BsonValue::Int32(n) => u32::try_from(*n).ok(),
            BsonValue::Int64(n) => u32::try_from(*n).ok(),
            _ => None,
        };
        match n {
            Some(n) => visitor.visit_u32(n),
            None => Err(self.unexpected("unsigned 32-bit integer")),
        }
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let n = match self.input {
            BsonValue::Int32(n) => u64::try_from(*n).ok(),
            BsonValue::Int64(n) => u64::try_from(*n).ok(),
            _ => None,
        };
        match n {
            Some(n) => visitor.visit_u64(n),
            None => Err(self.unexpected("unsigned integer")),
        }
    }

    fn deserialize_u128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input.as_f64() {
            Some(n) => visitor.visit_f64(n),
            None => Err(self.unexpected("float")),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        if let Some(s) = self.input.as_str() {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return visitor.visit_char(c);
            }
        }
        Err(self.unexpected("char"))
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::String(s) | BsonValue::Symbol(s) | BsonValue::Code(s) => {
                visitor.visit_borrowed_str(s.as_str())
            }
            BsonValue::ObjectId(oid) => visitor.visit_string(oid.to_hex()),
            BsonValue::Uuid(u) => visitor.visit_string(u.to_string()),
            _ => Err(self.unexpected("string")),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Binary(b) => visitor.visit_borrowed_bytes(&b.bytes),
            BsonValue::Uuid(u) => visitor.visit_borrowed_bytes(u.as_bytes()),
            BsonValue::ObjectId(oid) => visitor.visit_bytes(oid.as_bytes()),
            _ => Err(self.unexpected("binary")),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Null => visitor.visit_unit(),
            _ => Err(self.unexpected("null")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr.iter())),
            _ => Err(self.unexpected("array")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Document(doc) => visitor.visit_map(MapDeserializer::new(doc.iter())),
            _ => Err(self.unexpected("document")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::String(s) => visitor.visit_enum(s.as_str().into_deserializer()),
            BsonValue::Document(doc) if doc.len() == 1 => match doc.iter().next() {
                Some((variant, value)) => visitor.visit_enum(EnumDeserializer { variant, value }),
                None => Err(self.unexpected("single-key document for enum")),
            },
            _ => Err(self.unexpected("string or single-key document for enum")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}

/// 顶层文档的反序列化器，总是呈现为映射
struct DocumentDeserializer<'de> {
    doc: &'de Document,
}

impl<'de> de::Deserializer<'de> for DocumentDeserializer<'de> {
    type Error = BsonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_map(MapDeserializer::new(self.doc.iter()))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

struct SeqDeserializer<'de, I> {
    iter: I,
    _marker: std::marker::PhantomData<&'de ()>,
}

impl<'de, I: Iterator<Item = &'de BsonValue>> SeqDeserializer<'de, I> {
    fn new(iter: I) -> Self {
        Self {
            iter,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'de, I: Iterator<Item = &'de BsonValue>> SeqAccess<'de> for SeqDeserializer<'de, I> {
    type Error = BsonError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        match self.iter.next() {
            Some(value) => seed.deserialize(Deserializer::from_bson_value(value)).map(Some),
            None => Ok(None),
        }
    }
}

struct MapDeserializer<'de, I> {
    iter: I,
    value: Option<&'de BsonValue>,
}

impl<'de, I: Iterator<Item = (&'de str, &'de BsonValue)>> MapDeserializer<'de, I> {
    fn new(iter: I) -> Self {
        Self { iter, value: None }
    }
}

impl<'de, I: Iterator<Item = (&'de str, &'de BsonValue)>> MapAccess<'de> for MapDeserializer<'de, I> {
    type Error = BsonError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        let value = self
            .value
            .take()
            .ok_or_else(|| BsonError::Deserialization("No value".to_string()))?;
        seed.deserialize(Deserializer::from_bson_value(value))
    }
}

struct EnumDeserializer<'de> {
    variant: &'de str,
    value: &'de BsonValue,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer<'de> {
    type Error = BsonError;
    type Variant = VariantDeserializer<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), Self::Error> {
        use serde::de::value::StrDeserializer;
        let deserializer: StrDeserializer<'de, BsonError> = self.variant.into_deserializer();
        let variant: V::Value = seed.deserialize(deserializer)?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer<'de> {
    value: &'de BsonValue,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer<'de> {
    type Error = BsonError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, Self::Error> {
        seed.deserialize(Deserializer::from_bson_value(self.value))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error> {
        de::Deserializer::deserialize_seq(Deserializer::from_bson_value(self.value), visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        de::Deserializer::deserialize_map(Deserializer::from_bson_value(self.value), visitor)
    }
}
