//! 扩展 JSON 互转模块
//!
//! 提供 BsonValue 与 JSON 之间的相互转换，用于日志与诊断输出。
//! JSON 无法直接表示的类型使用扩展 JSON 形式，解析时再识别回来。

use crate::spec::BinarySubtype;
use crate::value::{Binary, BsonValue, CodeWithScope, DateTime, DbRef, RegexValue, Timestamp};
use crate::{BsonError, BsonResult, Document};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use compact_str::CompactString;
use serde_json::{json, Map, Number, Value as JsonValue};
use tessera_common::ObjectId;

/// 将 BsonValue 转换为 JSON
///
/// # Brief
/// 将 BSON 值转换为 JSON 值，复杂类型使用扩展 JSON 格式
///
/// # 扩展 JSON 格式
/// - ObjectId: `{"$oid": "507f1f77bcf86cd799439011"}`
/// - DateTime: `{"$date": 1234567890000}`
/// - Int64: `{"$numberLong": "42"}`
/// - Binary: `{"$binary": "base64_string", "$type": "00"}`
/// - Regex: `{"$regularExpression": {"pattern": "a+", "options": "i"}}`
/// - Timestamp: `{"$timestamp": {"t": 1, "i": 2}}`
/// - DBRef: `{"$ref": "users", "$id": ..., "$db": "app"}`
///
/// # Arguments
/// * `value` - 要转换的 BSON 值
///
/// # Returns
/// 成功返回 JSON 值；调用方对象没有 JSON 形式，返回错误
pub fn to_json(value: &BsonValue) -> BsonResult<JsonValue> {
    match value {
        BsonValue::Null => Ok(JsonValue::Null),
        BsonValue::Boolean(b) => Ok(JsonValue::Bool(*b)),
        BsonValue::Int32(n) => Ok(json!(*n)),
        BsonValue::Int64(n) => Ok(json!({"$numberLong": n.to_string()})),
        BsonValue::Double(f) => match Number::from_f64(*f) {
            Some(n) => Ok(JsonValue::Number(n)),
            None => Ok(json!({"$numberDouble": non_finite_name(*f)})),
        },
        BsonValue::String(s) => Ok(JsonValue::String(s.to_string())),
        BsonValue::Binary(b) => Ok(json!({
            "$binary": STANDARD.encode(&b.bytes),
            "$type": format!("{:02x}", u8::from(b.subtype)),
        })),
        BsonValue::Uuid(uuid) => Ok(json!({"$uuid": uuid.to_string()})),
        BsonValue::ObjectId(oid) => Ok(json!({"$oid": oid.to_hex()})),
        BsonValue::DateTime(dt) => Ok(json!({"$date": dt.timestamp_millis()})),
        BsonValue::Timestamp(ts) => Ok(json!({"$timestamp": {"t": ts.time, "i": ts.increment}})),
        BsonValue::Regex(r) => Ok(json!({
            "$regularExpression": {
                "pattern": r.pattern.as_str(),
                "options": r.flags.to_string(),
            }
        })),
        BsonValue::Code(code) => Ok(json!({"$code": code.as_str()})),
        BsonValue::CodeWithScope(c) => Ok(json!({
            "$code": c.code.as_str(),
            "$scope": document_to_json(&c.scope)?,
        })),
        BsonValue::Symbol(s) => Ok(json!({"$symbol": s.as_str()})),
        BsonValue::MinKey => Ok(json!({"$minKey": 1})),
        BsonValue::MaxKey => Ok(json!({"$maxKey": 1})),
        BsonValue::DbRef(r) => document_to_json(&r.as_document()),
        BsonValue::Array(arr) => {
            let json_arr: Result<Vec<_>, _> = arr.iter().map(to_json).collect();
            Ok(JsonValue::Array(json_arr?))
        }
        BsonValue::Document(doc) => document_to_json(doc),
        BsonValue::Object(obj) => Err(BsonError::Serialization(format!(
            "cannot render value of type {} as JSON",
            obj.state().class_name()
        ))),
    }
}

fn document_to_json(doc: &Document) -> BsonResult<JsonValue> {
    let mut json_obj = Map::with_capacity(doc.len());
    for (k, v) in doc.iter() {
        json_obj.insert(k.to_string(), to_json(v)?);
    }
    Ok(JsonValue::Object(json_obj))
}

fn non_finite_name(f: f64) -> &'static str {
    if f.is_nan() {
        "NaN"
    } else if f.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

/// 从 JSON 转换为 BsonValue
///
/// # Brief
/// 将 JSON 值转换为 BSON 值，识别扩展 JSON 格式。
/// 整数按取值范围选择 Int32 / Int64，与原生整数的转换规则一致。
///
/// # Arguments
/// * `value` - JSON 值
///
/// # Returns
/// 成功返回 BSON 值，扩展 JSON 内容无效时返回 `Deserialization` 错误
pub fn from_json(value: &JsonValue) -> BsonResult<BsonValue> {
    match value {
        JsonValue::Null => Ok(BsonValue::Null),
        JsonValue::Bool(b) => Ok(BsonValue::Boolean(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(BsonValue::from(i))
            } else if let Some(f) = n.as_f64() {
                Ok(BsonValue::Double(f))
            } else {
                Err(invalid("Invalid number"))
            }
        }
        JsonValue::String(s) => Ok(BsonValue::String(CompactString::new(s))),
        JsonValue::Array(arr) => {
            let bson_arr: Result<Vec<_>, _> = arr.iter().map(from_json).collect();
            Ok(BsonValue::Array(bson_arr?))
        }
        JsonValue::Object(obj) => {
            if let Some(value) = from_extended(obj)? {
                return Ok(value);
            }

            let mut doc = Document::with_capacity(obj.len());
            for (k, v) in obj {
                doc.insert(k.as_str(), from_json(v)?);
            }
            Ok(match DbRef::from_document(doc) {
                Ok(dbref) => BsonValue::DbRef(dbref),
                Err(doc) => BsonValue::Document(doc),
            })
        }
    }
}

/// 识别扩展 JSON 包装对象，普通对象返回 `None`
fn from_extended(obj: &Map<String, JsonValue>) -> BsonResult<Option<BsonValue>> {
    let Some(first) = obj.keys().next() else {
        return Ok(None);
    };
    let value = match (first.as_str(), obj.len()) {
        ("$oid", 1) => {
            let s = expect_str(obj, "$oid")?;
            let oid = ObjectId::from_hex(s).map_err(|e| invalid(e.to_string()))?;
            BsonValue::ObjectId(oid)
        }
        ("$uuid", 1) => {
            let s = expect_str(obj, "$uuid")?;
            BsonValue::Uuid(s.parse().map_err(|_| invalid("Invalid UUID"))?)
        }
        ("$date", 1) => BsonValue::DateTime(parse_date(&obj["$date"])?),
        ("$numberLong", 1) => {
            let s = expect_str(obj, "$numberLong")?;
            BsonValue::Int64(s.parse().map_err(|_| invalid("Invalid $numberLong"))?)
        }
        ("$numberInt", 1) => {
            let s = expect_str(obj, "$numberInt")?;
            BsonValue::Int32(s.parse().map_err(|_| invalid("Invalid $numberInt"))?)
        }
        ("$numberDouble", 1) => {
            let s = expect_str(obj, "$numberDouble")?;
            let f = match s {
                "NaN" => f64::NAN,
                "Infinity" => f64::INFINITY,
                "-Infinity" => f64::NEG_INFINITY,
                other => other.parse().map_err(|_| invalid("Invalid $numberDouble"))?,
            };
            BsonValue::Double(f)
        }
        ("$numberDecimal", 1) => {
            return Err(invalid("Decimal128 values are not supported"));
        }
        ("$binary", _) => BsonValue::Binary(parse_binary(obj)?),
        ("$timestamp", 1) => {
            let ts = &obj["$timestamp"];
            let part = |name: &str| {
                ts.get(name)
                    .and_then(JsonValue::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| invalid("Invalid $timestamp"))
            };
            BsonValue::Timestamp(Timestamp::new(part("t")?, part("i")?))
        }
        ("$regularExpression", 1) => {
            let re = &obj["$regularExpression"];
            let pattern = re
                .get("pattern")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| invalid("Invalid $regularExpression"))?;
            let options = re.get("options").and_then(JsonValue::as_str).unwrap_or("");
            BsonValue::Regex(RegexValue::new(pattern, options))
        }
        ("$regex", 1) | ("$regex", 2) if obj.len() == 1 || obj.contains_key("$options") => {
            let pattern = expect_str(obj, "$regex")?;
            let options = obj.get("$options").and_then(JsonValue::as_str).unwrap_or("");
            BsonValue::Regex(RegexValue::new(pattern, options))
        }
        ("$code", 1) => BsonValue::Code(expect_str(obj, "$code")?.into()),
        ("$code", 2) => {
            let code = expect_str(obj, "$code")?;
            let scope = match obj.get("$scope").map(from_json).transpose()? {
                Some(BsonValue::Document(doc)) => doc,
                _ => return Err(invalid("$scope must be a document")),
            };
            BsonValue::CodeWithScope(CodeWithScope {
                code: code.into(),
                scope,
            })
        }
        ("$symbol", 1) => BsonValue::Symbol(expect_str(obj, "$symbol")?.into()),
        ("$minKey", 1) => BsonValue::MinKey,
        ("$maxKey", 1) => BsonValue::MaxKey,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn expect_str<'a>(obj: &'a Map<String, JsonValue>, key: &str) -> BsonResult<&'a str> {
    obj.get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| invalid(format!("{} must be a string", key)))
}

fn parse_date(value: &JsonValue) -> BsonResult<DateTime> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .map(DateTime::from_millis)
            .ok_or_else(|| invalid("Invalid datetime")),
        JsonValue::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| DateTime::from(dt.with_timezone(&chrono::Utc)))
            .map_err(|e| invalid(format!("Invalid datetime: {}", e))),
        JsonValue::Object(inner) => {
            let millis = expect_str(inner, "$numberLong")?;
            millis
                .parse()
                .map(DateTime::from_millis)
                .map_err(|_| invalid("Invalid datetime"))
        }
        _ => Err(invalid("Invalid datetime")),
    }
}

/// 同时接受 `{"$binary": "..", "$type": "00"}` 与
/// `{"$binary": {"base64": "..", "subType": "00"}}` 两种写法
fn parse_binary(obj: &Map<String, JsonValue>) -> BsonResult<Binary> {
    let (data, subtype) = match (&obj["$binary"], obj.len()) {
        (JsonValue::String(data), 2) => (data.as_str(), expect_str(obj, "$type")?),
        (JsonValue::Object(inner), 1) => (
            expect_str(inner, "base64")?,
            expect_str(inner, "subType")?,
        ),
        _ => return Err(invalid("Invalid $binary")),
    };
    let bytes = STANDARD
        .decode(data)
        .map_err(|_| invalid("Invalid base64"))?;
    let subtype = u8::from_str_radix(subtype, 16).map_err(|_| invalid("Invalid binary subtype"))?;
    Ok(Binary::new(BinarySubtype::from(subtype), bytes))
}

fn invalid(msg: impl Into<String>) -> BsonError {
    BsonError::Deserialization(msg.into())
}

/// 将 BSON 值序列化为 JSON 字符串
///
/// # Brief
/// 将 BSON 值转换为美化的 JSON 字符串
///
/// # Arguments
/// * `value` - 要序列化的 BSON 值
///
/// # Returns
/// 成功返回 JSON 字符串，失败返回错误
pub fn to_json_string(value: &BsonValue) -> BsonResult<String> {
    let json_value = to_json(value)?;
    serde_json::to_string_pretty(&json_value)
        .map_err(|e| BsonError::Serialization(format!("JSON serialization failed: {}", e)))
}

/// 从 JSON 字符串反序列化为 BSON 值
///
/// # Arguments
/// * `json_str` - JSON 字符串
///
/// # Returns
/// 成功返回 BSON 值，失败返回错误
pub fn from_json_string(json_str: &str) -> BsonResult<BsonValue> {
    let json_value: JsonValue = serde_json::from_str(json_str)
        .map_err(|e| BsonError::Deserialization(format!("JSON parsing failed: {}", e)))?;
    from_json(&json_value)
}

impl Document {
    /// 以扩展 JSON 渲染文档，用于诊断输出
    pub fn to_json_string(&self) -> BsonResult<String> {
        serde_json::to_string(&document_to_json(self)?)
            .map_err(|e| BsonError::Serialization(format!("JSON serialization failed: {}", e)))
    }
}
