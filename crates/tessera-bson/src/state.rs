//! 值状态转换链
//!
//! 没有直接线格式映射的调用方对象([`BsonValue::Object`])在编码时
//! 经由一组按固定优先级排列的转换策略求得可编码的状态：
//!
//! 1. [`GetStateStrategy`] - 对象自身提供的状态(需启用 `enable_getstate`)
//! 2. [`CallbackStrategy`] - 调用方注入的回调
//! 3. [`FieldsStrategy`] - 对象的字段表(需启用 `enable_dict`)
//!
//! 第一个给出结果的策略胜出；全部不适用时报告 `InvalidDocument`。
//! 转换链是一个普通的值，随编码选项一起传入，不在任何全局位置注册。

use crate::config::ConversionConfig;
use crate::document::Document;
use crate::value::BsonValue;
use crate::{BsonError, BsonResult};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// 调用方对象的状态接口
///
/// 实现者至少给出类名；`get_state` 与 `fields` 默认不提供状态。
pub trait ElementState: fmt::Debug + Send + Sync {
    /// 类名，用于错误信息、标注与包装
    fn class_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    /// 对象主动提供的状态
    ///
    /// 只有文档状态会被转换链采用，其他类型视为不提供状态。
    ///
    /// # Returns
    /// `Ok(None)` 表示对象不提供状态
    fn get_state(&self) -> BsonResult<Option<BsonValue>> {
        Ok(None)
    }

    /// 对象的字段表
    fn fields(&self) -> Option<Document> {
        None
    }
}

/// 单个转换策略
pub trait StateStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// 尝试转换
    ///
    /// # Returns
    /// - `Ok(Some(state))` 转换成功
    /// - `Ok(None)` 本策略不适用，交给下一个策略
    /// - `Err(_)` 转换失败，终止整个编码
    fn resolve(&self, value: &dyn ElementState) -> BsonResult<Option<BsonValue>>;

    /// 结果是否接受类名标注
    fn annotates(&self) -> bool {
        false
    }
}

/// 使用 [`ElementState::get_state`]
#[derive(Debug, Clone, Copy, Default)]
pub struct GetStateStrategy;

impl StateStrategy for GetStateStrategy {
    fn name(&self) -> &str {
        "getstate"
    }

    fn resolve(&self, value: &dyn ElementState) -> BsonResult<Option<BsonValue>> {
        match value.get_state()? {
            Some(BsonValue::Document(doc)) => Ok(Some(BsonValue::Document(doc))),
            Some(other) => {
                trace!(
                    "Ignoring {} state of {}, getstate requires a document",
                    other.type_name(),
                    value.class_name()
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn annotates(&self) -> bool {
        true
    }
}

/// 使用 [`ElementState::fields`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldsStrategy;

impl StateStrategy for FieldsStrategy {
    fn name(&self) -> &str {
        "fields"
    }

    fn resolve(&self, value: &dyn ElementState) -> BsonResult<Option<BsonValue>> {
        Ok(value.fields().map(BsonValue::Document))
    }

    fn annotates(&self) -> bool {
        true
    }
}

type Callback = dyn Fn(&dyn ElementState) -> BsonResult<BsonValue> + Send + Sync;

/// 调用方回调
///
/// 回调返回 `InvalidDocument` 视为“不适用”，其余错误原样传播。
#[derive(Clone)]
pub struct CallbackStrategy {
    callback: Arc<Callback>,
}

impl CallbackStrategy {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&dyn ElementState) -> BsonResult<BsonValue> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for CallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallbackStrategy")
    }
}

impl StateStrategy for CallbackStrategy {
    fn name(&self) -> &str {
        "callback"
    }

    fn resolve(&self, value: &dyn ElementState) -> BsonResult<Option<BsonValue>> {
        match (self.callback)(value) {
            Ok(state) => Ok(Some(state)),
            Err(BsonError::InvalidDocument(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// 有序的转换策略链
#[derive(Clone, Default)]
pub struct ConversionChain {
    strategies: Vec<Arc<dyn StateStrategy>>,
    config: ConversionConfig,
}

impl ConversionChain {
    /// 按配置构建内置策略链
    ///
    /// # Arguments
    /// * `config` - 转换配置，决定启用哪些内置策略及标注/包装行为
    pub fn from_config(config: &ConversionConfig) -> Self {
        let mut strategies: Vec<Arc<dyn StateStrategy>> = Vec::new();
        if config.enable_getstate {
            strategies.push(Arc::new(GetStateStrategy));
        }
        if config.enable_dict {
            strategies.push(Arc::new(FieldsStrategy));
        }
        Self {
            strategies,
            config: config.clone(),
        }
    }

    /// 插入调用方回调，位于 getstate 之后、字段表之前
    pub fn with_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&dyn ElementState) -> BsonResult<BsonValue> + Send + Sync + 'static,
    {
        let position = usize::from(self.config.enable_getstate && !self.strategies.is_empty());
        self.with_strategy_at(position, Arc::new(CallbackStrategy::new(callback)))
    }

    /// 在链尾追加自定义策略
    pub fn with_strategy(mut self, strategy: Arc<dyn StateStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    fn with_strategy_at(mut self, index: usize, strategy: Arc<dyn StateStrategy>) -> Self {
        let index = index.min(self.strategies.len());
        self.strategies.insert(index, strategy);
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// 求对象的可编码状态
    ///
    /// # Brief
    /// 依次尝试各策略，第一个给出结果的策略胜出；随后按配置执行标注与包装
    ///
    /// # Arguments
    /// * `value` - 没有直接线格式映射的对象
    ///
    /// # Returns
    /// 成功返回状态值，没有策略适用时返回 `BsonError::InvalidDocument`
    pub fn resolve(&self, value: &dyn ElementState) -> BsonResult<BsonValue> {
        self.resolve_with(value, false)
    }

    /// 求顶层对象的状态，结果必须是文档
    ///
    /// # Brief
    /// 与 [`resolve`](Self::resolve) 相同，但跳过给出非文档状态的策略；
    /// 引用状态按其嵌入文档形式返回
    ///
    /// # Returns
    /// 成功返回文档，没有策略给出文档时返回 `BsonError::InvalidDocument`
    pub fn resolve_document(&self, value: &dyn ElementState) -> BsonResult<Document> {
        match self.resolve_with(value, true)? {
            BsonValue::Document(doc) => Ok(doc),
            BsonValue::DbRef(r) => Ok(r.as_document()),
            other => Err(BsonError::InvalidDocument(format!(
                "encoder expected a document, got {} from {}",
                other.type_name(),
                value.class_name()
            ))),
        }
    }

    fn resolve_with(&self, value: &dyn ElementState, ensure_document: bool) -> BsonResult<BsonValue> {
        for strategy in &self.strategies {
            let Some(state) = strategy.resolve(value)? else {
                continue;
            };
            if ensure_document && !matches!(state, BsonValue::Document(_) | BsonValue::DbRef(_)) {
                trace!(
                    "Skipping {} state of top-level {} from {} strategy",
                    state.type_name(),
                    value.class_name(),
                    strategy.name()
                );
                continue;
            }
            trace!(
                "Resolved {} via {} strategy",
                value.class_name(),
                strategy.name()
            );
            let state = if strategy.annotates() {
                self.annotate(value.class_name(), state)
            } else {
                state
            };
            return Ok(self.wrap(value.class_name(), state));
        }
        Err(BsonError::InvalidDocument(format!(
            "cannot convert value of type {} to bson",
            value.class_name()
        )))
    }

    fn annotate(&self, class_name: &str, state: BsonValue) -> BsonValue {
        match state {
            BsonValue::Document(mut doc) if self.config.enable_annotate => {
                doc.insert(self.config.annotate_key.as_str(), class_name);
                BsonValue::Document(doc)
            }
            other => other,
        }
    }

    fn wrap(&self, class_name: &str, state: BsonValue) -> BsonValue {
        if !self.config.enable_wrap {
            return state;
        }
        let mut wrapper = Document::with_capacity(2);
        wrapper.insert(self.config.wrap_class_key.as_str(), class_name);
        wrapper.insert(self.config.wrap_state_key.as_str(), state);
        BsonValue::Document(wrapper)
    }
}

impl fmt::Debug for ConversionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("ConversionChain")
            .field("strategies", &names)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[derive(Debug)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl ElementState for Point {
        fn class_name(&self) -> &str {
            "Point"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn get_state(&self) -> BsonResult<Option<BsonValue>> {
            Ok(Some(BsonValue::Array(vec![self.x.into(), self.y.into()])))
        }

        fn fields(&self) -> Option<Document> {
            Some(doc! { "x": (self.x), "y": (self.y) })
        }
    }

    #[derive(Debug)]
    struct Opaque;

    impl ElementState for Opaque {
        fn class_name(&self) -> &str {
            "Opaque"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn config() -> ConversionConfig {
        ConversionConfig::default()
    }

    #[test]
    fn test_empty_chain_rejects() {
        let chain = ConversionChain::from_config(&config());
        let err = chain.resolve(&Point { x: 1, y: 2 }).unwrap_err();
        match err {
            BsonError::InvalidDocument(msg) => assert!(msg.contains("Point")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[derive(Debug)]
    struct Tagged;

    impl ElementState for Tagged {
        fn class_name(&self) -> &str {
            "Tagged"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn get_state(&self) -> BsonResult<Option<BsonValue>> {
            Ok(Some(BsonValue::Document(doc! { "tag": "state" })))
        }

        fn fields(&self) -> Option<Document> {
            Some(doc! { "tag": "fields" })
        }
    }

    #[test]
    fn test_getstate_before_fields() {
        let chain = ConversionChain::from_config(&ConversionConfig {
            enable_getstate: true,
            enable_dict: true,
            ..config()
        });
        let state = chain.resolve(&Tagged).unwrap();
        assert_eq!(state, BsonValue::Document(doc! { "tag": "state" }));
    }

    #[test]
    fn test_non_document_getstate_falls_through() {
        let chain = ConversionChain::from_config(&ConversionConfig {
            enable_getstate: true,
            enable_dict: true,
            ..config()
        });
        let state = chain.resolve(&Point { x: 1, y: 2 }).unwrap();
        assert_eq!(state, BsonValue::Document(doc! { "x": 1, "y": 2 }));

        let getstate_only = ConversionChain::from_config(&ConversionConfig {
            enable_getstate: true,
            ..config()
        });
        assert!(matches!(
            getstate_only.resolve(&Point { x: 1, y: 2 }),
            Err(BsonError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_resolve_document_skips_scalar_callback() {
        let chain = ConversionChain::from_config(&ConversionConfig {
            enable_dict: true,
            ..config()
        })
        .with_callback(|_| Ok(BsonValue::Int32(7)));

        assert_eq!(chain.resolve(&Point { x: 1, y: 2 }).unwrap(), BsonValue::Int32(7));
        assert_eq!(
            chain.resolve_document(&Point { x: 1, y: 2 }).unwrap(),
            doc! { "x": 1, "y": 2 }
        );

        let callback_only = ConversionChain::default().with_callback(|_| Ok(BsonValue::Int32(7)));
        assert!(matches!(
            callback_only.resolve_document(&Opaque),
            Err(BsonError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_fields_with_annotation() {
        let chain = ConversionChain::from_config(&ConversionConfig {
            enable_dict: true,
            enable_annotate: true,
            ..config()
        });
        let state = chain.resolve(&Point { x: 1, y: 2 }).unwrap();
        assert_eq!(
            state,
            BsonValue::Document(doc! { "x": 1, "y": 2, "_$class": "Point" })
        );
    }

    #[test]
    fn test_wrap() {
        let chain = ConversionChain::from_config(&ConversionConfig {
            enable_dict: true,
            enable_wrap: true,
            ..config()
        });
        let state = chain.resolve(&Point { x: 1, y: 2 }).unwrap();
        assert_eq!(
            state,
            BsonValue::Document(doc! { "_$class": "Point", "_$state": { "x": 1, "y": 2 } })
        );
    }

    #[test]
    fn test_callback_not_applicable_falls_through() {
        let chain = ConversionChain::from_config(&ConversionConfig {
            enable_dict: true,
            ..config()
        })
        .with_callback(|value| {
            if value.as_any().is::<Opaque>() {
                Ok(BsonValue::from("opaque"))
            } else {
                Err(BsonError::InvalidDocument("not mine".into()))
            }
        });

        assert_eq!(chain.resolve(&Opaque).unwrap(), BsonValue::from("opaque"));
        assert_eq!(
            chain.resolve(&Point { x: 3, y: 4 }).unwrap(),
            BsonValue::Document(doc! { "x": 3, "y": 4 })
        );
    }

    #[test]
    fn test_callback_error_propagates() {
        let chain = ConversionChain::default()
            .with_callback(|_| Err(BsonError::Overflow("too big".into())));
        assert!(matches!(chain.resolve(&Opaque), Err(BsonError::Overflow(_))));
    }

    #[test]
    fn test_callback_position() {
        let chain = ConversionChain::from_config(&ConversionConfig {
            enable_getstate: true,
            enable_dict: true,
            ..config()
        })
        .with_callback(|_| Ok(BsonValue::Null));
        let names: Vec<&str> = chain.strategies.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["getstate", "callback", "fields"]);
    }
}
