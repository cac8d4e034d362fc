use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// 类型化属性包
///
/// 挂在Bot/Contact/Message上的键值扩展存储,
/// 以显式的类型化访问器取代动态查找。
/// 克隆共享同一份底层存储。
#[derive(Debug, Clone, Default)]
pub struct AttrMap {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入属性,同键覆盖
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.write().insert(key.into(), value.into());
    }

    /// 读取原始值
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    /// 删除属性
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().remove(key)
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        match self.inner.read().get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => default.to_string(),
        }
    }

    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.inner
            .read()
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.inner
            .read()
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.inner
            .read()
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
