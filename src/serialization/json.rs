//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了JSON序列化器的实现。

use super::Serializer;
use crate::error::{FanoutError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// JSON序列化器
///
/// 缓存中的用户记录和发布的事件都使用该格式，下游订阅者无需依赖本库即可解析
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| FanoutError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(|e| FanoutError::Serialization(e.to_string()))
    }
}
