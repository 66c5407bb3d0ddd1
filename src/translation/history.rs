//! 翻译历史记录
//!
//! 只保存在内存中，最新的记录排在最前面。
//!
//! 历史记录与翻译缓存相互独立：清空历史不会影响缓存，已缓存的原文再次请求时
//! 直接命中缓存，也不会重新出现在历史中。

use std::collections::VecDeque;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// 一条翻译记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub input_text: String,
    pub output_text: String,
}

impl HistoryEntry {
    pub fn new(input_text: impl Into<String>, output_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            output_text: output_text.into(),
        }
    }
}

/// 历史记录
pub struct HistoryLog {
    entries: RwLock<VecDeque<HistoryEntry>>,
    /// 0 表示不限制
    capacity: usize,
}

impl HistoryLog {
    /// 不限长度的历史记录
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// 限定长度，满时丢弃最旧的记录
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn append(&self, entry: HistoryEntry) {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push_front(entry);
        if self.capacity > 0 {
            entries.truncate(self.capacity);
        }
    }

    /// 按从新到旧的顺序列出
    pub fn list(&self) -> Vec<HistoryEntry> {
        match self.entries.read() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}
