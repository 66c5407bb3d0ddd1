//! 翻译结果缓存
//!
//! 以原文为键的精确匹配缓存，定期整体写入 JSON 快照文件。
//! 内存中的数据在进程生命周期内始终是权威来源，写盘失败只记录日志。

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::translation::error::{TranslationError, TranslationResult};

/// 翻译缓存
pub struct TranslationCache {
    entries: DashMap<String, String>,
    /// 自上次快照以来新增的条目
    dirty: Mutex<HashMap<String, String>>,
    path: Option<PathBuf>,
    /// 串行化快照写入，避免旧快照覆盖新快照
    flush_lock: tokio::sync::Mutex<()>,
}

impl TranslationCache {
    /// 创建仅存在于内存中的缓存
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            dirty: Mutex::new(HashMap::new()),
            path: None,
            flush_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// 从快照文件加载缓存
    ///
    /// 文件不存在时得到空缓存；文件损坏时记录警告并同样从空缓存开始。
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut cache = Self::new();

        match read_snapshot(&path) {
            Ok(Some(map)) => {
                tracing::info!("已加载翻译结果，共 {} 条", map.len());
                cache.entries.extend(map);
            }
            Ok(None) => {
                tracing::info!("未找到翻译结果文件 {}，将创建新文件", path.display());
            }
            Err(e) => {
                tracing::warn!("加载翻译结果文件失败，使用空缓存: {}", e);
            }
        }

        cache.path = Some(path);
        cache
    }

    /// 精确匹配查找，不做任何规范化
    pub fn lookup(&self, input: &str) -> Option<String> {
        self.entries.get(input).map(|entry| entry.value().clone())
    }

    /// 写入缓存条目
    ///
    /// 已存在的键不会被覆盖，返回值表示是否新增。
    pub fn store(&self, input: String, output: String) -> bool {
        match self.entries.entry(input) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let key = vacant.key().clone();
                vacant.insert(output.clone());
                self.lock_dirty().insert(key, output);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 等待写盘的新增条目数
    pub fn pending(&self) -> usize {
        self.lock_dirty().len()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 有新增条目时把整个缓存写入快照文件
    ///
    /// 返回是否实际写入。写入失败时保留脏数据，等待下一次重试。
    pub async fn snapshot_if_dirty(&self) -> bool {
        let Some(path) = self.path.clone() else {
            return false;
        };

        let _guard = self.flush_lock.lock().await;

        let pending = std::mem::take(&mut *self.lock_dirty());
        if pending.is_empty() {
            return false;
        }

        let snapshot: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let count = snapshot.len();

        let result = tokio::task::spawn_blocking(move || write_snapshot(&path, &snapshot))
            .await
            .map_err(|e| TranslationError::Persistence(format!("写入任务失败: {}", e)))
            .and_then(|inner| inner);

        match result {
            Ok(()) => {
                tracing::info!("翻译结果已保存，共 {} 条（新增 {} 条）", count, pending.len());
                true
            }
            Err(e) => {
                tracing::warn!("保存翻译结果到文件失败: {}", e);
                let mut dirty = self.lock_dirty();
                for (key, value) in pending {
                    dirty.entry(key).or_insert(value);
                }
                false
            }
        }
    }

    /// 启动定时快照任务
    pub fn spawn_snapshot_task(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // 第一次 tick 立即返回
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.snapshot_if_dirty().await;
            }
        })
    }

    fn lock_dirty(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        match self.dirty.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new()
    }
}

fn read_snapshot(path: &Path) -> TranslationResult<Option<HashMap<String, String>>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let map: HashMap<String, String> = serde_json::from_str(&data)?;
    Ok(Some(map))
}

fn write_snapshot(path: &Path, snapshot: &BTreeMap<String, String>) -> TranslationResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let data = serde_json::to_vec(snapshot)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_exact_match() {
        let cache = TranslationCache::new();
        cache.store("hello".to_string(), "你好".to_string());

        assert_eq!(cache.lookup("hello"), Some("你好".to_string()));
        assert_eq!(cache.lookup(" hello"), None);
        assert_eq!(cache.lookup("Hello"), None);
    }

    #[test]
    fn test_store_keeps_first_value() {
        let cache = TranslationCache::new();
        assert!(cache.store("hello".to_string(), "你好".to_string()));
        assert!(!cache.store("hello".to_string(), "哈喽".to_string()));

        assert_eq!(cache.lookup("hello"), Some("你好".to_string()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.pending(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_writes_only_when_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = TranslationCache::load(&path);

        assert!(!cache.snapshot_if_dirty().await);
        assert!(!path.exists());

        cache.store("hello".to_string(), "你好".to_string());
        assert!(cache.snapshot_if_dirty().await);
        assert_eq!(cache.pending(), 0);

        let written: HashMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.get("hello"), Some(&"你好".to_string()));

        // 没有新增时不重写
        assert!(!cache.snapshot_if_dirty().await);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let cache = TranslationCache::load(&path);
        cache.store("a b".to_string(), "甲乙".to_string());
        cache.store("c d".to_string(), "丙丁".to_string());
        assert!(cache.snapshot_if_dirty().await);

        let reloaded = TranslationCache::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.lookup("c d"), Some("丙丁".to_string()));
        assert_eq!(reloaded.pending(), 0);
    }

    #[test]
    fn test_corrupt_file_yields_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();

        let cache = TranslationCache::load(&path);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_dirty_entries() {
        let dir = tempfile::tempdir().unwrap();
        // 目标路径是一个目录，rename 会失败
        let path = dir.path().join("occupied");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("child"), "x").unwrap();

        let cache = TranslationCache::load(&path);
        cache.store("hello".to_string(), "你好".to_string());

        assert!(!cache.snapshot_if_dirty().await);
        assert_eq!(cache.pending(), 1);
        assert_eq!(cache.lookup("hello"), Some("你好".to_string()));
    }

    #[tokio::test]
    async fn test_snapshot_task_flushes_on_timer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = Arc::new(TranslationCache::load(&path));
        cache.store("hello".to_string(), "你好".to_string());

        let task = Arc::clone(&cache).spawn_snapshot_task(Duration::from_millis(50));

        let mut flushed = false;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if path.exists() && cache.pending() == 0 {
                flushed = true;
                break;
            }
        }
        task.abort();

        assert!(flushed, "定时任务应在若干周期内写入快照");
        assert_eq!(TranslationCache::load(&path).lookup("hello"), Some("你好".to_string()));
    }

    #[tokio::test]
    async fn test_memory_only_cache_never_writes() {
        let cache = TranslationCache::new();
        cache.store("hello".to_string(), "你好".to_string());
        assert!(!cache.snapshot_if_dirty().await);
    }
}
