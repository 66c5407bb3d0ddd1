//! 翻译请求处理
//!
//! 把启停开关、配置、缓存、上游调用、回复清理和历史记录串成一次完整的翻译。
//! 所有状态都归 [`TranslationService`] 所有，测试可以创建互相隔离的实例。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::translation::cache::TranslationCache;
use crate::translation::config::constants::{
    CONFIG_TEST_TIMEOUT, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, MIN_INPUT_CHARS,
    MODEL_PROBE_TIMEOUT, TRANSLATE_TIMEOUT,
};
use crate::translation::config::{ConfigPatch, ConfigStore, UpstreamConfig};
use crate::translation::discovery::ModelProber;
use crate::translation::error::{helpers, truncate_chars, TranslationError, TranslationResult};
use crate::translation::history::{HistoryEntry, HistoryLog};
use crate::translation::lifecycle::{LifecycleOutcome, ServiceLifecycle, ServiceState};
use crate::translation::sanitizer::sanitize;
use crate::translation::upstream::{ChatMessage, ChatRequest, UpstreamClient, Usage};

const TEST_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const TEST_USER_PROMPT: &str = "Hello, can you hear me? Please respond with a simple yes.";

/// 日志中显示的文本长度
const LOG_PREVIEW_CHARS: usize = 50;

/// 各类上游调用的超时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub translate: Duration,
    pub config_test: Duration,
    pub model_probe: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            translate: TRANSLATE_TIMEOUT,
            config_test: CONFIG_TEST_TIMEOUT,
            model_probe: MODEL_PROBE_TIMEOUT,
        }
    }
}

/// 一次成功的翻译
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// 是否直接来自缓存
    pub cached: bool,
}

/// 配置测试结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigTestReport {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// 运行统计
#[derive(Default)]
struct UsageStats {
    translations: AtomicU64,
    cache_hits: AtomicU64,
    upstream_failures: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_tokens: AtomicU64,
}

impl UsageStats {
    fn record_usage(&self, usage: Usage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens.fetch_add(usage.completion_tokens, Ordering::Relaxed);
        self.total_tokens.fetch_add(usage.total_tokens, Ordering::Relaxed);
        tracing::debug!(
            "Token使用: 请求={}, 回复={}, 总计={}",
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens
        );
    }
}

/// 统计快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub state: ServiceState,
    pub cache_entries: usize,
    pub history_entries: usize,
    pub translations: u64,
    pub cache_hits: u64,
    pub upstream_failures: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

type InflightCell = Arc<OnceCell<TranslationResult<String>>>;

/// 翻译服务
pub struct TranslationService {
    config: ConfigStore,
    cache: Arc<TranslationCache>,
    history: HistoryLog,
    lifecycle: ServiceLifecycle,
    client: UpstreamClient,
    prober: ModelProber,
    timeouts: Timeouts,
    /// 同一原文的并发未命中共享一次上游调用
    inflight: DashMap<String, InflightCell>,
    stats: UsageStats,
}

impl TranslationService {
    pub fn new(
        config: ConfigStore,
        cache: TranslationCache,
        history: HistoryLog,
    ) -> TranslationResult<Self> {
        let client = UpstreamClient::new()?;
        let timeouts = Timeouts::default();
        Ok(Self {
            config,
            cache: Arc::new(cache),
            history,
            lifecycle: ServiceLifecycle::new(),
            prober: ModelProber::with_timeout(client.clone(), timeouts.model_probe),
            client,
            timeouts,
            inflight: DashMap::new(),
            stats: UsageStats::default(),
        })
    }

    /// 替换超时设置
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.prober = ModelProber::with_timeout(self.client.clone(), timeouts.model_probe);
        self.timeouts = timeouts;
        self
    }

    pub fn config(&self) -> Arc<UpstreamConfig> {
        self.config.get()
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    pub fn state(&self) -> ServiceState {
        self.lifecycle.state()
    }

    /// 合并配置并开始接受翻译请求
    pub fn start(&self, patch: &ConfigPatch) -> LifecycleOutcome {
        self.lifecycle.start(patch, &self.config)
    }

    pub fn stop(&self) -> LifecycleOutcome {
        self.lifecycle.stop()
    }

    /// 翻译一段文本
    ///
    /// 检查顺序：服务状态、输入长度、配置完整性。命中缓存时不调用上游，
    /// 也不追加历史记录。失败时缓存和历史记录都保持不变。
    pub async fn translate(&self, input: &str) -> TranslationResult<Translation> {
        let result = self.translate_inner(input).await;
        if let Err(ref error) = result {
            helpers::log_error(error);
        }
        result
    }

    async fn translate_inner(&self, input: &str) -> TranslationResult<Translation> {
        if !self.lifecycle.is_listening() {
            return Err(TranslationError::ServiceNotStarted);
        }
        if input.trim().chars().count() < MIN_INPUT_CHARS {
            return Err(TranslationError::InputTooShort);
        }
        let config = self.config.get();
        config.validate()?;

        self.stats.translations.fetch_add(1, Ordering::Relaxed);

        if let Some(cached) = self.cache.lookup(input) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            tracing::info!("返回缓存的翻译结果: {}", preview(&cached));
            return Ok(Translation {
                text: cached,
                cached: true,
            });
        }

        let cell = Arc::clone(self.inflight.entry(input.to_string()).or_default().value());
        let outcome = cell
            .get_or_init(|| self.fetch_and_record(input, &config))
            .await
            .clone();
        self.inflight
            .remove_if(input, |_, current| Arc::ptr_eq(current, &cell));

        outcome.map(|text| Translation {
            text,
            cached: false,
        })
    }

    async fn fetch_and_record(&self, input: &str, config: &UpstreamConfig) -> TranslationResult<String> {
        // 上一轮共享调用可能刚刚写入缓存
        if let Some(cached) = self.cache.lookup(input) {
            return Ok(cached);
        }

        tracing::info!("收到翻译请求: {} 模型: {}", preview(input), config.model_name);

        let request = ChatRequest {
            model: &config.model_name,
            messages: vec![
                ChatMessage::system(&config.system_prompt),
                ChatMessage::user(input),
            ],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };
        let completion = self
            .client
            .chat_completion(&config.api_url, &config.api_key, &request, self.timeouts.translate)
            .await
            .inspect_err(|_| {
                // 共享同一次调用的请求只计一次
                self.stats.upstream_failures.fetch_add(1, Ordering::Relaxed);
            })?;

        if let Some(usage) = completion.usage {
            self.stats.record_usage(usage);
        }

        let text = sanitize(&completion.content);
        if text.is_empty() {
            tracing::warn!("API返回了空的翻译结果");
            return Ok(text);
        }

        self.cache.store(input.to_string(), text.clone());
        self.history.append(HistoryEntry::new(input, text.clone()));
        tracing::info!("翻译完成，返回结果: {}", preview(&text));
        Ok(text)
    }

    /// 使用给定配置发送一次固定的测试请求
    ///
    /// 不修改当前配置、缓存或历史记录。
    pub async fn test_config(&self, patch: &ConfigPatch) -> TranslationResult<ConfigTestReport> {
        let api_url = required_field(&patch.api_url, "API URL不能为空")?;
        let api_key = required_field(&patch.api_key, "API Key不能为空")?;
        let model_name = required_field(&patch.model_name, "模型名称不能为空")?;
        let temperature = patch.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        let max_tokens = patch.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        tracing::info!(
            "正在发送测试请求... API URL: {}, Model: {}, Temperature: {}, Max Tokens: {}",
            api_url,
            model_name,
            temperature,
            max_tokens
        );

        let request = ChatRequest {
            model: model_name,
            messages: vec![
                ChatMessage::system(TEST_SYSTEM_PROMPT),
                ChatMessage::user(TEST_USER_PROMPT),
            ],
            temperature,
            max_tokens,
        };
        let completion = self
            .client
            .chat_completion(api_url, api_key, &request, self.timeouts.config_test)
            .await?;

        if let Some(usage) = completion.usage {
            tracing::info!(
                "Token使用: 请求={}, 回复={}, 总计={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }
        tracing::info!("配置测试成功！API响应正常。");

        Ok(ConfigTestReport {
            content: completion.content,
            usage: completion.usage,
        })
    }

    /// 获取上游可用模型列表
    pub async fn list_models(&self, api_url: &str, api_key: &str) -> TranslationResult<Vec<String>> {
        self.prober.list_models(api_url, api_key).await
    }

    /// 历史记录，最新的在前
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.list()
    }

    /// 清空历史记录，不影响缓存
    pub fn clear_history(&self) {
        self.history.clear();
    }

    /// 有新增条目时写入缓存快照
    pub async fn flush_cache(&self) -> bool {
        self.cache.snapshot_if_dirty().await
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            state: self.lifecycle.state(),
            cache_entries: self.cache.len(),
            history_entries: self.history.len(),
            translations: self.stats.translations.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            upstream_failures: self.stats.upstream_failures.load(Ordering::Relaxed),
            prompt_tokens: self.stats.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.stats.completion_tokens.load(Ordering::Relaxed),
            total_tokens: self.stats.total_tokens.load(Ordering::Relaxed),
        }
    }
}

fn required_field<'a>(value: &'a Option<String>, message: &str) -> TranslationResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(helpers::config_error(message)),
    }
}

fn preview(text: &str) -> String {
    truncate_chars(text, LOG_PREVIEW_CHARS)
}
