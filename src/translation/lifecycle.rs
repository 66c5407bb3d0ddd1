//! 翻译服务启停开关

use std::sync::Mutex;

use serde::Serialize;

use crate::translation::config::{ConfigPatch, ConfigStore};

/// 服务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Stopped,
    Listening,
}

/// 启停操作的结果
///
/// 重复启动或重复停止不是错误，只是被拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Accepted,
    Declined,
}

impl LifecycleOutcome {
    pub fn is_accepted(self) -> bool {
        self == LifecycleOutcome::Accepted
    }
}

pub struct ServiceLifecycle {
    state: Mutex<ServiceState>,
}

impl ServiceLifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServiceState::Stopped),
        }
    }

    pub fn state(&self) -> ServiceState {
        *self.lock()
    }

    pub fn is_listening(&self) -> bool {
        self.state() == ServiceState::Listening
    }

    /// 合并配置并开始接受翻译请求
    ///
    /// 已在运行时不修改配置。
    pub fn start(&self, patch: &ConfigPatch, config: &ConfigStore) -> LifecycleOutcome {
        let mut state = self.lock();
        if *state == ServiceState::Listening {
            tracing::info!("翻译服务已在运行中，忽略重复启动");
            return LifecycleOutcome::Declined;
        }

        let merged = config.replace(patch);
        *state = ServiceState::Listening;
        tracing::info!("翻译服务已启动，模型: {}", merged.model_name);
        LifecycleOutcome::Accepted
    }

    pub fn stop(&self) -> LifecycleOutcome {
        let mut state = self.lock();
        if *state == ServiceState::Stopped {
            tracing::info!("翻译服务未在运行，忽略停止请求");
            return LifecycleOutcome::Declined;
        }

        *state = ServiceState::Stopped;
        tracing::info!("翻译服务已停止");
        LifecycleOutcome::Accepted
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ServiceState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ServiceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::config::UpstreamConfig;

    fn store() -> ConfigStore {
        ConfigStore::new(UpstreamConfig {
            api_url: "http://localhost/v1".to_string(),
            api_key: "sk".to_string(),
            model_name: "m".to_string(),
            system_prompt: String::new(),
            temperature: 1.0,
            max_tokens: 16,
        })
    }

    #[test]
    fn test_initial_state_is_stopped() {
        assert_eq!(ServiceLifecycle::new().state(), ServiceState::Stopped);
    }

    #[test]
    fn test_start_and_stop_transitions() {
        let lifecycle = ServiceLifecycle::new();
        let config = store();

        assert!(lifecycle.start(&ConfigPatch::default(), &config).is_accepted());
        assert!(lifecycle.is_listening());

        assert!(lifecycle.stop().is_accepted());
        assert_eq!(lifecycle.state(), ServiceState::Stopped);
    }

    #[test]
    fn test_repeated_transitions_are_declined() {
        let lifecycle = ServiceLifecycle::new();
        let config = store();

        assert_eq!(lifecycle.stop(), LifecycleOutcome::Declined);

        lifecycle.start(&ConfigPatch::default(), &config);
        let patch = ConfigPatch {
            model_name: Some("other".to_string()),
            ..Default::default()
        };
        assert_eq!(lifecycle.start(&patch, &config), LifecycleOutcome::Declined);
        // 被拒绝的启动不修改配置
        assert_eq!(config.get().model_name, "m");
    }

    #[test]
    fn test_start_merges_patch() {
        let lifecycle = ServiceLifecycle::new();
        let config = store();
        let patch = ConfigPatch {
            model_name: Some("qwen-turbo".to_string()),
            ..Default::default()
        };

        lifecycle.start(&patch, &config);
        assert_eq!(config.get().model_name, "qwen-turbo");
        assert_eq!(config.get().api_key, "sk");
    }
}
