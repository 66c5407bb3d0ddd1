// 集成测试公共模块
//
// 提供模拟上游服务和测试辅助工具

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use llm_translate_relay::translation::{
    ConfigPatch, ConfigStore, HistoryLog, Timeouts, TranslationCache, TranslationService,
    UpstreamConfig,
};

pub const TEST_API_KEY: &str = "sk-test";
pub const TEST_MODEL: &str = "test-model";

/// 模拟上游的聊天补全回复
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200，choices[0].message.content 为给定内容，附带 usage
    Content(String),
    /// 非 2xx 状态码和响应体
    Status(u16, String),
    /// 200，原样返回响应体
    Raw(String),
    /// 等待一段时间后再返回内容
    Slow(Duration, String),
}

/// 模型列表端点的回复
#[derive(Debug, Clone)]
pub struct ModelsReply {
    pub status: u16,
    pub body: String,
}

impl ModelsReply {
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Clone)]
struct MockState {
    reply: Arc<Mutex<MockReply>>,
    chat_calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<Value>>>,
    last_auth: Arc<Mutex<Option<String>>>,
    models_reply: Arc<Mutex<ModelsReply>>,
    models_calls: Arc<AtomicUsize>,
    v1_models_reply: Arc<Mutex<ModelsReply>>,
    v1_models_calls: Arc<AtomicUsize>,
}

/// 运行在 127.0.0.1 随机端口上的模拟上游
pub struct MockUpstream {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockUpstream {
    pub async fn start(reply: MockReply) -> Self {
        let state = MockState {
            reply: Arc::new(Mutex::new(reply)),
            chat_calls: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
            last_auth: Arc::new(Mutex::new(None)),
            models_reply: Arc::new(Mutex::new(ModelsReply::status(404, "not found"))),
            models_calls: Arc::new(AtomicUsize::new(0)),
            v1_models_reply: Arc::new(Mutex::new(ModelsReply::status(404, "not found"))),
            v1_models_calls: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_handler))
            .route("/v1/models", get(models_handler))
            .route("/v1/v1/models", get(v1_models_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Mock upstream should bind");
        let addr = listener.local_addr().expect("Mock upstream should have an address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// 不带 `/chat/completions` 后缀的基础地址
    pub fn api_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn set_reply(&self, reply: MockReply) {
        *self.state.reply.lock().unwrap() = reply;
    }

    /// `{base}/models`，同时也是第三个候选地址
    pub fn set_models_reply(&self, reply: ModelsReply) {
        *self.state.models_reply.lock().unwrap() = reply;
    }

    /// `{base}/v1/models`
    pub fn set_v1_models_reply(&self, reply: ModelsReply) {
        *self.state.v1_models_reply.lock().unwrap() = reply;
    }

    pub fn chat_calls(&self) -> usize {
        self.state.chat_calls.load(Ordering::SeqCst)
    }

    pub fn models_calls(&self) -> usize {
        self.state.models_calls.load(Ordering::SeqCst)
    }

    pub fn v1_models_calls(&self) -> usize {
        self.state.v1_models_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<Value> {
        self.state.last_request.lock().unwrap().clone()
    }

    pub fn last_auth(&self) -> Option<String> {
        self.state.last_auth.lock().unwrap().clone()
    }
}

fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16 }
    })
}

async fn chat_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    state.chat_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_request.lock().unwrap() = Some(request);
    *state.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let reply = state.reply.lock().unwrap().clone();
    match reply {
        MockReply::Content(content) => Json(completion_body(&content)).into_response(),
        MockReply::Status(status, body) => {
            (StatusCode::from_u16(status).unwrap(), body).into_response()
        }
        MockReply::Raw(body) => (StatusCode::OK, body).into_response(),
        MockReply::Slow(delay, content) => {
            tokio::time::sleep(delay).await;
            Json(completion_body(&content)).into_response()
        }
    }
}

fn models_response(reply: ModelsReply) -> Response {
    (StatusCode::from_u16(reply.status).unwrap(), reply.body).into_response()
}

async fn models_handler(State(state): State<MockState>) -> Response {
    state.models_calls.fetch_add(1, Ordering::SeqCst);
    let reply = state.models_reply.lock().unwrap().clone();
    models_response(reply)
}

async fn v1_models_handler(State(state): State<MockState>) -> Response {
    state.v1_models_calls.fetch_add(1, Ordering::SeqCst);
    let reply = state.v1_models_reply.lock().unwrap().clone();
    models_response(reply)
}

/// 指向给定地址的完整配置
pub fn test_config(api_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        api_url: api_url.to_string(),
        api_key: TEST_API_KEY.to_string(),
        model_name: TEST_MODEL.to_string(),
        system_prompt: "Translate the following text into Simplified Chinese.".to_string(),
        temperature: 1.0,
        max_tokens: 256,
    }
}

/// 缩短后的超时，避免测试长时间等待
pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        translate: Duration::from_secs(5),
        config_test: Duration::from_secs(5),
        model_probe: Duration::from_secs(5),
    }
}

/// 尚未启动的服务
pub fn build_service(api_url: &str) -> Arc<TranslationService> {
    build_service_with(api_url, TranslationCache::new(), fast_timeouts())
}

pub fn build_service_with(
    api_url: &str,
    cache: TranslationCache,
    timeouts: Timeouts,
) -> Arc<TranslationService> {
    let service = TranslationService::new(
        ConfigStore::new(test_config(api_url)),
        cache,
        HistoryLog::new(),
    )
    .expect("Service should be created")
    .with_timeouts(timeouts);
    Arc::new(service)
}

/// 已启动的服务
pub fn started_service(api_url: &str) -> Arc<TranslationService> {
    let service = build_service(api_url);
    assert!(service.start(&ConfigPatch::default()).is_accepted());
    service
}

/// 没有任何进程监听的地址
pub fn unreachable_api_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Should bind a free port");
    let addr = listener.local_addr().expect("Should have an address");
    drop(listener);
    format!("http://{}/v1", addr)
}
