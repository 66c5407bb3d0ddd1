//! 模型回复清理
//!
//! 去掉推理标记、修剪空白并限制长度，输出可以直接返回给游戏端。

use std::sync::OnceLock;

use regex::Regex;

/// 回复保留的最大字符数
pub const MAX_REPLY_CHARS: usize = 10_000;

/// 超长回复截断后追加的标记
pub const TRUNCATION_MARKER: &str = "...(content too long, truncated)";

// 标签名区分大小写，开闭标签必须同名
const REASONING_PATTERN: &str = r"(?s)<thinking>.*?</thinking>|<think>.*?</think>";

fn reasoning_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(REASONING_PATTERN).expect("reasoning pattern is valid"))
}

/// 清理模型原始回复
///
/// 返回空字符串表示模型没有给出任何内容，这不是错误。
pub fn sanitize(raw: &str) -> String {
    let stripped = reasoning_regex().replace_all(raw, "");
    let removed = raw.len() - stripped.len();
    if removed > 0 {
        tracing::debug!("已移除思维链内容 (减少了 {} 字节)", removed);
    }

    let trimmed = stripped.trim();
    match trimmed.char_indices().nth(MAX_REPLY_CHARS) {
        Some((cut, _)) => {
            tracing::warn!("翻译结果过长，已截断至 {} 字符", MAX_REPLY_CHARS);
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(&trimmed[..cut]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => trimmed.to_string(),
    }
}
