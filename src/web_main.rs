//! Web 服务器主程序入口

use std::path::{Path, PathBuf};

use clap::Parser;

use llm_translate_relay::env::{core::LogLevel, generate_env_docs, EnvConfig, EnvVar};
use llm_translate_relay::translation::UpstreamConfig;
use llm_translate_relay::web::{WebConfig, WebServer};

/// LLM 翻译中转服务
#[derive(Parser, Debug)]
#[command(name = "llm-translate-relay", version, about)]
struct Args {
    /// Bind address of both listeners
    #[arg(short, long)]
    bind: Option<String>,

    /// Port of the control surface
    #[arg(long)]
    control_port: Option<u16>,

    /// Port of the translation surface
    #[arg(short = 'p', long)]
    translate_port: Option<u16>,

    /// Translation cache snapshot file
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Directory served on the control surface
    #[arg(long)]
    static_dir: Option<String>,

    /// Print the environment variable reference and exit
    #[arg(long)]
    env_docs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if args.env_docs {
        print!("{}", generate_env_docs());
        return Ok(());
    }

    load_dotenv();

    let level = LogLevel::get_or_default("info".to_string())
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    match EnvConfig::from_env() {
        Ok(env_config) => {
            env_config.print_summary();
            if let Err(e) = env_config.validate() {
                tracing::warn!("环境变量配置有误: {}", e);
            }
        }
        Err(e) => tracing::warn!("环境变量配置有误: {}", e),
    }

    let mut web_config = WebConfig::default();
    if let Some(bind) = args.bind {
        web_config.bind_addr = bind;
    }
    if let Some(port) = args.control_port {
        web_config.control_port = port;
    }
    if let Some(port) = args.translate_port {
        web_config.translate_port = port;
    }
    if let Some(cache_file) = args.cache_file {
        web_config.cache_file = cache_file;
    }
    if let Some(static_dir) = args.static_dir {
        web_config.static_dir = Some(static_dir);
    }
    web_config.validate()?;

    let server = WebServer::new(web_config, UpstreamConfig::default())?;
    server.start().await?;

    Ok(())
}

/// 加载 .env 文件
fn load_dotenv() {
    // 按优先级加载 .env 文件
    let env_files = [".env.local", ".env"];

    for env_file in &env_files {
        if Path::new(env_file).exists() {
            match dotenv::from_filename(env_file) {
                Ok(_) => {
                    eprintln!("已加载环境变量文件: {}", env_file);
                    break;
                }
                Err(e) => eprintln!("无法加载环境变量文件 {}: {}", env_file, e),
            }
        }
    }
}
