use std::env;
use std::time::Duration;

/// 协议时序配置
///
/// 默认值即线上协议的观测常量,一般不需要调整。
/// 环境变量 `WXBOT_*` 可逐项覆盖,便于部署时调优。
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// 扫码确认窗口,超过后本次登录以ScanTimeout失败 (默认120秒)
    pub scan_timeout: Duration,

    /// 扫码轮询的固定间隔 (默认1秒)
    pub poll_interval: Duration,

    /// 同步引擎传输错误后的固定退避 (默认1秒)
    pub retry_interval: Duration,

    /// HTTP传输超时,须覆盖服务器约25秒的长轮询保持 (默认120秒)
    pub http_timeout: Duration,

    /// 请求携带的User-Agent
    pub user_agent: String,
}

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/71.0.3578.98 Safari/537.36";

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
            retry_interval: Duration::from_secs(1),
            http_timeout: Duration::from_secs(120),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl BotConfig {
    /// 从环境变量加载,未设置的项保持默认值
    ///
    /// - `WXBOT_SCAN_TIMEOUT_SECS`
    /// - `WXBOT_POLL_INTERVAL_SECS`
    /// - `WXBOT_RETRY_INTERVAL_SECS`
    /// - `WXBOT_HTTP_TIMEOUT_SECS`
    /// - `WXBOT_USER_AGENT`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env_secs("WXBOT_SCAN_TIMEOUT_SECS") {
            config.scan_timeout = secs;
        }
        if let Some(secs) = env_secs("WXBOT_POLL_INTERVAL_SECS") {
            config.poll_interval = secs;
        }
        if let Some(secs) = env_secs("WXBOT_RETRY_INTERVAL_SECS") {
            config.retry_interval = secs;
        }
        if let Some(secs) = env_secs("WXBOT_HTTP_TIMEOUT_SECS") {
            config.http_timeout = secs;
        }
        if let Ok(ua) = env::var("WXBOT_USER_AGENT") {
            if !ua.is_empty() {
                config.user_agent = ua;
            }
        }
        config
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    env::var(key).ok()?.parse::<u64>().ok().map(Duration::from_secs)
}
