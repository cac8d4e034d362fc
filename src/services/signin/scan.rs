use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::bot::Bot;
use crate::models::{BotError, SessionState};
use crate::services::signin::SignInStage;

// 200: window.code=200;window.redirect_uri="https://..."
// 201: window.code=201;window.userAvatar = 'data:img/jpg;base64,...'
// 408: window.code=408;
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"code\s*=\s*(\d+)\s*;").unwrap());
static REDIRECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"redirect_uri\s*=\s*"(.*)""#).unwrap());

/// 一次轮询的解析结果
#[derive(Debug, PartialEq)]
enum ScanStatus {
    /// 200: 已确认,携带跳转地址
    Confirmed(String),
    /// 201: 已扫码,等待确认
    Scanned,
    /// 408: 服务器侧判定超时
    TimedOut,
    /// 其他状态码,继续轮询
    Pending,
}

/// Scan阶段: 轮询扫码状态,与2分钟定时器竞速
///
/// 轮询与定时器中先到者获胜,败方路径为no-op
/// (tokio::time::timeout保证恰好一个结果胜出)。
pub(crate) struct ScanStage;

#[async_trait]
impl SignInStage for ScanStage {
    fn name(&self) -> &'static str {
        "scan"
    }

    async fn run(&self, bot: &Bot) -> Result<(), BotError> {
        let scan_timeout = bot.config().scan_timeout;
        match tokio::time::timeout(scan_timeout, poll_until_resolved(bot)).await {
            Ok(Ok(redirect_url)) => {
                let mut session = bot.session().write();
                session.redirect_url = redirect_url;
                session.state = SessionState::Confirm;
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => {
                tracing::warn!(timeout_secs = scan_timeout.as_secs(), "scan window elapsed");
                bot.session().write().state = SessionState::ScanTimeout;
                Err(BotError::ScanTimeout)
            }
        }
    }
}

/// 轮询直到确认或服务器判定超时
///
/// 传输错误按固定间隔重试,不会自行中止本阶段;
/// 响应体无法解析才视为协议错误并中止。
async fn poll_until_resolved(bot: &Bot) -> Result<String, BotError> {
    let poll_interval = bot.config().poll_interval;
    loop {
        let snapshot = bot.session_snapshot();
        let body = match bot.api().poll_scan(&snapshot).await {
            Ok(body) => body,
            Err(BotError::RequestFailed(reason)) => {
                tracing::debug!(reason = %reason, "scan poll transport error, retrying");
                tokio::time::sleep(poll_interval).await;
                continue;
            }
            Err(e) => return Err(e),
        };
        match parse_scan_response(&body)? {
            ScanStatus::Confirmed(redirect_url) => {
                tracing::info!("scan confirmed");
                return Ok(redirect_url);
            }
            ScanStatus::Scanned => {
                bot.session().write().state = SessionState::Scan;
                tokio::time::sleep(poll_interval).await;
            }
            ScanStatus::TimedOut => {
                bot.session().write().state = SessionState::ScanTimeout;
                return Err(BotError::ScanTimeout);
            }
            ScanStatus::Pending => {
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

fn parse_scan_response(body: &str) -> Result<ScanStatus, BotError> {
    let code: i32 = CODE_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| BotError::ResponseInvalid("扫码轮询响应缺少code".to_string()))?;
    match code {
        200 => {
            let redirect_url = REDIRECT_RE
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .filter(|url| !url.is_empty())
                .ok_or_else(|| {
                    BotError::ResponseInvalid("确认响应缺少redirect_uri".to_string())
                })?;
            Ok(ScanStatus::Confirmed(redirect_url))
        }
        201 => Ok(ScanStatus::Scanned),
        408 => Ok(ScanStatus::TimedOut),
        _ => Ok(ScanStatus::Pending),
    }
}
