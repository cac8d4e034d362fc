//! 同步引擎
//!
//! 登录成功后的常驻循环: 长轮询探测 -> 增量拉取 -> 派发,
//! 单任务双相状态机,天然保证任意时刻最多一个拉取在途。

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::task::JoinHandle;

use crate::bot::Bot;
use crate::models::{BotError, SessionState, SyncCheckResult};
use crate::services::dispatcher;

// window.synccheck={retcode:"0",selector:"2"}
static SYNC_CHECK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"retcode\s*:\s*"(\d+)"\s*,\s*selector\s*:\s*"(\d+)""#).unwrap());

/// 状态机的两相
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// 长轮询探测是否有新数据
    Checking,
    /// 拉取并派发增量
    Fetching,
}

pub(crate) struct SyncEngine;

impl SyncEngine {
    /// 在独立任务中启动同步循环
    ///
    /// 循环退出条件: 取消令牌触发、会话进入Stopped、
    /// 或服务器返回非零retcode (凭证失效)。
    pub(crate) fn spawn(bot: Bot) -> JoinHandle<()> {
        tokio::spawn(async move {
            run_loop(&bot).await;
            tracing::info!(uin = bot.uin(), "sync loop exited");
        })
    }
}

async fn run_loop(bot: &Bot) {
    let retry_interval = bot.config().retry_interval;
    let mut phase = Phase::Checking;
    loop {
        if bot.cancel_token().is_cancelled() || bot.state() == SessionState::Stopped {
            return;
        }
        match phase {
            Phase::Checking => {
                let snapshot = bot.session_snapshot();
                let result = match bot.api().sync_check(&snapshot).await {
                    Ok(body) => match parse_sync_check(&body) {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(error = %e, "sync check unparsable, retrying");
                            tokio::time::sleep(retry_interval).await;
                            continue;
                        }
                    },
                    Err(e) => {
                        tracing::debug!(error = %e, "sync check transport error, retrying");
                        tokio::time::sleep(retry_interval).await;
                        continue;
                    }
                };
                if result.retcode != 0 {
                    // 凭证失效或其他设备踢下线,会话不可恢复
                    tracing::warn!(retcode = result.retcode, "sync check fatal retcode");
                    bot.mark_stopped();
                    bot.fire_sign_out();
                    return;
                }
                if result.selector == 0 {
                    continue;
                }
                phase = Phase::Fetching;
            }
            Phase::Fetching => {
                let snapshot = bot.session_snapshot();
                match bot.api().web_sync(&snapshot).await {
                    Ok(payload) => {
                        dispatcher::dispatch(bot, &payload).await;
                        phase = Phase::Checking;
                    }
                    Err(e) => {
                        // 拉取失败不回到探测相,否则会丢掉本轮增量
                        tracing::warn!(error = %e, "web sync failed, retrying fetch");
                        tokio::time::sleep(retry_interval).await;
                    }
                }
            }
        }
    }
}

fn parse_sync_check(body: &str) -> Result<SyncCheckResult, BotError> {
    let caps = SYNC_CHECK_RE
        .captures(body)
        .ok_or_else(|| BotError::ResponseInvalid("synccheck响应格式异常".to_string()))?;
    let retcode = caps
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| BotError::ResponseInvalid("synccheck缺少retcode".to_string()))?;
    let selector = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| BotError::ResponseInvalid("synccheck缺少selector".to_string()))?;
    Ok(SyncCheckResult { retcode, selector })
}
