//! 登录流水线
//!
//! 固定顺序的六个阶段: qr -> scan -> redirect -> init -> notify -> contacts。
//! 严格串行执行,前一阶段成功返回之前后一阶段绝不开始;
//! 任一阶段出错立即中止,由Bot通过唯一一次的登录回调上报。
//!
//! 每个阶段读写Session累积凭证,阶段本身无状态。

mod contacts;
mod init;
mod notify;
mod qr;
mod redirect;
mod scan;

use async_trait::async_trait;

use crate::bot::Bot;
use crate::models::BotError;

/// 登录阶段
///
/// `run` 是 `(Session, HTTP客户端) -> (Session变更, 继续|错误)` 的封装。
#[async_trait]
pub(crate) trait SignInStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, bot: &Bot) -> Result<(), BotError>;
}

/// 固定的阶段序列
fn stages() -> Vec<Box<dyn SignInStage>> {
    vec![
        Box::new(qr::QrStage),
        Box::new(scan::ScanStage),
        Box::new(redirect::RedirectStage),
        Box::new(init::InitStage),
        Box::new(notify::NotifyStage),
        Box::new(contacts::ContactsStage),
    ]
}

/// 串行执行流水线,首个错误即中止
pub(crate) async fn run_pipeline(bot: &Bot) -> Result<(), BotError> {
    for stage in stages() {
        tracing::debug!(stage = stage.name(), "sign-in stage starting");
        if let Err(e) = stage.run(bot).await {
            tracing::warn!(stage = stage.name(), error = %e, "sign-in stage failed");
            return Err(e);
        }
        tracing::debug!(stage = stage.name(), "sign-in stage completed");
    }
    Ok(())
}
