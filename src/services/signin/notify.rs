use async_trait::async_trait;

use crate::bot::Bot;
use crate::models::BotError;
use crate::services::signin::SignInStage;

/// Notify阶段: 向服务器上报"客户端已就绪"
///
/// 响应体只要拿到就算成功,内容不做校验。
pub(crate) struct NotifyStage;

#[async_trait]
impl SignInStage for NotifyStage {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn run(&self, bot: &Bot) -> Result<(), BotError> {
        let snapshot = bot.session_snapshot();
        bot.api().status_notify(&snapshot).await?;
        tracing::debug!("status notify sent");
        Ok(())
    }
}
