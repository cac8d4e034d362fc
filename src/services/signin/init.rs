use async_trait::async_trait;
use serde_json::Value;

use crate::bot::Bot;
use crate::models::{BotError, Contact, SyncKey};
use crate::services::signin::SignInStage;

/// Init阶段: 初始化会话,取回自身档案与首个同步游标
///
/// 游标缺失或为空会让同步引擎空转,视为协议错误中止。
pub(crate) struct InitStage;

#[async_trait]
impl SignInStage for InitStage {
    fn name(&self) -> &'static str {
        "init"
    }

    async fn run(&self, bot: &Bot) -> Result<(), BotError> {
        let snapshot = bot.session_snapshot();
        let payload = bot.api().init(&snapshot).await?;

        let user = payload.get("User").cloned().unwrap_or(Value::Null);
        let user_name = user
            .get("UserName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if user_name.is_empty() {
            return Err(BotError::ResponseInvalid(
                "webwxinit响应缺少自身档案".to_string(),
            ));
        }
        let nick_name = user
            .get("NickName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let avatar_path = user
            .get("HeadImgUrl")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let sync_key = payload
            .get("SyncKey")
            .and_then(SyncKey::from_json)
            .ok_or_else(|| BotError::ResponseInvalid("webwxinit响应缺少同步游标".to_string()))?;

        tracing::info!(user_name = %user_name, nick_name = %nick_name, "session initialized");

        let self_contact = Contact::from_json(&user);
        {
            let mut session = bot.session().write();
            session.user_name = user_name;
            session.nick_name = nick_name;
            if !avatar_path.is_empty() {
                session.avatar_url = format!("https://{}{}", session.host, avatar_path);
            }
            session.sync_key = sync_key;
        }
        if let Some(contact) = self_contact {
            bot.set_self_contact(contact);
        }
        Ok(())
    }
}
