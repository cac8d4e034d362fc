use async_trait::async_trait;
use serde_json::Value;

use crate::bot::Bot;
use crate::models::{BotError, Contact};
use crate::services::signin::SignInStage;

/// Contacts阶段: 全量拉取通讯录并整体替换本地目录
pub(crate) struct ContactsStage;

#[async_trait]
impl SignInStage for ContactsStage {
    fn name(&self) -> &'static str {
        "contacts"
    }

    async fn run(&self, bot: &Bot) -> Result<(), BotError> {
        let snapshot = bot.session_snapshot();
        let payload = bot.api().fetch_contacts(&snapshot).await?;

        let contacts: Vec<Contact> = payload
            .get("MemberList")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Contact::from_json).collect())
            .unwrap_or_default();

        tracing::info!(count = contacts.len(), "contact directory bootstrapped");
        bot.contacts().replace_all(contacts);
        Ok(())
    }
}
