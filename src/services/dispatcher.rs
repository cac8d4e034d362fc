//! 增量派发
//!
//! webwxsync载荷的处理顺序: 游标整体替换 -> 联系人增删 -> 消息。
//! 好友请求消息在这里自动接受,接受成功后不再作为普通消息上报。

use serde_json::Value;

use crate::bot::Bot;
use crate::models::message::{split_group_speaker, MSG_VERIFY};
use crate::models::{Contact, Message, SyncKey};

/// 联系人回调的变更码
pub const CONTACT_MODIFIED: i32 = 1;
pub const CONTACT_DELETED: i32 = 2;

/// 处理一次webwxsync的完整载荷
pub(crate) async fn dispatch(bot: &Bot, payload: &Value) {
    // 游标整体替换,绝不逐项合并; 空游标保留旧值
    if let Some(sync_key) = payload.get("SyncCheckKey").and_then(SyncKey::from_json) {
        bot.session().write().sync_key = sync_key;
    }

    if let Some(list) = payload.get("ModContactList").and_then(Value::as_array) {
        for item in list {
            if let Some(contact) = Contact::from_json(item) {
                bot.contacts().add(contact.clone());
                bot.handler().on_contact(&contact, CONTACT_MODIFIED);
            }
        }
    }

    if let Some(list) = payload.get("DelContactList").and_then(Value::as_array) {
        for item in list {
            if let Some(contact) = Contact::from_json(item) {
                bot.contacts().remove(&contact.user_name);
                bot.handler().on_contact(&contact, CONTACT_DELETED);
            }
        }
    }

    if let Some(list) = payload.get("AddMsgList").and_then(Value::as_array) {
        for item in list {
            let Some(mut msg) = Message::from_json(item) else {
                tracing::debug!("message without id skipped");
                continue;
            };
            if msg.msg_type == MSG_VERIFY && try_accept_friend(bot, item).await {
                continue;
            }
            // 拆分只看内容是否匹配定长前缀,不看发送方标识
            if let Some((speaker, text)) = split_group_speaker(&msg.content) {
                msg.speaker_user_name = Some(speaker);
                msg.content = text;
            }
            bot.handler().on_message(&msg, 0);
        }
    }
}

/// 自动接受好友请求
///
/// 接受失败时返回false,让消息按普通消息继续上报,
/// 调用方可以自行处理RecommendInfo。
async fn try_accept_friend(bot: &Bot, raw: &Value) -> bool {
    let info = raw.get("RecommendInfo");
    let user_name = info
        .and_then(|i| i.get("UserName"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let ticket = info
        .and_then(|i| i.get("Ticket"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if user_name.is_empty() || ticket.is_empty() {
        return false;
    }
    match bot.accept(user_name, ticket).await {
        Ok(contact) => {
            tracing::info!(user_name = %user_name, "friend request accepted");
            bot.handler().on_contact(&contact, CONTACT_MODIFIED);
            true
        }
        Err(e) => {
            tracing::warn!(user_name = %user_name, error = %e, "friend accept failed");
            false
        }
    }
}
