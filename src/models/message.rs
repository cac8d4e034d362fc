use serde_json::Value;

use crate::models::AttrMap;

/// 消息类型标签 (服务器数字编码)
///
/// 自带表情/emoji/位置坐标都是文本消息,Content里混排。
pub const MSG_TEXT: i64 = 1;
pub const MSG_IMAGE: i64 = 3;
pub const MSG_VOICE: i64 = 34;

/// 被添加好友待验证
pub const MSG_VERIFY: i64 = 37;

pub const MSG_FRIEND_RECOMMEND: i64 = 40;

/// 名片消息
pub const MSG_CARD: i64 = 42;
pub const MSG_VIDEO: i64 = 43;

/// 动画表情 (官方表情包Content无内容,自定义表情Content为XML)
pub const MSG_ANIM_EMOTION: i64 = 47;
pub const MSG_LOCATION: i64 = 48;

/// 公众号推送/分享的链接,红包,文件,收藏,实时位置共享
pub const MSG_LINK: i64 = 49;
pub const MSG_VOIP: i64 = 50;

/// 登录之后系统发送的初始化消息
pub const MSG_INIT: i64 = 51;
pub const MSG_VOIP_NOTIFY: i64 = 52;
pub const MSG_VOIP_INVITE: i64 = 53;
pub const MSG_VIDEO_CALL: i64 = 62;
pub const MSG_NOTICE: i64 = 9999;

/// 系统消息,例如通过好友验证后的"你已添加了..."
pub const MSG_SYSTEM: i64 = 10000;

/// 撤回消息
pub const MSG_REVOKE: i64 = 10002;

/// 消息
///
/// 构造后不可变,核心不做持久化。
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub from_user_name: String,
    pub to_user_name: String,
    pub content: String,
    pub url: String,
    pub create_time: i64,
    pub msg_type: i64,

    /// 当前说话人 (仅群消息有该字段,由内容前缀解析得出)
    pub speaker_user_name: Option<String>,

    attrs: AttrMap,

    /// 原始载荷,保留不常用字段
    raw: Value,
}

impl Message {
    /// 从同步载荷构造消息
    ///
    /// 标识优先取NewMsgId,缺失时回退MsgId;两者都没有则返回None。
    pub fn from_json(value: &Value) -> Option<Message> {
        let obj = value.as_object()?;

        let mut id = obj
            .get("NewMsgId")
            .and_then(Value::as_i64)
            .filter(|n| *n != 0)
            .map(|n| n.to_string())
            .unwrap_or_default();
        if id.is_empty() {
            id = obj
                .get("MsgId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
        }
        if id.is_empty() {
            return None;
        }

        Some(Message {
            id,
            from_user_name: str_field(obj, "FromUserName"),
            to_user_name: str_field(obj, "ToUserName"),
            content: str_field(obj, "Content"),
            url: str_field(obj, "Url"),
            create_time: obj.get("CreateTime").and_then(Value::as_i64).unwrap_or(0),
            msg_type: obj.get("MsgType").and_then(Value::as_i64).unwrap_or(0),
            speaker_user_name: None,
            attrs: AttrMap::new(),
            raw: value.clone(),
        })
    }

    /// 是否群消息 (说话人只在群消息中出现)
    pub fn is_group_message(&self) -> bool {
        self.speaker_user_name.is_some()
    }

    /// 类型化属性包
    pub fn attrs(&self) -> &AttrMap {
        &self.attrs
    }

    /// 原始载荷
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// 拆分群消息的发言者前缀
///
/// 群消息格式为 `@成员id:<br/>正文`,成员id定长33字节;
/// 被@转发的变体把冒号挪到65字节处。两处都不匹配
/// (如入群通知等系统文本) 则返回None,内容原样保留。
pub fn split_group_speaker(content: &str) -> Option<(String, String)> {
    let bytes = content.as_bytes();
    let colon_at = |idx: usize| bytes.get(idx) == Some(&b':');
    let boundary = |idx: usize| content.is_char_boundary(idx);

    if bytes.len() > 33 && colon_at(33) && boundary(33) && boundary(34) {
        let speaker = content[..33].to_string();
        let rest = strip_br(&content[34..]);
        return Some((speaker, rest));
    }
    if bytes.len() > 65 && colon_at(65) && boundary(33) && boundary(66) {
        let speaker = content[..33].to_string();
        let rest = strip_br(&content[66..]);
        return Some((speaker, rest));
    }
    None
}

fn strip_br(text: &str) -> String {
    text.strip_prefix("<br/>").unwrap_or(text).to_string()
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
