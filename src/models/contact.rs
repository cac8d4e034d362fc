use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::AttrMap;

/// 联系人分类
///
/// 由数字验证标志与标识前缀共同决定,见 [`Contact::classify`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    /// 好友
    Friend,

    /// 群
    Group,

    /// 公众号/企业号
    Official,

    /// 系统帐号 (如微信团队/文件传输助手)
    System,

    /// 无法识别的验证标志
    Unknown,
}

/// 联系人
///
/// `user_name` 是服务器分配的不透明标识,每次登录都会重新签发,
/// 绝不跨登录持久化。联系人归通讯录所有,不会比所属Bot活得更久。
#[derive(Debug, Clone)]
pub struct Contact {
    /// 不透明标识,群以`@@`开头,好友以`@`开头,
    /// 系统帐号直接是名字 (weixin/filehelper/fmessage)
    pub user_name: String,

    /// 昵称,群联系人表示群名称
    pub nick_name: String,

    /// 备注名 (仅好友有)
    pub remark_name: String,

    /// 原始验证标志: 个人和群为0,订阅号8,企业号24,系统号56
    pub verify_flag: i64,

    /// 验证标志解析后的分类
    pub kind: ContactKind,

    /// 成员列表 (仅群有, UserName -> NickName),惰性填充
    pub members: Option<HashMap<String, String>>,

    attrs: AttrMap,

    /// 原始载荷,保留不常用字段
    raw: Value,
}

impl Contact {
    /// 分类决策表
    ///
    /// | 验证标志 | 标识前缀 | 分类 |
    /// |---|---|---|
    /// | 0 | `@@` | 群 |
    /// | 0 | `@`  | 好友 |
    /// | 0 | 其他 | 系统 |
    /// | 8 / 24 | - | 公众号/企业号 |
    /// | 56 | - | 系统 |
    /// | 其他 | - | 未知 |
    pub fn classify(verify_flag: i64, user_name: &str) -> ContactKind {
        match verify_flag {
            0 => {
                if user_name.starts_with("@@") {
                    ContactKind::Group
                } else if user_name.starts_with('@') {
                    ContactKind::Friend
                } else {
                    ContactKind::System
                }
            }
            8 | 24 => ContactKind::Official,
            56 => ContactKind::System,
            _ => ContactKind::Unknown,
        }
    }

    /// 从JSON载荷构造联系人
    ///
    /// 标识为空的条目返回None,由调用方丢弃。
    pub fn from_json(value: &Value) -> Option<Contact> {
        let obj = value.as_object()?;
        let user_name = obj
            .get("UserName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if user_name.is_empty() {
            return None;
        }
        let nick_name = obj
            .get("NickName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let remark_name = obj
            .get("RemarkName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let verify_flag = obj.get("VerifyFlag").and_then(Value::as_i64).unwrap_or(0);

        let member_count = obj.get("MemberCount").and_then(Value::as_i64).unwrap_or(0);
        let members = if member_count > 0 {
            Some(parse_members(obj.get("MemberList")))
        } else {
            None
        };

        let kind = Self::classify(verify_flag, &user_name);
        Some(Contact {
            user_name,
            nick_name,
            remark_name,
            verify_flag,
            kind,
            members,
            attrs: AttrMap::new(),
            raw: value.clone(),
        })
    }

    pub fn is_group(&self) -> bool {
        self.kind == ContactKind::Group
    }

    pub fn is_friend(&self) -> bool {
        self.kind == ContactKind::Friend
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

fn parse_members(list: Option<&Value>) -> HashMap<String, String> {
    let mut members = HashMap::new();
    if let Some(arr) = list.and_then(Value::as_array) {
        for item in arr {
            let user_name = item.get("UserName").and_then(Value::as_str).unwrap_or("");
            if user_name.is_empty() {
                continue;
            }
            let nick_name = item.get("NickName").and_then(Value::as_str).unwrap_or("");
            members.insert(user_name.to_string(), nick_name.to_string());
        }
    }
    members
}
