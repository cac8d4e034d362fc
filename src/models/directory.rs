use std::collections::HashMap;

use parking_lot::RwLock;

use crate::models::Contact;

/// 通讯录
///
/// 按服务器分配的标识索引的并发键值存储。
/// 读者(get/find/enumerate)可并发,写者(add/remove)互斥。
/// 由contacts引导阶段填充,同步分发器与公开API更新。
#[derive(Debug, Default)]
pub struct ContactDirectory {
    data: RwLock<HashMap<String, Contact>>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换 (仅登录引导使用)
    pub(crate) fn replace_all(&self, contacts: Vec<Contact>) {
        let mut data = self.data.write();
        data.clear();
        for c in contacts {
            if !c.user_name.is_empty() {
                data.insert(c.user_name.clone(), c);
            }
        }
    }

    /// 添加联系人,同标识覆盖 (replace语义,绝非追加)
    pub fn add(&self, contact: Contact) {
        if contact.user_name.is_empty() {
            return;
        }
        self.data
            .write()
            .insert(contact.user_name.clone(), contact);
    }

    /// 按标识移除
    pub fn remove(&self, user_name: &str) {
        if user_name.is_empty() {
            return;
        }
        self.data.write().remove(user_name);
    }

    /// 按标识查找
    pub fn get(&self, user_name: &str) -> Option<Contact> {
        if user_name.is_empty() {
            return None;
        }
        self.data.read().get(user_name).cloned()
    }

    /// 按关键字查找第一个匹配 (昵称或备注包含关键字)
    pub fn find(&self, keyword: &str) -> Option<Contact> {
        if keyword.is_empty() {
            return None;
        }
        self.data
            .read()
            .values()
            .find(|c| c.nick_name.contains(keyword) || c.remark_name.contains(keyword))
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.data.read().len()
    }

    /// 遍历,回调返回false时停止
    pub fn each(&self, mut f: impl FnMut(&Contact) -> bool) {
        for c in self.data.read().values() {
            if !f(c) {
                break;
            }
        }
    }
}
