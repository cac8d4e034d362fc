//! Bot注册表
//!
//! 以uin为键登记在线实例,供多帐号场景按uin/uuid检索。
//! 默认提供进程级全局表,测试可注入独立实例做隔离。

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::bot::Bot;
use crate::models::SessionState;

static GLOBAL: Lazy<Arc<BotRegistry>> = Lazy::new(|| Arc::new(BotRegistry::new()));

#[derive(Default)]
pub struct BotRegistry {
    data: RwLock<HashMap<i64, Bot>>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级全局注册表
    pub fn global() -> Arc<BotRegistry> {
        GLOBAL.clone()
    }

    pub(crate) fn register(&self, uin: i64, bot: Bot) {
        self.data.write().insert(uin, bot);
    }

    pub(crate) fn unregister(&self, uin: i64) {
        self.data.write().remove(&uin);
    }

    pub fn by_uin(&self, uin: i64) -> Option<Bot> {
        self.data.read().get(&uin).cloned()
    }

    pub fn by_uuid(&self, uuid: &str) -> Option<Bot> {
        self.data
            .read()
            .values()
            .find(|b| b.uuid() == uuid)
            .cloned()
    }

    /// 所有处于Running状态的实例
    pub fn running(&self) -> Vec<Bot> {
        self.data
            .read()
            .values()
            .filter(|b| b.state() == SessionState::Running)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.data.read().len()
    }

    /// 遍历所有实例,回调返回false时提前结束
    pub fn each<F>(&self, mut f: F)
    where
        F: FnMut(&Bot) -> bool,
    {
        for bot in self.data.read().values() {
            if !f(bot) {
                break;
            }
        }
    }
}
