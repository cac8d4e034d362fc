use crate::models::{BotError, Contact, Message};

/// 事件回调接口
///
/// 消费方实现该trait接收登录结果与实时的联系人/消息推送。
/// 回调在流水线/同步引擎的任务上同步执行,不要在其中长时间阻塞。
pub trait EventHandler: Send + Sync {
    /// 登录完成
    ///
    /// 每次登录尝试恰好触发一次:
    /// 成功时error为None,任一阶段失败时携带错误。
    fn on_sign_in(&self, error: Option<&BotError>);

    /// 退出/下线 (服务器侧会话失效,即致命retcode)
    fn on_sign_out(&self);

    /// 收到二维码,参数为可扫码的二维码链接
    fn on_qr_code(&self, url: &str);

    /// 联系人更新,如:
    /// 好友资料更新、删除好友或被好友删除,
    /// 建群、入群、群改名、群成员变更、退群等。
    /// 第二个参数暂时没用
    fn on_contact(&self, contact: &Contact, reserved: i32);

    /// 收到消息,第二个参数暂时没用
    fn on_message(&self, message: &Message, reserved: i32);
}
