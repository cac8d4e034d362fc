//! 数据模型模块
//!
//! 包含所有核心数据结构:
//! - errors: 错误类型定义 (请求/响应/超时/状态/参数/查找)
//! - session: 协议会话状态 (主机、凭证、同步游标、生命周期)
//! - contact: 联系人与分类决策表
//! - message: 消息与数字类型标签
//! - directory: 通讯录 (读写锁保护的并发存储)
//! - attrs: 类型化属性包 (Bot/Contact/Message的扩展存储)
//! - events: 事件回调接口

pub mod attrs;
pub mod contact;
pub mod directory;
pub mod errors;
pub mod events;
pub mod message;
pub mod session;

// 重导出常用类型,简化外部引用
pub use attrs::AttrMap;
pub use contact::{Contact, ContactKind};
pub use directory::ContactDirectory;
pub use errors::BotError;
pub use events::EventHandler;
pub use message::Message;
pub use session::{
    BaseRequest, Session, SessionState, SyncCheckResult, SyncKey, SyncKeyItem,
};
