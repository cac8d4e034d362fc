//! 微信网页版协议客户端
//!
//! 完整实现扫码登录流水线与长轮询同步引擎:
//! 签发二维码 -> 轮询扫码确认 -> 兑换会话凭证 -> 初始化会话 ->
//! 上报客户端状态 -> 引导通讯录,登录后进入 探测/拉取/派发 的同步循环。
//!
//! # 使用方式
//!
//! ```no_run
//! use std::sync::Arc;
//! use wxbot::{Bot, BotError, Contact, EventHandler, Message};
//!
//! struct Echo;
//!
//! impl EventHandler for Echo {
//!     fn on_sign_in(&self, error: Option<&BotError>) {
//!         println!("sign in: {:?}", error);
//!     }
//!     fn on_sign_out(&self) {}
//!     fn on_qr_code(&self, url: &str) {
//!         println!("scan me: {}", url);
//!     }
//!     fn on_contact(&self, _contact: &Contact, _reserved: i32) {}
//!     fn on_message(&self, message: &Message, _reserved: i32) {
//!         println!("[{}] {}", message.from_user_name, message.content);
//!     }
//! }
//!
//! # async fn run() -> Result<(), BotError> {
//! let bot = Bot::new(Arc::new(Echo))?;
//! bot.start().await?;
//! # Ok(())
//! # }
//! ```
//!
//! 回调在内部任务上同步执行,耗时操作请自行转投其他任务。

pub mod bot;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use bot::Bot;
pub use config::BotConfig;
pub use models::{
    AttrMap, BotError, Contact, ContactDirectory, ContactKind, EventHandler, Message, Session,
    SessionState, SyncKey,
};
pub use services::{BotRegistry, ReqwestTransport, UploadFile, WebTransport};
