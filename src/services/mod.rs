//! 服务层: 传输、协议端点、登录流水线、同步引擎与注册表

pub(crate) mod dispatcher;
pub mod registry;
pub(crate) mod signin;
pub(crate) mod sync_engine;
pub mod transport;
pub(crate) mod wechat_api;

pub use registry::BotRegistry;
pub use transport::{ReqwestTransport, UploadFile, WebTransport};
