use thiserror::Error;

/// 协议交互相关错误
///
/// 覆盖登录流水线、同步引擎与公开API的所有失败场景。
/// 每个错误都包含足够的上下文信息,帮助调试和恢复。
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BotError {
    /// 请求失败
    ///
    /// 可能原因:
    /// - 网络连接中断或超时
    /// - 服务器不可达
    /// - 返回了非200状态码
    #[error("请求失败: {0}")]
    RequestFailed(String),

    /// 响应格式无效
    ///
    /// 服务器返回的数据不符合预期的模式/结构
    #[error("响应格式无效: {0}")]
    ResponseInvalid(String),

    /// 扫码确认超时
    ///
    /// 二维码签发后2分钟内未在手机上确认
    #[error("扫码确认超时")]
    ScanTimeout,

    /// 状态无效
    ///
    /// 当前生命周期状态不允许该操作,
    /// 如登录完成前收发消息、运行中重复登录
    #[error("状态无效: 当前会话状态不允许该操作")]
    InvalidState,

    /// 参数无效
    ///
    /// 调用方传入的必填字段为空
    #[error("参数无效: {0}")]
    InvalidArgs(&'static str),

    /// 联系人不存在
    ///
    /// 按标识寻址的联系人不在通讯录中
    #[error("联系人不存在: {0}")]
    ContactNotFound(String),
}

/// 实现从reqwest::Error到BotError的转换
impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BotError::RequestFailed("请求超时".to_string())
        } else if err.is_connect() {
            BotError::RequestFailed("无法连接到服务器".to_string())
        } else {
            BotError::RequestFailed(err.to_string())
        }
    }
}

/// 实现从serde_json::Error到BotError的转换
impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::ResponseInvalid(err.to_string())
    }
}
