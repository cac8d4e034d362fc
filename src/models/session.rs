use serde::{Deserialize, Serialize};

/// 默认主机集群
///
/// redirect阶段会根据服务器分配的跳转地址切换到wx2集群,
/// 切换之后所有请求必须使用同一套主机,否则服务器返回1100错误码。
pub const DEFAULT_HOST: &str = "wx.qq.com";
pub const DEFAULT_SYNC_CHECK_HOST: &str = "webpush.weixin.qq.com";
pub const DEFAULT_REFERER: &str = "https://wx.qq.com/";
pub const DEFAULT_BASE_URL: &str = "https://wx.qq.com/cgi-bin/mmwebwx-bin";
pub const DEFAULT_SYNC_CHECK_BASE_URL: &str = "https://webpush.weixin.qq.com/cgi-bin/mmwebwx-bin";

/// 登录入口地址 (与主机集群无关)
pub const DEFAULT_LOGIN_URL: &str = "https://login.weixin.qq.com/jslogin";
pub const DEFAULT_QR_URL: &str = "https://login.weixin.qq.com/qrcode";
pub const DEFAULT_SCAN_URL: &str = "https://login.weixin.qq.com/cgi-bin/mmwebwx-bin/login";

/// 会话生命周期状态
///
/// 状态转换流程:
/// Unknown -> Scan -> Confirm -> Running -> Stopped
///              |
///              +---> ScanTimeout (2分钟内未确认,本次登录终止)
///
/// ScanTimeout与Stopped是终态,其余状态只能单向前进。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// 初始状态,尚未签发二维码
    Unknown,

    /// 已扫码,等待手机端确认
    Scan,

    /// 等待确认超时
    ScanTimeout,

    /// 已确认,握手进行中
    Confirm,

    /// 登录成功,可以正常收发消息
    Running,

    /// 已下线 (主动停止或致命retcode)
    Stopped,
}

impl SessionState {
    /// 是否为本次登录的终态
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::ScanTimeout | SessionState::Stopped)
    }
}

/// 每个JSON请求都携带的基础信封
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseRequest {
    #[serde(rename = "DeviceID")]
    pub device_id: String,

    #[serde(rename = "Sid")]
    pub sid: String,

    #[serde(rename = "Skey")]
    pub skey: String,

    #[serde(rename = "Uin")]
    pub uin: i64,
}

/// 同步游标的单项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncKeyItem {
    #[serde(rename = "Key")]
    pub key: i64,

    #[serde(rename = "Val")]
    pub val: i64,
}

/// 服务器下发的同步游标
///
/// 表示客户端已消费的变更历史位置。每次同步请求必须原样回传,
/// 服务器返回新游标时整体替换,绝不合并。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncKey {
    #[serde(rename = "Count")]
    pub count: i64,

    #[serde(rename = "List")]
    pub list: Vec<SyncKeyItem>,
}

impl SyncKey {
    /// 游标是否为空 (尚未初始化或服务器未返回)
    pub fn is_empty(&self) -> bool {
        self.count <= 0 || self.list.is_empty()
    }

    /// 展开为synccheck请求的query形式
    ///
    /// 按列表顺序将 `key_val` 以 `|` 连接,
    /// 例: `{1:100, 2:200}` -> `"1_100|2_200"`,空列表 -> `""`
    pub fn expand(&self) -> String {
        self.list
            .iter()
            .map(|item| format!("{}_{}", item.key, item.val))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// 从同步载荷中解析游标
    ///
    /// 返回None表示该字段缺失或为空游标,调用方据此保留旧游标。
    pub fn from_json(value: &serde_json::Value) -> Option<SyncKey> {
        let sk: SyncKey = serde_json::from_value(value.clone()).ok()?;
        if sk.is_empty() {
            None
        } else {
            Some(sk)
        }
    }
}

/// 一次synccheck的结果对
///
/// 仅在一轮循环内有效,不做保留。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCheckResult {
    /// 非0表示会话在服务器侧已失效 (致命)
    pub retcode: i64,

    /// 0表示无变更,非0表示有变更待拉取
    pub selector: i64,
}

/// 协议会话状态
///
/// 登录流水线各阶段逐步累积凭证,同步引擎消费并更新游标。
/// 唯一拥有者是Bot,流水线与同步引擎独占写入,请求构造只读。
#[derive(Debug, Clone)]
pub struct Session {
    /// 主机集群,redirect阶段选定后保持一致
    pub host: String,
    pub sync_check_host: String,
    pub referer: String,
    pub base_url: String,
    pub sync_check_base_url: String,

    /// 登录入口 (jslogin / 二维码 / 扫码轮询)
    pub login_url: String,
    pub qr_url: String,
    pub scan_url: String,

    pub state: SessionState,

    /// 二维码会话凭证,由QR阶段签发
    pub uuid: String,
    pub qr_code_url: String,

    /// 扫码确认后服务器下发的跳转地址
    pub redirect_url: String,

    /// redirect阶段获得的会话凭证,登录后不再变更
    pub skey: String,
    pub sid: String,
    pub uin: i64,
    pub pass_ticket: String,
    pub base_request: BaseRequest,

    /// 同步游标与帐号信息,由init阶段填充
    pub sync_key: SyncKey,
    pub user_name: String,
    pub nick_name: String,
    pub avatar_url: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            sync_check_host: DEFAULT_SYNC_CHECK_HOST.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            sync_check_base_url: DEFAULT_SYNC_CHECK_BASE_URL.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            qr_url: DEFAULT_QR_URL.to_string(),
            scan_url: DEFAULT_SCAN_URL.to_string(),
            state: SessionState::Unknown,
            uuid: String::new(),
            qr_code_url: String::new(),
            redirect_url: String::new(),
            skey: String::new(),
            sid: String::new(),
            uin: 0,
            pass_ticket: String::new(),
            base_request: BaseRequest::default(),
            sync_key: SyncKey::default(),
            user_name: String::new(),
            nick_name: String::new(),
            avatar_url: String::new(),
        }
    }
}

impl Session {
    /// 切换到wx2从属集群
    ///
    /// 仅当redirect地址的主机名包含"wx2"时调用,
    /// 必须发生在后续任何请求之前。
    pub fn switch_to_secondary_cluster(&mut self) {
        self.host = "wx2.qq.com".to_string();
        self.sync_check_host = "webpush.wx2.qq.com".to_string();
        self.referer = "https://wx2.qq.com/".to_string();
        self.base_url = "https://wx2.qq.com/cgi-bin/mmwebwx-bin".to_string();
        self.sync_check_base_url = "https://webpush.wx2.qq.com/cgi-bin/mmwebwx-bin".to_string();
    }
}
