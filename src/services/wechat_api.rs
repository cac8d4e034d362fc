use std::sync::Arc;

use serde_json::{json, Value};

use crate::models::{BotError, Session};
use crate::services::transport::{UploadFile, WebTransport};
use crate::utils::time_utils;

/// 二维码签发接口的固定应用标识
const APP_ID: &str = "wx782c26e4c19acffb";
const NEW_LOGIN_PAGE: &str = "https://wx.qq.com/cgi-bin/mmwebwx-bin/webwxnewloginpage";

pub(crate) const SEND_IMAGE_URL_PATH: &str = "/webwxsendmsgimg";
pub(crate) const SEND_VIDEO_URL_PATH: &str = "/webwxsendvideomsg";

/// 协议API客户端
///
/// 每个方法对应一个协议端点,负责拼装query/body并透过传输层发出。
/// JS片段类端点返回原始文本 (由调用方做模式提取),
/// JSON端点返回解析后的Value。
pub struct WechatApi {
    transport: Arc<dyn WebTransport>,
}

impl WechatApi {
    pub fn new(transport: Arc<dyn WebTransport>) -> Self {
        Self { transport }
    }

    /// 签发登录票据 (GET jslogin) -> JS片段
    pub async fn js_login(&self, s: &Session) -> Result<String, BotError> {
        let url = build_url(
            &s.login_url,
            &[
                ("appid", APP_ID.to_string()),
                ("fun", "new".to_string()),
                ("lang", "zh_CN".to_string()),
                ("_", time_utils::timestamp_string_13()),
                ("redirect_uri", NEW_LOGIN_PAGE.to_string()),
            ],
        )?;
        self.transport.get_text(&url, &s.referer).await
    }

    /// 轮询扫码状态 (GET login) -> JS片段
    pub async fn poll_scan(&self, s: &Session) -> Result<String, BotError> {
        let url = build_url(
            &s.scan_url,
            &[
                ("loginicon", "true".to_string()),
                ("r", time_utils::timestamp_string_10()),
                ("tip", "0".to_string()),
                ("uuid", s.uuid.clone()),
                ("_", time_utils::timestamp_string_13()),
            ],
        )?;
        self.transport.get_text(&url, &s.referer).await
    }

    /// 解析跳转地址 (GET redirect_url) -> XML信封
    ///
    /// 服务器下发的地址可能缺少fun/version参数,此请求必须带上。
    pub async fn resolve_redirect(&self, s: &Session) -> Result<String, BotError> {
        let url = build_url(
            &s.redirect_url,
            &[("fun", "new".to_string()), ("version", "v2".to_string())],
        )?;
        self.transport.get_text(&url, &s.referer).await
    }

    /// 会话初始化 (POST webwxinit) -> JSON
    pub async fn init(&self, s: &Session) -> Result<Value, BotError> {
        let url = build_url(
            &format!("{}/webwxinit", s.base_url),
            &[
                ("pass_ticket", s.pass_ticket.clone()),
                ("r", time_utils::timestamp_string_10()),
            ],
        )?;
        let body = json!({ "BaseRequest": s.base_request });
        let text = self.transport.post_json(&url, &s.referer, &body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 上线通知 (POST webwxstatusnotify),响应体不做检查
    pub async fn status_notify(&self, s: &Session) -> Result<(), BotError> {
        let url = build_url(
            &format!("{}/webwxstatusnotify", s.base_url),
            &[("pass_ticket", s.pass_ticket.clone())],
        )?;
        let body = json!({
            "BaseRequest": s.base_request,
            "ClientMsgId": time_utils::timestamp_string_13(),
            "Code": 3,
            "FromUserName": s.user_name,
            "ToUserName": s.user_name,
        });
        self.transport.post_json(&url, &s.referer, &body).await?;
        Ok(())
    }

    /// 拉取全量联系人 (GET webwxgetcontact) -> JSON
    pub async fn fetch_contacts(&self, s: &Session) -> Result<Value, BotError> {
        let url = build_url(
            &format!("{}/webwxgetcontact", s.base_url),
            &[
                ("pass_ticket", s.pass_ticket.clone()),
                ("r", time_utils::timestamp_string_13()),
                ("seq", "0".to_string()),
                ("skey", s.skey.clone()),
            ],
        )?;
        let text = self.transport.get_text(&url, &s.referer).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 长轮询检查 (GET synccheck) -> JS片段
    ///
    /// 服务器会保持 (阻塞) 连接约25秒,直到超时或有变更。
    pub async fn sync_check(&self, s: &Session) -> Result<String, BotError> {
        let url = build_url(
            &format!("{}/synccheck", s.sync_check_base_url),
            &[
                ("deviceid", s.base_request.device_id.clone()),
                ("r", time_utils::timestamp_string_13()),
                ("sid", s.sid.clone()),
                ("skey", s.skey.clone()),
                ("synckey", s.sync_key.expand()),
                ("uin", s.uin.to_string()),
                ("_", time_utils::timestamp_string_13()),
            ],
        )?;
        self.transport.get_text(&url, &s.referer).await
    }

    /// 拉取变更 (POST webwxsync) -> JSON
    pub async fn web_sync(&self, s: &Session) -> Result<Value, BotError> {
        let url = build_url(
            &format!("{}/webwxsync", s.base_url),
            &[
                ("pass_ticket", s.pass_ticket.clone()),
                ("sid", s.sid.clone()),
                ("skey", s.skey.clone()),
            ],
        )?;
        let body = json!({
            "BaseRequest": s.base_request,
            "rr": time_utils::complement_unix_seconds().to_string(),
            "SyncKey": s.sync_key,
        });
        let text = self.transport.post_json(&url, &s.referer, &body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 通过好友验证 (POST webwxverifyuser) -> JSON
    pub async fn verify_user(
        &self,
        s: &Session,
        to_user_name: &str,
        ticket: &str,
    ) -> Result<Value, BotError> {
        let url = build_url(
            &format!("{}/webwxverifyuser", s.base_url),
            &[
                ("r", time_utils::timestamp_string_13()),
                ("pass_ticket", s.pass_ticket.clone()),
            ],
        )?;
        let body = json!({
            "BaseRequest": s.base_request,
            "skey": s.skey,
            "Opcode": 3,
            "SceneListCount": 1,
            "SceneList": [33],
            "VerifyContent": "",
            "VerifyUserListSize": 1,
            "VerifyUserList": [{
                "Value": to_user_name,
                "VerifyUserTicket": ticket,
            }],
        });
        let text = self.transport.post_json(&url, &s.referer, &body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 设置备注名 (POST webwxoplog) -> JSON
    pub async fn remark(
        &self,
        s: &Session,
        to_user_name: &str,
        remark: &str,
    ) -> Result<Value, BotError> {
        let url = build_url(
            &format!("{}/webwxoplog", s.base_url),
            &[("pass_ticket", s.pass_ticket.clone())],
        )?;
        let body = json!({
            "BaseRequest": s.base_request,
            "UserName": to_user_name,
            "CmdId": 2,
            "RemarkName": remark,
        });
        let text = self.transport.post_json(&url, &s.referer, &body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 批量拉取联系人 (POST webwxbatchgetcontact) -> JSON
    pub async fn batch_contacts(
        &self,
        s: &Session,
        to_user_names: &[&str],
    ) -> Result<Value, BotError> {
        let url = build_url(
            &format!("{}/webwxbatchgetcontact", s.base_url),
            &[
                ("type", "ex".to_string()),
                ("r", time_utils::timestamp_string_13()),
            ],
        )?;
        let list: Vec<Value> = to_user_names
            .iter()
            .map(|name| json!({"UserName": name, "EncryChatRoomId": ""}))
            .collect();
        let body = json!({
            "BaseRequest": s.base_request,
            "Count": to_user_names.len(),
            "List": list,
        });
        let text = self.transport.post_json(&url, &s.referer, &body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 发送文本消息 (POST webwxsendmsg) -> JSON
    pub async fn send_text(
        &self,
        s: &Session,
        to_user_name: &str,
        text: &str,
    ) -> Result<Value, BotError> {
        let url = build_url(
            &format!("{}/webwxsendmsg", s.base_url),
            &[("pass_ticket", s.pass_ticket.clone())],
        )?;
        let local_id = time_utils::client_msg_id();
        let body = json!({
            "BaseRequest": s.base_request,
            "Scene": 0,
            "Msg": {
                "Type": crate::models::message::MSG_TEXT,
                "Content": text,
                "FromUserName": s.user_name,
                "ToUserName": to_user_name,
                "LocalID": local_id,
                "ClientMsgId": local_id,
            },
        });
        let resp = self.transport.post_json(&url, &s.referer, &body).await?;
        Ok(serde_json::from_str(&resp)?)
    }

    /// 发送媒体消息 (POST webwxsendmsgimg/webwxsendvideomsg) -> JSON
    pub async fn send_media(
        &self,
        s: &Session,
        to_user_name: &str,
        media_id: &str,
        msg_type: i64,
        send_url_path: &str,
    ) -> Result<Value, BotError> {
        let url = build_url(
            &format!("{}{}", s.base_url, send_url_path),
            &[
                ("fun", "async".to_string()),
                ("f", "json".to_string()),
                ("pass_ticket", s.pass_ticket.clone()),
            ],
        )?;
        let local_id = time_utils::client_msg_id();
        let body = json!({
            "BaseRequest": s.base_request,
            "Scene": 0,
            "Msg": {
                "Type": msg_type,
                "MediaId": media_id,
                "FromUserName": s.user_name,
                "ToUserName": to_user_name,
                "LocalID": local_id,
                "ClientMsgId": local_id,
                "Content": "",
            },
        });
        let resp = self.transport.post_json(&url, &s.referer, &body).await?;
        Ok(serde_json::from_str(&resp)?)
    }

    /// 上传媒体 (POST webwxuploadmedia),返回MediaId
    ///
    /// 单次multipart上传,分块上传是边界外协作者的职责。
    pub async fn upload_media(
        &self,
        s: &Session,
        to_user_name: &str,
        data: Vec<u8>,
        filename: &str,
    ) -> Result<String, BotError> {
        let upload_base = upload_host(&s.base_url);
        let url = build_url(
            &format!("{}/webwxuploadmedia", upload_base),
            &[("f", "json".to_string())],
        )?;

        let mime_type = mime_by_extension(filename);
        let media_type = match mime_type.split('/').next().unwrap_or("") {
            "image" => "pic",
            "video" => "video",
            _ => "doc",
        };

        let total_len = data.len();
        let client_media_id = time_utils::client_msg_id();
        let request_payload = json!({
            "BaseRequest": s.base_request,
            "UploadType": 2,
            "ClientMediaId": client_media_id,
            "TotalLen": total_len,
            "DataLen": total_len,
            "StartPos": 0,
            "MediaType": 4,
            "FromUserName": s.user_name,
            "ToUserName": to_user_name,
        });

        let fields = vec![
            ("id".to_string(), "WU_FILE_0".to_string()),
            ("name".to_string(), filename.to_string()),
            ("type".to_string(), mime_type.to_string()),
            ("size".to_string(), total_len.to_string()),
            ("mediatype".to_string(), media_type.to_string()),
            ("uploadmediarequest".to_string(), request_payload.to_string()),
            ("pass_ticket".to_string(), s.pass_ticket.clone()),
        ];
        let file = UploadFile {
            file_name: filename.to_string(),
            mime_type: mime_type.to_string(),
            data,
        };
        let resp = self
            .transport
            .post_multipart(&url, &s.referer, fields, file)
            .await?;
        let v: Value = serde_json::from_str(&resp)?;
        let media_id = v
            .get("MediaId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if media_id.is_empty() {
            return Err(BotError::ResponseInvalid("MediaId缺失".to_string()));
        }
        Ok(media_id)
    }

    /// 服务器侧登出 (POST webwxlogout),尽力而为
    pub async fn sign_out(&self, s: &Session) -> Result<(), BotError> {
        let url = build_url(
            &format!("{}/webwxlogout", s.base_url),
            &[
                ("redirect", "1".to_string()),
                ("type", "1".to_string()),
                ("skey", s.skey.clone()),
            ],
        )?;
        let form = [("sid", s.sid.clone()), ("uin", s.uin.to_string())];
        self.transport.post_form(&url, &s.referer, &form).await?;
        Ok(())
    }
}

/// 拼装带query的URL
///
/// 保留原有query,给定参数覆盖同名项 (redirect地址必须强制fun/version)。
fn build_url(base: &str, params: &[(&str, String)]) -> Result<String, BotError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| BotError::RequestFailed(format!("无效的URL {}: {}", base, e)))?;
    let existing: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !params.iter().any(|(pk, _)| pk == key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &existing {
            pairs.append_pair(key, value);
        }
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url.to_string())
}

/// 上传走 file. 前缀的主机
fn upload_host(base_url: &str) -> String {
    match base_url.split_once("://") {
        Some((scheme, rest)) => format!("{}://file.{}", scheme, rest),
        None => base_url.to_string(),
    }
}

fn mime_by_extension(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}
