use async_trait::async_trait;
use serde::Deserialize;

use crate::bot::Bot;
use crate::models::{BaseRequest, BotError};
use crate::services::signin::SignInStage;
use crate::utils::time_utils;

/// 跳转地址返回的XML错误信封
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "error")]
struct RedirectEnvelope {
    #[serde(default)]
    ret: i32,

    #[serde(default)]
    message: String,

    #[serde(default)]
    isgrayscale: i32,

    #[serde(default)]
    pass_ticket: String,

    #[serde(default)]
    skey: String,

    #[serde(default)]
    wxsid: String,

    #[serde(default)]
    wxuin: i64,
}

/// Redirect阶段: 兑换会话凭证并选定主机集群
///
/// 四个字段 (pass_ticket/skey/wxsid/wxuin) 缺一不可。
/// 跳转地址的主机名可能是wx.qq.com或wx2.qq.com,
/// 可能与帐号注册时间有关;从下一阶段起所有请求必须
/// 使用同一套主机,否则服务器返回1100错误码。
pub(crate) struct RedirectStage;

#[async_trait]
impl SignInStage for RedirectStage {
    fn name(&self) -> &'static str {
        "redirect"
    }

    async fn run(&self, bot: &Bot) -> Result<(), BotError> {
        let snapshot = bot.session_snapshot();
        let body = bot.api().resolve_redirect(&snapshot).await?;
        let envelope: RedirectEnvelope = quick_xml::de::from_str(&body)
            .map_err(|e| BotError::ResponseInvalid(format!("XML信封解析失败: {}", e)))?;

        if envelope.pass_ticket.is_empty()
            || envelope.skey.is_empty()
            || envelope.wxsid.is_empty()
            || envelope.wxuin == 0
        {
            tracing::warn!(
                ret = envelope.ret,
                message = %envelope.message,
                isgrayscale = envelope.isgrayscale,
                "redirect envelope missing credentials"
            );
            return Err(BotError::ResponseInvalid(
                "redirect信封凭证字段不全".to_string(),
            ));
        }

        let redirect_host = reqwest::Url::parse(&snapshot.redirect_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        let mut session = bot.session().write();
        session.pass_ticket = envelope.pass_ticket;
        session.skey = envelope.skey.clone();
        session.sid = envelope.wxsid.clone();
        session.uin = envelope.wxuin;
        session.base_request = BaseRequest {
            device_id: time_utils::device_id(),
            sid: envelope.wxsid,
            skey: envelope.skey,
            uin: envelope.wxuin,
        };
        if !redirect_host.is_empty() {
            session.host = redirect_host.clone();
        }
        // 后续任何请求发出之前必须完成集群选择
        if redirect_host.contains("wx2") {
            session.switch_to_secondary_cluster();
            tracing::info!(host = %session.host, "switched to secondary cluster");
        }
        Ok(())
    }
}
