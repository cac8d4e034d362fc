use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::bot::Bot;
use crate::models::BotError;
use crate::services::signin::SignInStage;

// 响应是可执行的JS片段而非JSON:
// window.QRLogin.code = 200; window.QRLogin.uuid = "wbVC3cUBrQ==";
static UUID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"uuid\s*=\s*"(.*)""#).unwrap());

/// QR阶段: 签发登录票据,提取uuid并上报二维码链接
pub(crate) struct QrStage;

#[async_trait]
impl SignInStage for QrStage {
    fn name(&self) -> &'static str {
        "qr"
    }

    async fn run(&self, bot: &Bot) -> Result<(), BotError> {
        let snapshot = bot.session_snapshot();
        let body = bot.api().js_login(&snapshot).await?;
        let uuid = extract_uuid(&body)
            .ok_or_else(|| BotError::ResponseInvalid("jslogin响应缺少uuid".to_string()))?;

        let qr_code_url = {
            let mut session = bot.session().write();
            session.uuid = uuid.clone();
            session.qr_code_url = format!("{}/{}", session.qr_url, uuid);
            session.qr_code_url.clone()
        };

        tracing::info!(uuid = %uuid, "QR ticket issued");
        bot.handler().on_qr_code(&qr_code_url);
        Ok(())
    }
}

fn extract_uuid(body: &str) -> Option<String> {
    let uuid = UUID_RE.captures(body)?.get(1)?.as_str().to_string();
    if uuid.is_empty() {
        None
    } else {
        Some(uuid)
    }
}
