use async_trait::async_trait;
use serde_json::Value;

use crate::config::BotConfig;
use crate::models::BotError;

/// 上传文件描述 (单次multipart,不做分块)
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// 上传文件名 (非路径,服务器据此检测类型,如 1.png)
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// HTTP传输层
///
/// 登录流水线与同步引擎对网络的唯一出口。
/// 生产实现基于reqwest (cookie自动管理);
/// 测试用脚本化实现回放预置响应,无需真实网络。
#[async_trait]
pub trait WebTransport: Send + Sync {
    /// GET请求,返回响应体文本;非200状态码映射为RequestFailed
    async fn get_text(&self, url: &str, referer: &str) -> Result<String, BotError>;

    /// POST JSON请求,返回响应体文本
    async fn post_json(&self, url: &str, referer: &str, body: &Value) -> Result<String, BotError>;

    /// POST表单请求 (application/x-www-form-urlencoded)
    async fn post_form(
        &self,
        url: &str,
        referer: &str,
        form: &[(&str, String)],
    ) -> Result<String, BotError>;

    /// POST multipart请求 (媒体上传)
    async fn post_multipart(
        &self,
        url: &str,
        referer: &str,
        fields: Vec<(String, String)>,
        file: UploadFile,
    ) -> Result<String, BotError>;
}

/// 基于reqwest的生产传输层
///
/// - cookie store: 跨流水线阶段保持会话cookie
/// - 超时: 必须盖过服务器约25秒的长轮询保持
/// - User-Agent: 伪装浏览器,服务器会校验
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &BotConfig) -> Result<Self, BotError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| BotError::RequestFailed(e.to_string()))?;
        Ok(Self { client })
    }

    async fn read_ok(&self, resp: reqwest::Response) -> Result<String, BotError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(BotError::RequestFailed(format!(
                "HTTP状态码 {}",
                status.as_u16()
            )));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl WebTransport for ReqwestTransport {
    async fn get_text(&self, url: &str, referer: &str) -> Result<String, BotError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::REFERER, referer)
            .send()
            .await?;
        self.read_ok(resp).await
    }

    async fn post_json(&self, url: &str, referer: &str, body: &Value) -> Result<String, BotError> {
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::REFERER, referer)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/json; charset=UTF-8",
            )
            .body(body.to_string())
            .send()
            .await?;
        self.read_ok(resp).await
    }

    async fn post_form(
        &self,
        url: &str,
        referer: &str,
        form: &[(&str, String)],
    ) -> Result<String, BotError> {
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::REFERER, referer)
            .form(form)
            .send()
            .await?;
        self.read_ok(resp).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        referer: &str,
        fields: Vec<(String, String)>,
        file: UploadFile,
    ) -> Result<String, BotError> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }
        let part = reqwest::multipart::Part::bytes(file.data)
            .file_name(file.file_name)
            .mime_str(&file.mime_type)
            .map_err(|e| BotError::RequestFailed(e.to_string()))?;
        form = form.part("filename", part);

        let resp = self
            .client
            .post(url)
            .header(reqwest::header::REFERER, referer)
            .multipart(form)
            .send()
            .await?;
        self.read_ok(resp).await
    }
}
