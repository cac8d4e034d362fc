//! Bot门面
//!
//! 公开API的唯一入口: 登录/登出、消息发送、联系人操作。
//! 内部状态全部挂在Arc上,克隆句柄共享同一会话。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::BotConfig;
use crate::models::message::{MSG_IMAGE, MSG_VIDEO};
use crate::models::{
    AttrMap, BotError, Contact, ContactDirectory, EventHandler, Message, Session, SessionState,
};
use crate::services::registry::BotRegistry;
use crate::services::signin;
use crate::services::sync_engine::SyncEngine;
use crate::services::transport::{ReqwestTransport, WebTransport};
use crate::services::wechat_api::{WechatApi, SEND_IMAGE_URL_PATH, SEND_VIDEO_URL_PATH};

struct BotInner {
    config: BotConfig,
    session: RwLock<Session>,
    api: WechatApi,
    handler: Arc<dyn EventHandler>,
    contacts: ContactDirectory,
    registry: Arc<BotRegistry>,
    attrs: AttrMap,
    cancel: CancellationToken,
    self_contact: RwLock<Option<Contact>>,
    start_time: RwLock<Option<DateTime<Utc>>>,
    stop_time: RwLock<Option<DateTime<Utc>>>,
    sign_out_fired: AtomicBool,
}

/// 单个帐号的协议客户端
///
/// 句柄可随意克隆与跨任务传递,所有克隆共享同一会话。
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    /// 使用默认配置与全局注册表创建实例
    pub fn new(handler: Arc<dyn EventHandler>) -> Result<Bot, BotError> {
        let config = BotConfig::from_env();
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_parts(
            handler,
            transport,
            BotRegistry::global(),
            config,
        ))
    }

    /// 注入传输层/注册表/配置 (测试与多帐号隔离场景)
    pub fn with_parts(
        handler: Arc<dyn EventHandler>,
        transport: Arc<dyn WebTransport>,
        registry: Arc<BotRegistry>,
        config: BotConfig,
    ) -> Bot {
        Bot {
            inner: Arc::new(BotInner {
                config,
                session: RwLock::new(Session::default()),
                api: WechatApi::new(transport),
                handler,
                contacts: ContactDirectory::new(),
                registry,
                attrs: AttrMap::new(),
                cancel: CancellationToken::new(),
                self_contact: RwLock::new(None),
                start_time: RwLock::new(None),
                stop_time: RwLock::new(None),
                sign_out_fired: AtomicBool::new(false),
            }),
        }
    }

    /// 执行登录流水线,成功后启动同步引擎
    ///
    /// 无论成功失败,登录回调恰好触发一次。
    pub async fn start(&self) -> Result<(), BotError> {
        {
            let state = self.state();
            if state == SessionState::Running {
                return Err(BotError::InvalidState);
            }
            // 终态实例重新登录时重置会话
            if state.is_terminal() {
                *self.inner.session.write() = Session::default();
                self.inner.sign_out_fired.store(false, Ordering::SeqCst);
            }
        }
        match signin::run_pipeline(self).await {
            Ok(()) => {
                let uin = {
                    let mut session = self.inner.session.write();
                    session.state = SessionState::Running;
                    session.uin
                };
                *self.inner.start_time.write() = Some(Utc::now());
                self.inner.registry.register(uin, self.clone());
                tracing::info!(uin, "signed in");
                self.inner.handler.on_sign_in(None);
                SyncEngine::spawn(self.clone());
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-in failed");
                self.inner.handler.on_sign_in(Some(&e));
                Err(e)
            }
        }
    }

    /// 主动下线: 通知服务器(尽力而为)、停止同步循环、从注册表摘除
    pub async fn stop(&self) {
        let snapshot = self.session_snapshot();
        self.mark_stopped();
        self.inner.cancel.cancel();
        if let Err(e) = self.inner.api.sign_out(&snapshot).await {
            tracing::debug!(error = %e, "server-side sign out failed");
        }
        self.inner.registry.unregister(snapshot.uin);
        tracing::info!(uin = snapshot.uin, "stopped");
    }

    // ---- 消息发送 ----

    /// 发送文本消息
    pub async fn send_text(&self, to_user_name: &str, text: &str) -> Result<(), BotError> {
        let session = self.sendable_session(to_user_name)?;
        let resp = self.inner.api.send_text(&session, to_user_name, text).await?;
        ensure_ok(&resp)
    }

    /// 上传并发送图片
    pub async fn send_image(
        &self,
        to_user_name: &str,
        data: Vec<u8>,
        filename: &str,
    ) -> Result<(), BotError> {
        let session = self.sendable_session(to_user_name)?;
        let media_id = self
            .inner
            .api
            .upload_media(&session, to_user_name, data, filename)
            .await?;
        let resp = self
            .inner
            .api
            .send_media(&session, to_user_name, &media_id, MSG_IMAGE, SEND_IMAGE_URL_PATH)
            .await?;
        ensure_ok(&resp)
    }

    /// 上传并发送视频
    pub async fn send_video(
        &self,
        to_user_name: &str,
        data: Vec<u8>,
        filename: &str,
    ) -> Result<(), BotError> {
        let session = self.sendable_session(to_user_name)?;
        let media_id = self
            .inner
            .api
            .upload_media(&session, to_user_name, data, filename)
            .await?;
        let resp = self
            .inner
            .api
            .send_media(&session, to_user_name, &media_id, MSG_VIDEO, SEND_VIDEO_URL_PATH)
            .await?;
        ensure_ok(&resp)
    }

    /// 用已有MediaId转发图片,不再重复上传
    pub async fn forward_image(&self, to_user_name: &str, media_id: &str) -> Result<(), BotError> {
        if media_id.is_empty() {
            return Err(BotError::InvalidArgs("media_id为空"));
        }
        let session = self.sendable_session(to_user_name)?;
        let resp = self
            .inner
            .api
            .send_media(&session, to_user_name, media_id, MSG_IMAGE, SEND_IMAGE_URL_PATH)
            .await?;
        ensure_ok(&resp)
    }

    /// 用已有MediaId转发视频
    pub async fn forward_video(&self, to_user_name: &str, media_id: &str) -> Result<(), BotError> {
        if media_id.is_empty() {
            return Err(BotError::InvalidArgs("media_id为空"));
        }
        let session = self.sendable_session(to_user_name)?;
        let resp = self
            .inner
            .api
            .send_media(&session, to_user_name, media_id, MSG_VIDEO, SEND_VIDEO_URL_PATH)
            .await?;
        ensure_ok(&resp)
    }

    /// 快捷回复: 群消息回给群并@发言者语义由调用方处理,
    /// 这里只把文本发回消息来源
    pub async fn reply_text(&self, message: &Message, text: &str) -> Result<(), BotError> {
        self.send_text(&message.from_user_name, text).await
    }

    // ---- 联系人操作 ----

    /// 接受好友请求 (webwxverifyuser Opcode 3)
    pub async fn verify(&self, to_user_name: &str, ticket: &str) -> Result<(), BotError> {
        if to_user_name.is_empty() || ticket.is_empty() {
            return Err(BotError::InvalidArgs("user_name或ticket为空"));
        }
        self.ensure_running()?;
        let session = self.session_snapshot();
        let resp = self
            .inner
            .api
            .verify_user(&session, to_user_name, ticket)
            .await?;
        ensure_ok(&resp)
    }

    /// 接受好友请求并取回对方档案,写入通讯录
    pub async fn accept(&self, to_user_name: &str, ticket: &str) -> Result<Contact, BotError> {
        self.verify(to_user_name, ticket).await?;
        let contact = self.contact_from_server(to_user_name).await?;
        self.inner.contacts.add(contact.clone());
        Ok(contact)
    }

    /// 设置备注名
    pub async fn remark(&self, to_user_name: &str, remark: &str) -> Result<(), BotError> {
        if to_user_name.is_empty() {
            return Err(BotError::InvalidArgs("user_name为空"));
        }
        self.ensure_running()?;
        let session = self.session_snapshot();
        let resp = self.inner.api.remark(&session, to_user_name, remark).await?;
        // webwxoplog的返回码在顶层Ret而非BaseResponse
        let ret = resp.get("Ret").and_then(Value::as_i64).unwrap_or(-1);
        if ret != 0 {
            return Err(BotError::ResponseInvalid(format!("oplog返回码 {}", ret)));
        }
        if let Some(mut contact) = self.inner.contacts.get(to_user_name) {
            contact.remark_name = remark.to_string();
            self.inner.contacts.add(contact);
        }
        Ok(())
    }

    /// 从服务器拉取单个联系人档案
    pub async fn contact_from_server(&self, user_name: &str) -> Result<Contact, BotError> {
        let mut list = self.contacts_from_server(&[user_name]).await?;
        list.pop()
            .ok_or_else(|| BotError::ContactNotFound(user_name.to_string()))
    }

    /// 从服务器批量拉取联系人档案 (群成员昵称等惰性字段)
    pub async fn contacts_from_server(
        &self,
        user_names: &[&str],
    ) -> Result<Vec<Contact>, BotError> {
        if user_names.is_empty() {
            return Err(BotError::InvalidArgs("user_names为空"));
        }
        self.ensure_running()?;
        let session = self.session_snapshot();
        let resp = self.inner.api.batch_contacts(&session, user_names).await?;
        ensure_ok(&resp)?;
        let contacts = resp
            .get("ContactList")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Contact::from_json).collect())
            .unwrap_or_default();
        Ok(contacts)
    }

    // ---- 状态访问 ----

    pub fn uin(&self) -> i64 {
        self.inner.session.read().uin
    }

    pub fn uuid(&self) -> String {
        self.inner.session.read().uuid.clone()
    }

    pub fn user_name(&self) -> String {
        self.inner.session.read().user_name.clone()
    }

    pub fn state(&self) -> SessionState {
        self.inner.session.read().state
    }

    /// 自身档案 (init阶段之后可用)
    pub fn self_contact(&self) -> Option<Contact> {
        self.inner.self_contact.read().clone()
    }

    /// 调用方自由读写的附属数据
    pub fn attrs(&self) -> &AttrMap {
        &self.inner.attrs
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        *self.inner.start_time.read()
    }

    pub fn stop_time(&self) -> Option<DateTime<Utc>> {
        *self.inner.stop_time.read()
    }

    /// 通讯录
    pub fn contacts(&self) -> &ContactDirectory {
        &self.inner.contacts
    }

    // ---- crate内部协作 ----

    pub(crate) fn session(&self) -> &RwLock<Session> {
        &self.inner.session
    }

    /// 请求构造用的会话快照,避免跨await持锁
    pub(crate) fn session_snapshot(&self) -> Session {
        self.inner.session.read().clone()
    }

    pub(crate) fn api(&self) -> &WechatApi {
        &self.inner.api
    }

    pub(crate) fn handler(&self) -> &Arc<dyn EventHandler> {
        &self.inner.handler
    }

    pub(crate) fn config(&self) -> &BotConfig {
        &self.inner.config
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    pub(crate) fn set_self_contact(&self, contact: Contact) {
        *self.inner.self_contact.write() = Some(contact);
    }

    /// 会话进入Stopped终态并记录下线时间
    pub(crate) fn mark_stopped(&self) {
        self.inner.session.write().state = SessionState::Stopped;
        *self.inner.stop_time.write() = Some(Utc::now());
    }

    /// 触发下线回调,整个会话最多一次
    pub(crate) fn fire_sign_out(&self) {
        if !self.inner.sign_out_fired.swap(true, Ordering::SeqCst) {
            self.inner.registry.unregister(self.uin());
            self.inner.handler.on_sign_out();
        }
    }

    fn ensure_running(&self) -> Result<(), BotError> {
        if self.state() != SessionState::Running {
            return Err(BotError::InvalidState);
        }
        Ok(())
    }

    /// 发送前的统一校验: 参数 -> 状态 -> 收件人存在性
    fn sendable_session(&self, to_user_name: &str) -> Result<Session, BotError> {
        if to_user_name.is_empty() {
            return Err(BotError::InvalidArgs("to_user_name为空"));
        }
        self.ensure_running()?;
        if self.inner.contacts.get(to_user_name).is_none()
            && self.user_name() != to_user_name
        {
            return Err(BotError::ContactNotFound(to_user_name.to_string()));
        }
        Ok(self.session_snapshot())
    }
}

/// 校验JSON响应的BaseResponse.Ret
fn ensure_ok(resp: &Value) -> Result<(), BotError> {
    let ret = resp
        .get("BaseResponse")
        .and_then(|b| b.get("Ret"))
        .and_then(Value::as_i64)
        .unwrap_or(-1);
    if ret != 0 {
        return Err(BotError::ResponseInvalid(format!(
            "BaseResponse.Ret {}",
            ret
        )));
    }
    Ok(())
}
