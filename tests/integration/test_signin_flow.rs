//! 登录流水线端到端: 脚本化传输回放服务器响应

mod helpers;

use wxbot::{BotError, SessionState};

use helpers::{script_sign_in, scripted_bot, RecordingHandler, ScriptedTransport, TEST_UIN};

#[tokio::test]
async fn test_full_sign_in_reaches_running() {
    let transport = ScriptedTransport::new();
    script_sign_in(&transport);
    let handler = RecordingHandler::new();
    let (bot, registry) = scripted_bot(transport.clone(), handler.clone());

    bot.start().await.expect("sign-in should succeed");

    assert_eq!(bot.state(), SessionState::Running);
    assert_eq!(bot.uin(), TEST_UIN);
    assert_eq!(bot.user_name(), "@self");

    // 通讯录引导: 2个联系人整体替换
    assert_eq!(bot.contacts().count(), 2);
    assert_eq!(bot.contacts().get("@friend1").unwrap().nick_name, "张三");
    assert!(bot.contacts().get("@@room1").unwrap().is_group());

    // 自身档案在init阶段填充
    assert_eq!(bot.self_contact().unwrap().user_name, "@self");

    // 二维码回调携带可扫码链接
    let qr_urls = handler.qr_urls.lock().clone();
    assert_eq!(qr_urls.len(), 1);
    assert_eq!(qr_urls[0], "https://login.weixin.qq.com/qrcode/gbNqzfpEow==");

    // 登录回调恰好一次且无错误
    let sign_ins = handler.sign_ins.lock().clone();
    assert_eq!(sign_ins.len(), 1);
    assert!(sign_ins[0].is_none());

    // 注册表可按uin检索
    assert!(registry.by_uin(TEST_UIN).is_some());
    assert_eq!(registry.running().len(), 1);

    // 运行中重复登录是状态违例
    assert_eq!(bot.start().await.unwrap_err(), BotError::InvalidState);
    assert_eq!(handler.sign_ins.lock().len(), 1);
}

#[tokio::test]
async fn test_scan_window_elapsed_fails_with_timeout() {
    let transport = ScriptedTransport::new();
    transport.script(
        "jslogin",
        r#"window.QRLogin.code = 200; window.QRLogin.uuid = "gbNqzfpEow==";"#,
    );
    // 一直停留在"已扫码待确认",直到2百毫秒的测试窗口耗尽
    transport.stick(
        "login.weixin.qq.com/cgi-bin/mmwebwx-bin/login",
        "window.code=201;window.userAvatar = 'data:img/jpg;base64,x'",
    );
    let handler = RecordingHandler::new();
    let (bot, _registry) = scripted_bot(transport, handler.clone());

    let err = bot.start().await.unwrap_err();
    assert_eq!(err, BotError::ScanTimeout);
    assert_eq!(bot.state(), SessionState::ScanTimeout);

    let sign_ins = handler.sign_ins.lock().clone();
    assert_eq!(sign_ins.len(), 1);
    assert_eq!(sign_ins[0], Some(BotError::ScanTimeout));
}

#[tokio::test]
async fn test_server_side_timeout_code_408() {
    let transport = ScriptedTransport::new();
    transport.script(
        "jslogin",
        r#"window.QRLogin.code = 200; window.QRLogin.uuid = "gbNqzfpEow==";"#,
    );
    transport.stick(
        "login.weixin.qq.com/cgi-bin/mmwebwx-bin/login",
        "window.code=408;",
    );
    let handler = RecordingHandler::new();
    let (bot, _registry) = scripted_bot(transport, handler.clone());

    let err = bot.start().await.unwrap_err();
    assert_eq!(err, BotError::ScanTimeout);
    assert_eq!(bot.state(), SessionState::ScanTimeout);
}

#[tokio::test]
async fn test_missing_uuid_aborts_pipeline() {
    let transport = ScriptedTransport::new();
    transport.script("jslogin", "window.QRLogin.code = 400;");
    let handler = RecordingHandler::new();
    let (bot, _registry) = scripted_bot(transport, handler.clone());

    let err = bot.start().await.unwrap_err();
    assert!(matches!(err, BotError::ResponseInvalid(_)));

    // 失败同样恰好上报一次
    let sign_ins = handler.sign_ins.lock().clone();
    assert_eq!(sign_ins.len(), 1);
    assert!(sign_ins[0].is_some());
    // 后续阶段未被触达
    assert!(handler.qr_urls.lock().is_empty());
}

#[tokio::test]
async fn test_redirect_envelope_missing_credentials_aborts() {
    let transport = ScriptedTransport::new();
    transport.script(
        "jslogin",
        r#"window.QRLogin.code = 200; window.QRLogin.uuid = "gbNqzfpEow==";"#,
    );
    transport.script(
        "login.weixin.qq.com/cgi-bin/mmwebwx-bin/login",
        r#"window.code=200;window.redirect_uri="https://wx.qq.com/cgi-bin/mmwebwx-bin/webwxnewloginpage?ticket=AbC-123";"#,
    );
    // 缺少skey/wxsid的信封
    transport.script(
        "webwxnewloginpage",
        "<error><ret>1203</ret><message>当前登录环境异常</message></error>",
    );
    let handler = RecordingHandler::new();
    let (bot, _registry) = scripted_bot(transport, handler.clone());

    let err = bot.start().await.unwrap_err();
    assert!(matches!(err, BotError::ResponseInvalid(_)));
    assert_eq!(handler.sign_ins.lock().len(), 1);
}

#[tokio::test]
async fn test_secondary_cluster_selected_from_redirect_host() {
    // 扫码确认把会话分配到wx2集群
    let transport2 = ScriptedTransport::new();
    transport2.script(
        "jslogin",
        r#"window.QRLogin.code = 200; window.QRLogin.uuid = "gbNqzfpEow==";"#,
    );
    transport2.script(
        "login.weixin.qq.com/cgi-bin/mmwebwx-bin/login",
        r#"window.code=200;window.redirect_uri="https://wx2.qq.com/cgi-bin/mmwebwx-bin/webwxnewloginpage?ticket=AbC-123";"#,
    );
    transport2.script(
        "webwxnewloginpage",
        &format!(
            "<error><ret>0</ret><skey>@crypt_sk</skey><wxsid>SID123</wxsid>\
<wxuin>{}</wxuin><pass_ticket>PT</pass_ticket></error>",
            TEST_UIN
        ),
    );
    transport2.script("webwxinit", r#"{"BaseResponse":{"Ret":0},"User":{"UserName":"@self","NickName":"n"},"SyncKey":{"Count":1,"List":[{"Key":1,"Val":2}]}}"#);
    transport2.script("webwxstatusnotify", r#"{"BaseResponse":{"Ret":0}}"#);
    transport2.script("webwxgetcontact", r#"{"BaseResponse":{"Ret":0},"MemberList":[]}"#);

    let handler = RecordingHandler::new();
    let (bot, _registry) = scripted_bot(transport2.clone(), handler);

    bot.start().await.expect("sign-in should succeed");

    // 集群切换后,init及后续请求全部落在wx2主机
    let requests = transport2.requests.lock().clone();
    let init_url = requests.iter().find(|u| u.contains("webwxinit")).unwrap();
    assert!(init_url.starts_with("https://wx2.qq.com/"));
}

#[tokio::test]
async fn test_send_requires_running_session_and_known_contact() {
    let transport = ScriptedTransport::new();
    let handler = RecordingHandler::new();
    let (bot, _registry) = scripted_bot(transport.clone(), handler.clone());

    // 登录前发送直接被拒
    assert_eq!(
        bot.send_text("@friend1", "hi").await.unwrap_err(),
        BotError::InvalidState
    );

    script_sign_in(&transport);
    bot.start().await.expect("sign-in should succeed");

    // 空收件人与陌生收件人
    assert!(matches!(
        bot.send_text("", "hi").await.unwrap_err(),
        BotError::InvalidArgs(_)
    ));
    assert_eq!(
        bot.send_text("@stranger", "hi").await.unwrap_err(),
        BotError::ContactNotFound("@stranger".to_string())
    );

    // 正常发送
    transport.script("webwxsendmsg", r#"{"BaseResponse":{"Ret":0},"MsgID":"1"}"#);
    bot.send_text("@friend1", "你好").await.expect("send should succeed");

    // 服务器拒绝映射为错误
    transport.script("webwxsendmsg", r#"{"BaseResponse":{"Ret":1205}}"#);
    assert!(matches!(
        bot.send_text("@friend1", "again").await.unwrap_err(),
        BotError::ResponseInvalid(_)
    ));
}

#[tokio::test]
async fn test_remark_updates_local_directory() {
    let transport = ScriptedTransport::new();
    script_sign_in(&transport);
    transport.script("webwxoplog", r#"{"Ret":0}"#);
    let handler = RecordingHandler::new();
    let (bot, _registry) = scripted_bot(transport, handler);

    bot.start().await.expect("sign-in should succeed");
    bot.remark("@friend1", "老张").await.expect("remark should succeed");

    assert_eq!(bot.contacts().get("@friend1").unwrap().remark_name, "老张");
    // 备注后可按备注名检索
    assert_eq!(bot.contacts().find("老张").unwrap().user_name, "@friend1");
}

#[tokio::test]
async fn test_stop_unregisters_and_marks_stopped() {
    let transport = ScriptedTransport::new();
    script_sign_in(&transport);
    transport.stick("webwxlogout", "");
    let handler = RecordingHandler::new();
    let (bot, registry) = scripted_bot(transport, handler.clone());

    bot.start().await.expect("sign-in should succeed");
    assert_eq!(registry.count(), 1);

    bot.stop().await;
    assert_eq!(bot.state(), SessionState::Stopped);
    assert!(bot.stop_time().is_some());
    assert_eq!(registry.count(), 0);

    // 主动停止不触发服务器侧失效的下线回调
    assert_eq!(handler.sign_out_count(), 0);
}
