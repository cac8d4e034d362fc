//! 同步引擎: 探测/拉取交替、重试与致命下线

mod helpers;

use serde_json::json;
use wxbot::SessionState;

use helpers::{script_sign_in, scripted_bot, wait_until, RecordingHandler, ScriptedTransport};

fn sync_payload(text: &str, key_val: i64) -> String {
    json!({
        "BaseResponse": {"Ret": 0},
        "SyncCheckKey": {
            "Count": 2,
            "List": [{"Key": 1, "Val": key_val}, {"Key": 2, "Val": 661706078}]
        },
        "AddMsgList": [{
            "NewMsgId": 7411987i64 + key_val,
            "MsgType": 1,
            "Content": text,
            "FromUserName": "@friend1",
            "ToUserName": "@self",
            "CreateTime": 1546300800
        }]
    })
    .to_string()
}

const SELECTOR_2: &str = r#"window.synccheck={retcode:"0",selector:"2"}"#;
const RETCODE_FATAL: &str = r#"window.synccheck={retcode:"1101",selector:"0"}"#;

#[tokio::test]
async fn test_check_fetch_dispatch_cycle() {
    let transport = ScriptedTransport::new();
    script_sign_in(&transport);
    transport.script("synccheck", SELECTOR_2);
    transport.script("webwxsync", &sync_payload("你好", 661706100));
    transport.script("synccheck", RETCODE_FATAL);

    let handler = RecordingHandler::new();
    let (bot, _registry) = scripted_bot(transport.clone(), handler.clone());
    bot.start().await.expect("sign-in should succeed");

    wait_until("下线回调触发", || handler.sign_out_count() == 1).await;

    let messages = handler.messages.lock().clone();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "你好");
    assert_eq!(messages[0].from_user_name, "@friend1");

    // 拉取后游标整体替换,下一轮探测携带新游标
    let requests = transport.requests.lock().clone();
    let last_check = requests
        .iter()
        .filter(|u| u.contains("synccheck"))
        .next_back()
        .unwrap();
    assert!(last_check.contains("synckey=1_661706100%7C2_661706078"));

    assert_eq!(bot.state(), SessionState::Stopped);
}

#[tokio::test]
async fn test_fatal_retcode_fires_sign_out_once() {
    let transport = ScriptedTransport::new();
    script_sign_in(&transport);
    transport.script("synccheck", RETCODE_FATAL);

    let handler = RecordingHandler::new();
    let (bot, registry) = scripted_bot(transport, handler.clone());
    bot.start().await.expect("sign-in should succeed");

    wait_until("下线回调触发", || handler.sign_out_count() == 1).await;
    // 引擎退出后不会再有第二次回调
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(handler.sign_out_count(), 1);
    assert_eq!(bot.state(), SessionState::Stopped);
    assert_eq!(registry.count(), 0);
}

#[tokio::test]
async fn test_at_most_one_fetch_in_flight() {
    let transport = ScriptedTransport::new();
    script_sign_in(&transport);
    for i in 0..5 {
        transport.script("synccheck", SELECTOR_2);
        transport.script("webwxsync", &sync_payload("msg", 661706100 + i));
    }
    transport.script("synccheck", RETCODE_FATAL);

    let handler = RecordingHandler::new();
    let (bot, _registry) = scripted_bot(transport.clone(), handler.clone());
    bot.start().await.expect("sign-in should succeed");

    wait_until("下线回调触发", || handler.sign_out_count() == 1).await;

    assert_eq!(handler.messages.lock().len(), 5);
    // 单任务状态机: 任意时刻最多一个拉取在途
    assert_eq!(transport.max_sync_in_flight(), 1);
}

#[tokio::test]
async fn test_fetch_error_retries_without_losing_round() {
    let transport = ScriptedTransport::new();
    script_sign_in(&transport);
    transport.script("synccheck", SELECTOR_2);
    // 首次拉取断网,重试后成功;本轮增量不得丢失
    transport.script_err("webwxsync");
    transport.script("webwxsync", &sync_payload("补发", 661706100));
    transport.script("synccheck", RETCODE_FATAL);

    let handler = RecordingHandler::new();
    let (bot, _registry) = scripted_bot(transport, handler.clone());
    bot.start().await.expect("sign-in should succeed");

    wait_until("下线回调触发", || handler.sign_out_count() == 1).await;

    let messages = handler.messages.lock().clone();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "补发");
}

#[tokio::test]
async fn test_unparsable_check_response_is_retried() {
    let transport = ScriptedTransport::new();
    script_sign_in(&transport);
    transport.script("synccheck", "<html>502 Bad Gateway</html>");
    transport.script("synccheck", RETCODE_FATAL);

    let handler = RecordingHandler::new();
    let (bot, _registry) = scripted_bot(transport, handler.clone());
    bot.start().await.expect("sign-in should succeed");

    wait_until("下线回调触发", || handler.sign_out_count() == 1).await;
    assert!(handler.messages.lock().is_empty());
    assert_eq!(bot.state(), SessionState::Stopped);
}
