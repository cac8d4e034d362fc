//! 群消息发言者前缀的拆分规则

use wxbot::models::message::split_group_speaker;

// 33字节的群成员标识
fn member_id(fill: char) -> String {
    format!("@{}", fill.to_string().repeat(32))
}

#[test]
fn test_plain_group_message_with_br() {
    let content = format!("{}:<br/>早上好", member_id('a'));
    let (speaker, text) = split_group_speaker(&content).unwrap();
    assert_eq!(speaker, member_id('a'));
    assert_eq!(text, "早上好");
}

#[test]
fn test_group_message_without_br() {
    let content = format!("{}:hello", member_id('a'));
    let (speaker, text) = split_group_speaker(&content).unwrap();
    assert_eq!(speaker, member_id('a'));
    assert_eq!(text, "hello");
}

#[test]
fn test_empty_body_after_colon() {
    let content = format!("{}:<br/>", member_id('a'));
    let (speaker, text) = split_group_speaker(&content).unwrap();
    assert_eq!(speaker, member_id('a'));
    assert_eq!(text, "");
}

#[test]
fn test_mention_variant_colon_at_65() {
    // 被@转发的变体: 前缀65字节,发言者仍取前33字节
    let content = format!("{}{}:<br/>ping", member_id('a'), "b".repeat(32));
    let (speaker, text) = split_group_speaker(&content).unwrap();
    assert_eq!(speaker, member_id('a'));
    assert_eq!(text, "ping");
}

#[test]
fn test_system_notice_is_not_split() {
    // 入群通知等系统文本没有定长前缀,原样保留
    assert!(split_group_speaker("你邀请了新成员加入群聊").is_none());
    assert!(split_group_speaker("\"张三\"加入了群聊").is_none());
}

#[test]
fn test_short_content_is_not_split() {
    assert!(split_group_speaker("short:text").is_none());
    assert!(split_group_speaker(":").is_none());
    assert!(split_group_speaker("").is_none());
}

#[test]
fn test_colon_in_wrong_position_is_not_split() {
    // 冒号既不在33也不在65字节处
    let content = format!("{}x:hello", member_id('a'));
    assert!(split_group_speaker(&content).is_none());
}

#[test]
fn test_multibyte_char_straddling_boundary() {
    // 第65字节是冒号,但第33字节落在多字节字符中间,不拆分
    let content = format!("{}宽{}:tail", "a".repeat(32), "x".repeat(30));
    assert_eq!(content.as_bytes()[65], b':');
    assert!(!content.is_char_boundary(33));
    assert!(split_group_speaker(&content).is_none());
}
