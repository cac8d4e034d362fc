use chrono::Utc;
use rand::Rng;

/// 13位毫秒时间戳字符串 (`_`/`r`/`ClientMsgId`等query参数用)
pub fn timestamp_string_13() -> String {
    truncate_left(Utc::now().timestamp_millis(), 13)
}

/// 10位秒级时间戳字符串
pub fn timestamp_string_10() -> String {
    truncate_left(Utc::now().timestamp_millis(), 10)
}

/// 合成设备标识: "e" + 15位随机数字
pub fn device_id() -> String {
    let mut rng = rand::thread_rng();
    let digits: String = (0..15).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect();
    format!("e{}", digits)
}

/// 发送消息用的本地标识: 毫秒时间戳左移4位再拼接末4位
pub fn client_msg_id() -> String {
    let ts = Utc::now().timestamp_millis();
    let s = ts.to_string();
    let tail = &s[s.len().saturating_sub(4)..];
    format!("{}{}", ts << 4, tail)
}

/// 同步请求的`rr`参数: 当前unix秒数的按位取反
pub fn complement_unix_seconds() -> i64 {
    !Utc::now().timestamp()
}

fn truncate_left(n: i64, len: usize) -> String {
    let s = n.to_string();
    if s.len() > len {
        s[..len].to_string()
    } else {
        s
    }
}
