//! 同步游标的展开与整体替换语义

use serde_json::json;
use wxbot::SyncKey;

#[test]
fn test_expand_preserves_server_order() {
    let v = json!({
        "Count": 4,
        "List": [
            {"Key": 1, "Val": 661706065},
            {"Key": 2, "Val": 661706078},
            {"Key": 3, "Val": 661706060},
            {"Key": 1000, "Val": 1546300800}
        ]
    });
    let sk = SyncKey::from_json(&v).unwrap();
    assert_eq!(
        sk.expand(),
        "1_661706065|2_661706078|3_661706060|1000_1546300800"
    );
}

#[test]
fn test_single_item_has_no_separator() {
    let sk = SyncKey::from_json(&json!({"Count": 1, "List": [{"Key": 1, "Val": 2}]})).unwrap();
    assert_eq!(sk.expand(), "1_2");
}

#[test]
fn test_empty_cursor_is_rejected() {
    // 空游标返回None,调用方据此保留旧游标
    assert!(SyncKey::from_json(&json!({"Count": 0, "List": []})).is_none());
    assert!(SyncKey::from_json(&json!({"Count": 3, "List": []})).is_none());
    assert!(SyncKey::from_json(&json!(null)).is_none());
    assert!(SyncKey::from_json(&json!("garbage")).is_none());
}

#[test]
fn test_serialization_keeps_server_field_names() {
    let v = json!({"Count": 1, "List": [{"Key": 7, "Val": 99}]});
    let sk = SyncKey::from_json(&v).unwrap();
    // 回传服务器时字段名必须保持Count/List/Key/Val
    assert_eq!(serde_json::to_value(&sk).unwrap(), v);
}

#[test]
fn test_replacement_never_merges() {
    let old = SyncKey::from_json(&json!({
        "Count": 2,
        "List": [{"Key": 1, "Val": 10}, {"Key": 2, "Val": 20}]
    }))
    .unwrap();
    let new = SyncKey::from_json(&json!({"Count": 1, "List": [{"Key": 3, "Val": 30}]})).unwrap();

    // 新游标整体接管,旧项不保留
    let replaced = new.clone();
    assert_eq!(replaced.expand(), "3_30");
    assert_ne!(replaced, old);
    assert!(!replaced.expand().contains("1_10"));
}
