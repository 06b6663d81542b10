//! 实时变更通知
//!
//! 后端通过 Phoenix Channel 协议（vsn 1.0.0，JSON 文本帧）推送表变更。
//! 本模块负责：
//! - 构造 join / heartbeat 消息
//! - 将 `postgres_changes` 消息解码为 `ChangeEvent`
//! - 根据用户角色过滤事件，并把事件应用到本地工单列表

use crate::{ServiceOrder, UserRole};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";
pub const TOPIC_PHOENIX: &str = "phoenix";

/// 心跳间隔（毫秒）
pub const HEARTBEAT_INTERVAL_MS: u32 = 30_000;
/// 行高亮持续时间（毫秒）
pub const HIGHLIGHT_DURATION_MS: u64 = 5_000;
/// 断线重连的退避表（毫秒），超出部分取最后一项
pub const RECONNECT_DELAYS_MS: [u32; 4] = [1_000, 2_000, 5_000, 10_000];

/// 第 `attempt` 次重连前的等待时间（从 0 开始计数）
pub fn reconnect_delay_ms(attempt: u32) -> u32 {
    let last = RECONNECT_DELAYS_MS.len() - 1;
    RECONNECT_DELAYS_MS[(attempt as usize).min(last)]
}

// =========================================================
// Phoenix 消息
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
}

impl PhoenixMessage {
    /// 订阅 `public.{table}` 上的全部变更
    pub fn join(topic: &str, table: &str, access_token: Option<&str>, msg_ref: u64) -> Self {
        let mut payload = json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "*", "schema": "public", "table": table }
                ]
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = Value::String(token.to_string());
        }
        Self {
            topic: topic.to_string(),
            event: EVENT_JOIN.to_string(),
            payload,
            msg_ref: Some(msg_ref.to_string()),
        }
    }

    pub fn heartbeat(msg_ref: u64) -> Self {
        Self {
            topic: TOPIC_PHOENIX.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref.to_string()),
        }
    }
}

// =========================================================
// 变更事件
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub old_record: Option<Value>,
}

#[derive(Deserialize)]
struct ChangePayload {
    data: ChangeEvent,
}

/// 解码一帧文本
///
/// - 非 `postgres_changes` 消息（如 `phx_reply`）返回 `Ok(None)`
/// - JSON 本身无效时返回错误
pub fn decode_change(text: &str) -> Result<Option<ChangeEvent>, serde_json::Error> {
    let msg: PhoenixMessage = serde_json::from_str(text)?;
    if msg.event != EVENT_POSTGRES_CHANGES {
        return Ok(None);
    }
    let payload: ChangePayload = serde_json::from_value(msg.payload)?;
    Ok(Some(payload.data))
}

/// 若该帧是 `topic` 上的失败回复（如 join 被拒），返回服务端给出的原因
pub fn reply_error(text: &str, topic: &str) -> Option<String> {
    let msg: PhoenixMessage = serde_json::from_str(text).ok()?;
    if msg.event != EVENT_REPLY || msg.topic != topic {
        return None;
    }
    if msg.payload.get("status")?.as_str()? != "error" {
        return None;
    }
    let reason = match msg.payload.get("response") {
        Some(response) => match response.get("reason") {
            Some(Value::String(reason)) => reason.clone(),
            Some(reason) => reason.to_string(),
            None => response.to_string(),
        },
        None => String::new(),
    };
    Some(reason)
}

impl ChangeEvent {
    /// 对 DELETE 取旧记录，其余取新记录
    fn subject(&self) -> Option<&Value> {
        match self.kind {
            ChangeKind::Delete => self.old_record.as_ref(),
            _ => self.record.as_ref(),
        }
    }

    pub fn row_id(&self) -> Option<i64> {
        self.subject()?.get("id")?.as_i64()
    }

    pub fn master_id(&self) -> Option<&str> {
        self.subject()?.get("master_id")?.as_str()
    }

    pub fn order(&self) -> Option<ServiceOrder> {
        self.record
            .as_ref()
            .and_then(|r| serde_json::from_value(r.clone()).ok())
    }

    /// 管理员可见所有事件；技师只可见分配给自己的工单
    ///
    /// DELETE 的旧记录可能只带主键，此时无法判断归属，直接放行：
    /// 删除本地不存在的行不会产生任何效果。
    pub fn visible_to(&self, role: UserRole, user_id: &str) -> bool {
        match role {
            UserRole::Admin => true,
            UserRole::Master => match self.master_id() {
                Some(master) => master == user_id,
                None => self.kind == ChangeKind::Delete,
            },
        }
    }

    pub fn highlight(&self) -> Option<RowHighlight> {
        match self.kind {
            ChangeKind::Insert => Some(RowHighlight::New),
            ChangeKind::Update => Some(RowHighlight::Updated),
            ChangeKind::Delete => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowHighlight {
    New,
    Updated,
}

impl RowHighlight {
    pub fn class(&self) -> &'static str {
        match self {
            RowHighlight::New => "row-new",
            RowHighlight::Updated => "row-updated",
        }
    }
}

/// 按角色应用事件后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEffect {
    Unchanged,
    /// 行被插入、替换或删除
    Patched,
    /// 工单被转给其他技师，已从本地列表移除
    Withdrawn,
}

/// 带角色过滤的 [`apply_change`]
///
/// 技师收到不可见的 UPDATE 时，说明该工单已转给别人：若本地仍有这一行则移除。
pub fn apply_visible_change(
    orders: &mut Vec<ServiceOrder>,
    event: &ChangeEvent,
    role: UserRole,
    user_id: &str,
) -> ChangeEffect {
    if event.visible_to(role, user_id) {
        return if apply_change(orders, event) {
            ChangeEffect::Patched
        } else {
            ChangeEffect::Unchanged
        };
    }

    let Some(id) = event.row_id().filter(|_| event.kind == ChangeKind::Update) else {
        return ChangeEffect::Unchanged;
    };
    let before = orders.len();
    orders.retain(|o| o.id != id);
    if orders.len() != before {
        ChangeEffect::Withdrawn
    } else {
        ChangeEffect::Unchanged
    }
}

/// 将事件应用到本地列表（新行插在最前）
///
/// 返回是否发生了变化。
pub fn apply_change(orders: &mut Vec<ServiceOrder>, event: &ChangeEvent) -> bool {
    match event.kind {
        ChangeKind::Insert => match event.order() {
            Some(order) if !orders.iter().any(|o| o.id == order.id) => {
                orders.insert(0, order);
                true
            }
            _ => false,
        },
        ChangeKind::Update => {
            let Some(order) = event.order() else {
                return false;
            };
            match orders.iter_mut().find(|o| o.id == order.id) {
                Some(slot) => {
                    *slot = order;
                    true
                }
                None => {
                    orders.insert(0, order);
                    true
                }
            }
        }
        ChangeKind::Delete => {
            let Some(id) = event.row_id() else {
                return false;
            };
            let before = orders.len();
            orders.retain(|o| o.id != id);
            orders.len() != before
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(kind: &str, record: Value, old_record: Value) -> String {
        json!({
            "topic": "realtime:orders",
            "event": "postgres_changes",
            "ref": null,
            "payload": {
                "ids": [1],
                "data": {
                    "schema": "public",
                    "table": "orders",
                    "commit_timestamp": "2025-01-01T00:00:00Z",
                    "type": kind,
                    "record": record,
                    "old_record": old_record
                }
            }
        })
        .to_string()
    }

    fn order(id: i64, master: &str) -> ServiceOrder {
        ServiceOrder {
            id,
            number: Some(format!("N{}", id)),
            client_name: None,
            car: None,
            phone: None,
            status: None,
            due_date: None,
            master_id: Some(master.to_string()),
        }
    }

    #[test]
    fn join_message_shape() {
        let msg = PhoenixMessage::join("realtime:orders", "orders", Some("jwt"), 1);
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["event"], "phx_join");
        assert_eq!(v["ref"], "1");
        assert_eq!(v["payload"]["access_token"], "jwt");
        assert_eq!(v["payload"]["config"]["postgres_changes"][0]["table"], "orders");
    }

    #[test]
    fn heartbeat_goes_to_phoenix_topic() {
        let v = serde_json::to_value(PhoenixMessage::heartbeat(7)).unwrap();
        assert_eq!(v["topic"], "phoenix");
        assert_eq!(v["event"], "heartbeat");
        assert_eq!(v["ref"], "7");
    }

    #[test]
    fn decodes_update() {
        let text = frame(
            "UPDATE",
            json!({"id": 5, "master_id": "m1", "status": "готов"}),
            json!({"id": 5}),
        );
        let ev = decode_change(&text).unwrap().unwrap();
        assert_eq!(ev.kind, ChangeKind::Update);
        assert_eq!(ev.table, "orders");
        assert_eq!(ev.row_id(), Some(5));
        assert_eq!(ev.master_id(), Some("m1"));
        assert_eq!(ev.highlight(), Some(RowHighlight::Updated));
        assert_eq!(ev.order().unwrap().status.as_deref(), Some("готов"));
    }

    #[test]
    fn ignores_replies_and_rejects_garbage() {
        let reply = r#"{"topic":"phoenix","event":"phx_reply","payload":{"status":"ok"},"ref":"1"}"#;
        assert_eq!(decode_change(reply).unwrap(), None);
        assert!(decode_change("not json").is_err());
    }

    #[test]
    fn role_filtering() {
        let text = frame("INSERT", json!({"id": 1, "master_id": "m1"}), Value::Null);
        let ev = decode_change(&text).unwrap().unwrap();
        assert!(ev.visible_to(UserRole::Admin, "anyone"));
        assert!(ev.visible_to(UserRole::Master, "m1"));
        assert!(!ev.visible_to(UserRole::Master, "m2"));

        let text = frame("INSERT", json!({"id": 1}), Value::Null);
        let ev = decode_change(&text).unwrap().unwrap();
        assert!(!ev.visible_to(UserRole::Master, "m1"));

        let text = frame("DELETE", Value::Null, json!({"id": 1}));
        let ev = decode_change(&text).unwrap().unwrap();
        assert!(ev.visible_to(UserRole::Master, "m1"));
    }

    #[test]
    fn applies_changes_to_list() {
        let mut orders = vec![order(1, "m1"), order(2, "m1")];

        let ins = decode_change(&frame("INSERT", json!({"id": 3, "master_id": "m1"}), Value::Null))
            .unwrap()
            .unwrap();
        assert!(apply_change(&mut orders, &ins));
        assert_eq!(orders[0].id, 3);
        // 重复 INSERT 不会插入两次
        assert!(!apply_change(&mut orders, &ins));

        let upd = decode_change(&frame(
            "UPDATE",
            json!({"id": 2, "master_id": "m1", "status": "в работе"}),
            json!({"id": 2}),
        ))
        .unwrap()
        .unwrap();
        assert!(apply_change(&mut orders, &upd));
        assert_eq!(orders[2].status.as_deref(), Some("в работе"));

        let del = decode_change(&frame("DELETE", Value::Null, json!({"id": 1})))
            .unwrap()
            .unwrap();
        assert!(apply_change(&mut orders, &del));
        assert_eq!(orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![3, 2]);
        assert!(!apply_change(&mut orders, &del));
    }

    #[test]
    fn reassigned_order_leaves_previous_master_list() {
        let mut orders = vec![order(9, "m1"), order(10, "m1")];
        let upd = decode_change(&frame(
            "UPDATE",
            json!({"id": 9, "master_id": "m2"}),
            json!({"id": 9}),
        ))
        .unwrap()
        .unwrap();

        assert!(!upd.visible_to(UserRole::Master, "m1"));
        assert_eq!(
            apply_visible_change(&mut orders, &upd, UserRole::Master, "m1"),
            ChangeEffect::Withdrawn
        );
        assert_eq!(orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![10]);
        // 再次收到同一事件不再有变化
        assert_eq!(
            apply_visible_change(&mut orders, &upd, UserRole::Master, "m1"),
            ChangeEffect::Unchanged
        );

        // 新技师收到后插入，管理员原地替换
        let mut theirs = Vec::new();
        assert_eq!(
            apply_visible_change(&mut theirs, &upd, UserRole::Master, "m2"),
            ChangeEffect::Patched
        );
        let mut all = vec![order(9, "m1")];
        assert_eq!(
            apply_visible_change(&mut all, &upd, UserRole::Admin, "admin"),
            ChangeEffect::Patched
        );
        assert_eq!(all[0].master_id.as_deref(), Some("m2"));
    }

    #[test]
    fn foreign_insert_is_ignored_for_master() {
        let mut orders = vec![order(1, "m1")];
        let ins = decode_change(&frame("INSERT", json!({"id": 2, "master_id": "m2"}), Value::Null))
            .unwrap()
            .unwrap();
        assert_eq!(
            apply_visible_change(&mut orders, &ins, UserRole::Master, "m1"),
            ChangeEffect::Unchanged
        );
        assert_eq!(orders.len(), 1);
    }

    #[test]
    fn reconnect_backoff_is_capped() {
        assert_eq!(reconnect_delay_ms(0), 1_000);
        assert_eq!(reconnect_delay_ms(1), 2_000);
        assert_eq!(reconnect_delay_ms(2), 5_000);
        assert_eq!(reconnect_delay_ms(3), 10_000);
        assert_eq!(reconnect_delay_ms(50), 10_000);
        assert_eq!(reconnect_delay_ms(u32::MAX), 10_000);
    }

    #[test]
    fn detects_rejected_join() {
        let rejected = json!({
            "topic": "realtime:public:orders",
            "event": "phx_reply",
            "ref": "1",
            "payload": {"status": "error", "response": {"reason": "Invalid JWT"}}
        })
        .to_string();
        assert_eq!(
            reply_error(&rejected, "realtime:public:orders").as_deref(),
            Some("Invalid JWT")
        );
        assert_eq!(reply_error(&rejected, "realtime:public:shops"), None);

        let ok = json!({
            "topic": "realtime:public:orders",
            "event": "phx_reply",
            "ref": "1",
            "payload": {"status": "ok", "response": {}}
        })
        .to_string();
        assert_eq!(reply_error(&ok, "realtime:public:orders"), None);
        assert_eq!(reply_error("not json", "realtime:public:orders"), None);
    }
}
