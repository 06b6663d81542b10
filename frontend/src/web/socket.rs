//! WebSocket 封装模块
//!
//! 面向 Phoenix Channel 的最小客户端：连接建立后发送 join 帧，
//! 按固定间隔发送心跳，把收到的文本帧交给回调。连接断开后按退避表重连
//! 并重新 join；drop 时关闭连接并停止重连。

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use sto_shared::realtime::{self, HEARTBEAT_INTERVAL_MS, PhoenixMessage};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use super::{Interval, Timeout};

/// 单条物理连接及其事件回调
struct Connection {
    ws: WebSocket,
    _on_open: Closure<dyn FnMut()>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onclose(None);
        let _ = self.ws.close();
    }
}

struct Channel {
    url: String,
    topic: String,
    table: String,
    access_token: Option<String>,
    on_text: Box<dyn Fn(String)>,
    next_ref: Cell<u64>,
    /// 连续失败次数，join 成功发送后归零
    attempt: Cell<u32>,
    closed: Cell<bool>,
    conn: RefCell<Option<Connection>>,
    retry: RefCell<Option<Timeout>>,
}

impl Channel {
    fn next_ref(&self) -> u64 {
        self.next_ref.replace(self.next_ref.get() + 1)
    }

    fn send(&self, msg: &PhoenixMessage) {
        let conn = self.conn.borrow();
        let Some(ws) = conn.as_ref().map(|c| &c.ws) else {
            return;
        };
        if ws.ready_state() != WebSocket::OPEN {
            return;
        }
        match serde_json::to_string(msg) {
            Ok(text) => {
                if let Err(e) = ws.send_with_str(&text) {
                    log_warn!("[Realtime] send failed: {:?}", e);
                }
            }
            Err(e) => log_error!("[Realtime] encode failed: {}", e),
        }
    }
}

/// 建立一条新连接，替换旧连接
fn open(channel: &Rc<Channel>) -> Result<(), JsValue> {
    let ws = WebSocket::new(&channel.url)?;

    let on_open = {
        let channel = Rc::downgrade(channel);
        Closure::<dyn FnMut()>::new(move || {
            let Some(ch) = channel.upgrade() else {
                return;
            };
            ch.attempt.set(0);
            let join = PhoenixMessage::join(
                &ch.topic,
                &ch.table,
                ch.access_token.as_deref(),
                ch.next_ref(),
            );
            ch.send(&join);
            log_info!("[Realtime] joined {}", ch.topic);
        })
    };
    ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

    let on_message = {
        let channel = Rc::downgrade(channel);
        Closure::<dyn FnMut(MessageEvent)>::new(move |ev: MessageEvent| {
            let (Some(ch), Some(text)) = (channel.upgrade(), ev.data().as_string()) else {
                return;
            };
            if let Some(reason) = realtime::reply_error(&text, &ch.topic) {
                log_error!("[Realtime] {} rejected: {}", ch.topic, reason);
            }
            (ch.on_text)(text);
        })
    };
    ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

    let on_close = {
        let channel = Rc::downgrade(channel);
        Closure::<dyn FnMut(CloseEvent)>::new(move |ev: CloseEvent| {
            log_warn!("[Realtime] closed (code {})", ev.code());
            if let Some(ch) = channel.upgrade() {
                schedule_reconnect(&ch);
            }
        })
    };
    ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

    // 旧连接在此处 drop，其回调已解除，不会再触发重连
    channel.conn.replace(Some(Connection {
        ws,
        _on_open: on_open,
        _on_message: on_message,
        _on_close: on_close,
    }));
    Ok(())
}

fn schedule_reconnect(channel: &Rc<Channel>) {
    if channel.closed.get() {
        return;
    }
    let attempt = channel.attempt.get();
    channel.attempt.set(attempt.saturating_add(1));
    let delay = realtime::reconnect_delay_ms(attempt);
    log_info!("[Realtime] reconnecting in {} ms (attempt {})", delay, attempt + 1);

    let weak: Weak<Channel> = Rc::downgrade(channel);
    let timeout = Timeout::new(delay, move || {
        let Some(ch) = weak.upgrade() else {
            return;
        };
        if ch.closed.get() {
            return;
        }
        if let Err(e) = open(&ch) {
            log_error!("[Realtime] reconnect failed: {:?}", e);
            schedule_reconnect(&ch);
        }
    });

    match timeout {
        Ok(t) => {
            channel.retry.replace(Some(t));
        }
        Err(e) => log_error!("[Realtime] cannot schedule reconnect: {:?}", e),
    }
}

pub struct RealtimeSocket {
    channel: Rc<Channel>,
    _heartbeat: Interval,
}

impl RealtimeSocket {
    /// 连接并订阅 `table`
    ///
    /// `on_text` 会收到所有文本帧（包括 `phx_reply`），由调用方解码过滤。
    pub fn connect<F>(
        url: &str,
        topic: &str,
        table: &str,
        access_token: Option<String>,
        on_text: F,
    ) -> Result<Self, JsValue>
    where
        F: Fn(String) + 'static,
    {
        let channel = Rc::new(Channel {
            url: url.to_string(),
            topic: topic.to_string(),
            table: table.to_string(),
            access_token,
            on_text: Box::new(on_text),
            next_ref: Cell::new(1),
            attempt: Cell::new(0),
            closed: Cell::new(false),
            conn: RefCell::new(None),
            retry: RefCell::new(None),
        });
        open(&channel)?;

        let heartbeat = {
            let channel = Rc::downgrade(&channel);
            Interval::new(HEARTBEAT_INTERVAL_MS, move || {
                if let Some(ch) = channel.upgrade() {
                    ch.send(&PhoenixMessage::heartbeat(ch.next_ref()));
                }
            })?
        };

        Ok(Self {
            channel,
            _heartbeat: heartbeat,
        })
    }
}

impl Drop for RealtimeSocket {
    fn drop(&mut self) {
        self.channel.closed.set(true);
        self.channel.retry.take();
        self.channel.conn.take();
    }
}
