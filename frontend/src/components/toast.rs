//! 页面级提示消息，3 秒后自动清除

use leptos::prelude::*;
use std::time::Duration;

const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// 每次显示递增，内容相同的两条消息也能区分
    pub seq: u64,
    pub message: String,
    pub is_err: bool,
}

/// 定时器到期时只清除自己那一条
fn expired(current: Option<&Toast>, seq: u64) -> bool {
    current.is_some_and(|t| t.seq == seq)
}

#[derive(Clone, Copy)]
pub struct Toasts {
    current: RwSignal<Option<Toast>>,
    next_seq: StoredValue<u64>,
}

impl Toasts {
    fn show(&self, message: String, is_err: bool) {
        let seq = self.next_seq.get_value() + 1;
        self.next_seq.set_value(seq);
        self.current.set(Some(Toast {
            seq,
            message,
            is_err,
        }));
    }

    pub fn success(&self, msg: impl Into<String>) {
        self.show(msg.into(), false);
    }

    pub fn error(&self, msg: impl Into<String>) {
        self.show(msg.into(), true);
    }
}

pub fn provide_toasts() {
    provide_context(Toasts {
        current: RwSignal::new(None),
        next_seq: StoredValue::new(0),
    });
}

pub fn use_toasts() -> Toasts {
    use_context::<Toasts>().expect("Toasts should be provided")
}

#[component]
pub fn ToastHost() -> impl IntoView {
    let notification = use_toasts().current;

    Effect::new(move |_| {
        let Some(seq) = notification.with(|n| n.as_ref().map(|t| t.seq)) else {
            return;
        };
        set_timeout(
            move || {
                notification.maybe_update(|n| {
                    let done = expired(n.as_ref(), seq);
                    if done {
                        *n = None;
                    }
                    done
                });
            },
            TOAST_DURATION,
        );
    });

    view! {
        {move || notification.get().map(|toast| view! {
            <div class="toast toast-top toast-end z-50">
                <div class=if toast.is_err { "alert alert-error shadow-lg" } else { "alert alert-success shadow-lg" }>
                    <span>{toast.message}</span>
                </div>
            </div>
        })}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toast(seq: u64, message: &str) -> Toast {
        Toast {
            seq,
            message: message.into(),
            is_err: false,
        }
    }

    #[test]
    fn repeated_message_outlives_first_timer() {
        // 同一条提示连续出现两次：第一条的定时器不能清掉第二条
        let second = toast(2, "SMS отправлено клиенту");
        assert!(!expired(Some(&second), 1));
        assert!(expired(Some(&second), 2));
    }

    #[test]
    fn nothing_to_expire_when_cleared() {
        assert!(!expired(None, 1));
    }
}
