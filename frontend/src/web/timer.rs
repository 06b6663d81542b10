//! 定时器封装模块

use wasm_bindgen::prelude::*;

/// 周期性定时器
///
/// 封装 `setInterval`，drop 时自动清除。
pub struct Interval {
    handle: i32,
    _closure: Closure<dyn Fn()>,
}

impl Interval {
    pub fn new<F>(millis: u32, callback: F) -> Result<Self, JsValue>
    where
        F: Fn() + 'static,
    {
        let closure = Closure::<dyn Fn()>::new(callback);
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

        let handle = window.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            millis as i32,
        )?;

        Ok(Self {
            handle,
            _closure: closure,
        })
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.handle);
        }
    }
}

/// 一次性定时器
///
/// 封装 `setTimeout`，drop 时若尚未触发则取消。回调由 JS 侧持有，
/// 因此可以在回调内部安全地替换持有它的 `Timeout`。
pub struct Timeout {
    handle: i32,
}

impl Timeout {
    pub fn new<F>(millis: u32, callback: F) -> Result<Self, JsValue>
    where
        F: FnOnce() + 'static,
    {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let callback = Closure::once_into_js(callback);

        let handle = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            millis as i32,
        )?;

        Ok(Self { handle })
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(self.handle);
        }
    }
}
