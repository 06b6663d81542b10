//! 日期选择器组件
//!
//! 绑定到一个只读文本输入框。弹层通过 Portal 挂到 body 上，
//! 页面上同一时间只允许一个选择器处于打开状态（由 `PickerRegistry` 保证）。

use leptos::html;
use leptos::portal::Portal;
use leptos::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use sto_shared::calendar::{
    CalendarCursor, CalendarDate, PickerAction, PickerOutcome, PickerRegistry, WEEKDAY_LABELS,
};
use sto_shared::popup::{self, Placement, Rect, Viewport};
use wasm_bindgen::JsValue;

// 弹层尚未挂载时用于定位的估计尺寸，与样式表一致
const POPUP_WIDTH: f64 = 280.0;
const POPUP_HEIGHT: f64 = 300.0;

static NEXT_PICKER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy)]
struct OpenPicker(RwSignal<PickerRegistry>);

pub fn provide_picker_registry() {
    provide_context(OpenPicker(RwSignal::new(PickerRegistry::default())));
}

fn use_open_picker() -> RwSignal<PickerRegistry> {
    use_context::<OpenPicker>()
        .expect("picker registry should be provided")
        .0
}

/// 浏览器本地时区的今天
pub fn today() -> CalendarDate {
    let now = js_sys::Date::new_0();
    CalendarDate::from_ymd(now.get_full_year() as i32, now.get_month() + 1, now.get_date())
        .unwrap_or_default()
}

fn viewport() -> Viewport {
    let Some(window) = web_sys::window() else {
        return Viewport::default();
    };
    let px = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    Viewport {
        width: px(window.inner_width()),
        height: px(window.inner_height()),
        scroll_x: window.scroll_x().unwrap_or(0.0),
        scroll_y: window.scroll_y().unwrap_or(0.0),
    }
}

/// 程序化写值后补发 input / change，让外部监听者感知变化
fn notify_input(input: &web_sys::HtmlInputElement) {
    for kind in ["input", "change"] {
        let init = web_sys::EventInit::new();
        init.set_bubbles(true);
        match web_sys::Event::new_with_event_init_dict(kind, &init) {
            Ok(event) => {
                let _ = input.dispatch_event(&event);
            }
            Err(e) => log_warn!("[DatePicker] cannot create {} event: {:?}", kind, e),
        }
    }
}

#[component]
pub fn DatePicker(
    /// 绑定值，`YYYY-MM-DD` 或空串
    value: RwSignal<String>,
    #[prop(optional, into)] id: Option<String>,
    #[prop(optional, into)] placeholder: Option<String>,
) -> impl IntoView {
    let open_picker = use_open_picker();
    let picker_id = NEXT_PICKER_ID.fetch_add(1, Ordering::Relaxed);
    let is_open = Memo::new(move |_| open_picker.with(|r| r.is_open(picker_id)));

    let cursor = RwSignal::new(CalendarCursor::containing(today()));
    let placement = RwSignal::new(Placement::default());
    let input_ref = NodeRef::<html::Input>::new();
    let popup_ref = NodeRef::<html::Div>::new();

    let reposition = move || {
        let Some(input) = input_ref.get_untracked() else {
            return;
        };
        let r = input.get_bounding_client_rect();
        let anchor = Rect {
            top: r.top(),
            left: r.left(),
            width: r.width(),
            height: r.height(),
        };
        let (width, height) = popup_ref
            .get_untracked()
            .map(|p| (p.offset_width() as f64, p.offset_height() as f64))
            .filter(|&(w, h)| w > 0.0 && h > 0.0)
            .unwrap_or((POPUP_WIDTH, POPUP_HEIGHT));
        placement.set(popup::place(anchor, width, height, viewport()));
    };

    let open = move || {
        if is_open.get_untracked() {
            return;
        }
        let current = input_ref
            .get_untracked()
            .map(|i| i.value())
            .unwrap_or_else(|| value.get_untracked());
        cursor.set(CalendarCursor::from_input(&current, today()));
        // 写入新 id 即卸载其他选择器的弹层
        open_picker.update(|r| {
            if let Some(prev) = r.open(picker_id) {
                log_info!("[DatePicker] #{} replaces #{}", picker_id, prev);
            }
        });
        reposition();
    };

    let close = move || open_picker.maybe_update(|r| r.close_if_owner(picker_id));

    // 弹层挂载后按真实尺寸重新定位；换月可能改变行数
    Effect::new(move |_| {
        cursor.track();
        if is_open.get() && popup_ref.get().is_some() {
            reposition();
        }
    });

    on_cleanup(move || open_picker.maybe_update(|r| r.close_if_owner(picker_id)));

    let commit = move |new_value: String| {
        value.set(new_value.clone());
        if let Some(input) = input_ref.get_untracked() {
            input.set_value(&new_value);
            notify_input(&input);
        }
        close();
    };

    let act = move |action: PickerAction| {
        let outcome = cursor
            .try_update(|c| c.apply(action))
            .unwrap_or(PickerOutcome::Ignored);
        match outcome {
            PickerOutcome::Navigated | PickerOutcome::Ignored => {}
            PickerOutcome::Commit(date) => commit(date),
            PickerOutcome::Cleared => commit(String::new()),
            PickerOutcome::Dismissed => close(),
        }
    };

    let days = move || {
        let selected = CalendarDate::parse(&value.get()).ok();
        let grid = cursor.get().grid(today(), selected);
        let blanks = (0..grid.leading_blanks)
            .map(|_| view! { <div></div> })
            .collect_view();
        let cells = grid
            .days
            .into_iter()
            .map(|cell| {
                let day = cell.day();
                view! {
                    <div class=cell.class() on:click=move |_| act(PickerAction::Select(day))>
                        {day}
                    </div>
                }
            })
            .collect_view();
        view! { {blanks} {cells} }
    };

    let popup_view = move || {
        is_open.get().then(|| {
            view! {
                <Portal>
                    <div class="dp-overlay" on:click=move |_| act(PickerAction::Dismiss)></div>
                    <div
                        class="dp-popup"
                        node_ref=popup_ref
                        style=move || {
                            let p = placement.get();
                            format!("top: {}px; left: {}px;", p.top, p.left)
                        }
                    >
                        <div class="dp-header">
                            <button type="button" class="btn btn-ghost btn-xs" on:click=move |_| act(PickerAction::PrevYear)>"«"</button>
                            <button type="button" class="btn btn-ghost btn-xs" on:click=move |_| act(PickerAction::PrevMonth)>"‹"</button>
                            <span class="font-semibold">{move || cursor.get().title()}</span>
                            <button type="button" class="btn btn-ghost btn-xs" on:click=move |_| act(PickerAction::NextMonth)>"›"</button>
                            <button type="button" class="btn btn-ghost btn-xs" on:click=move |_| act(PickerAction::NextYear)>"»"</button>
                        </div>
                        <div class="dp-grid">
                            {WEEKDAY_LABELS
                                .iter()
                                .map(|label| view! { <div class="dp-weekday">{*label}</div> })
                                .collect_view()}
                            {days}
                        </div>
                        <div class="dp-footer">
                            <button type="button" class="btn btn-ghost btn-xs" on:click=move |_| act(PickerAction::Clear)>
                                "Очистить"
                            </button>
                        </div>
                    </div>
                </Portal>
            }
        })
    };

    view! {
        <input
            type="text"
            readonly
            class="input input-bordered input-sm w-36 cursor-pointer"
            id=id
            placeholder=placeholder
            node_ref=input_ref
            prop:value=move || value.get()
            on:input=move |ev| value.set(event_target_value(&ev))
            on:click=move |_| open()
            on:focus=move |_| open()
        />
        {popup_view}
    }
}
