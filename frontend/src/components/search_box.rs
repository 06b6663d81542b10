use leptos::prelude::*;

/// 可折叠的表格搜索框
///
/// 每次原生 `input` 事件都把当前文本交给 `on_search`；
/// 收起时清空文本并以空串通知一次，让表格恢复完整列表。
#[component]
pub fn SearchBox(
    #[prop(into)] on_search: Callback<String>,
    #[prop(optional, into)] placeholder: Option<String>,
) -> impl IntoView {
    let (visible, set_visible) = signal(false);
    let (query, set_query) = signal(String::new());
    let input_ref = NodeRef::<leptos::html::Input>::new();

    let toggle = move |_| {
        if visible.get_untracked() {
            set_visible.set(false);
            set_query.set(String::new());
            on_search.run(String::new());
        } else {
            set_visible.set(true);
        }
    };

    // 展开后聚焦输入框
    Effect::new(move |_| {
        if visible.get() {
            if let Some(input) = input_ref.get() {
                let _ = input.focus();
            }
        }
    });

    let placeholder = placeholder.unwrap_or_else(|| "Поиск…".to_string());

    view! {
        <div class="flex items-center gap-2">
            <Show when=move || visible.get()>
                <input
                    type="search"
                    class="input input-bordered input-sm w-56"
                    placeholder=placeholder.clone()
                    node_ref=input_ref
                    prop:value=query
                    on:input=move |ev| {
                        let text = event_target_value(&ev);
                        set_query.set(text.clone());
                        on_search.run(text);
                    }
                />
            </Show>
            <button
                type="button"
                class="btn btn-ghost btn-sm"
                title=move || if visible.get() { "Скрыть поиск" } else { "Поиск" }
                on:click=toggle
            >
                {move || if visible.get() { "✕" } else { "🔍" }}
            </button>
        </div>
    }
}
