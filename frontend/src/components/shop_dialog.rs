mod form_state;

use crate::auth::use_auth;
use crate::components::toast::use_toasts;
use form_state::FormState;
use leptos::prelude::*;
use leptos::task::spawn_local;

/// 新建车间对话框
///
/// 提交成功后关闭并重置表单；取消、点击背景或 Escape 直接关闭，不提交。
#[component]
pub fn ShopDialog() -> impl IntoView {
    let auth = use_auth();
    let toasts = use_toasts();
    let form = FormState::new();

    let (open, set_open) = signal(false);
    let (loading, set_loading) = signal(false);
    let (error, set_error) = signal(Option::<String>::None);
    let dialog_ref = NodeRef::<leptos::html::Dialog>::new();

    Effect::new(move |_| {
        if let Some(dialog) = dialog_ref.get() {
            if open.get() {
                if !dialog.open() {
                    let _ = dialog.show_modal();
                }
            } else if dialog.open() {
                dialog.close();
            }
        }
    });

    let close = move || {
        set_open.set(false);
        set_error.set(None);
        form.reset();
    };

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        if loading.get_untracked() {
            return;
        }

        let req = match form.to_request() {
            Ok(req) => req,
            Err(e) => {
                set_error.set(Some(e.to_string()));
                return;
            }
        };
        let Some(api) = auth.state.get_untracked().api else {
            set_error.set(Some("Сессия истекла, войдите снова".to_string()));
            return;
        };

        set_loading.set(true);
        set_error.set(None);
        spawn_local(async move {
            match api.create_shop(&req).await {
                Ok(shop) => {
                    log_info!("[ShopDialog] created shop #{}", shop.id);
                    toasts.success(format!("Цех «{}» создан", shop.name));
                    close();
                }
                Err(e) => {
                    log_warn!("[ShopDialog] create failed: {}", e);
                    set_error.set(Some(format!("Не удалось создать цех: {}", e)));
                }
            }
            set_loading.set(false);
        });
    };

    view! {
        // 触发按钮
        <button class="btn btn-primary btn-sm" on:click=move |_| set_open.set(true)>
            "+ Цех"
        </button>

        // 模态框内容；Escape 触发原生 close 事件
        <dialog class="modal" node_ref=dialog_ref on:close=move |_| close()>
            <div class="modal-box">
                <h3 class="font-bold text-lg">"Новый цех"</h3>

                <form on:submit=on_submit class="space-y-4 mt-4">
                    <Show when=move || error.get().is_some()>
                        <div role="alert" class="alert alert-error text-sm py-2">
                            <span>{move || error.get().unwrap_or_default()}</span>
                        </div>
                    </Show>

                    <div class="form-control">
                        <label for="shop_name" class="label">
                            <span class="label-text">"Название"</span>
                        </label>
                        <input id="shop_name" required
                            type="text"
                            class="input input-bordered w-full"
                            prop:value=form.name
                            on:input=move |ev| form.name.set(event_target_value(&ev))
                        />
                    </div>
                    <div class="form-control">
                        <label for="shop_address" class="label">
                            <span class="label-text">"Адрес"</span>
                        </label>
                        <input id="shop_address"
                            type="text"
                            class="input input-bordered w-full"
                            prop:value=form.address
                            on:input=move |ev| form.address.set(event_target_value(&ev))
                        />
                    </div>
                    <div class="form-control">
                        <label for="shop_phone" class="label">
                            <span class="label-text">"Телефон"</span>
                        </label>
                        <input id="shop_phone"
                            type="tel"
                            placeholder="+7 (900) 000-00-00"
                            class="input input-bordered w-full"
                            prop:value=form.phone
                            on:input=move |ev| form.phone.set(event_target_value(&ev))
                        />
                    </div>

                    <div class="modal-action">
                        <button type="button" class="btn btn-ghost" on:click=move |_| close()>"Отмена"</button>
                        <button type="submit" class="btn btn-primary" disabled=move || loading.get()>
                            {move || if loading.get() {
                                view! { <span class="loading loading-spinner"></span> "Сохранение…" }.into_any()
                            } else {
                                "Создать".into_any()
                            }}
                        </button>
                    </div>
                </form>
            </div>
            // 点击背景关闭
            <form method="dialog" class="modal-backdrop">
                <button>"close"</button>
            </form>
        </dialog>
    }
}
