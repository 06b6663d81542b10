//! заказ-наряды：主页面
//!
//! 列表加载后通过实时通道增量更新，新增 / 修改的行短暂高亮。

use crate::api::BackendApi;
use crate::auth::{logout, use_auth};
use crate::components::date_picker::DatePicker;
use crate::components::host_links::HostLink;
use crate::components::search_box::SearchBox;
use crate::components::shop_dialog::ShopDialog;
use crate::components::toast::use_toasts;
use crate::web::RealtimeSocket;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::collections::HashMap;
use std::time::Duration;
use sto_shared::filter::filter_rows;
use sto_shared::phone::PhoneNumber;
use sto_shared::protocol::SendSmsRequest;
use sto_shared::realtime::{self, ChangeEffect, HIGHLIGHT_DURATION_MS, RowHighlight};
use sto_shared::{ServiceOrder, TABLE_ORDERS, UserRole};

const REALTIME_TOPIC: &str = "realtime:public:orders";

/// 行高亮：(样式, 序号)。序号用于判断淡出定时器是否已被新事件取代
type Highlights = HashMap<i64, (RowHighlight, u64)>;

fn sms_text(order: &ServiceOrder) -> String {
    match (order.car.as_deref(), order.number.as_deref()) {
        (Some(car), Some(number)) => {
            format!("Ваш автомобиль {} готов. Заказ-наряд №{}.", car, number)
        }
        (Some(car), None) => format!("Ваш автомобиль {} готов.", car),
        _ => "Ваш автомобиль готов.".to_string(),
    }
}

fn phone_label(raw: &str) -> String {
    PhoneNumber::parse(raw)
        .map(|p| p.display())
        .unwrap_or_else(|_| raw.to_string())
}

/// 按搜索词和交付日期过滤，保持原有顺序
fn visible_orders(orders: &[ServiceOrder], query: &str, due_date: &str) -> Vec<ServiceOrder> {
    filter_rows(orders, query, |o| o.search_cells())
        .into_iter()
        .map(|i| &orders[i])
        .filter(|o| due_date.is_empty() || o.due_date.as_deref() == Some(due_date))
        .cloned()
        .collect()
}

#[component]
pub fn OrdersPage() -> impl IntoView {
    let auth = use_auth();
    let toasts = use_toasts();

    let orders = RwSignal::new(Vec::<ServiceOrder>::new());
    let (loading, set_loading) = signal(true);
    let query = RwSignal::new(String::new());
    let due_date = RwSignal::new(String::new());
    let highlights = RwSignal::new(Highlights::new());
    let highlight_seq = StoredValue::new(0u64);
    let socket = StoredValue::new_local(Option::<RealtimeSocket>::None);

    let role = move || auth.state.with(|s| s.role);
    // 技师只加载自己的工单
    let master_filter = move || {
        auth.state.with_untracked(|s| match s.role {
            UserRole::Admin => None,
            UserRole::Master => s.user.as_ref().map(|u| u.id.clone()),
        })
    };

    let load_orders = move |api: BackendApi| {
        set_loading.set(true);
        spawn_local(async move {
            match api.list_orders(master_filter().as_deref()).await {
                Ok(list) => orders.set(list),
                Err(e) => {
                    log_error!("[Orders] load failed: {}", e);
                    toasts.error(format!("Не удалось загрузить заказ-наряды: {}", e));
                }
            }
            set_loading.set(false);
        });
    };

    let highlight = move |id: i64, kind: RowHighlight| {
        let seq = highlight_seq.get_value() + 1;
        highlight_seq.set_value(seq);
        highlights.update(|h| {
            h.insert(id, (kind, seq));
        });
        set_timeout(
            move || {
                highlights.try_update(|h| {
                    if h.get(&id).is_some_and(|&(_, s)| s == seq) {
                        h.remove(&id);
                    }
                });
            },
            Duration::from_millis(HIGHLIGHT_DURATION_MS),
        );
    };

    let on_change_text = move |text: String| {
        let event = match realtime::decode_change(&text) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(e) => {
                log_warn!("[Orders] undecodable realtime frame: {}", e);
                return;
            }
        };
        let (role, user_id) = auth.state.with_untracked(|s| {
            (s.role, s.user.as_ref().map(|u| u.id.clone()).unwrap_or_default())
        });

        let mut effect = ChangeEffect::Unchanged;
        orders.maybe_update(|list| {
            effect = realtime::apply_visible_change(list, &event, role, &user_id);
            effect != ChangeEffect::Unchanged
        });
        match effect {
            ChangeEffect::Patched => {
                if let (Some(id), Some(kind)) = (event.row_id(), event.highlight()) {
                    highlight(id, kind);
                }
            }
            ChangeEffect::Withdrawn => {
                log_info!("[Orders] order {:?} reassigned, removed from list", event.row_id());
            }
            ChangeEffect::Unchanged => {}
        }
    };

    // 初始加载与实时订阅
    Effect::new(move |_| {
        let Some(api) = auth.state.with(|s| s.api.clone()) else {
            return;
        };
        load_orders(api.clone());

        let token = api.access_token().map(str::to_string);
        match RealtimeSocket::connect(
            &api.realtime_url(),
            REALTIME_TOPIC,
            TABLE_ORDERS,
            token,
            on_change_text,
        ) {
            Ok(s) => socket.set_value(Some(s)),
            Err(e) => log_error!("[Orders] realtime connect failed: {:?}", e),
        }
    });

    let notify_client = move |order: ServiceOrder| {
        let Some(api) = auth.state.get_untracked().api else {
            return;
        };
        let Some(phone) = order.phone.clone() else {
            return;
        };
        let req = SendSmsRequest {
            phone,
            message: sms_text(&order),
        };
        spawn_local(async move {
            match api.call(&req).await {
                Ok(res) => {
                    log_info!("[Orders] sms {} -> {}", res.status, res.phone);
                    toasts.success("SMS отправлено клиенту");
                }
                Err(e) => {
                    log_warn!("[Orders] sms failed: {}", e);
                    toasts.error(format!("Не удалось отправить SMS: {}", e));
                }
            }
        });
    };

    let sms_enabled = move || auth.state.with(|s| s.api.as_ref().is_some_and(|a| a.sms_enabled()));

    let rows = move || {
        let list = orders.with(|o| visible_orders(o, &query.get(), &due_date.get()));
        list.into_iter()
            .map(|order| {
                let id = order.id;
                let row_class = move || {
                    highlights.with(|h| h.get(&id).map(|(k, _)| k.class()).unwrap_or_default())
                };
                let phone = order.phone.as_deref().map(phone_label).unwrap_or_default();
                let can_notify = order.phone.is_some();
                let order_for_sms = order.clone();
                view! {
                    <tr class=row_class>
                        <td>{order.number.clone().unwrap_or_default()}</td>
                        <td>{order.client_name.clone().unwrap_or_default()}</td>
                        <td>{order.car.clone().unwrap_or_default()}</td>
                        <td class="whitespace-nowrap">{phone}</td>
                        <td>{order.due_date.clone().unwrap_or_default()}</td>
                        <td><span class="badge badge-ghost">{order.status.clone().unwrap_or_default()}</span></td>
                        <td>
                            <Show when=move || sms_enabled() && can_notify>
                                <button
                                    class="btn btn-xs btn-outline"
                                    on:click={
                                        let order = order_for_sms.clone();
                                        move |_| notify_client(order.clone())
                                    }
                                >
                                    "Уведомить"
                                </button>
                            </Show>
                        </td>
                    </tr>
                }
            })
            .collect_view()
    };

    view! {
        <div class="min-h-screen bg-base-200 p-4 md:p-8">
            <div class="max-w-7xl mx-auto space-y-6">
                <div class="navbar bg-base-100 rounded-box shadow">
                    <div class="flex-1 gap-2">
                        <span class="text-xl font-bold px-2">"Заказ-наряды"</span>
                        <span class="badge badge-neutral">
                            {move || match role() {
                                UserRole::Admin => "Администратор",
                                UserRole::Master => "Мастер",
                            }}
                        </span>
                    </div>
                    <div class="flex-none gap-2">
                        <HostLink path="/">"Сайт СТО"</HostLink>
                        <Show when=move || role() == UserRole::Admin>
                            <ShopDialog />
                        </Show>
                        <button class="btn btn-outline btn-error btn-sm" on:click=move |_| logout(auth)>
                            "Выйти"
                        </button>
                    </div>
                </div>

                <div class="card bg-base-100 shadow">
                    <div class="card-body">
                        <div class="flex flex-wrap items-center justify-between gap-2">
                            <div class="flex items-center gap-2">
                                <label for="due_date" class="text-sm">"Срок:"</label>
                                <DatePicker value=due_date id="due_date" placeholder="Любая дата" />
                            </div>
                            <SearchBox on_search=move |q: String| query.set(q) />
                        </div>

                        <Show
                            when=move || !loading.get()
                            fallback=|| view! {
                                <div class="flex justify-center p-8">
                                    <span class="loading loading-spinner loading-lg"></span>
                                </div>
                            }
                        >
                            <div class="overflow-x-auto">
                                <table class="table table-zebra">
                                    <thead>
                                        <tr>
                                            <th>"№"</th>
                                            <th>"Клиент"</th>
                                            <th>"Автомобиль"</th>
                                            <th>"Телефон"</th>
                                            <th>"Срок"</th>
                                            <th>"Статус"</th>
                                            <th></th>
                                        </tr>
                                    </thead>
                                    <tbody>{rows}</tbody>
                                </table>
                            </div>
                        </Show>
                    </div>
                </div>
            </div>
        </div>
    }
}
