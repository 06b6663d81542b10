//! СТО 前端应用
//!
//! 采用 Context-Driven 的高内聚低耦合架构：
//! - `web::route`: 路由定义（领域模型）
//! - `web::router`: 路由服务（核心引擎）
//! - `auth`: 认证状态与会话守卫
//! - `components`: UI 组件层

// 日志宏必须在模块声明之前定义
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($arg)*)));
        #[cfg(not(target_arch = "wasm32"))]
        println!($($arg)*);
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        ::web_sys::console::warn_1(&::wasm_bindgen::JsValue::from_str(&format!($($arg)*)));
        #[cfg(not(target_arch = "wasm32"))]
        eprintln!($($arg)*);
    }};
}

macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        ::web_sys::console::error_1(&::wasm_bindgen::JsValue::from_str(&format!($($arg)*)));
        #[cfg(not(target_arch = "wasm32"))]
        eprintln!($($arg)*);
    }};
}

// 原生 Web API 封装模块
// 此模块提供对浏览器原生 API 的轻量级封装，替代 gloo-* 系列 crate，
// 以减小 WASM 二进制体积。
pub(crate) mod web {
    mod http;
    pub mod route;
    pub mod router;
    mod socket;
    mod storage;
    mod timer;

    pub use http::{HttpClient, HttpError, HttpRequestBuilder};
    pub use socket::RealtimeSocket;
    pub use storage::LocalStorage;
    pub use timer::{Interval, Timeout};
}

mod api;
mod auth;
mod config;
mod components {
    pub mod date_picker;
    pub mod host_links;
    pub mod login;
    pub mod orders;
    pub mod search_box;
    pub mod shop_dialog;
    pub mod toast;
}

use crate::auth::{AuthContext, init_auth};
use crate::components::date_picker::provide_picker_registry;
use crate::components::host_links::provide_host_name;
use crate::components::login::LoginPage;
use crate::components::orders::OrdersPage;
use crate::components::toast::{ToastHost, provide_toasts};
use crate::config::AppConfig;

use leptos::prelude::*;

use web::route::AppRoute;
use web::router::{Router, RouterOutlet, use_router};

/// 路由匹配函数
///
/// 根据 AppRoute 枚举返回对应的视图组件。
fn route_matcher(route: AppRoute) -> AnyView {
    match route {
        AppRoute::Login => view! { <LoginPage /> }.into_any(),
        AppRoute::Orders => view! { <OrdersPage /> }.into_any(),
        AppRoute::NotFound => view! { <NotFound /> }.into_any(),
    }
}

#[component]
fn NotFound() -> impl IntoView {
    let router = use_router();
    view! {
        <div class="flex items-center justify-center min-h-screen bg-base-200">
            <div class="text-center">
                <h1 class="text-6xl font-bold text-error">"404"</h1>
                <p class="text-xl mt-4">"Страница не найдена"</p>
                <button class="btn btn-link mt-2" on:click=move |_| router.navigate("/")>
                    "На главную"
                </button>
            </div>
        </div>
    }
}

#[component]
pub fn App() -> impl IntoView {
    // 1. 创建认证上下文
    let auth_ctx = AuthContext::new(AppConfig::load());
    provide_context(auth_ctx);

    // 2. 页面级单例：打开中的日期选择器、提示消息、站点域名
    provide_picker_registry();
    provide_toasts();
    provide_host_name(auth_ctx);

    // 3. 从 LocalStorage 恢复会话并执行守卫
    init_auth(auth_ctx);

    // 4. 认证信号注入路由服务；首次守卫完成前不挂载路由，避免登录页闪烁
    let is_authenticated = auth_ctx.is_authenticated_signal();
    let is_loading = auth_ctx.is_loading_signal();

    view! {
        <Show
            when=move || !is_loading.get()
            fallback=|| view! {
                <div class="flex items-center justify-center min-h-screen">
                    <span class="loading loading-spinner loading-lg text-primary"></span>
                </div>
            }
        >
            <Router is_authenticated=is_authenticated>
                <RouterOutlet matcher=route_matcher />
            </Router>
        </Show>
        <ToastHost />
    }
}
