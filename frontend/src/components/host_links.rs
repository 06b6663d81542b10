//! 站点链接
//!
//! 启动时读取后端配置的站点域名（失败则使用本地缓存），
//! 改写页面中所有带 `data-host-path` 的静态链接，并为组件内的链接提供 `HostLink`。

use crate::api::BackendApi;
use crate::auth::AuthContext;
use crate::web::LocalStorage;
use leptos::prelude::*;
use leptos::task::spawn_local;
use sto_shared::links::{resolve_host, rewrite_href};
use wasm_bindgen::JsCast;

const STORAGE_HOST_KEY: &str = "sto_host_name";
const HOST_PATH_ATTR: &str = "data-host-path";

/// 当前生效的站点域名
#[derive(Clone, Copy)]
pub struct HostName(ReadSignal<Option<String>>);

/// 改写文档中已有的静态链接，返回改写数量
fn rewrite_document_links(host: &str) -> usize {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return 0;
    };
    let Ok(nodes) = document.query_selector_all(&format!("a[{}]", HOST_PATH_ATTR)) else {
        return 0;
    };

    let mut count = 0;
    for i in 0..nodes.length() {
        let Some(anchor) = nodes
            .item(i)
            .and_then(|n| n.dyn_into::<web_sys::Element>().ok())
        else {
            continue;
        };
        if let Some(path) = anchor.get_attribute(HOST_PATH_ATTR) {
            if anchor.set_attribute("href", &rewrite_href(host, &path)).is_ok() {
                count += 1;
            }
        }
    }
    count
}

/// 提供站点域名上下文，并在域名变化时改写静态链接
pub fn provide_host_name(auth: AuthContext) {
    let cached = LocalStorage::get(STORAGE_HOST_KEY);
    let (host, set_host) = signal(resolve_host(None, cached.as_deref()));
    provide_context(HostName(host));

    Effect::new(move |_| {
        if let Some(h) = host.get() {
            let n = rewrite_document_links(&h);
            log_info!("[HostLinks] {} link(s) -> {}", n, h);
        }
    });

    // 设置表对匿名请求可读，无需等待登录
    let api = match BackendApi::new(&auth.config.get_value()) {
        Ok(api) => api,
        Err(e) => {
            log_warn!("[HostLinks] {}", e);
            return;
        }
    };

    spawn_local(async move {
        let fetched = api.host_name().await.unwrap_or_else(|e| {
            log_warn!("[HostLinks] host lookup failed, using cache: {}", e);
            None
        });
        let resolved = resolve_host(fetched.as_deref(), cached.as_deref());
        // 仅缓存后端确认过的值
        if let (Some(_), Some(h)) = (&fetched, &resolved) {
            LocalStorage::set(STORAGE_HOST_KEY, h);
        }
        if resolved != host.get_untracked() {
            set_host.set(resolved);
        }
    });
}

/// 指向站点页面的链接；域名未知时不渲染 href
#[component]
pub fn HostLink(#[prop(into)] path: String, children: Children) -> impl IntoView {
    let host = use_context::<HostName>().map(|h| h.0);
    let href = {
        let path = path.clone();
        move || {
            host.and_then(|h| h.get())
                .map(|h| rewrite_href(&h, &path))
        }
    };

    view! {
        <a class="link link-hover" href=href target="_blank" rel="noopener" data-host-path=path>
            {children()}
        </a>
    }
}
