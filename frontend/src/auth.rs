//! 认证模块
//!
//! 会话守卫：查询后端认证状态 -> 校验白名单 -> 失败则清除会话。
//! 路由服务通过注入的认证信号完成重定向，本模块不直接导航。

use crate::api::BackendApi;
use crate::config::AppConfig;
use crate::web::LocalStorage;
use leptos::prelude::*;
use leptos::task::spawn_local;
use sto_shared::session::{self, SessionVerdict};
use sto_shared::{AuthUser, UserRole};

const STORAGE_TOKEN_KEY: &str = "sto_access_token";

/// 认证状态
#[derive(Clone, Default)]
pub struct AuthState {
    /// 已授权的 API 客户端（仅在守卫通过后存在）
    pub api: Option<BackendApi>,
    pub user: Option<AuthUser>,
    pub role: UserRole,
    pub is_authenticated: bool,
    /// 启动时的会话检查是否仍在进行
    pub is_loading: bool,
    /// 上一次守卫拒绝的原因，用于登录页提示
    pub notice: Option<String>,
}

/// 认证上下文
#[derive(Clone, Copy)]
pub struct AuthContext {
    pub state: ReadSignal<AuthState>,
    pub set_state: WriteSignal<AuthState>,
    pub config: StoredValue<AppConfig>,
}

impl AuthContext {
    pub fn new(config: AppConfig) -> Self {
        let (state, set_state) = signal(AuthState {
            is_loading: true,
            ..Default::default()
        });
        Self {
            state,
            set_state,
            config: StoredValue::new(config),
        }
    }

    /// 获取认证状态信号（用于路由服务注入）
    pub fn is_authenticated_signal(&self) -> Signal<bool> {
        let state = self.state;
        Signal::derive(move || state.get().is_authenticated)
    }

    pub fn is_loading_signal(&self) -> Signal<bool> {
        let state = self.state;
        Signal::derive(move || state.get().is_loading)
    }

    fn base_api(&self) -> Result<BackendApi, String> {
        BackendApi::new(&self.config.get_value()).map_err(|e| e.to_string())
    }
}

/// 从 Context 获取认证上下文
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().expect("AuthContext should be provided")
}

fn notice_for(verdict: SessionVerdict) -> Option<String> {
    match verdict {
        SessionVerdict::Allowed => None,
        SessionVerdict::NoSession => Some("Сессия истекла, войдите снова".to_string()),
        SessionVerdict::NotWhitelisted => {
            Some("Нет доступа: адрес не внесён в список разрешённых".to_string())
        }
    }
}

/// 会话守卫
///
/// 使用给定的令牌查询当前用户，并检查白名单。通过时写入认证状态，
/// 否则清除本地会话。网络错误按无会话处理。
async fn guard_session(ctx: AuthContext, api: BackendApi) -> SessionVerdict {
    let user = match api.current_user().await {
        Ok(user) => user,
        Err(e) => {
            log_warn!("[Auth] session lookup failed: {}", e);
            None
        }
    };

    let entries = match user.as_ref().and_then(|u| u.email.as_deref()) {
        Some(email) => api.whitelist_entries(email).await.unwrap_or_else(|e| {
            log_warn!("[Auth] whitelist lookup failed: {}", e);
            Vec::new()
        }),
        None => Vec::new(),
    };

    let verdict = session::evaluate(user.as_ref(), &entries);
    log_info!("[Auth] session verdict: {:?}", verdict);

    if verdict.is_allowed() {
        let role = match user.as_ref() {
            Some(u) => api.user_role(&u.id).await.unwrap_or_else(|e| {
                log_warn!("[Auth] role lookup failed, using default: {}", e);
                UserRole::default()
            }),
            None => UserRole::default(),
        };
        ctx.set_state.update(|state| {
            state.api = Some(api);
            state.user = user;
            state.role = role;
            state.is_authenticated = true;
            state.is_loading = false;
            state.notice = None;
        });
    } else {
        LocalStorage::delete(STORAGE_TOKEN_KEY);
        if verdict == SessionVerdict::NotWhitelisted {
            // 白名单外的会话在服务端同样注销
            if let Err(e) = api.sign_out().await {
                log_warn!("[Auth] sign out of rejected session failed: {}", e);
            }
        }
        ctx.set_state.update(|state| {
            *state = AuthState {
                notice: notice_for(verdict),
                ..Default::default()
            };
        });
    }
    verdict
}

/// 启动时恢复会话
pub fn init_auth(ctx: AuthContext) {
    let token = LocalStorage::get(STORAGE_TOKEN_KEY);
    let api = ctx.base_api();

    match (token, api) {
        (Some(token), Ok(api)) => {
            spawn_local(async move {
                guard_session(ctx, api.with_token(token)).await;
            });
        }
        (_, api) => {
            if let Err(e) = api {
                log_error!("[Auth] {}", e);
            }
            ctx.set_state.update(|state| state.is_loading = false);
        }
    }
}

/// 登录，失败时返回可展示的错误信息
pub async fn login(ctx: AuthContext, email: String, password: String) -> Result<(), String> {
    let api = ctx.base_api()?;

    let session = api.sign_in(email.trim(), &password).await.map_err(|e| {
        log_warn!("[Auth] sign in failed: {}", e);
        "Неверный email или пароль".to_string()
    })?;

    LocalStorage::set(STORAGE_TOKEN_KEY, &session.access_token);

    let verdict = guard_session(ctx, api.with_token(session.access_token)).await;
    match notice_for(verdict) {
        None => Ok(()),
        Some(msg) => Err(msg),
    }
}

/// 注销并清除状态，导航由路由服务自动处理
pub fn logout(ctx: AuthContext) {
    let api = ctx.state.get_untracked().api;
    LocalStorage::delete(STORAGE_TOKEN_KEY);
    ctx.set_state.set(AuthState::default());

    if let Some(api) = api {
        spawn_local(async move {
            if let Err(e) = api.sign_out().await {
                log_warn!("[Auth] sign out failed: {}", e);
            }
        });
    }
}
