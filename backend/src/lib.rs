use worker::*;

pub mod error;
pub mod logic;
mod token_store;

pub(crate) mod utils {
    pub mod request;
    pub mod sms {
        pub mod gateway;
        pub mod report;
    }
}

use error::{ErrorResponse, SmsError};
use logic::SmsLogic;
use sto_shared::HEADER_API_KEY;
use sto_shared::protocol::{ApiRequest, SendSmsRequest};
use token_store::RestTokenStore;
use utils::request::WorkerHttpClient;
use utils::sms::gateway::DEFAULT_SMS_API_URL;

// =========================================================
// 常量定义
// =========================================================
const DEFAULT_TOKEN_TABLE: &str = "app_secrets";
const DEFAULT_TOKEN_NAME: &str = "sms_ru";
const DEFAULT_SERVICE_KEY_NAME: &str = "SUPABASE_SERVICE_KEY";
const DEFAULT_ANON_KEY_NAME: &str = "SUPABASE_ANON_KEY";

// =========================================================
// 宏定义 (包含日志和响应处理)
// =========================================================

#[cfg(target_arch = "wasm32")]
macro_rules! log_info { ($($t:tt)*) => (worker::console_log!($($t)*)) }
#[cfg(not(target_arch = "wasm32"))]
macro_rules! log_info { ($($t:tt)*) => (println!($($t)*)) }

#[cfg(target_arch = "wasm32")]
macro_rules! log_error { ($($t:tt)*) => (worker::console_error!($($t)*)) }
#[cfg(not(target_arch = "wasm32"))]
macro_rules! log_error { ($($t:tt)*) => (eprintln!($($t)*)) }

// 辅助函数：将 SmsError 映射为 Worker Response
fn map_error_to_response(e: SmsError) -> Result<Response> {
    let status = e.status_code();

    // 对于 5xx 错误，记录日志以便排查
    if status >= 500 {
        log_error!("Internal Error [{}]: {}", e.error_code(), e);
    }

    Ok(Response::from_json(&ErrorResponse::from(&e))?.with_status(status))
}

// 统一响应宏
macro_rules! respond {
    (json, $expr:expr) => {
        match $expr {
            Ok(v) => Response::from_json(&v),
            Err(e) => map_error_to_response(e),
        }
    };
}

// 辅助宏：处理 Result 类型的 unwrapping
macro_rules! unwrap_or_resp {
    ($expr:expr, $err_mapper:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => return map_error_to_response($err_mapper(e.to_string())),
        }
    };
}

// =========================================================
// 运行时配置与鉴权
// =========================================================

/// 抽象 Secret 读取，便于测试
pub trait SecretResolver {
    fn get_secret(&self, name: &str) -> Option<String>;
}

pub struct EnvSecretResolver<'a>(pub &'a Env);

impl<'a> SecretResolver for EnvSecretResolver<'a> {
    fn get_secret(&self, name: &str) -> Option<String> {
        self.0
            .secret(name)
            .ok()
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
    }
}

/// 从 [vars] 读取的运行时配置，缺省时使用默认值
struct RuntimeConfig {
    supabase_url: String,
    token_table: String,
    token_name: String,
    sms_api_url: String,
    service_key_name: String,
    anon_key_name: String,
}

impl RuntimeConfig {
    fn new(env: &Env) -> Self {
        let var = |name: &str, default: &str| {
            env.var(name)
                .map(|v| v.to_string())
                .unwrap_or_else(|_| default.to_string())
        };
        Self {
            supabase_url: var("SUPABASE_URL", ""),
            token_table: var("SMS_TOKEN_TABLE", DEFAULT_TOKEN_TABLE),
            token_name: var("SMS_TOKEN_NAME", DEFAULT_TOKEN_NAME),
            sms_api_url: var("SMS_API_URL", DEFAULT_SMS_API_URL),
            service_key_name: var("SERVICE_KEY_NAME", DEFAULT_SERVICE_KEY_NAME),
            anon_key_name: var("ANON_KEY_NAME", DEFAULT_ANON_KEY_NAME),
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0, |acc, (&x, &y)| acc | (x ^ y))
        == 0
}

/// 调用方必须携带与配置一致的 apikey；未配置 key 时一律拒绝
fn check_api_key(provided: Option<&str>, expected: Option<&str>) -> error::SmsResult<()> {
    match (provided, expected) {
        (Some(p), Some(e)) if constant_time_eq(p, e) => Ok(()),
        _ => Err(SmsError::unauthorized("Invalid API key")),
    }
}

fn ensure_client_auth<S: SecretResolver>(
    req: &Request,
    secrets: &S,
    config: &RuntimeConfig,
) -> error::SmsResult<()> {
    let provided = req
        .headers()
        .get(HEADER_API_KEY)
        .map_err(|e| SmsError::invalid_input(e.to_string()))?;
    let expected = secrets.get_secret(&config.anon_key_name);
    check_api_key(provided.as_deref(), expected.as_deref())
}

// =========================================================
// API Controllers (适配层)
// =========================================================

async fn send_sms(mut req: Request, ctx: RouteContext<()>) -> Result<Response> {
    let cfg = RuntimeConfig::new(&ctx.env);
    let secrets = EnvSecretResolver(&ctx.env);
    if let Err(e) = ensure_client_auth(&req, &secrets, &cfg) {
        return map_error_to_response(e);
    }

    let body: SendSmsRequest = unwrap_or_resp!(req.json().await, |e| SmsError::serialization(
        format!("Invalid JSON Body: {}", e)
    ));

    let service_key = unwrap_or_resp!(
        secrets
            .get_secret(&cfg.service_key_name)
            .ok_or_else(|| format!("secret {} is not set", cfg.service_key_name)),
        SmsError::config
    );

    let client = WorkerHttpClient;
    let store = RestTokenStore::new(
        &client,
        &cfg.supabase_url,
        &service_key,
        &cfg.token_table,
        &cfg.token_name,
    );

    let logic = SmsLogic::new(&client, &store, &cfg.sms_api_url);
    let result = logic.send(body).await;
    if let Ok(sent) = &result {
        log_info!("SMS sent to {} (id: {:?})", sent.phone, sent.sms_id);
    }

    respond!(json, result)
}

// =========================================================
// Entry Points
// =========================================================

#[event(fetch)]
pub async fn main(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    console_error_panic_hook::set_once();

    let cors = Cors::new()
        .with_origins(vec!["*"])
        .with_methods(vec![Method::Post, Method::Options])
        .with_allowed_headers(vec!["Content-Type", "Authorization", HEADER_API_KEY]);

    let router = Router::new();
    router
        .post_async(SendSmsRequest::PATH, send_sms)
        .options_async(SendSmsRequest::PATH, |_, _| async { Response::empty() })
        .run(req, env)
        .await?
        .with_cors(&cors)
}
