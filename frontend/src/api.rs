//! 后端访问层
//!
//! 直接调用 BaaS 的 REST / Auth 接口，只覆盖本应用用到的几个查询。

use crate::config::AppConfig;
use crate::web::{HttpClient, HttpError, HttpRequestBuilder};
use serde::Serialize;
use sto_shared::protocol::ApiRequest;
use sto_shared::{
    AuthSession, AuthUser, CreateShopRequest, HEADER_API_KEY, HEADER_AUTHORIZATION, Profile,
    SETTING_HOST_NAME, ServiceOrder, Setting, Shop, TABLE_ORDERS, TABLE_PROFILES, TABLE_SETTINGS,
    TABLE_SHOPS, TABLE_WHITELIST, UserRole, WhitelistEntry,
};

#[derive(Debug, Clone)]
pub enum ApiError {
    Http(HttpError),
    /// 非 2xx 响应：(状态码, 响应体)
    Status(u16, String),
    NotConfigured,
    Empty,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Http(e) => write!(f, "{}", e),
            ApiError::Status(code, body) => write!(f, "HTTP {}: {}", code, body),
            ApiError::NotConfigured => write!(f, "Адрес сервера не настроен"),
            ApiError::Empty => write!(f, "Сервер вернул пустой ответ"),
        }
    }
}

impl From<HttpError> for ApiError {
    fn from(e: HttpError) -> Self {
        ApiError::Http(e)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn encode(value: &str) -> String {
    js_sys::encode_uri_component(value).into()
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BackendApi {
    pub base_url: String,
    anon_key: String,
    access_token: Option<String>,
    sms_endpoint: String,
}

impl BackendApi {
    pub fn new(config: &AppConfig) -> ApiResult<Self> {
        if !config.is_configured() {
            return Err(ApiError::NotConfigured);
        }
        Ok(Self {
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: None,
            sms_endpoint: config.sms_endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn sms_enabled(&self) -> bool {
        !self.sms_endpoint.is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 附加 apikey 与 Bearer 头；未登录时使用匿名 key
    fn authorize(&self, builder: HttpRequestBuilder) -> HttpRequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        builder
            .header(HEADER_API_KEY, &self.anon_key)
            .header(HEADER_AUTHORIZATION, &format!("Bearer {}", bearer))
    }

    async fn get_rows<T: serde::de::DeserializeOwned>(&self, table: &str, query: &str) -> ApiResult<Vec<T>> {
        let url = self.url(&format!("/rest/v1/{}?{}", table, query));
        let res = self
            .authorize(HttpClient::get(&url))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !res.ok() {
            let status = res.status();
            return Err(ApiError::Status(status, res.text().await.unwrap_or_default()));
        }
        Ok(res.json().await?)
    }

    // =========================================================
    // Auth
    // =========================================================

    /// 邮箱 + 密码登录
    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<AuthSession> {
        let url = self.url("/auth/v1/token?grant_type=password");
        let res = HttpClient::post(&url)
            .header(HEADER_API_KEY, &self.anon_key)
            .json(&PasswordGrant { email, password })?
            .send()
            .await?;

        if !res.ok() {
            let status = res.status();
            return Err(ApiError::Status(status, res.text().await.unwrap_or_default()));
        }
        Ok(res.json().await?)
    }

    /// 当前用户；令牌无效或过期时返回 `Ok(None)`
    pub async fn current_user(&self) -> ApiResult<Option<AuthUser>> {
        if self.access_token.is_none() {
            return Ok(None);
        }
        let res = self
            .authorize(HttpClient::get(&self.url("/auth/v1/user")))
            .send()
            .await?;

        match res.status() {
            401 | 403 => Ok(None),
            _ if res.ok() => Ok(Some(res.json().await?)),
            status => Err(ApiError::Status(status, res.text().await.unwrap_or_default())),
        }
    }

    pub async fn sign_out(&self) -> ApiResult<()> {
        if self.access_token.is_none() {
            return Ok(());
        }
        let res = self
            .authorize(HttpClient::post(&self.url("/auth/v1/logout")))
            .send()
            .await?;
        if !res.ok() {
            return Err(ApiError::Status(res.status(), String::new()));
        }
        Ok(())
    }

    // =========================================================
    // Tables
    // =========================================================

    /// 白名单候选行（大小写不敏感匹配，最终判定在 `session::evaluate`）
    pub async fn whitelist_entries(&self, email: &str) -> ApiResult<Vec<WhitelistEntry>> {
        let query = format!("select=email&email=ilike.{}", encode(email.trim()));
        self.get_rows(TABLE_WHITELIST, &query).await
    }

    pub async fn user_role(&self, user_id: &str) -> ApiResult<UserRole> {
        let query = format!("select=id,role&id=eq.{}&limit=1", encode(user_id));
        let rows: Vec<Profile> = self.get_rows(TABLE_PROFILES, &query).await?;
        Ok(rows.into_iter().next().map(|p| p.role).unwrap_or_default())
    }

    pub async fn host_name(&self) -> ApiResult<Option<String>> {
        let query = format!("select=key,value&key=eq.{}&limit=1", SETTING_HOST_NAME);
        let rows: Vec<Setting> = self.get_rows(TABLE_SETTINGS, &query).await?;
        Ok(rows.into_iter().next().and_then(|s| s.value))
    }

    /// 技师只能看到分配给自己的工单
    pub async fn list_orders(&self, master_id: Option<&str>) -> ApiResult<Vec<ServiceOrder>> {
        let mut query = String::from("select=*&order=created_at.desc");
        if let Some(id) = master_id {
            query.push_str(&format!("&master_id=eq.{}", encode(id)));
        }
        self.get_rows(TABLE_ORDERS, &query).await
    }

    pub async fn create_shop(&self, req: &CreateShopRequest) -> ApiResult<Shop> {
        let url = self.url(&format!("/rest/v1/{}", TABLE_SHOPS));
        let res = self
            .authorize(HttpClient::post(&url))
            .header("Prefer", "return=representation")
            .json(req)?
            .send()
            .await?;

        if !res.ok() {
            let status = res.status();
            return Err(ApiError::Status(status, res.text().await.unwrap_or_default()));
        }
        let rows: Vec<Shop> = res.json().await?;
        rows.into_iter().next().ok_or(ApiError::Empty)
    }

    // =========================================================
    // Edge functions
    // =========================================================

    /// 调用自有函数端点（例如短信发送）
    pub async fn call<R: ApiRequest>(&self, req: &R) -> ApiResult<R::Response> {
        if self.sms_endpoint.is_empty() {
            return Err(ApiError::NotConfigured);
        }
        let url = format!("{}{}", self.sms_endpoint, R::PATH);
        let res = self
            .authorize(HttpClient::request(R::METHOD.into(), &url))
            .json(req)?
            .send()
            .await?;

        if !res.ok() {
            let status = res.status();
            return Err(ApiError::Status(status, res.text().await.unwrap_or_default()));
        }
        Ok(res.json().await?)
    }

    /// 实时通道地址（http(s) -> ws(s)）
    pub fn realtime_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_base, self.anon_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(url: &str) -> BackendApi {
        BackendApi::new(&AppConfig {
            backend_url: url.into(),
            anon_key: "anon".into(),
            sms_endpoint: String::new(),
        })
        .unwrap()
    }

    #[test]
    fn requires_configuration() {
        assert!(matches!(
            BackendApi::new(&AppConfig::default()),
            Err(ApiError::NotConfigured)
        ));
    }

    #[test]
    fn realtime_url_switches_scheme() {
        assert_eq!(
            api("https://x.supabase.co/").realtime_url(),
            "wss://x.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
        assert_eq!(
            api("http://localhost:54321").realtime_url(),
            "ws://localhost:54321/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
    }

    #[test]
    fn token_is_attached_and_sms_disabled_by_default() {
        let api = api("https://x.supabase.co").with_token("jwt");
        assert_eq!(api.access_token(), Some("jwt"));
        assert!(!api.sms_enabled());
    }
}
