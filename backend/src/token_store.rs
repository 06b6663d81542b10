use crate::error::{SmsError, SmsResult};
use crate::utils::request::{HttpClient, HttpMethod, HttpRequest};
use async_trait::async_trait;
use serde::Deserialize;
use sto_shared::{HEADER_API_KEY, HEADER_AUTHORIZATION};
use worker::Url;

// =========================================================
// 抽象接口：TokenStore
// =========================================================

/// 短信服务商 token 的来源
#[async_trait(?Send)]
pub trait TokenStore {
    async fn load_token(&self) -> SmsResult<String>;
}

#[derive(Deserialize)]
struct TokenRow {
    token: Option<String>,
}

// =========================================================
// 实现：通过 REST 接口读取数据库
// =========================================================

/// 从 `{table}` 表读取 `name = {name}` 的一行
pub struct RestTokenStore<'a, C: HttpClient> {
    client: &'a C,
    base_url: String,
    service_key: String,
    table: String,
    name: String,
}

impl<'a, C: HttpClient> RestTokenStore<'a, C> {
    pub fn new(client: &'a C, base_url: &str, service_key: &str, table: &str, name: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            table: table.to_string(),
            name: name.to_string(),
        }
    }

    fn query_url(&self) -> SmsResult<Url> {
        if self.base_url.is_empty() {
            return Err(SmsError::config("SUPABASE_URL is not configured"));
        }
        Url::parse_with_params(
            &format!("{}/rest/v1/{}", self.base_url, self.table),
            &[
                ("select", "token".to_string()),
                ("name", format!("eq.{}", self.name)),
                ("limit", "1".to_string()),
            ],
        )
        .map_err(|e| SmsError::config(format!("Invalid SUPABASE_URL: {}", e)).with_source(e))
    }
}

#[async_trait(?Send)]
impl<'a, C: HttpClient> TokenStore for RestTokenStore<'a, C> {
    async fn load_token(&self) -> SmsResult<String> {
        let url = self.query_url()?;
        let req = HttpRequest::new(url.as_str(), HttpMethod::Get)
            .with_header(HEADER_API_KEY, &self.service_key)
            .with_header(HEADER_AUTHORIZATION, &format!("Bearer {}", self.service_key))
            .with_header("Accept", "application/json");

        let resp = self
            .client
            .send(req)
            .await
            .map_err(|e| SmsError::store(e.to_string()))?;

        if !resp.is_success() {
            return Err(SmsError::store(format!(
                "Token query failed with status {}",
                resp.status
            )));
        }

        let rows: Vec<TokenRow> = resp
            .json()
            .map_err(|e| SmsError::store(format!("Malformed token rows: {}", e)))?;

        rows.into_iter()
            .find_map(|row| row.token.filter(|t| !t.trim().is_empty()))
            .ok_or_else(|| {
                SmsError::config(format!("SMS token '{}' not found in {}", self.name, self.table))
            })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::utils::request::MockHttpClient;
    use serde_json::json;
    use std::cell::Cell;

    /// 固定返回值的 TokenStore，并记录调用次数
    pub struct MockTokenStore {
        token: Option<String>,
        pub calls: Cell<usize>,
    }

    impl MockTokenStore {
        pub fn with_token(token: &str) -> Self {
            Self {
                token: Some(token.to_string()),
                calls: Cell::new(0),
            }
        }

        pub fn empty() -> Self {
            Self {
                token: None,
                calls: Cell::new(0),
            }
        }
    }

    #[async_trait(?Send)]
    impl TokenStore for MockTokenStore {
        async fn load_token(&self) -> SmsResult<String> {
            self.calls.set(self.calls.get() + 1);
            self.token
                .clone()
                .ok_or_else(|| SmsError::config("SMS token not found"))
        }
    }

    const TABLE_URL: &str = "https://db.example/rest/v1/app_secrets";

    #[tokio::test]
    async fn loads_first_non_empty_token() {
        let client = MockHttpClient::new();
        client.mock_response(TABLE_URL, 200, json!([{ "token": "  " }, { "token": "abc" }]));

        let store = RestTokenStore::new(&client, "https://db.example/", "svc", "app_secrets", "sms_ru");
        assert_eq!(store.load_token().await.unwrap(), "abc");

        let requests = client.requests.borrow();
        let req = &requests[0];
        assert!(req.url.contains("name=eq.sms_ru"));
        assert!(req.url.contains("select=token"));
        assert_eq!(req.headers.get(HEADER_API_KEY).unwrap(), "svc");
        assert_eq!(req.headers.get(HEADER_AUTHORIZATION).unwrap(), "Bearer svc");
    }

    #[tokio::test]
    async fn missing_row_is_config_error() {
        let client = MockHttpClient::new();
        client.mock_response(TABLE_URL, 200, json!([]));

        let store = RestTokenStore::new(&client, "https://db.example", "svc", "app_secrets", "sms_ru");
        let err = store.load_token().await.unwrap_err();
        assert_eq!(err.error_code(), "MISSING_CONFIG");
    }

    #[tokio::test]
    async fn http_failure_is_store_error() {
        let client = MockHttpClient::new();
        client.mock_response(TABLE_URL, 401, json!({ "message": "JWT expired" }));

        let store = RestTokenStore::new(&client, "https://db.example", "svc", "app_secrets", "sms_ru");
        let err = store.load_token().await.unwrap_err();
        assert_eq!(err.error_code(), "INTERNAL_STORE_ERROR");
    }

    #[tokio::test]
    async fn empty_base_url_fails_before_any_request() {
        let client = MockHttpClient::new();
        let store = RestTokenStore::new(&client, "", "svc", "app_secrets", "sms_ru");
        assert!(store.load_token().await.is_err());
        assert_eq!(client.request_count(), 0);
    }
}
