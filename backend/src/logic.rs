use crate::error::{SmsError, SmsResult};
use crate::token_store::TokenStore;
use crate::utils::request::HttpClient;
use crate::utils::sms::gateway::SmsGateway;
use sto_shared::phone::PhoneNumber;
use sto_shared::protocol::{SendSmsRequest, SendSmsResponse};

/// 短信发送的业务逻辑
///
/// 不依赖 worker 的 Env / Request / Response，可以注入 Mock 做单元测试。
pub struct SmsLogic<'a, C: HttpClient, S: TokenStore> {
    store: &'a S,
    gateway: SmsGateway<'a, C>,
}

impl<'a, C: HttpClient, S: TokenStore> SmsLogic<'a, C, S> {
    pub fn new(client: &'a C, store: &'a S, api_url: &str) -> Self {
        Self {
            store,
            gateway: SmsGateway::new(client, api_url),
        }
    }

    /// 校验 -> 读取 token -> 调用服务商
    ///
    /// 校验失败时不会访问数据库。
    pub async fn send(&self, req: SendSmsRequest) -> SmsResult<SendSmsResponse> {
        let phone = PhoneNumber::parse(&req.phone)
            .map_err(|e| SmsError::from(e).in_op_with("sms.validate", "phone"))?;

        let message = req.message.trim();
        if message.is_empty() {
            return Err(SmsError::invalid_input("message is empty").in_op("sms.validate"));
        }

        let token = self
            .store
            .load_token()
            .await
            .map_err(|e| e.in_op("token.load"))?;

        self.gateway.send(&token, &phone, message).await
    }
}

// =========================================================
// 单元测试 (无需 Miniflare/Wasm 环境)
// =========================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmsErrorStatus;
    use crate::token_store::tests::MockTokenStore;
    use crate::utils::request::MockHttpClient;
    use serde_json::json;

    const SEND_URL: &str = "https://sms.example/sms/send";

    fn request(phone: &str, message: &str) -> SendSmsRequest {
        SendSmsRequest {
            phone: phone.into(),
            message: message.into(),
        }
    }

    #[tokio::test]
    async fn sends_to_normalized_phone() {
        let client = MockHttpClient::new();
        client.mock_response(
            SEND_URL,
            200,
            json!({
                "status": "OK",
                "sms": { "79161234567": { "status": "OK", "sms_id": "1-2" } }
            }),
        );
        let store = MockTokenStore::with_token("secret-token");
        let logic = SmsLogic::new(&client, &store, "https://sms.example");

        let resp = logic
            .send(request("+7 (916) 123-45-67", "  Ваш автомобиль готов  "))
            .await
            .unwrap();
        assert_eq!(resp.phone, "79161234567");
        assert_eq!(resp.sms_id.as_deref(), Some("1-2"));

        let requests = client.requests.borrow();
        assert!(requests[0].url.contains("api_id=secret-token"));
        assert!(requests[0].url.contains("to=79161234567"));
    }

    #[tokio::test]
    async fn invalid_phone_skips_token_lookup() {
        let client = MockHttpClient::new();
        let store = MockTokenStore::with_token("t");
        let logic = SmsLogic::new(&client, &store, "https://sms.example");

        let err = logic.send(request("12345", "hi")).await.unwrap_err();
        assert_eq!(err.status, SmsErrorStatus::InvalidInput);
        assert_eq!(store.calls.get(), 0);
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let client = MockHttpClient::new();
        let store = MockTokenStore::with_token("t");
        let logic = SmsLogic::new(&client, &store, "https://sms.example");

        let err = logic.send(request("89161234567", "   ")).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(store.calls.get(), 0);
    }

    #[tokio::test]
    async fn missing_token_is_traced() {
        let client = MockHttpClient::new();
        let store = MockTokenStore::empty();
        let logic = SmsLogic::new(&client, &store, "https://sms.example");

        let err = logic.send(request("89161234567", "hi")).await.unwrap_err();
        assert_eq!(err.status, SmsErrorStatus::Config);
        assert_eq!(err.spans().last().unwrap().operation, "token.load");
        assert_eq!(client.request_count(), 0);
    }
}
