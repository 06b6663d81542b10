use super::report::SmsReport;
use crate::error::{SmsError, SmsResult};
use crate::utils::request::{HttpClient, HttpMethod, HttpRequest};
use sto_shared::phone::PhoneNumber;
use sto_shared::protocol::SendSmsResponse;
use worker::Url;

pub const DEFAULT_SMS_API_URL: &str = "https://sms.ru";

// =========================================================
// Gateway
// =========================================================

pub struct SmsGateway<'a, C: HttpClient> {
    client: &'a C,
    api_url: String,
}

impl<'a, C: HttpClient> SmsGateway<'a, C> {
    pub fn new(client: &'a C, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// 构造发送地址，所有参数都经过 URL 编码
    pub fn send_url(&self, token: &str, phone: &PhoneNumber, message: &str) -> SmsResult<Url> {
        Url::parse_with_params(
            &format!("{}/sms/send", self.api_url),
            &[
                ("api_id", token),
                ("to", phone.as_str()),
                ("msg", message),
                ("json", "1"),
            ],
        )
        .map_err(|e| SmsError::config(format!("Invalid SMS_API_URL: {}", e)).with_source(e))
    }

    pub async fn send(
        &self,
        token: &str,
        phone: &PhoneNumber,
        message: &str,
    ) -> SmsResult<SendSmsResponse> {
        let url = self.send_url(token, phone, message)?;
        let req = HttpRequest::new(url.as_str(), HttpMethod::Get)
            .with_header("Accept", "application/json");

        let resp = self
            .client
            .send(req)
            .await
            .map_err(|e| SmsError::from(e).in_op("sms.send"))?;

        if !resp.is_success() {
            return Err(SmsError::external_api(format!(
                "SMS provider responded with status {}",
                resp.status
            ))
            .in_op("sms.send"));
        }

        let report: SmsReport = serde_json::from_str(&resp.body).map_err(|e| {
            SmsError::external_api(format!("Malformed SMS provider response: {}", e))
                .in_op("sms.decode")
        })?;

        report
            .into_response(phone)
            .map_err(|e| e.in_op_with("sms.send", phone.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::request::MockHttpClient;
    use serde_json::json;

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("8 916 123 45 67").unwrap()
    }

    #[test]
    fn send_url_encodes_cyrillic_message() {
        let client = MockHttpClient::new();
        let gateway = SmsGateway::new(&client, "https://sms.example/");
        let url = gateway.send_url("tok en", &phone(), "Заказ готов").unwrap();

        assert_eq!(url.path(), "/sms/send");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("api_id".into(), "tok en".into()),
                ("to".into(), "79161234567".into()),
                ("msg".into(), "Заказ готов".into()),
                ("json".into(), "1".into()),
            ]
        );
        assert!(!url.as_str().contains(' '));
    }

    #[tokio::test]
    async fn send_returns_provider_result() {
        let client = MockHttpClient::new();
        client.mock_response(
            "https://sms.example/sms/send",
            200,
            json!({
                "status": "OK",
                "sms": { "79161234567": { "status": "OK", "sms_id": "42" } }
            }),
        );

        let gateway = SmsGateway::new(&client, "https://sms.example");
        let resp = gateway.send("token", &phone(), "hi").await.unwrap();
        assert_eq!(resp.sms_id.as_deref(), Some("42"));

        let requests = client.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].headers.get("Accept").unwrap(), "application/json");
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let client = MockHttpClient::new();
        client.mock_response("https://sms.example/sms/send", 503, json!({}));

        let gateway = SmsGateway::new(&client, "https://sms.example");
        let err = gateway.send("token", &phone(), "hi").await.unwrap_err();
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.spans()[0].operation, "sms.send");
    }
}
