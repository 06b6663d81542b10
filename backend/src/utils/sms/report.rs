use crate::error::{SmsError, SmsResult};
use serde::Deserialize;
use std::collections::HashMap;
use sto_shared::phone::PhoneNumber;
use sto_shared::protocol::SendSmsResponse;

const STATUS_OK: &str = "OK";

// =========================================================
// 服务商响应 (`json=1` 模式)
// =========================================================

/// 单个号码的发送结果
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SmsEntry {
    pub status: String,
    #[serde(default)]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub sms_id: Option<String>,
}

/// 整体响应
///
/// 请求级错误（如 api_id 无效）只有顶层 `status = "ERROR"`；
/// 号码级错误出现在 `sms.{phone}` 中。
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SmsReport {
    pub status: String,
    #[serde(default)]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub sms: HashMap<String, SmsEntry>,
    #[serde(default)]
    pub balance: Option<f64>,
}

fn describe(text: Option<&str>, code: Option<i64>) -> String {
    match (text, code) {
        (Some(text), Some(code)) => format!("{} (code {})", text, code),
        (Some(text), None) => text.to_string(),
        (None, Some(code)) => format!("code {}", code),
        (None, None) => "unknown error".to_string(),
    }
}

impl SmsReport {
    /// 提取指定号码的发送结果
    pub fn into_response(self, phone: &PhoneNumber) -> SmsResult<SendSmsResponse> {
        if self.status != STATUS_OK {
            return Err(SmsError::external_api(format!(
                "SMS provider rejected request: {}",
                describe(self.status_text.as_deref(), self.status_code)
            )));
        }

        let entry = self.sms.get(phone.as_str()).ok_or_else(|| {
            SmsError::external_api(format!("SMS provider returned no result for {}", phone))
        })?;

        if entry.status != STATUS_OK {
            return Err(SmsError::external_api(format!(
                "SMS to {} failed: {}",
                phone,
                describe(entry.status_text.as_deref(), entry.status_code)
            )));
        }

        Ok(SendSmsResponse {
            phone: phone.as_str().to_string(),
            sms_id: entry.sms_id.clone(),
            status: entry.status.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("79161234567").unwrap()
    }

    #[test]
    fn extracts_successful_entry() {
        let report: SmsReport = serde_json::from_value(json!({
            "status": "OK",
            "status_code": 100,
            "sms": {
                "79161234567": { "status": "OK", "status_code": 100, "sms_id": "000-1" }
            },
            "balance": 41.5
        }))
        .unwrap();

        let resp = report.into_response(&phone()).unwrap();
        assert_eq!(resp.phone, "79161234567");
        assert_eq!(resp.sms_id.as_deref(), Some("000-1"));
        assert_eq!(resp.status, "OK");
    }

    #[test]
    fn request_level_error() {
        let report: SmsReport = serde_json::from_value(json!({
            "status": "ERROR",
            "status_code": 200,
            "status_text": "Неправильный api_id"
        }))
        .unwrap();

        let err = report.into_response(&phone()).unwrap_err();
        assert_eq!(err.status_code(), 502);
        assert!(err.message.contains("Неправильный api_id (code 200)"));
    }

    #[test]
    fn number_level_error() {
        let report: SmsReport = serde_json::from_value(json!({
            "status": "OK",
            "sms": {
                "79161234567": { "status": "ERROR", "status_code": 207, "status_text": "На этот номер нельзя отправлять" }
            }
        }))
        .unwrap();

        let err = report.into_response(&phone()).unwrap_err();
        assert!(err.message.contains("207"));
    }

    #[test]
    fn missing_entry_is_error() {
        let report: SmsReport = serde_json::from_value(json!({ "status": "OK", "sms": {} })).unwrap();
        assert!(report.into_response(&phone()).is_err());
    }
}
