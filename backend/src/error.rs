use std::fmt;

use serde::{Deserialize, Serialize};
use sto_shared::phone::PhoneError;

// =========================================================
// 错误状态枚举
// =========================================================

/// 错误状态枚举
/// 包含错误对应的语义（状态码）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmsErrorStatus {
    /// 400: 请求参数校验失败（手机号、短信内容）
    InvalidInput,
    /// 400: JSON 解析或序列化错误
    Serialization,
    /// 401: 调用方未携带有效的 apikey
    Unauthorized,
    /// 500: 运行时配置缺失（如 SUPABASE_URL、短信 token）
    Config,
    /// 500: 数据库读取失败
    Store,
    /// 502: 短信服务商调用失败
    ExternalApi,
}

impl SmsErrorStatus {
    pub fn status_code(&self) -> u16 {
        match self {
            SmsErrorStatus::InvalidInput | SmsErrorStatus::Serialization => 400,
            SmsErrorStatus::Unauthorized => 401,
            SmsErrorStatus::Config | SmsErrorStatus::Store => 500,
            SmsErrorStatus::ExternalApi => 502,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SmsErrorStatus::InvalidInput => "INVALID_INPUT",
            SmsErrorStatus::Serialization => "JSON_PARSE_ERROR",
            SmsErrorStatus::Unauthorized => "UNAUTHORIZED",
            SmsErrorStatus::Config => "MISSING_CONFIG",
            SmsErrorStatus::Store => "INTERNAL_STORE_ERROR",
            SmsErrorStatus::ExternalApi => "UPSTREAM_ERROR",
        }
    }
}

// =========================================================
// 错误上下文追踪
// =========================================================

/// 结构化的错误追踪片段
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorSpan {
    /// 操作名称，如 "token.load", "sms.send"
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorSpan {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: None,
        }
    }

    pub fn with_detail(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: Some(detail.into()),
        }
    }
}

// =========================================================
// 核心错误类型
// =========================================================

/// 短信函数的错误类型
///
/// - status: 错误语义
/// - message: 错误消息
/// - source: 原始错误（可选）
/// - spans: 调用追踪栈
#[derive(Debug)]
pub struct SmsError {
    pub status: SmsErrorStatus,
    pub message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    spans: Vec<ErrorSpan>,
}

impl SmsError {
    pub fn new(status: SmsErrorStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
            spans: Vec::new(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(SmsErrorStatus::InvalidInput, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(SmsErrorStatus::Serialization, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(SmsErrorStatus::Unauthorized, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(SmsErrorStatus::Config, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(SmsErrorStatus::Store, message)
    }

    pub fn external_api(message: impl Into<String>) -> Self {
        Self::new(SmsErrorStatus::ExternalApi, message)
    }

    /// 添加操作追踪（无额外细节）
    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::new(operation));
        self
    }

    /// 添加操作追踪（带额外细节）
    pub fn in_op_with(mut self, operation: impl Into<String>, detail: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::with_detail(operation, detail));
        self
    }

    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status.status_code()
    }

    pub fn error_code(&self) -> &'static str {
        self.status.error_code()
    }

    pub fn spans(&self) -> &[ErrorSpan] {
        &self.spans
    }
}

impl fmt::Display for SmsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_code(), self.message)?;

        if !self.spans.is_empty() {
            write!(f, " | trace: ")?;
            for (i, span) in self.spans.iter().enumerate() {
                if i > 0 {
                    write!(f, " -> ")?;
                }
                write!(f, "{}", span.operation)?;
                if let Some(detail) = &span.detail {
                    write!(f, "({})", detail)?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for SmsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type SmsResult<T> = std::result::Result<T, SmsError>;

// =========================================================
// 传输用错误类型
// =========================================================

/// 返回给调用方的错误体
///
/// 5xx 错误不会携带 spans，避免泄露内部细节。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<ErrorSpan>,
}

impl From<&SmsError> for ErrorResponse {
    fn from(e: &SmsError) -> Self {
        if e.status_code() >= 500 {
            Self {
                code: e.error_code().to_string(),
                message: "Internal Server Error".to_string(),
                spans: Vec::new(),
            }
        } else {
            Self {
                code: e.error_code().to_string(),
                message: e.message.clone(),
                spans: e.spans.clone(),
            }
        }
    }
}

// =========================================================
// 类型转换实现
// =========================================================

impl From<worker::Error> for SmsError {
    fn from(e: worker::Error) -> Self {
        SmsError::external_api(e.to_string())
    }
}

impl From<serde_json::Error> for SmsError {
    fn from(e: serde_json::Error) -> Self {
        SmsError::serialization(e.to_string()).with_source(e)
    }
}

impl From<PhoneError> for SmsError {
    fn from(e: PhoneError) -> Self {
        SmsError::invalid_input(e.to_string()).with_source(e)
    }
}
