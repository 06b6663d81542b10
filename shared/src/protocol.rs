use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
pub trait ApiRequest: Serialize + DeserializeOwned {
    /// The response type returned by this request.
    type Response: Serialize + DeserializeOwned;
    /// The URL path (or suffix).
    const PATH: &'static str;
    /// The HTTP method.
    const METHOD: HttpMethod;
}

// =========================================================
// Request Definitions
// =========================================================

/// Send an SMS through the edge function.
///
/// `phone` is accepted in any common format and normalized server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendSmsRequest {
    pub phone: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendSmsResponse {
    /// Normalized phone (`7XXXXXXXXXX`)
    pub phone: String,
    #[serde(default)]
    pub sms_id: Option<String>,
    pub status: String,
}

impl ApiRequest for SendSmsRequest {
    type Response = SendSmsResponse;
    const PATH: &'static str = "/api/send-sms";
    const METHOD: HttpMethod = HttpMethod::Post;
}
