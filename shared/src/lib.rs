use serde::{Deserialize, Serialize};

pub mod calendar;
pub mod filter;
pub mod links;
pub mod phone;
pub mod popup;
pub mod protocol;
pub mod realtime;
pub mod session;

pub use chrono;

// =========================================================
// 常量定义 (Constants)
// =========================================================

/// BaaS 网关要求的匿名 key 请求头
pub const HEADER_API_KEY: &str = "apikey";
pub const HEADER_AUTHORIZATION: &str = "Authorization";

pub const TABLE_WHITELIST: &str = "whitelist";
pub const TABLE_PROFILES: &str = "profiles";
pub const TABLE_SETTINGS: &str = "settings";
pub const TABLE_SHOPS: &str = "shops";
pub const TABLE_ORDERS: &str = "orders";

/// `settings` 表中保存站点域名的 key
pub const SETTING_HOST_NAME: &str = "host_name";

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

/// 用户角色
///
/// 未知或缺失的角色一律按 `Master` 处理（权限最小）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    #[default]
    #[serde(other)]
    Master,
}

/// GoTrue `/auth/v1/user` 返回的用户（只取用到的字段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// 密码登录成功后的会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// 新建“цех”（车间）请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateShopRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// 服务工单（`orders` 表中的一行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: i64,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub car: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub master_id: Option<String>,
}

impl ServiceOrder {
    /// 参与表格搜索的文本列
    pub fn search_cells(&self) -> [&str; 6] {
        [
            self.number.as_deref().unwrap_or_default(),
            self.client_name.as_deref().unwrap_or_default(),
            self.car.as_deref().unwrap_or_default(),
            self.phone.as_deref().unwrap_or_default(),
            self.status.as_deref().unwrap_or_default(),
            self.due_date.as_deref().unwrap_or_default(),
        ]
    }
}
