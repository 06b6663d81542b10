//! 运行时配置
//!
//! 编译期默认值来自环境变量（`STO_BACKEND_URL` / `STO_ANON_KEY` /
//! `STO_SMS_ENDPOINT`），LocalStorage 中的同名键可以覆盖它们。

use crate::web::LocalStorage;

pub const STORAGE_BACKEND_URL_KEY: &str = "sto_backend_url";
pub const STORAGE_ANON_KEY_KEY: &str = "sto_anon_key";
pub const STORAGE_SMS_ENDPOINT_KEY: &str = "sto_sms_endpoint";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppConfig {
    /// BaaS 根地址，如 `https://xyz.supabase.co`
    pub backend_url: String,
    pub anon_key: String,
    /// 短信函数根地址；为空时不显示“通知客户”按钮
    pub sms_endpoint: String,
}

fn pick(stored: Option<String>, compiled: Option<&str>) -> String {
    stored
        .filter(|v| !v.trim().is_empty())
        .or_else(|| compiled.map(str::to_string))
        .unwrap_or_default()
        .trim()
        .trim_end_matches('/')
        .to_string()
}

impl AppConfig {
    pub fn load() -> Self {
        Self {
            backend_url: pick(
                LocalStorage::get(STORAGE_BACKEND_URL_KEY),
                option_env!("STO_BACKEND_URL"),
            ),
            anon_key: pick(LocalStorage::get(STORAGE_ANON_KEY_KEY), option_env!("STO_ANON_KEY")),
            sms_endpoint: pick(
                LocalStorage::get(STORAGE_SMS_ENDPOINT_KEY),
                option_env!("STO_SMS_ENDPOINT"),
            ),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.backend_url.is_empty() && !self.anon_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_value_overrides_compiled_default() {
        assert_eq!(pick(Some("https://a.ru/".into()), Some("https://b.ru")), "https://a.ru");
        assert_eq!(pick(Some("  ".into()), Some("https://b.ru")), "https://b.ru");
        assert_eq!(pick(None, None), "");
    }

    #[test]
    fn configured_requires_url_and_key() {
        let mut cfg = AppConfig {
            backend_url: "https://x.supabase.co".into(),
            ..Default::default()
        };
        assert!(!cfg.is_configured());
        cfg.anon_key = "anon".into();
        assert!(cfg.is_configured());
    }
}
