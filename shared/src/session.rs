//! 会话守卫的判定逻辑

use crate::{AuthUser, WhitelistEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionVerdict {
    Allowed,
    /// 未登录或会话失效
    NoSession,
    /// 已登录但邮箱不在白名单中
    NotWhitelisted,
}

impl SessionVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, SessionVerdict::Allowed)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 忽略大小写与首尾空白比较邮箱
pub fn is_whitelisted(email: &str, entries: &[WhitelistEntry]) -> bool {
    let email = normalize_email(email);
    !email.is_empty() && entries.iter().any(|e| normalize_email(&e.email) == email)
}

pub fn evaluate(user: Option<&AuthUser>, entries: &[WhitelistEntry]) -> SessionVerdict {
    let Some(user) = user else {
        return SessionVerdict::NoSession;
    };
    match user.email.as_deref() {
        Some(email) if is_whitelisted(email, entries) => SessionVerdict::Allowed,
        _ => SessionVerdict::NotWhitelisted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(email: &str) -> WhitelistEntry {
        WhitelistEntry {
            email: email.to_string(),
        }
    }

    fn user(email: Option<&str>) -> AuthUser {
        AuthUser {
            id: "u1".into(),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn no_user_means_no_session() {
        assert_eq!(evaluate(None, &[entry("a@b.ru")]), SessionVerdict::NoSession);
    }

    #[test]
    fn whitelist_match_ignores_case_and_spaces() {
        let u = user(Some(" Master@STO.ru "));
        assert_eq!(evaluate(Some(&u), &[entry("master@sto.ru")]), SessionVerdict::Allowed);
    }

    #[test]
    fn missing_or_unknown_email_is_rejected() {
        let entries = [entry("master@sto.ru")];
        assert_eq!(
            evaluate(Some(&user(Some("other@sto.ru"))), &entries),
            SessionVerdict::NotWhitelisted
        );
        assert_eq!(evaluate(Some(&user(None)), &entries), SessionVerdict::NotWhitelisted);
        assert!(!is_whitelisted("", &[entry("")]));
    }
}
