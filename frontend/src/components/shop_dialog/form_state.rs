//! 表单状态管理模块
//!
//! 将零散的 signal 整合为 `FormState` 结构体，负责：
//! - 数据的持有
//! - 数据的重置
//! - 数据到请求对象的转换（含校验）

use leptos::prelude::*;
use std::fmt;
use sto_shared::CreateShopRequest;
use sto_shared::phone::{PhoneError, PhoneNumber};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopFormError {
    EmptyName,
    Phone(PhoneError),
}

impl fmt::Display for ShopFormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShopFormError::EmptyName => write!(f, "Укажите название"),
            ShopFormError::Phone(PhoneError::Empty) => write!(f, "Укажите телефон"),
            ShopFormError::Phone(PhoneError::InvalidLength(n)) => {
                write!(f, "Телефон должен содержать 10 или 11 цифр (сейчас {})", n)
            }
            ShopFormError::Phone(PhoneError::InvalidPrefix) => {
                write!(f, "Телефон должен начинаться с +7, 8 или 9")
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// 校验并构造请求；可选字段为空白时省略，电话存为规范化的纯数字形式
pub fn build_shop_request(
    name: &str,
    address: &str,
    phone: &str,
) -> Result<CreateShopRequest, ShopFormError> {
    let name = non_empty(name).ok_or(ShopFormError::EmptyName)?;
    let phone = match non_empty(phone) {
        Some(raw) => Some(
            PhoneNumber::parse(&raw)
                .map_err(ShopFormError::Phone)?
                .as_str()
                .to_string(),
        ),
        None => None,
    };

    Ok(CreateShopRequest {
        name,
        address: non_empty(address),
        phone,
    })
}

/// 表单状态结构体
///
/// 使用 `RwSignal` 因为它实现了 `Copy` trait，非常适合作为 Props 在组件间传递。
#[derive(Clone, Copy)]
pub struct FormState {
    pub name: RwSignal<String>,
    pub address: RwSignal<String>,
    pub phone: RwSignal<String>,
}

impl FormState {
    pub fn new() -> Self {
        Self {
            name: RwSignal::new(String::new()),
            address: RwSignal::new(String::new()),
            phone: RwSignal::new(String::new()),
        }
    }

    /// 重置表单到初始状态
    pub fn reset(&self) {
        self.name.set(String::new());
        self.address.set(String::new());
        self.phone.set(String::new());
    }

    pub fn to_request(&self) -> Result<CreateShopRequest, ShopFormError> {
        build_shop_request(
            &self.name.get_untracked(),
            &self.address.get_untracked(),
            &self.phone.get_untracked(),
        )
    }
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_required() {
        assert_eq!(
            build_shop_request("   ", "", ""),
            Err(ShopFormError::EmptyName)
        );
    }

    #[test]
    fn optional_fields_are_omitted_when_blank() {
        let req = build_shop_request(" Цех №1 ", "  ", "").unwrap();
        assert_eq!(req.name, "Цех №1");
        assert_eq!(req.address, None);
        assert_eq!(req.phone, None);
    }

    #[test]
    fn phone_is_normalized() {
        let req = build_shop_request("Цех", "ул. Ленина, 1", "8 (916) 123-45-67").unwrap();
        assert_eq!(req.phone.as_deref(), Some("79161234567"));
        assert_eq!(req.address.as_deref(), Some("ул. Ленина, 1"));
    }

    #[test]
    fn invalid_phone_blocks_submit() {
        let err = build_shop_request("Цех", "", "12345").unwrap_err();
        assert_eq!(err, ShopFormError::Phone(PhoneError::InvalidLength(5)));
        assert!(err.to_string().contains("5"));
    }
}
