use super::require_text;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// The company paying for the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerInfo {
    pub company_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl PayerInfo {
    pub fn new(
        company_id: impl Into<String>,
        name: impl Into<String>,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            company_id: require_text(company_id.into(), "payer_company_id")?,
            name: require_text(name.into(), "payer_name")?,
            email,
            phone,
        })
    }
}

/// The company receiving the money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeInfo {
    pub company_id: String,
    pub name: String,
}

impl PayeeInfo {
    pub fn new(company_id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            company_id: require_text(company_id.into(), "payee_company_id")?,
            name: require_text(name.into(), "payee_name")?,
        })
    }
}
