use serde::{Deserialize, Serialize};

pub const DEFAULT_SOLUTION: &str = "Mark";
pub const DEFAULT_LANDING_PAGE: &str = "Billing";
/// Buyers without a gateway account; the gateway then needs the address.
pub const SOLE_SOLUTION: &str = "Sole";

/// Merchant preferences for the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub solution: Option<String>,
    pub landing_page: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub preferences: Preferences,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl PaymentMethod {
    pub fn solution(&self) -> &str {
        present(&self.preferences.solution).unwrap_or(DEFAULT_SOLUTION)
    }

    pub fn landing_page(&self) -> &str {
        present(&self.preferences.landing_page).unwrap_or(DEFAULT_LANDING_PAGE)
    }

    pub fn logo_url(&self) -> &str {
        present(&self.preferences.logo_url).unwrap_or("")
    }

    pub fn address_required(&self) -> bool {
        self.preferences.solution.as_deref() == Some(SOLE_SOLUTION)
    }
}
