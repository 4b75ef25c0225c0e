use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// The signed-in buyer a request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: u64,
    pub company_id: u64,
    #[serde(default)]
    pub current_sign_in_ip: Option<IpAddr>,
}
