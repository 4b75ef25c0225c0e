use crate::domain::order::Order;
use crate::domain::user::CurrentUser;
use crate::error::Result;
use crate::infrastructure::sandbox::SandboxScript;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Seed data for a replay: the signed-in user, their orders, and how the
/// sandbox gateway should answer.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub user: CurrentUser,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub gateway: SandboxScript,
}

impl Fixture {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}
