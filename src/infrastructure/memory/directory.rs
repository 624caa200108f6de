//! In-memory citizen directory for the CLI demo and integration tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::ports::tools::{CitizenDirectory, CitizenRecord, NewCitizen, ToolError};

/// Process-local resident registry.
#[derive(Default)]
pub struct InMemoryDirectory {
    records: RwLock<HashMap<String, CitizenRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a known resident, returning the assigned user id.
    pub async fn seed(&self, contact: &str, language: crate::domain::models::Language) -> String {
        let user_id = Uuid::new_v4().to_string();
        self.records.write().await.insert(
            contact.to_string(),
            CitizenRecord {
                user_id: user_id.clone(),
                role: "citizen".to_string(),
                language,
            },
        );
        user_id
    }
}

#[async_trait]
impl CitizenDirectory for InMemoryDirectory {
    async fn lookup_user(&self, contact: &str) -> Result<Option<CitizenRecord>, ToolError> {
        Ok(self.records.read().await.get(contact).cloned())
    }

    async fn create_user(&self, citizen: NewCitizen) -> Result<String, ToolError> {
        let mut records = self.records.write().await;
        if records.contains_key(&citizen.contact) {
            return Err(ToolError::Rejected(format!(
                "an account already exists for {}",
                citizen.contact
            )));
        }
        let user_id = Uuid::new_v4().to_string();
        records.insert(
            citizen.contact.clone(),
            CitizenRecord {
                user_id: user_id.clone(),
                role: "citizen".to_string(),
                language: citizen.language,
            },
        );
        Ok(user_id)
    }
}
