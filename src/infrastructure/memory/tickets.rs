//! In-memory ticket store for the CLI demo and integration tests.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::ports::tools::{
    CreateTicketRequest, TicketReceipt, TicketStore, TicketSummary, ToolError,
};

#[derive(Debug, Clone)]
struct StoredTicket {
    id: String,
    tracking_number: String,
    user_id: String,
    category: String,
    status: String,
    created_at: chrono::DateTime<Utc>,
}

/// Process-local ticket registry issuing TKT-YYYYMMDD-XXXXXX references.
#[derive(Default)]
pub struct InMemoryTicketStore {
    tickets: RwLock<Vec<StoredTicket>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.tickets.read().await.len()
    }
}

/// Generate a public ticket reference for today.
fn generate_tracking_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .to_uppercase()
        .chars()
        .take(6)
        .collect();
    format!("TKT-{date}-{suffix}")
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn create_ticket(&self, request: CreateTicketRequest) -> Result<TicketReceipt, ToolError> {
        if request.category.trim().is_empty() || request.description.trim().is_empty() {
            return Err(ToolError::Rejected(
                "category and description are required".to_string(),
            ));
        }

        let ticket = StoredTicket {
            id: Uuid::new_v4().to_string(),
            tracking_number: generate_tracking_number(),
            user_id: request.user_id.clone(),
            category: request.category.clone(),
            status: "open".to_string(),
            created_at: Utc::now(),
        };

        let receipt = TicketReceipt {
            id: ticket.id.clone(),
            tracking_number: ticket.tracking_number.clone(),
            status: ticket.status.clone(),
        };

        self.tickets.write().await.push(ticket);
        Ok(receipt)
    }

    async fn lookup_tickets(
        &self,
        user_id: &str,
        tracking_number: Option<&str>,
    ) -> Result<Vec<TicketSummary>, ToolError> {
        let tickets = self.tickets.read().await;
        Ok(tickets
            .iter()
            .filter(|t| t.user_id == user_id)
            .filter(|t| tracking_number.is_none_or(|tn| t.tracking_number == tn))
            .map(|t| TicketSummary {
                tracking_number: t.tracking_number.clone(),
                category: t.category.clone(),
                status: t.status.clone(),
                created_at: t.created_at,
            })
            .collect())
    }
}
