//! In-memory `FrontendService`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::proto::v1::frontend_service_server::FrontendService;
use crate::proto::v1::{
    CreateTicketRequest, DeleteTicketRequest, DeleteTicketResponse, GetTicketRequest, Ticket,
};

/// A `FrontendService` backed by a map.
///
/// `CreateTicket` without a ticket succeeds and returns an empty ticket;
/// with one, the ticket is stored under a fresh id. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct FakeFrontend {
    tickets: Arc<Mutex<HashMap<String, Ticket>>>,
}

impl FakeFrontend {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tickets.
    #[must_use]
    pub fn ticket_count(&self) -> usize {
        self.tickets.lock().len()
    }

    /// Looks up a stored ticket.
    #[must_use]
    pub fn ticket(&self, id: &str) -> Option<Ticket> {
        self.tickets.lock().get(id).cloned()
    }
}

fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[tonic::async_trait]
impl FrontendService for FakeFrontend {
    async fn create_ticket(
        &self,
        request: Request<CreateTicketRequest>,
    ) -> Result<Response<Ticket>, Status> {
        let Some(mut ticket) = request.into_inner().ticket else {
            return Ok(Response::new(Ticket::default()));
        };
        if !ticket.id.is_empty() {
            return Err(Status::invalid_argument("ticket id must not be set on create"));
        }

        ticket.id = Uuid::now_v7().to_string();
        ticket.create_time_unix_ms = now_unix_ms();
        self.tickets.lock().insert(ticket.id.clone(), ticket.clone());
        tracing::debug!(ticket_id = %ticket.id, "ticket created");
        Ok(Response::new(ticket))
    }

    async fn get_ticket(
        &self,
        request: Request<GetTicketRequest>,
    ) -> Result<Response<Ticket>, Status> {
        let id = request.into_inner().ticket_id;
        if id.is_empty() {
            return Err(Status::invalid_argument("ticket_id is required"));
        }
        self.ticket(&id)
            .map(Response::new)
            .ok_or_else(|| Status::not_found(format!("ticket {id} not found")))
    }

    async fn delete_ticket(
        &self,
        request: Request<DeleteTicketRequest>,
    ) -> Result<Response<DeleteTicketResponse>, Status> {
        let id = request.into_inner().ticket_id;
        if id.is_empty() {
            return Err(Status::invalid_argument("ticket_id is required"));
        }
        // Deleting an unknown ticket succeeds.
        self.tickets.lock().remove(&id);
        Ok(Response::new(DeleteTicketResponse {}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_create_returns_empty_ticket() {
        let frontend = FakeFrontend::new();
        let ticket = frontend
            .create_ticket(Request::new(CreateTicketRequest::default()))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(ticket, Ticket::default());
        assert_eq!(frontend.ticket_count(), 0);
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let frontend = FakeFrontend::new();
        let created = frontend
            .create_ticket(Request::new(CreateTicketRequest {
                ticket: Some(Ticket {
                    game_mode: "ranked".to_string(),
                    tags: HashMap::from([("region".to_string(), "eu".to_string())]),
                    ..Ticket::default()
                }),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(!created.id.is_empty());
        assert!(created.create_time_unix_ms > 0);

        let fetched = frontend
            .get_ticket(Request::new(GetTicketRequest {
                ticket_id: created.id.clone(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(fetched, created);

        frontend
            .delete_ticket(Request::new(DeleteTicketRequest {
                ticket_id: created.id.clone(),
            }))
            .await
            .unwrap();
        let err = frontend
            .get_ticket(Request::new(GetTicketRequest {
                ticket_id: created.id,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn test_client_supplied_id_rejected() {
        let frontend = FakeFrontend::new();
        let err = frontend
            .create_ticket(Request::new(CreateTicketRequest {
                ticket: Some(Ticket {
                    id: "mine".to_string(),
                    ..Ticket::default()
                }),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }
}
