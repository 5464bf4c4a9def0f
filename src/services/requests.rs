use uuid::Uuid;

use super::catalog::{ensure_admin, CatalogService};
use crate::clock::SharedClock;
use crate::error::{AppError, Result};
use crate::models::{Exercise, ExerciseDraft, ExerciseRequest, RequestStatus, User};
use crate::store::Store;

/// User-submitted catalog additions and their admin review.
#[derive(Clone)]
pub struct RequestService<S: Store> {
    store: S,
    clock: SharedClock,
    catalog: CatalogService<S>,
}

fn newest_first(requests: &mut [ExerciseRequest]) {
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl<S: Store> RequestService<S> {
    pub fn new(store: S, clock: SharedClock, catalog: CatalogService<S>) -> Self {
        Self {
            store,
            clock,
            catalog,
        }
    }

    pub async fn submit(&self, requester: &User, name: &str, details: &str) -> Result<ExerciseRequest> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Exercise name is required".to_string()));
        }

        let request = ExerciseRequest {
            id: Uuid::new_v4().to_string(),
            requested_by: requester.email.clone(),
            name: name.to_string(),
            details: details.trim().to_string(),
            status: RequestStatus::Pending,
            admin_note: String::new(),
            created_at: self.clock.now(),
            reviewed_at: None,
            reviewed_by: None,
        };
        self.store.put(&request).await?;

        tracing::info!("{} requested exercise {:?}", requester.email, request.name);
        Ok(request)
    }

    pub async fn mine(&self, requester: &User) -> Result<Vec<ExerciseRequest>> {
        let mut requests = self
            .store
            .by_index::<ExerciseRequest>("requested_by", &requester.email)
            .await?;
        newest_first(&mut requests);
        Ok(requests)
    }

    pub async fn pending(&self, actor: &User) -> Result<Vec<ExerciseRequest>> {
        ensure_admin(actor)?;

        let mut requests = self
            .store
            .by_index::<ExerciseRequest>("status", RequestStatus::Pending.as_str())
            .await?;
        newest_first(&mut requests);
        Ok(requests)
    }

    /// Adds the requested exercise to the catalog and closes the request.
    /// The draft's name defaults to the requested name when blank.
    pub async fn approve(
        &self,
        actor: &User,
        request_id: &str,
        mut draft: ExerciseDraft,
    ) -> Result<(ExerciseRequest, Exercise)> {
        ensure_admin(actor)?;
        let mut request = self.pending_request(request_id).await?;

        if draft.name.trim().is_empty() {
            draft.name = request.name.clone();
        }
        let exercise = self.catalog.insert(draft, &actor.email).await?;

        request.status = RequestStatus::Approved;
        request.reviewed_at = Some(self.clock.now());
        request.reviewed_by = Some(actor.email.clone());
        request.admin_note = "Approved and added to the catalog.".to_string();
        self.store.put(&request).await?;

        tracing::info!("Request {} approved by {}", request.id, actor.email);
        Ok((request, exercise))
    }

    pub async fn reject(&self, actor: &User, request_id: &str, note: &str) -> Result<ExerciseRequest> {
        ensure_admin(actor)?;
        let mut request = self.pending_request(request_id).await?;

        request.status = RequestStatus::Rejected;
        request.reviewed_at = Some(self.clock.now());
        request.reviewed_by = Some(actor.email.clone());
        request.admin_note = note.trim().to_string();
        self.store.put(&request).await?;

        tracing::info!("Request {} rejected by {}", request.id, actor.email);
        Ok(request)
    }

    async fn pending_request(&self, request_id: &str) -> Result<ExerciseRequest> {
        let request = self
            .store
            .get::<ExerciseRequest>(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Exercise request not found".to_string()))?;

        if request.status != RequestStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Request was already {}",
                request.status.as_str()
            )));
        }
        Ok(request)
    }
}
