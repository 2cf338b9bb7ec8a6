//! Leave requests and their review

use super::{ApiClient, ClientError};
use crate::types::{LeaveDecision, LeaveRequest, LeaveReview, Listing, NewLeaveRequest, Role};
use tracing::info;

impl ApiClient {
    /// Leave requests filed by the signed-in user
    pub async fn my_leave_requests(&self) -> Result<Vec<LeaveRequest>, ClientError> {
        let listing: Listing<LeaveRequest> = self.get("/leave-requests/me").await?;
        Ok(listing.into_vec())
    }

    pub async fn apply_leave(&self, request: &NewLeaveRequest) -> Result<LeaveRequest, ClientError> {
        self.post("/leave-requests", request).await
    }

    /// Leave requests awaiting or past review by `role`
    pub async fn leave_requests(&self, role: Role) -> Result<Vec<LeaveRequest>, ClientError> {
        let listing: Listing<LeaveRequest> = self.get(&format!("/{role}/leave-requests")).await?;
        Ok(listing.into_vec())
    }

    pub async fn review_leave(
        &self,
        role: Role,
        id: &str,
        decision: LeaveDecision,
    ) -> Result<LeaveRequest, ClientError> {
        let review = LeaveReview {
            status: decision.status(),
            comment: None,
        };
        let updated: LeaveRequest = self
            .patch(&format!("/{role}/leave-requests/{id}"), &review)
            .await?;
        info!(id, status = ?updated.status, "Leave request reviewed");
        Ok(updated)
    }
}
