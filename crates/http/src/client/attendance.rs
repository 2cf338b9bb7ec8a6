//! Attendance check-in/check-out

use super::{ApiClient, ApiRequest, ClientError};
use crate::types::{AttendanceRecord, Listing, Role};

impl ApiClient {
    /// Open today's attendance record
    pub async fn check_in(&self) -> Result<AttendanceRecord, ClientError> {
        self.execute(ApiRequest::post("/attendance/check-in")).await
    }

    /// Close the open attendance record
    pub async fn check_out(&self) -> Result<AttendanceRecord, ClientError> {
        self.execute(ApiRequest::post("/attendance/check-out")).await
    }

    /// The signed-in user's own attendance
    pub async fn attendance_history(&self) -> Result<Vec<AttendanceRecord>, ClientError> {
        let listing: Listing<AttendanceRecord> = self.get("/attendance/me").await?;
        Ok(listing.into_vec())
    }

    /// Attendance of everyone `role` oversees
    pub async fn team_attendance(&self, role: Role) -> Result<Vec<AttendanceRecord>, ClientError> {
        let listing: Listing<AttendanceRecord> = self.get(&format!("/{role}/attendance")).await?;
        Ok(listing.into_vec())
    }
}
