use super::{ApiClient, ApiRequest, ClientError};
use crate::types::{Department, Listing, NewDepartment, Role};

impl ApiClient {
    pub async fn list_departments(&self, role: Role) -> Result<Vec<Department>, ClientError> {
        let listing: Listing<Department> = self.get(&format!("/{role}/departments")).await?;
        Ok(listing.into_vec())
    }

    pub async fn create_department(
        &self,
        role: Role,
        department: &NewDepartment,
    ) -> Result<Department, ClientError> {
        self.post(&format!("/{role}/departments"), department).await
    }

    pub async fn delete_department(&self, role: Role, id: &str) -> Result<(), ClientError> {
        self.send(ApiRequest::delete(format!("/{role}/departments/{id}")))
            .await
            .map(|_| ())
    }
}
