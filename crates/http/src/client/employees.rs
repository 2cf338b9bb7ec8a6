//! Employee records

use super::{ApiClient, ApiRequest, ClientError};
use crate::types::{Employee, EmployeeUpdate, Listing, NewEmployee, Role};

impl ApiClient {
    /// Employees visible to `role`
    pub async fn list_employees(&self, role: Role) -> Result<Vec<Employee>, ClientError> {
        let listing: Listing<Employee> = self.get(&format!("/{role}/employees")).await?;
        Ok(listing.into_vec())
    }

    pub async fn get_employee(&self, role: Role, id: &str) -> Result<Employee, ClientError> {
        self.get(&format!("/{role}/employees/{id}")).await
    }

    pub async fn create_employee(
        &self,
        role: Role,
        employee: &NewEmployee,
    ) -> Result<Employee, ClientError> {
        self.post(&format!("/{role}/employees"), employee).await
    }

    /// Apply a partial update
    pub async fn update_employee(
        &self,
        role: Role,
        id: &str,
        update: &EmployeeUpdate,
    ) -> Result<Employee, ClientError> {
        self.put(&format!("/{role}/employees/{id}"), update).await
    }

    pub async fn delete_employee(&self, role: Role, id: &str) -> Result<(), ClientError> {
        self.send(ApiRequest::delete(format!("/{role}/employees/{id}")))
            .await
            .map(|_| ())
    }
}
