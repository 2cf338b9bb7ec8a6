//! CLI commands

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use peopleos_http::types::{LeaveDecision, NewLeaveRequest, Role};
use peopleos_http::{ApiClient, ApiRequest, Method};
use serde_json::Value;
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and keep the session for later commands
    Login {
        #[arg(long, env = "PEOPLEOS_EMAIL")]
        email: String,

        #[arg(long, env = "PEOPLEOS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Send an arbitrary authenticated request
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,

        /// Path relative to the API base URL
        path: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },

    /// Employee records
    Employees {
        #[command(subcommand)]
        command: EmployeeCommands,
    },

    /// Departments
    Departments {
        #[command(subcommand)]
        command: DepartmentCommands,
    },

    /// Attendance check-in/check-out
    Attendance {
        #[command(subcommand)]
        command: AttendanceCommands,
    },

    /// Leave requests
    Leave {
        #[command(subcommand)]
        command: LeaveCommands,
    },
}

#[derive(Subcommand)]
pub enum EmployeeCommands {
    /// List employees
    List {
        #[arg(long, default_value = "hr")]
        role: Role,
    },

    /// Show one employee
    Get {
        id: String,

        #[arg(long, default_value = "hr")]
        role: Role,
    },
}

#[derive(Subcommand)]
pub enum DepartmentCommands {
    /// List departments
    List {
        #[arg(long, default_value = "admin")]
        role: Role,
    },
}

#[derive(Subcommand)]
pub enum AttendanceCommands {
    /// Check in for today
    CheckIn,

    /// Check out
    CheckOut,

    /// Own attendance, or the team's with --role
    History {
        #[arg(long)]
        role: Option<Role>,
    },
}

#[derive(Subcommand)]
pub enum LeaveCommands {
    /// Own leave requests, or those to review with --role
    List {
        #[arg(long)]
        role: Option<Role>,
    },

    /// File a leave request
    Apply {
        #[arg(long = "type", default_value = "annual")]
        leave_type: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Approve or reject a leave request
    Review {
        id: String,

        decision: Decision,

        #[arg(long, default_value = "manager")]
        role: Role,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Decision {
    Approve,
    Reject,
}

impl From<Decision> for LeaveDecision {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => LeaveDecision::Approve,
            Decision::Reject => LeaveDecision::Reject,
        }
    }
}

impl Commands {
    pub async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            Commands::Login { email, password } => {
                let response = client.login(&email, &password).await?;
                match response.user {
                    Some(user) => print_json(&user),
                    None => {
                        info!("Signed in as {email}");
                        Ok(())
                    }
                }
            }
            Commands::Logout => client.logout().await.map_err(Into::into),
            Commands::Whoami => print_json(&client.me().await?),
            Commands::Request { method, path, body } => {
                send_raw(client, &method, path, body.as_deref()).await
            }
            Commands::Employees { command } => command.execute(client).await,
            Commands::Departments { command } => command.execute(client).await,
            Commands::Attendance { command } => command.execute(client).await,
            Commands::Leave { command } => command.execute(client).await,
        }
    }
}

impl EmployeeCommands {
    pub async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            EmployeeCommands::List { role } => print_json(&client.list_employees(role).await?),
            EmployeeCommands::Get { id, role } => {
                print_json(&client.get_employee(role, &id).await?)
            }
        }
    }
}

impl DepartmentCommands {
    pub async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            DepartmentCommands::List { role } => {
                print_json(&client.list_departments(role).await?)
            }
        }
    }
}

impl AttendanceCommands {
    pub async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            AttendanceCommands::CheckIn => print_json(&client.check_in().await?),
            AttendanceCommands::CheckOut => {
                let record = client.check_out().await?;
                if let Some(worked) = record.worked() {
                    info!(
                        "Worked {}h{:02}m",
                        worked.num_hours(),
                        worked.num_minutes() % 60
                    );
                }
                print_json(&record)
            }
            AttendanceCommands::History { role: None } => {
                print_json(&client.attendance_history().await?)
            }
            AttendanceCommands::History { role: Some(role) } => {
                print_json(&client.team_attendance(role).await?)
            }
        }
    }
}

impl LeaveCommands {
    pub async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            LeaveCommands::List { role: None } => print_json(&client.my_leave_requests().await?),
            LeaveCommands::List { role: Some(role) } => {
                print_json(&client.leave_requests(role).await?)
            }
            LeaveCommands::Apply {
                leave_type,
                start,
                end,
                reason,
            } => {
                if end < start {
                    bail!("Leave cannot end ({end}) before it starts ({start})");
                }
                let request = NewLeaveRequest {
                    leave_type,
                    start_date: start,
                    end_date: end,
                    reason,
                };
                print_json(&client.apply_leave(&request).await?)
            }
            LeaveCommands::Review { id, decision, role } => {
                print_json(&client.review_leave(role, &id, decision.into()).await?)
            }
        }
    }
}

async fn send_raw(client: &ApiClient, method: &str, path: String, body: Option<&str>) -> Result<()> {
    let method: Method = method
        .to_ascii_uppercase()
        .parse()
        .with_context(|| format!("Invalid HTTP method '{method}'"))?;

    let mut request = ApiRequest::new(method, path);
    if let Some(body) = body {
        let body: Value = serde_json::from_str(body).context("Request body is not valid JSON")?;
        request = request.with_body(body);
    }

    let response = client.send(request).await?;
    info!(status = response.status.as_u16(), "Request completed");

    match serde_json::from_str::<Value>(&response.body) {
        Ok(value) => print_json(&value),
        Err(_) => {
            if !response.body.is_empty() {
                println!("{}", response.body);
            }
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
