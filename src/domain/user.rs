use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::OrderType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Employee,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Customer => "customer",
            Role::Employee => "employee",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Employee specialty. Same vocabulary as order types.
pub type EmployeeRole = OrderType;

/// Represents an account in the user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub employee_role: Option<EmployeeRole>,
    pub is_active: bool,
    /// Back-reference of `Order::assigned_to`; kept in sync by the order client.
    pub assigned_orders: BTreeSet<String>,
    pub customer_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a new user.
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub employee_role: Option<EmployeeRole>,
    pub customer_number: Option<String>,
}

/// Patch for updating an existing user's profile.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub employee_role: Option<EmployeeRole>,
    pub customer_number: Option<String>,
}

/// The authenticated caller of an operation, as supplied by the auth layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
    pub employee_role: Option<EmployeeRole>,
    pub is_active: bool,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    pub fn is_customer(&self) -> bool {
        self.role == Role::Customer
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            role: user.role,
            employee_role: user.employee_role,
            is_active: user.is_active,
        }
    }
}
