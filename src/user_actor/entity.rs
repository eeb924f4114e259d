use std::collections::BTreeSet;

use chrono::Utc;

use super::actions::{UserAction, UserActionResult};
use super::error::UserError;
use crate::actor_framework::Entity;
use crate::domain::{Role, User, UserCreate, UserPatch};

fn normalize_email(email: &str) -> Result<String, UserError> {
    let email = email.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(UserError::ValidationError(format!("Invalid email: {:?}", email))),
    }
}

fn required(value: &str, field: &str) -> Result<String, UserError> {
    let value = value.trim();
    if value.is_empty() {
        Err(UserError::ValidationError(format!("{} is required", field)))
    } else {
        Ok(value.to_string())
    }
}

impl User {
    fn check_employee_role(&self) -> Result<(), UserError> {
        match (self.role, self.employee_role) {
            (Role::Employee, None) => Err(UserError::ValidationError("employeeRole is required for employees".into())),
            (Role::Customer | Role::Admin, Some(_)) => Err(UserError::ValidationError(format!(
                "employeeRole is only allowed for employees, not {}",
                self.role
            ))),
            _ => Ok(()),
        }
    }
}

impl Entity for User {
    const KIND: &'static str = "user";

    type Id = String;
    type CreateParams = UserCreate;
    type Patch = UserPatch;
    type Action = UserAction;
    type ActionResult = UserActionResult;
    type Error = UserError;

    fn id(&self) -> &String {
        &self.id
    }

    /// Creates a new, active User from creation parameters.
    ///
    /// Email and username are normalised to lowercase so the uniqueness check
    /// is case-insensitive.
    fn from_create_params(id: String, params: UserCreate) -> Result<Self, UserError> {
        Ok(Self {
            id,
            name: required(&params.name, "name")?,
            username: required(&params.username, "username")?.to_ascii_lowercase(),
            email: normalize_email(&params.email)?,
            role: params.role,
            employee_role: params.employee_role,
            is_active: true,
            assigned_orders: BTreeSet::new(),
            customer_number: params.customer_number,
            created_at: Utc::now(),
        })
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        let mut keys = vec![("email", self.email.clone()), ("username", self.username.clone())];
        if let Some(number) = &self.customer_number {
            keys.push(("customerNumber", number.clone()));
        }
        keys
    }

    fn on_create(&mut self) -> Result<(), UserError> {
        self.check_employee_role()
    }

    /// Updates the user's profile information.
    ///
    /// The role itself is fixed; only the specialty of an employee may change.
    fn on_update(&mut self, patch: UserPatch) -> Result<(), UserError> {
        if let Some(name) = patch.name {
            self.name = required(&name, "name")?;
        }
        if let Some(email) = patch.email {
            self.email = normalize_email(&email)?;
        }
        if let Some(employee_role) = patch.employee_role {
            self.employee_role = Some(employee_role);
        }
        if let Some(number) = patch.customer_number {
            self.customer_number = Some(number);
        }
        self.check_employee_role()
    }

    fn handle_action(&mut self, action: UserAction) -> Result<UserActionResult, UserError> {
        match action {
            UserAction::SetActive(active) => {
                let changed = self.is_active != active;
                self.is_active = active;
                Ok(UserActionResult::Changed(changed))
            }
            UserAction::AddAssignedOrder(order_id) => {
                if self.role != Role::Employee {
                    return Err(UserError::ValidationError(format!(
                        "Only employees can hold assignments; {} is a {}",
                        self.id, self.role
                    )));
                }
                Ok(UserActionResult::Changed(self.assigned_orders.insert(order_id)))
            }
            UserAction::RemoveAssignedOrder(order_id) => {
                Ok(UserActionResult::Changed(self.assigned_orders.remove(&order_id)))
            }
        }
    }
}
