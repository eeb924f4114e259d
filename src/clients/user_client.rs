use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::access::{ensure_active, ensure_admin};
use crate::actor_framework::{Filter, ResourceClient};
use crate::domain::{Actor, EmployeeRole, Role, User, UserCreate, UserPatch};
use crate::error::{AppError, AppResult};
use crate::user_actor::{UserAction, UserActionResult};

/// Self-service signup payload.
#[derive(Debug, Clone)]
pub struct Signup {
    pub name: String,
    pub username: String,
    pub email: String,
}

/// Admin-created staff account.
#[derive(Debug, Clone)]
pub struct StaffAccount {
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub employee_role: Option<EmployeeRole>,
}

/// Bootstrap admin created at startup when missing.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSeed {
    pub name: String,
    pub username: String,
    pub email: String,
}

/// Client for the user directory.
#[derive(Clone)]
pub struct UserClient {
    inner: ResourceClient<User>,
    customer_sequence: Arc<AtomicU64>,
}

impl_client_methods!(UserClient, User, user);

impl UserClient {
    pub fn new(inner: ResourceClient<User>) -> Self {
        Self { inner, customer_sequence: Arc::new(AtomicU64::new(1)) }
    }

    /// Registers a customer and hands out the next `CUST-nnnn` number.
    #[instrument(skip(self, signup), fields(username = %signup.username))]
    pub async fn register_customer(&self, signup: Signup) -> AppResult<User> {
        debug!("Sending request");
        let number = self.customer_sequence.fetch_add(1, Ordering::SeqCst);
        let id = self
            .inner
            .create(UserCreate {
                name: signup.name,
                username: signup.username,
                email: signup.email,
                role: Role::Customer,
                employee_role: None,
                customer_number: Some(format!("CUST-{:04}", number)),
            })
            .await?;
        let user = self.inner.fetch(id).await?;
        info!(user_id = %user.id, "Customer registered");
        Ok(user)
    }

    #[instrument(skip(self, actor, account), fields(actor_id = %actor.id, username = %account.username))]
    pub async fn create_staff(&self, actor: &Actor, account: StaffAccount) -> AppResult<User> {
        ensure_admin(actor)?;
        if account.role == Role::Customer {
            return Err(AppError::validation("Customers sign up themselves"));
        }
        let id = self
            .inner
            .create(UserCreate {
                name: account.name,
                username: account.username,
                email: account.email,
                role: account.role,
                employee_role: account.employee_role,
                customer_number: None,
            })
            .await?;
        let user = self.inner.fetch(id).await?;
        info!(user_id = %user.id, role = %user.role, "Staff account created");
        Ok(user)
    }

    /// Admins read anyone; everybody else reads only themselves.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn get_user(&self, actor: &Actor, id: &str) -> AppResult<User> {
        ensure_active(actor)?;
        if !actor.is_admin() && actor.id != id {
            return Err(AppError::forbidden("You can only view your own account"));
        }
        self.find_user(id).await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn list_users(&self, actor: &Actor, role: Option<Role>) -> AppResult<Vec<User>> {
        ensure_admin(actor)?;
        let mut users = self
            .list_users_where(Filter::new(move |u: &User| role.map_or(true, |r| u.role == r)))
            .await?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    /// Active admins; the audience of admin broadcasts.
    pub(crate) async fn list_admins(&self) -> AppResult<Vec<User>> {
        self.list_users_where(Filter::new(|u: &User| u.role == Role::Admin && u.is_active))
            .await
    }

    /// Active employees whose specialty matches `specialty`.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn eligible_assignees(&self, actor: &Actor, specialty: EmployeeRole) -> AppResult<Vec<User>> {
        ensure_admin(actor)?;
        self.list_users_where(Filter::new(move |u: &User| {
            u.role == Role::Employee && u.is_active && u.employee_role == Some(specialty)
        }))
        .await
    }

    /// Profile edit by the user themselves or an admin. Only admins may change a specialty.
    #[instrument(skip(self, actor, patch), fields(actor_id = %actor.id))]
    pub async fn update_profile(&self, actor: &Actor, id: &str, patch: UserPatch) -> AppResult<User> {
        ensure_active(actor)?;
        if !actor.is_admin() {
            if actor.id != id {
                return Err(AppError::forbidden("You can only edit your own account"));
            }
            if patch.employee_role.is_some() || patch.customer_number.is_some() {
                return Err(AppError::forbidden("Only admins can change these fields"));
            }
        }
        Ok(self.inner.update(id.to_string(), patch).await?)
    }

    /// Enables or disables an account. Admins cannot lock themselves out.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn set_active(&self, actor: &Actor, id: &str, active: bool) -> AppResult<bool> {
        ensure_admin(actor)?;
        if actor.id == id && !active {
            return Err(AppError::validation("You cannot deactivate your own account"));
        }
        let UserActionResult::Changed(changed) =
            self.inner.perform_action(id.to_string(), UserAction::SetActive(active)).await?;
        info!(user_id = %id, active, changed, "Account activity updated");
        Ok(changed)
    }

    pub(crate) async fn add_assigned_order(&self, employee_id: &str, order_id: &str) -> AppResult<()> {
        self.inner
            .perform_action(employee_id.to_string(), UserAction::AddAssignedOrder(order_id.to_string()))
            .await?;
        Ok(())
    }

    pub(crate) async fn remove_assigned_order(&self, employee_id: &str, order_id: &str) -> AppResult<()> {
        self.inner
            .perform_action(employee_id.to_string(), UserAction::RemoveAssignedOrder(order_id.to_string()))
            .await?;
        Ok(())
    }

    /// Drops the account record. Callers detach assignments first.
    pub(crate) async fn remove_account(&self, id: &str) -> AppResult<User> {
        Ok(self.inner.delete(id.to_string()).await?)
    }

    /// Makes sure the bootstrap admin exists and is active. Idempotent.
    #[instrument(skip(self, seed), fields(email = %seed.email))]
    pub async fn seed_admin(&self, seed: &AdminSeed) -> AppResult<User> {
        let email = seed.email.trim().to_ascii_lowercase();
        let existing = self
            .list_users_where(Filter::new(move |u: &User| u.email == email))
            .await?
            .into_iter()
            .next();

        match existing {
            Some(user) if user.role == Role::Admin => {
                if !user.is_active {
                    warn!(user_id = %user.id, "Seed admin was deactivated; re-enabling");
                    self.inner.perform_action(user.id.clone(), UserAction::SetActive(true)).await?;
                    return self.find_user(&user.id).await;
                }
                debug!(user_id = %user.id, "Seed admin already present");
                Ok(user)
            }
            Some(user) => Err(AppError::validation(format!(
                "Seed admin email {} belongs to a {} account",
                user.email, user.role
            ))),
            None => {
                let id = self
                    .inner
                    .create(UserCreate {
                        name: seed.name.clone(),
                        username: seed.username.clone(),
                        email: seed.email.clone(),
                        role: Role::Admin,
                        employee_role: None,
                        customer_number: None,
                    })
                    .await?;
                info!(user_id = %id, "Seed admin created");
                self.find_user(&id).await
            }
        }
    }
}
