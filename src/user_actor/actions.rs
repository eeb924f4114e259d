/// Custom actions for User entities.
#[derive(Debug, Clone)]
pub enum UserAction {
    /// Enables or disables the account.
    SetActive(bool),
    /// Records an order in the employee's `assigned_orders` back-reference.
    AddAssignedOrder(String),
    /// Drops an order from the `assigned_orders` back-reference.
    RemoveAssignedOrder(String),
}

/// Results from UserActions. `Changed(false)` means the action was a no-op.
#[derive(Debug, Clone, PartialEq)]
pub enum UserActionResult {
    Changed(bool),
}
