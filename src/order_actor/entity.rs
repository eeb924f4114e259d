use chrono::Utc;

use super::actions::{OrderAction, OrderTransition, StatusUpdate};
use super::error::OrderError;
use crate::actor_framework::Entity;
use crate::domain::{
    ApprovalStatus, Order, OrderCreate, OrderDetails, OrderPatch, OrderStatus, PendingWork, SampleImage, SampleKind,
};

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Order {
    fn guard_not_superseded(&self, action: &'static str) -> Result<(), OrderError> {
        if self.status == OrderStatus::Superseded {
            return Err(OrderError::InvalidTransition { from: self.status, action });
        }
        Ok(())
    }

    fn apply_status_update(&mut self, update: StatusUpdate) -> Result<(), OrderError> {
        self.guard_not_superseded("update status")?;
        if let Some(status) = update.status {
            if status == OrderStatus::Superseded {
                return Err(OrderError::ValidationError(
                    "Superseded is set only by creating a revision order".into(),
                ));
            }
            self.status = status;
        }
        if let Some(reason) = non_empty(update.rejected_reason) {
            self.rejected_reason = Some(reason);
        }
        if let Some(report) = non_empty(update.report) {
            self.report = Some(report);
        }
        if let Some(tracking) = non_empty(update.tracking_number) {
            self.tracking_number = Some(tracking);
        }
        Ok(())
    }

    fn apply_customer_feedback(&mut self, approve: bool, comment: Option<String>) -> Result<(), OrderError> {
        let action = if approve { "approve the design" } else { "request a revision" };
        if !self.status.awaits_customer() {
            return Err(OrderError::InvalidTransition { from: self.status, action });
        }
        if approve {
            self.status = match self.status {
                OrderStatus::RevisionReady => OrderStatus::RevisionApproved,
                _ => OrderStatus::DesignApproved,
            };
            self.customer_approval_status = ApprovalStatus::Approved;
        } else {
            let comment = non_empty(comment)
                .ok_or_else(|| OrderError::ValidationError("A revision comment is required".into()))?;
            self.notes = if self.notes.is_empty() {
                format!("Revision request: {}", comment)
            } else {
                format!("{}\n\nRevision request: {}", self.notes, comment)
            };
            self.status = OrderStatus::InRevision;
            self.customer_approval_status = ApprovalStatus::RevisionRequested;
        }
        Ok(())
    }

    fn publish_samples(&mut self, kind: SampleKind, files: Vec<crate::domain::StoredFile>, comments: Option<String>) {
        let uploaded_at = Utc::now();
        let comments = non_empty(comments);
        self.sample_images.extend(files.into_iter().map(|file| SampleImage {
            file,
            kind,
            comments: comments.clone(),
            uploaded_at,
        }));
        self.status = match kind {
            SampleKind::Initial => OrderStatus::WaitingForApproval,
            SampleKind::Revision => OrderStatus::RevisionReady,
        };
        self.customer_approval_status = ApprovalStatus::Pending;
    }
}

impl Entity for Order {
    const KIND: &'static str = "order";

    type Id = String;
    type CreateParams = OrderCreate;
    type Patch = OrderPatch;
    type Action = OrderAction;
    type ActionResult = OrderTransition;
    type Error = OrderError;

    fn id(&self) -> &String {
        &self.id
    }

    /// Creates a new Order from creation parameters.
    ///
    /// The order starts `In Progress`, unassigned, awaiting customer approval.
    /// `order_type` and `required_employee_role` both come from the details.
    fn from_create_params(id: String, params: OrderCreate) -> Result<Self, OrderError> {
        if params.files.is_empty() {
            return Err(OrderError::ValidationError("At least one file is required".into()));
        }
        let order_type = params.details.order_type();
        let now = Utc::now();
        Ok(Self {
            id,
            order_number: params.order_number,
            customer_id: params.customer_id,
            order_type,
            details: params.details,
            files: params.files,
            notes: params.notes.trim().to_string(),
            status: OrderStatus::InProgress,
            customer_approval_status: ApprovalStatus::Pending,
            sample_images: Vec::new(),
            assigned_to: None,
            required_employee_role: order_type,
            revision: params.revision,
            pending_work: PendingWork::None,
            rejected_reason: None,
            report: None,
            tracking_number: None,
            price_cents: None,
            due_date: None,
            invoice_id: None,
            has_invoice: false,
            invoice_status: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("orderNumber", self.order_number.clone())]
    }

    /// Applies an admin edit.
    ///
    /// A patch carrying a different order type is rejected; type-specific
    /// fields are overlaid and re-validated against the existing type.
    fn on_update(&mut self, patch: OrderPatch) -> Result<(), OrderError> {
        if let Some(order_type) = patch.order_type {
            if order_type != self.order_type {
                return Err(OrderError::ValidationError(format!(
                    "orderType cannot change after creation (is {}, got {})",
                    self.order_type, order_type
                )));
            }
        }
        if let Some(edit) = patch.fields {
            let merged = self.details.to_fields().overlay(&edit);
            self.details = OrderDetails::from_fields(self.order_type, &merged).map_err(|missing| {
                OrderError::ValidationError(format!("Missing required fields: {}", missing.join(", ")))
            })?;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes.trim().to_string();
        }
        if let Some(price) = patch.price_cents {
            if price < 0 {
                return Err(OrderError::ValidationError("price cannot be negative".into()));
            }
            self.price_cents = Some(price);
        }
        if let Some(due) = patch.due_date {
            self.due_date = Some(due);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn handle_action(&mut self, action: OrderAction) -> Result<OrderTransition, OrderError> {
        let before = self.clone();
        match action {
            OrderAction::Assign { employee_id } => {
                self.guard_not_superseded("assign")?;
                self.assigned_to = Some(employee_id);
            }
            OrderAction::Unassign => {
                self.assigned_to = None;
            }
            OrderAction::UpdateStatus(update) => self.apply_status_update(update)?,
            OrderAction::ReplaceNotes(notes) => {
                self.notes = notes.trim().to_string();
            }
            OrderAction::ApproveDesign => self.apply_customer_feedback(true, None)?,
            OrderAction::RequestRevision { comment } => self.apply_customer_feedback(false, Some(comment))?,
            OrderAction::AddSamples { kind, files, comments } => {
                self.guard_not_superseded("upload samples")?;
                if files.is_empty() {
                    return Err(OrderError::ValidationError("At least one sample file is required".into()));
                }
                self.publish_samples(kind, files, comments);
            }
            OrderAction::SubmitPendingWork(submission) => {
                self.guard_not_superseded("submit work")?;
                if submission.files.is_empty() && submission.report.is_none() && submission.proposed_status.is_none() {
                    return Err(OrderError::ValidationError("Submitted work is empty".into()));
                }
                if submission.proposed_status == Some(OrderStatus::Superseded) {
                    return Err(OrderError::ValidationError("Superseded cannot be proposed".into()));
                }
                self.pending_work = PendingWork::Pending { submission };
            }
            OrderAction::ApprovePendingWork => {
                self.guard_not_superseded("approve work")?;
                let PendingWork::Pending { submission } = &self.pending_work else {
                    return Err(OrderError::NoPendingWork);
                };
                let submission = submission.clone();
                self.pending_work = PendingWork::None;
                if !submission.files.is_empty() {
                    let kind = match submission.proposed_status {
                        Some(OrderStatus::RevisionReady) => SampleKind::Revision,
                        _ => SampleKind::Initial,
                    };
                    self.publish_samples(kind, submission.files, None);
                }
                if let Some(status) = submission.proposed_status {
                    self.status = status;
                }
                if let Some(report) = submission.report {
                    self.report = Some(report);
                }
            }
            OrderAction::RejectPendingWork { reason } => {
                let reason = non_empty(Some(reason))
                    .ok_or_else(|| OrderError::ValidationError("A rejection reason is required".into()))?;
                let PendingWork::Pending { submission } = &self.pending_work else {
                    return Err(OrderError::NoPendingWork);
                };
                self.pending_work = PendingWork::Rejected {
                    submission: submission.clone(),
                    reason,
                    rejected_at: Utc::now(),
                };
            }
            OrderAction::MarkSuperseded => {
                if self.status != OrderStatus::Completed {
                    return Err(OrderError::InvalidTransition { from: self.status, action: "supersede" });
                }
                self.status = OrderStatus::Superseded;
                self.pending_work = PendingWork::None;
            }
            OrderAction::LinkInvoice { invoice_id, status } => {
                if let Some(existing) = &self.invoice_id {
                    if *existing != invoice_id {
                        return Err(OrderError::Conflict(format!(
                            "order {} is already invoiced by {}",
                            self.order_number, existing
                        )));
                    }
                }
                self.invoice_id = Some(invoice_id);
                self.has_invoice = true;
                self.invoice_status = Some(status);
            }
            OrderAction::SetInvoiceStatus(status) => {
                if !self.has_invoice {
                    return Err(OrderError::ValidationError("Order has no invoice".into()));
                }
                self.invoice_status = Some(status);
            }
            OrderAction::UnlinkInvoice => {
                self.invoice_id = None;
                self.has_invoice = false;
                self.invoice_status = None;
            }
        }
        self.updated_at = Utc::now();
        Ok(OrderTransition { before, after: self.clone() })
    }
}
