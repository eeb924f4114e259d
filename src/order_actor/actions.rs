use crate::domain::{Order, OrderStatus, PaymentStatus, SampleKind, StoredFile, WorkSubmission};

/// Admin/employee status edit. Fields left `None` are untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub status: Option<OrderStatus>,
    pub rejected_reason: Option<String>,
    pub report: Option<String>,
    pub tracking_number: Option<String>,
}

/// Custom actions for Order entities: every lifecycle transition that touches
/// a single order document.
#[derive(Debug, Clone)]
pub enum OrderAction {
    /// Points `assigned_to` at an employee, replacing any previous assignee.
    Assign { employee_id: String },
    /// Clears `assigned_to`.
    Unassign,
    UpdateStatus(StatusUpdate),
    /// Customer replaces their own notes. Never touches status.
    ReplaceNotes(String),
    /// Customer accepts the current sample.
    ApproveDesign,
    /// Customer asks for changes; the comment is appended to the notes.
    RequestRevision { comment: String },
    /// Admin publishes previews to the customer.
    AddSamples {
        kind: SampleKind,
        files: Vec<StoredFile>,
        comments: Option<String>,
    },
    /// Employee stages work for admin review, invisible to the customer.
    SubmitPendingWork(WorkSubmission),
    ApprovePendingWork,
    RejectPendingWork { reason: String },
    /// Parent side of a revision fork.
    MarkSuperseded,
    LinkInvoice { invoice_id: String, status: PaymentStatus },
    SetInvoiceStatus(PaymentStatus),
    UnlinkInvoice,
}

/// Result of every OrderAction: the document before and after the transition.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTransition {
    pub before: Order,
    pub after: Order,
}

impl OrderTransition {
    pub fn status_changed(&self) -> bool {
        self.before.status != self.after.status
    }

    pub fn tracking_changed(&self) -> bool {
        self.after.tracking_number.is_some() && self.before.tracking_number != self.after.tracking_number
    }
}
