use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::files::StoredFile;
use super::invoice::PaymentStatus;
use super::user::{Actor, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Vector,
    Digitizing,
    Patches,
}

impl OrderType {
    /// Prefix used in generated order numbers.
    pub fn prefix(self) -> &'static str {
        match self {
            OrderType::Vector => "VEC",
            OrderType::Digitizing => "DIG",
            OrderType::Patches => "PAT",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Vector => "vector",
            OrderType::Digitizing => "digitizing",
            OrderType::Patches => "patches",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vector" => Ok(OrderType::Vector),
            "digitizing" => Ok(OrderType::Digitizing),
            "patches" => Ok(OrderType::Patches),
            other => Err(format!("Invalid order type: {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Waiting for Approval")]
    WaitingForApproval,
    #[serde(rename = "Design Approved")]
    DesignApproved,
    #[serde(rename = "In Revision")]
    InRevision,
    #[serde(rename = "Manufacturing")]
    Manufacturing,
    #[serde(rename = "Revision Ready")]
    RevisionReady,
    #[serde(rename = "Revision Approved")]
    RevisionApproved,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Rejected")]
    Rejected,
    #[serde(rename = "Cancelled")]
    Cancelled,
    #[serde(rename = "Superseded")]
    Superseded,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::InProgress => "In Progress",
            OrderStatus::WaitingForApproval => "Waiting for Approval",
            OrderStatus::DesignApproved => "Design Approved",
            OrderStatus::InRevision => "In Revision",
            OrderStatus::Manufacturing => "Manufacturing",
            OrderStatus::RevisionReady => "Revision Ready",
            OrderStatus::RevisionApproved => "Revision Approved",
            OrderStatus::Completed => "Completed",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Superseded => "Superseded",
        }
    }

    /// Statuses in which a customer is looking at a sample and can give feedback.
    pub fn awaits_customer(self) -> bool {
        matches!(self, OrderStatus::WaitingForApproval | OrderStatus::RevisionReady)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    RevisionRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    Initial,
    Revision,
}

/// Preview uploaded for the customer to review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleImage {
    pub file: StoredFile,
    pub kind: SampleKind,
    pub comments: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

// -----------------------------------------------------------------------------
// Type-specific fields
// -----------------------------------------------------------------------------

/// Loose field bag as submitted by a customer or an admin edit. Validated into
/// [`OrderDetails`] against the order type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderFields {
    pub design_name: Option<String>,
    pub file_format: Option<String>,
    pub color_count: Option<u32>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub unit: Option<String>,
    pub placement: Option<String>,
    pub fabric: Option<String>,
    pub patch_length: Option<f64>,
    pub patch_width: Option<f64>,
    pub patch_style: Option<String>,
    pub patch_backing: Option<String>,
    pub patch_quantity: Option<u32>,
    pub patch_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorDetails {
    pub design_name: String,
    pub file_format: String,
    pub color_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitizingDetails {
    pub design_name: String,
    pub length: f64,
    pub width: f64,
    pub unit: String,
    pub placement: String,
    pub fabric: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchDetails {
    pub design_name: String,
    pub patch_length: f64,
    pub patch_width: f64,
    pub unit: String,
    pub patch_style: String,
    pub patch_backing: String,
    pub patch_quantity: u32,
    pub patch_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "orderType", rename_all = "lowercase")]
pub enum OrderDetails {
    Vector(VectorDetails),
    Digitizing(DigitizingDetails),
    Patches(PatchDetails),
}

fn text(value: &Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

fn number<N: Copy + Default + PartialOrd>(value: Option<N>, name: &'static str, missing: &mut Vec<&'static str>) -> N {
    match value {
        Some(v) if v > N::default() => v,
        _ => {
            missing.push(name);
            N::default()
        }
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl OrderDetails {
    /// Builds the details for `order_type`, or returns the camelCase names of every
    /// missing required field.
    pub fn from_fields(order_type: OrderType, fields: &OrderFields) -> Result<Self, Vec<&'static str>> {
        let mut missing = Vec::new();
        let details = match order_type {
            OrderType::Vector => OrderDetails::Vector(VectorDetails {
                design_name: text(&fields.design_name, "designName", &mut missing),
                file_format: text(&fields.file_format, "fileFormat", &mut missing),
                color_count: fields.color_count,
            }),
            OrderType::Digitizing => OrderDetails::Digitizing(DigitizingDetails {
                design_name: text(&fields.design_name, "designName", &mut missing),
                length: number(fields.length, "length", &mut missing),
                width: number(fields.width, "width", &mut missing),
                unit: text(&fields.unit, "unit", &mut missing),
                placement: text(&fields.placement, "placement", &mut missing),
                fabric: optional(&fields.fabric),
            }),
            OrderType::Patches => OrderDetails::Patches(PatchDetails {
                design_name: text(&fields.design_name, "designName", &mut missing),
                patch_length: number(fields.patch_length, "patchLength", &mut missing),
                patch_width: number(fields.patch_width, "patchWidth", &mut missing),
                unit: text(&fields.unit, "unit", &mut missing),
                patch_style: text(&fields.patch_style, "patchStyle", &mut missing),
                patch_backing: text(&fields.patch_backing, "patchBacking", &mut missing),
                patch_quantity: number(fields.patch_quantity, "patchQuantity", &mut missing),
                patch_address: text(&fields.patch_address, "patchAddress", &mut missing),
            }),
        };
        if missing.is_empty() {
            Ok(details)
        } else {
            Err(missing)
        }
    }

    pub fn order_type(&self) -> OrderType {
        match self {
            OrderDetails::Vector(_) => OrderType::Vector,
            OrderDetails::Digitizing(_) => OrderType::Digitizing,
            OrderDetails::Patches(_) => OrderType::Patches,
        }
    }

    pub fn design_name(&self) -> &str {
        match self {
            OrderDetails::Vector(d) => &d.design_name,
            OrderDetails::Digitizing(d) => &d.design_name,
            OrderDetails::Patches(d) => &d.design_name,
        }
    }

    /// Flattens back into a field bag (used to overlay an edit and re-validate).
    pub fn to_fields(&self) -> OrderFields {
        match self {
            OrderDetails::Vector(d) => OrderFields {
                design_name: Some(d.design_name.clone()),
                file_format: Some(d.file_format.clone()),
                color_count: d.color_count,
                ..OrderFields::default()
            },
            OrderDetails::Digitizing(d) => OrderFields {
                design_name: Some(d.design_name.clone()),
                length: Some(d.length),
                width: Some(d.width),
                unit: Some(d.unit.clone()),
                placement: Some(d.placement.clone()),
                fabric: d.fabric.clone(),
                ..OrderFields::default()
            },
            OrderDetails::Patches(d) => OrderFields {
                design_name: Some(d.design_name.clone()),
                patch_length: Some(d.patch_length),
                patch_width: Some(d.patch_width),
                unit: Some(d.unit.clone()),
                patch_style: Some(d.patch_style.clone()),
                patch_backing: Some(d.patch_backing.clone()),
                patch_quantity: Some(d.patch_quantity),
                patch_address: Some(d.patch_address.clone()),
                ..OrderFields::default()
            },
        }
    }

    /// Billable quantity: patch count for patches, one design otherwise.
    pub fn quantity(&self) -> u32 {
        match self {
            OrderDetails::Patches(d) => d.patch_quantity,
            _ => 1,
        }
    }
}

impl OrderFields {
    /// Overlays every field set in `edit` on top of `self`.
    pub fn overlay(mut self, edit: &OrderFields) -> OrderFields {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if edit.$field.is_some() { self.$field = edit.$field.clone(); })*
            };
        }
        take!(
            design_name, file_format, color_count, length, width, unit, placement, fabric,
            patch_length, patch_width, patch_style, patch_backing, patch_quantity, patch_address
        );
        self
    }
}

// -----------------------------------------------------------------------------
// Employee pending work
// -----------------------------------------------------------------------------

/// Draft deliverable an assigned employee hands in for admin review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSubmission {
    pub proposed_status: Option<OrderStatus>,
    pub files: Vec<StoredFile>,
    pub report: Option<String>,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PendingWork {
    #[default]
    None,
    Pending {
        submission: WorkSubmission,
    },
    Rejected {
        submission: WorkSubmission,
        reason: String,
        rejected_at: DateTime<Utc>,
    },
}

impl PendingWork {
    pub fn has_pending_work(&self) -> bool {
        matches!(self, PendingWork::Pending { .. })
    }

    pub fn was_rejected(&self) -> bool {
        matches!(self, PendingWork::Rejected { .. })
    }

    pub fn submission(&self) -> Option<&WorkSubmission> {
        match self {
            PendingWork::None => None,
            PendingWork::Pending { submission } | PendingWork::Rejected { submission, .. } => Some(submission),
        }
    }
}

// -----------------------------------------------------------------------------
// Order
// -----------------------------------------------------------------------------

/// Link from a revision order back to the order it was forked from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionLink {
    pub parent_order_id: String,
    /// First order of the lineage; every revision of it shares this value.
    pub root_order_id: String,
    pub revision_number: u32,
    pub reason: Option<String>,
}

/// Represents a customer design order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub customer_id: String,
    pub order_type: OrderType,
    pub details: OrderDetails,
    pub files: Vec<StoredFile>,
    pub notes: String,
    pub status: OrderStatus,
    pub customer_approval_status: ApprovalStatus,
    pub sample_images: Vec<SampleImage>,
    pub assigned_to: Option<String>,
    pub required_employee_role: OrderType,
    pub revision: Option<RevisionLink>,
    pub pending_work: PendingWork,
    pub rejected_reason: Option<String>,
    pub report: Option<String>,
    pub tracking_number: Option<String>,
    pub price_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub invoice_id: Option<String>,
    pub has_invoice: bool,
    pub invoice_status: Option<PaymentStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_revision(&self) -> bool {
        self.revision.is_some()
    }

    pub fn parent_order_id(&self) -> Option<&str> {
        self.revision.as_ref().map(|r| r.parent_order_id.as_str())
    }

    /// Lineage root: the order itself unless it is a revision.
    pub fn root_order_id(&self) -> &str {
        self.revision.as_ref().map_or(self.id.as_str(), |r| r.root_order_id.as_str())
    }

    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.assigned_to.as_deref() == Some(user_id)
    }

    /// Every stored file the order references, for cleanup on delete.
    pub fn all_files(&self) -> Vec<&StoredFile> {
        let mut files: Vec<&StoredFile> = self.files.iter().collect();
        files.extend(self.sample_images.iter().map(|s| &s.file));
        if let Some(submission) = self.pending_work.submission() {
            files.extend(submission.files.iter());
        }
        files
    }

    /// Copy of the order as `actor` may see it. Pending work is visible only to
    /// admins and the employee who submitted it.
    pub fn view_for(&self, actor: &Actor) -> Order {
        let mut view = self.clone();
        let may_see_pending = match actor.role {
            Role::Admin => true,
            Role::Employee => self.pending_work.submission().is_some_and(|s| s.submitted_by == actor.id),
            Role::Customer => false,
        };
        if !may_see_pending {
            view.pending_work = PendingWork::None;
        }
        view
    }
}

/// Parameters for creating a new order. The order number is produced by the caller.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub order_number: String,
    pub customer_id: String,
    pub details: OrderDetails,
    pub files: Vec<StoredFile>,
    pub notes: String,
    pub revision: Option<RevisionLink>,
}

/// Admin edit of an order's descriptive fields.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    /// Must match the stored type when present; the type itself never changes.
    pub order_type: Option<OrderType>,
    pub fields: Option<OrderFields>,
    pub notes: Option<String>,
    pub price_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

/// Builds order numbers like `PAT-20260115-0007`.
pub fn order_number(order_type: OrderType, date: NaiveDate, sequence: u64) -> String {
    format!("{}-{}-{:04}", order_type.prefix(), date.format("%Y%m%d"), sequence)
}

/// Order number of a revision: parent number plus `-R<n>`.
pub fn revision_order_number(parent_number: &str, revision_number: u32) -> String {
    let base = parent_number.split("-R").next().unwrap_or(parent_number);
    format!("{}-R{}", base, revision_number)
}
