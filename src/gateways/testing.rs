//! # Gateway doubles
//!
//! In-memory stand-ins for the external collaborators. Each records what it
//! was asked to do so tests can assert side effects, and some can be told to
//! fail so tests can check that failures stay best-effort.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    CaptureReport, CheckoutHandle, CheckoutRequest, Email, FileStorage, GatewayError, GatewayResult, Mailer,
    PaymentProvider, PushChannel, PushMessage,
};
use crate::domain::{FileUpload, StoredFile};

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<Email> {
        self.sent().into_iter().filter(|e| e.to == address).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> GatewayResult<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Always fails, like an SMTP relay that is down.
#[derive(Default)]
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: Email) -> GatewayResult<()> {
        Err(GatewayError::Transport("mail relay unreachable".into()))
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    uploaded: Mutex<Vec<StoredFile>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub fn uploaded(&self) -> Vec<StoredFile> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn upload(&self, upload: FileUpload, folder: &str) -> GatewayResult<StoredFile> {
        let mut uploaded = self.uploaded.lock().unwrap();
        let file = StoredFile {
            url: format!("memory://{}/{}-{}", folder, uploaded.len() + 1, upload.filename),
            filename: upload.filename,
            size: upload.bytes.len() as u64,
            mimetype: upload.mimetype,
        };
        uploaded.push(file.clone());
        Ok(file)
    }

    async fn delete(&self, file: &StoredFile) -> GatewayResult<()> {
        self.deleted.lock().unwrap().push(file.url.clone());
        Ok(())
    }
}

/// Payment provider answering from a fixed table of captures.
#[derive(Default)]
pub struct ScriptedPayments {
    captures: Mutex<HashMap<String, CaptureReport>>,
    checkouts: Mutex<Vec<CheckoutRequest>>,
}

impl ScriptedPayments {
    /// Makes `report` answerable by `fetch_capture`.
    pub fn record(&self, report: CaptureReport) {
        self.captures.lock().unwrap().insert(report.transaction_id.clone(), report);
    }

    pub fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.checkouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for ScriptedPayments {
    async fn create_checkout(&self, request: CheckoutRequest) -> GatewayResult<CheckoutHandle> {
        let mut checkouts = self.checkouts.lock().unwrap();
        checkouts.push(request);
        let id = format!("PP-{}", checkouts.len());
        Ok(CheckoutHandle {
            approval_url: Some(format!("https://pay.test/approve/{}", id)),
            provider_order_id: id,
        })
    }

    async fn fetch_capture(&self, transaction_id: &str) -> GatewayResult<CaptureReport> {
        self.captures
            .lock()
            .unwrap()
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected(format!("unknown capture {}", transaction_id)))
    }
}

#[derive(Default)]
pub struct RecordingPush {
    messages: Mutex<Vec<PushMessage>>,
    fail: bool,
}

impl RecordingPush {
    pub fn failing() -> Self {
        Self { messages: Mutex::new(Vec::new()), fail: true }
    }

    pub fn messages(&self) -> Vec<PushMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushChannel for RecordingPush {
    async fn emit(&self, message: PushMessage) -> GatewayResult<()> {
        if self.fail {
            return Err(GatewayError::Transport("socket server down".into()));
        }
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}
