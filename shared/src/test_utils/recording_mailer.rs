use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::mailer::{Mailer, MailerError};

/// One dispatched notice, as the messaging collaborator would see it.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub subject: String,
    pub recipients: Vec<String>,
    pub template_id: u32,
    pub variables: HashMap<String, String>,
}

/// Mailer double that records every send instead of dispatching it.
/// Flip `fail_next` to simulate a messaging-collaborator outage.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_with_template(&self, template_id: u32) -> Vec<SentMail> {
        self.sent()
            .into_iter()
            .filter(|m| m.template_id == template_id)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        subject: &str,
        recipients: &[String],
        template_id: u32,
        variables: &HashMap<String, String>,
    ) -> Result<(), MailerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailerError::SendFailed("simulated outage".to_string()));
        }
        if recipients.is_empty() {
            return Ok(());
        }
        self.sent.lock().unwrap().push(SentMail {
            subject: subject.to_string(),
            recipients: recipients.to_vec(),
            template_id,
            variables: variables.clone(),
        });
        Ok(())
    }
}
