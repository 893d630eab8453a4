// src/integrations/mail/mod.rs
//
// Customer notification
//
// The workflow only knows the Notifier trait. The shipped implementation
// queues messages in the email_outbox table; the host's mailer delivers them.

pub mod outbox;

pub use outbox::{OutboxEmail, SqliteEmailOutbox};

use crate::domain::{CfdiArtifacts, Order};
use crate::error::AppResult;

pub trait Notifier: Send + Sync {
    /// Tells the customer their invoice is ready
    fn send_cfdi_email(&self, order: &Order, artifacts: &CfdiArtifacts) -> AppResult<()>;
}
