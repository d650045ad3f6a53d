//! Mail delivery seam.
//!
//! Captcha codes for password resets go out through this trait. The default
//! implementation writes the message to the log instead of speaking SMTP,
//! which is enough for development and for deployments that scrape logs.

use async_trait::async_trait;
use tracing::info;

use quill_core::Result;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Logs outbound mail rather than delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        info!(
            subsystem = "api",
            component = "mailer",
            to = %to,
            subject = %subject,
            body = %body,
            "Outbound mail (log delivery)"
        );
        Ok(())
    }
}
