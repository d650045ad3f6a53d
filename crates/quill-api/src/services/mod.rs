//! Outbound service seams.

mod mailer;

pub use mailer::{LogMailer, Mailer};
