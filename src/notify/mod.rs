pub mod mailer;
pub mod templates;

use actix_web::web;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::{notification::Notification, user::User};
use crate::store::{NotificationStore, StoreResult};
use mailer::{Mailer, OutgoingMail};

pub const SUBJECT: &str = "Leave Notification";

/// In-app destinations carried on notifications.
pub mod links {
    pub const DASHBOARD: &str = "/dashboard";
    pub const APPROVALS: &str = "/approvals";
}

/// Persists in-app notifications and relays them by email.
///
/// The notification row is the record of truth; email delivery is best
/// effort and its failures are only logged.
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    link_prefix: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, link_prefix: impl Into<String>) -> Self {
        Self {
            mailer,
            link_prefix: link_prefix.into(),
        }
    }

    pub fn link(&self, path: &str) -> String {
        format!("{}{}", self.link_prefix.trim_end_matches('/'), path)
    }

    /// `html` replaces the plain message as the email body when given.
    pub async fn send<S: NotificationStore>(
        &self,
        store: &S,
        recipient: &User,
        message: &str,
        link: Option<&str>,
        html: Option<String>,
    ) -> StoreResult<Notification> {
        let link = link.map(|path| self.link(path));
        let notification = store
            .insert_notification(recipient.id, message, link.as_deref())
            .await?;

        let is_html = html.is_some();
        self.relay(OutgoingMail {
            to: recipient.email.clone(),
            to_name: recipient.full_name(),
            subject: SUBJECT.to_string(),
            body: html.unwrap_or_else(|| message.to_string()),
            is_html,
        })
        .await;

        Ok(notification)
    }

    pub async fn relay(&self, mail: OutgoingMail) {
        let mailer = Arc::clone(&self.mailer);
        let to = mail.to.clone();

        match web::block(move || mailer.deliver(&mail)).await {
            Ok(Ok(())) => debug!(to = %to, "Email relayed"),
            Ok(Err(e)) => warn!(error = %e, to = %to, "Email delivery failed"),
            Err(e) => warn!(error = %e, to = %to, "Email worker unavailable"),
        }
    }
}
