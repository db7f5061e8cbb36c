use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
}

/// Blocking mail relay; callers run it off the async executor.
pub trait Mailer: Send + Sync {
    fn deliver(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let builder = if config.port == 587 {
            SmtpTransport::starttls_relay(&config.host)?
        } else {
            SmtpTransport::relay(&config.host)?
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: config.from.parse()?,
        })
    }
}

impl Mailer for SmtpMailer {
    fn deliver(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        let to = Mailbox::new(Some(mail.to_name.clone()), mail.to.parse()?);
        let content_type = if mail.is_html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .header(content_type)
            .body(mail.body.clone())?;

        self.transport.send(&message)?;
        Ok(())
    }
}

/// Used when no SMTP relay is configured.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn deliver(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        info!(to = %mail.to, subject = %mail.subject, "SMTP not configured, email skipped");
        Ok(())
    }
}
