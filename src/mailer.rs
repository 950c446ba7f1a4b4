//! Email delivery over authenticated STARTTLS SMTP.
//!
//! The SMTP transport is created inside [`SmtpMailer::send`] and dropped when
//! it returns, so each send is one session: connect, authenticate, transmit
//! to every recipient at once, quit. The transport is built without
//! connection pooling so nothing outlives the call.

use crate::config::{EmailSettings, RunConfig};
use crate::error::DeliveryError;
use crate::models::EmailMessage;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt;
use tracing::{info, instrument};

/// Something that can deliver a rendered [`EmailMessage`].
pub trait Mailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError>;
}

/// Build the MIME message: one `To` header listing every recipient, with
/// plain-text and HTML alternatives.
pub fn build_message(from: &Mailbox, message: &EmailMessage) -> Result<Message, DeliveryError> {
    let mut builder = Message::builder().from(from.clone()).subject(&message.subject);
    for recipient in &message.recipients {
        let to: Mailbox = recipient.parse().map_err(|e: lettre::address::AddressError| {
            DeliveryError::Address {
                address: recipient.clone(),
                reason: e.to_string(),
            }
        })?;
        builder = builder.to(to);
    }

    builder
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(message.text_body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(message.html_body.clone()),
                ),
        )
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

/// SMTP mailer using the run's account credentials.
pub struct SmtpMailer {
    host: String,
    port: u16,
    username: String,
    password: String,
    from: Mailbox,
}

impl fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish()
    }
}

impl SmtpMailer {
    pub fn new(config: &RunConfig, settings: &EmailSettings) -> Result<Self, DeliveryError> {
        let address: Address =
            config
                .email_username
                .parse()
                .map_err(|e: lettre::address::AddressError| DeliveryError::Address {
                    address: config.email_username.clone(),
                    reason: e.to_string(),
                })?;
        Ok(Self {
            host: settings.smtp_host.clone(),
            port: settings.smtp_port,
            username: config.email_username.clone(),
            password: config.email_password.clone(),
            from: Mailbox::new(Some(settings.sender_name.clone()), address),
        })
    }

    pub fn from_mailbox(&self) -> &Mailbox {
        &self.from
    }
}

impl Mailer for SmtpMailer {
    #[instrument(level = "info", skip_all, fields(host = %self.host, port = self.port))]
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        let email = build_message(&self.from, message)?;

        let creds = Credentials::new(self.username.clone(), self.password.clone());
        let transport: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
                .map_err(|e| DeliveryError::Transport(e.to_string()))?
                .port(self.port)
                .credentials(creds)
                .build();

        transport
            .send(email)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        info!(
            recipients = message.recipients.len(),
            subject = %message.subject,
            "Email sent successfully"
        );
        Ok(())
    }
}

/// Prints the rendered message instead of sending it (`--dry-run`).
#[derive(Debug, Default)]
pub struct StdoutMailer;

impl Mailer for StdoutMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        println!("Subject: {}", message.subject);
        println!("To: {}", message.recipients.join(", "));
        println!("\n{}", message.text_body);
        println!("----- HTML -----\n{}", message.html_body);
        info!("Dry run: email printed, not sent");
        Ok(())
    }
}
