// src/services/mail_service.rs

use actix_web::web;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::SmtpConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("mail worker failed: {0}")]
    Blocking(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Sends mail through an SMTP relay using STARTTLS.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = SmtpTransport::starttls_relay(&config.server)?
            .port(config.port)
            .credentials(creds)
            .build();
        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(email.to.parse()?)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html)?;

        // The SMTP transport blocks; keep it off the async workers.
        let transport = self.transport.clone();
        let response = web::block(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Blocking(e.to_string()))??;
        log::info!("Email sent successfully to {}: {:?}", email.to, response.code());
        Ok(())
    }
}

/// Escapes text for use in HTML bodies and quoted attributes.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn verification_email(name: &str, to: &str, link: &str) -> OutgoingEmail {
    let name = escape_html(name);
    let link = escape_html(link);
    OutgoingEmail {
        to: to.to_string(),
        subject: "Verify your email".to_string(),
        html: format!(
            "<h3>Hello {name},</h3>\
             <p>Please verify your email by clicking the link below:</p>\
             <a href=\"{link}\">Verify your email</a>\
             <p>This link expires in 1 hour.</p>"
        ),
    }
}

pub fn password_reset_email(name: &str, to: &str, link: &str) -> OutgoingEmail {
    let name = escape_html(name);
    let link = escape_html(link);
    OutgoingEmail {
        to: to.to_string(),
        subject: "Password Reset".to_string(),
        html: format!(
            "<p>Hi {name},</p>\
             <p>Click <a href=\"{link}\">here</a> to reset your password. The link expires in 1 hour.</p>"
        ),
    }
}
