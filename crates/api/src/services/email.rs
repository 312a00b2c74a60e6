//! Transactional email over SMTP.
//!
//! Bodies are rendered from Askama templates in `templates/email/`, each in
//! a plain text and an HTML flavour sent as `multipart/alternative`.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use techmart_core::OrderStatus;

use crate::config::EmailConfig;

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    name: &'a str,
    reset_url: &'a str,
    expires_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    name: &'a str,
    reset_url: &'a str,
    expires_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/order_status.html")]
struct OrderStatusHtml<'a> {
    name: &'a str,
    order_id: i32,
    status: &'a str,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_status.txt")]
struct OrderStatusText<'a> {
    name: &'a str,
    order_id: i32,
    status: &'a str,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/newsletter.html")]
struct NewsletterHtml<'a> {
    paragraphs: Vec<&'a str>,
    unsubscribe_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/newsletter.txt")]
struct NewsletterText<'a> {
    body: &'a str,
    unsubscribe_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
        expires_minutes: i64,
    ) -> Result<(), EmailError> {
        let html = PasswordResetHtml {
            name,
            reset_url,
            expires_minutes,
        }
        .render()?;
        let text = PasswordResetText {
            name,
            reset_url,
            expires_minutes,
        }
        .render()?;

        self.send_multipart_email(to, "Reset your TechMart password", &text, &html)
            .await
    }

    /// Tell a customer their order moved to a new status.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_status(
        &self,
        to: &str,
        name: &str,
        order_id: i32,
        status: OrderStatus,
        order_url: &str,
    ) -> Result<(), EmailError> {
        let status = status_label(status);
        let html = OrderStatusHtml {
            name,
            order_id,
            status,
            order_url,
        }
        .render()?;
        let text = OrderStatusText {
            name,
            order_id,
            status,
            order_url,
        }
        .render()?;

        let subject = format!("Order #{order_id}: {status}");
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send one newsletter issue to one subscriber.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_newsletter(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        unsubscribe_url: &str,
    ) -> Result<(), EmailError> {
        let paragraphs = body
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let html = NewsletterHtml {
            paragraphs,
            unsubscribe_url,
        }
        .render()?;
        let text = NewsletterText {
            body,
            unsubscribe_url,
        }
        .render()?;

        self.send_multipart_email(to, subject, &text, &html).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Customer-facing wording for an order status.
#[must_use]
pub const fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Awaiting confirmation",
        OrderStatus::Processing => "Being prepared",
        OrderStatus::Shipping => "On its way",
        OrderStatus::Delivered => "Delivered",
        OrderStatus::Cancelled => "Cancelled",
        OrderStatus::ReturnRequested => "Return requested",
        OrderStatus::Returned => "Returned",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_reset_templates_render_link() {
        let url = "https://techmart.vn/reset-password?token=abc";
        let text = PasswordResetText {
            name: "Lan",
            reset_url: url,
            expires_minutes: 60,
        }
        .render()
        .unwrap();
        assert!(text.contains(url));
        assert!(text.contains("60 minutes"));

        let html = PasswordResetHtml {
            name: "Lan",
            reset_url: url,
            expires_minutes: 60,
        }
        .render()
        .unwrap();
        assert!(html.contains("href=\"https://techmart.vn/reset-password?token=abc\""));
    }

    #[test]
    fn test_order_status_template_escapes_name() {
        let html = OrderStatusHtml {
            name: "<b>Minh</b>",
            order_id: 12,
            status: status_label(OrderStatus::Shipping),
            order_url: "https://techmart.vn/orders/12",
        }
        .render()
        .unwrap();
        assert!(html.contains("#12"));
        assert!(html.contains("On its way"));
        assert!(!html.contains("<b>Minh</b>"));
    }

    #[test]
    fn test_newsletter_splits_paragraphs() {
        let html = NewsletterHtml {
            paragraphs: vec!["Big sale", "Ends Sunday"],
            unsubscribe_url: "https://techmart.vn/unsubscribe",
        }
        .render()
        .unwrap();
        assert_eq!(html.matches("<p>").count(), 2);
        assert!(html.contains("<p>Ends Sunday</p>"));
    }
}
