//! Invoice email delivery.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.
//! Delivery goes through the [`InvoiceMailer`] trait so the outbox can be
//! driven by something other than a real SMTP relay.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use backoffice_core::Email;

use crate::config::EmailConfig;
use crate::models::InvoiceDocument;

/// One row of the item table in the email body.
struct EmailRow {
    description: String,
    sku: String,
    quantity: i32,
    amount: String,
}

/// HTML template for the invoice email.
#[derive(Template)]
#[template(path = "email/invoice.html")]
struct InvoiceEmailHtml<'a> {
    company_name: &'a str,
    company_email: Option<&'a str>,
    customer_name: &'a str,
    order_number: &'a str,
    invoice_number: &'a str,
    invoice_date: String,
    rows: &'a [EmailRow],
    total: String,
}

/// Plain text template for the invoice email.
#[derive(Template)]
#[template(path = "email/invoice.txt")]
struct InvoiceEmailText<'a> {
    company_name: &'a str,
    company_email: Option<&'a str>,
    customer_name: &'a str,
    order_number: &'a str,
    invoice_number: &'a str,
    invoice_date: String,
    rows: &'a [EmailRow],
    total: String,
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

    /// The attachment could not be attached.
    #[error("Invalid attachment: {0}")]
    Attachment(String),
}

/// A composed invoice email with its PDF.
#[derive(Debug, Clone)]
pub struct InvoiceEmail {
    pub to: Email,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    /// Invoice number; also seeds the `Message-ID`.
    pub reference: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

/// Delivers invoice emails.
#[async_trait]
pub trait InvoiceMailer: Send + Sync {
    /// Send the email, returning the `Message-ID` it was sent with.
    async fn send_invoice(&self, email: &InvoiceEmail) -> Result<String, EmailError>;
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Render the subject and bodies for an invoice email.
///
/// # Errors
///
/// Returns `EmailError::Template` if a template fails to render.
pub fn compose_invoice_email(
    doc: &InvoiceDocument,
    attachment_name: String,
    attachment: Vec<u8>,
) -> Result<InvoiceEmail, EmailError> {
    let rows: Vec<EmailRow> = doc
        .items
        .iter()
        .map(|item| {
            let mut variant = format!("{} / {}", item.color, item.size);
            if let Some(fit) = &item.fit {
                variant.push_str(" / ");
                variant.push_str(fit);
            }
            EmailRow {
                description: format!("{} ({variant})", item.style_name),
                sku: item.sku.clone(),
                quantity: item.quantity,
                amount: money(item.total_price),
            }
        })
        .collect();
    let invoice_date = doc.invoice_date.format("%Y-%m-%d").to_string();
    let total = money(doc.amounts.total_amount);
    let company_email = doc.company.email.as_deref();

    let html_body = InvoiceEmailHtml {
        company_name: &doc.company.name,
        company_email,
        customer_name: &doc.bill_to.name,
        order_number: &doc.order_number,
        invoice_number: &doc.invoice_number,
        invoice_date: invoice_date.clone(),
        rows: &rows,
        total: total.clone(),
    }
    .render()?;
    let text_body = InvoiceEmailText {
        company_name: &doc.company.name,
        company_email,
        customer_name: &doc.bill_to.name,
        order_number: &doc.order_number,
        invoice_number: &doc.invoice_number,
        invoice_date,
        rows: &rows,
        total,
    }
    .render()?;

    Ok(InvoiceEmail {
        to: doc.customer_email.clone(),
        subject: format!("Your invoice for order {}", doc.order_number),
        text_body,
        html_body,
        reference: doc.invoice_number.clone(),
        attachment_name,
        attachment,
    })
}

/// SMTP invoice mailer.
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

    fn message_id(&self, reference: &str) -> String {
        let domain = self
            .from_address
            .rsplit_once('@')
            .map_or("localhost", |(_, d)| d.trim_end_matches('>'));
        format!("<{reference}@{domain}>")
    }
}

#[async_trait]
impl InvoiceMailer for EmailService {
    async fn send_invoice(&self, email: &InvoiceEmail) -> Result<String, EmailError> {
        let message_id = self.message_id(&email.reference);
        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|e| EmailError::Attachment(e.to_string()))?;

        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .as_str()
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.to_string()))?)
            .subject(&email.subject)
            .message_id(Some(message_id.clone()))
            .multipart(
                MultiPart::mixed()
                    .multipart(
                        MultiPart::alternative()
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_PLAIN)
                                    .body(email.text_body.clone()),
                            )
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_HTML)
                                    .body(email.html_body.clone()),
                            ),
                    )
                    .singlepart(
                        Attachment::new(email.attachment_name.clone())
                            .body(email.attachment.clone(), pdf_type),
                    ),
            )?;

        self.mailer.send(message).await?;

        tracing::info!(to = %email.to, reference = %email.reference, "Invoice email sent");
        Ok(message_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::invoice_pdf::tests::sample_document;

    #[test]
    fn test_compose_invoice_email_fills_templates() {
        let doc = sample_document(2);
        let email =
            compose_invoice_email(&doc, "invoice-x.pdf".to_string(), b"%PDF-1.5".to_vec()).unwrap();

        assert_eq!(email.to.as_str(), "buyer@shop.test");
        assert_eq!(email.subject, "Your invoice for order ORD-1710497472123-42");
        assert_eq!(email.reference, "INV-20240315-101112123-9");
        assert!(email.text_body.contains("Hi Ada Buyer,"));
        assert!(email.text_body.contains("2 x Oxford Shirt (Navy / M / Slim) (ST100-NVY-0)  20.00"));
        assert!(email.text_body.contains("Total: 25.00"));
        assert!(email.html_body.contains("<strong>ORD-1710497472123-42</strong>"));
        assert!(email.html_body.contains("billing@threadline.test"));
        assert_eq!(email.attachment_name, "invoice-x.pdf");
    }

    #[test]
    fn test_html_body_escapes_customer_text() {
        let mut doc = sample_document(1);
        doc.bill_to.name = "<script>alert(1)</script>".to_string();
        let email = compose_invoice_email(&doc, "f.pdf".to_string(), Vec::new()).unwrap();
        assert!(!email.html_body.contains("<script>"));
    }
}
