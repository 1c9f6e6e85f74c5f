//! Business logic services for the back office.
//!
//! # Services
//!
//! - `auth` - Argon2 password login for admins and customers
//! - `checkout` - Transactional checkout orchestration
//! - `email` - Invoice email composition and SMTP delivery
//! - `invoice_pdf` - Invoice page layout and PDF rendering
//! - `invoices` - Invoice number resolution and downloads
//! - `issuing` - FIFO stock allocation
//! - `outbox` - Invoice email outbox worker

pub mod auth;
pub mod checkout;
pub mod email;
pub mod invoice_pdf;
pub mod invoices;
pub mod issuing;
pub mod outbox;

pub use auth::{AuthError, AuthService};
pub use checkout::{CheckoutError, CheckoutService, CheckoutStage, PlacedOrder};
pub use email::{EmailError, EmailService, InvoiceEmail, InvoiceMailer};
pub use invoices::{InvoiceError, InvoicePdf};
pub use issuing::{IssueError, ItemFailure, StockAllocator};
pub use outbox::OutboxWorker;
