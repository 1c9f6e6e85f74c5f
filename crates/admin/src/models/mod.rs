//! Domain models for the back office.
//!
//! Row types derive `sqlx::FromRow` where every column decodes directly;
//! rows carrying text statuses are converted in the repositories.

pub mod admin_user;
pub mod catalog;
pub mod customer;
pub mod invoice;
pub mod order;
pub mod session;
pub mod stock;

pub use admin_user::{AdminRole, AdminUser};
pub use catalog::{
    Attribute, AttributeInput, AttributeKind, CreateStyleInput, CreateVariantInput, Style,
    Variant,
};
pub use customer::{Customer, RegisterCustomerInput};
pub use invoice::{InvoiceDocument, InvoiceLine, InvoiceParty, OutboxEntry};
pub use order::{
    AddressInput, CheckoutLine, CheckoutReceipt, CheckoutRequest, Order, OrderDetail,
    OrderItemDetail, OrderListFilter, PaymentMethodInput,
};
pub use session::{CurrentAdmin, CurrentCustomer, keys as session_keys};
pub use stock::{
    IssueReceipt, IssueRequest, IssuedAllocation, IssuingItem, LotAllocation, ReceiveLotInput,
    StockLot,
};
