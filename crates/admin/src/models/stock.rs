//! Stock lot and issuing types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use backoffice_core::{CompanyCode, OrderId, OrderItemId, StockIssuingId, StockLotId};

/// One inbound lot in `main_stock`.
///
/// Lots are consumed oldest `created_at` first; `id` breaks ties between lots
/// received in the same instant.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockLot {
    pub id: StockLotId,
    pub company_code: CompanyCode,
    pub style_number: String,
    pub sku: String,
    pub batch_number: String,
    pub lot_no: String,
    pub unit_price: Decimal,
    pub main_stock_qty: i32,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/admin/stock`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiveLotInput {
    pub style_number: String,
    pub sku: String,
    pub batch_number: String,
    pub lot_no: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl ReceiveLotInput {
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("style_number", &self.style_number),
            ("sku", &self.sku),
            ("batch_number", &self.batch_number),
            ("lot_no", &self.lot_no),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }
        if self.quantity <= 0 {
            return Err("quantity must be greater than 0".to_string());
        }
        if self.unit_price < Decimal::ZERO {
            return Err("unit_price cannot be negative".to_string());
        }
        Ok(())
    }
}

/// One line of an issuing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuingItem {
    pub order_item_id: OrderItemId,
    pub style_number: String,
    pub sku: String,
    pub issuing_qty: i32,
}

/// Body of `POST /issue`.
///
/// The admin route `POST /api/admin/orders/{id}/issue` takes the order id
/// from the path and only `issuing_items` from the body.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRequest {
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub issuing_items: Vec<IssuingItem>,
}

/// A quantity drawn from one lot for one order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotAllocation {
    pub order_item_id: OrderItemId,
    pub main_stock_id: StockLotId,
    pub style_number: String,
    pub sku: String,
    pub batch_number: String,
    pub lot_no: String,
    pub unit_price: Decimal,
    pub issuing_qty: i32,
}

/// Result of a successful issuing batch.
#[derive(Debug, Clone, Serialize)]
pub struct IssueReceipt {
    pub order_id: OrderId,
    /// Number of order items issued.
    pub issued_count: usize,
    /// Ledger rows written, in allocation order.
    pub allocations: Vec<IssuedAllocation>,
}

/// A persisted ledger row.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedAllocation {
    pub stock_issuing_id: StockIssuingId,
    #[serde(flatten)]
    pub allocation: LotAllocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot_input(quantity: i32) -> ReceiveLotInput {
        ReceiveLotInput {
            style_number: "ST100".to_string(),
            sku: "ST100-NVY-M".to_string(),
            batch_number: "B-2024-01".to_string(),
            lot_no: "L1".to_string(),
            unit_price: Decimal::new(1250, 2),
            quantity,
        }
    }

    #[test]
    fn test_receive_lot_requires_positive_quantity() {
        assert!(lot_input(10).validate().is_ok());
        assert_eq!(
            lot_input(0).validate(),
            Err("quantity must be greater than 0".to_string())
        );
    }

    #[test]
    fn test_receive_lot_requires_lot_no() {
        let mut input = lot_input(5);
        input.lot_no = " ".to_string();
        assert_eq!(input.validate(), Err("lot_no is required".to_string()));
    }
}
