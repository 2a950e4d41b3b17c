use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockyard_core::money::ensure_money;
use stockyard_core::{Barcode, DomainError, DomainResult, Entity};

use crate::category::{ProductCategory, ProductUnit};

const MAX_NAME_LEN: usize = 255;

/// Catalog entry, keyed by barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub barcode: Barcode,
    pub name: String,
    pub category: ProductCategory,
    pub unit: ProductUnit,
    /// Current list price; captured into order lines when they are added.
    pub unit_price: Option<Decimal>,
    pub storage_days: Option<i32>,
}

impl Product {
    /// Build a validated product; the name is trimmed.
    pub fn new(
        barcode: Barcode,
        name: impl Into<String>,
        category: ProductCategory,
        unit: ProductUnit,
        unit_price: Option<Decimal>,
        storage_days: Option<i32>,
    ) -> DomainResult<Self> {
        let product = Self {
            barcode,
            name: name.into().trim().to_string(),
            category,
            unit,
            unit_price,
            storage_days,
        };
        product.validate()?;
        Ok(product)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "name longer than {MAX_NAME_LEN} characters"
            )));
        }
        if let Some(price) = self.unit_price {
            ensure_money("unit_price", price)?;
        }
        if matches!(self.storage_days, Some(days) if days < 0) {
            return Err(DomainError::validation("storage_days must not be negative"));
        }
        Ok(())
    }

    /// Price captured by a new order line when the client supplies none.
    pub fn list_price(&self) -> Decimal {
        self.unit_price.unwrap_or(Decimal::ZERO)
    }
}

impl Entity for Product {
    type Id = Barcode;

    fn id(&self) -> &Self::Id {
        &self.barcode
    }
}
