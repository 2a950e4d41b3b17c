use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stockyard_core::DomainError;

/// Catalog category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Groats,
    Pasta,
    FlourSugarSalt,
    Snacks,
    SoftDrinks,
    Water,
    VegetableOils,
    Sweets,
    CannedGoods,
    Other,
}

/// Unit of measure a product is stocked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductUnit {
    Kg,
    Pcs,
    Pack,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 10] = [
        ProductCategory::Groats,
        ProductCategory::Pasta,
        ProductCategory::FlourSugarSalt,
        ProductCategory::Snacks,
        ProductCategory::SoftDrinks,
        ProductCategory::Water,
        ProductCategory::VegetableOils,
        ProductCategory::Sweets,
        ProductCategory::CannedGoods,
        ProductCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProductCategory::Groats => "groats",
            ProductCategory::Pasta => "pasta",
            ProductCategory::FlourSugarSalt => "flour_sugar_salt",
            ProductCategory::Snacks => "snacks",
            ProductCategory::SoftDrinks => "soft_drinks",
            ProductCategory::Water => "water",
            ProductCategory::VegetableOils => "vegetable_oils",
            ProductCategory::Sweets => "sweets",
            ProductCategory::CannedGoods => "canned_goods",
            ProductCategory::Other => "other",
        }
    }
}

impl ProductUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductUnit::Kg => "kg",
            ProductUnit::Pcs => "pcs",
            ProductUnit::Pack => "pack",
        }
    }
}

impl FromStr for ProductCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown product category '{s}'")))
    }
}

impl FromStr for ProductUnit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kg" => Ok(ProductUnit::Kg),
            "pcs" => Ok(ProductUnit::Pcs),
            "pack" => Ok(ProductUnit::Pack),
            other => Err(DomainError::validation(format!("unknown product unit '{other}'"))),
        }
    }
}

impl core::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for ProductUnit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_snake_case_wire_names() {
        for category in ProductCategory::ALL {
            assert_eq!(category.as_str().parse::<ProductCategory>().unwrap(), category);
        }
        assert_eq!(
            "flour_sugar_salt".parse::<ProductCategory>().unwrap(),
            ProductCategory::FlourSugarSalt
        );
    }

    #[test]
    fn unknown_unit_is_rejected() {
        match "litre".parse::<ProductUnit>().unwrap_err() {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for unknown unit"),
        }
    }
}
