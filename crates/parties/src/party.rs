use serde::{Deserialize, Serialize};

use stockyard_core::{DomainError, DomainResult, Entity, TaxId};

/// Party kind: customer or supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }
}

impl core::fmt::Display for PartyKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact and banking details for a party. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub contact_person: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub street: Option<String>,
    pub mobile_phone: Option<String>,
    pub email: Option<String>,
    pub bik: Option<String>,
    pub settlement_account: Option<String>,
    pub correspondent_account: Option<String>,
}

/// Supplier or customer, keyed by tax id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub tax_id: TaxId,
    pub kind: PartyKind,
    pub company_name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
}

/// Column limits of the party table.
const LIMITS: [(&str, usize); 9] = [
    ("contact_person", 255),
    ("city", 100),
    ("region", 100),
    ("street", 255),
    ("mobile_phone", 20),
    ("email", 150),
    ("bik", 9),
    ("settlement_account", 20),
    ("correspondent_account", 20),
];

impl Party {
    pub fn new(
        tax_id: TaxId,
        kind: PartyKind,
        company_name: impl Into<String>,
        contact: ContactInfo,
    ) -> DomainResult<Self> {
        let party = Self {
            tax_id,
            kind,
            company_name: company_name.into().trim().to_string(),
            contact,
        };
        party.validate()?;
        Ok(party)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.company_name.trim().is_empty() {
            return Err(DomainError::validation("company_name cannot be empty"));
        }
        if self.company_name.chars().count() > 255 {
            return Err(DomainError::validation("company_name longer than 255 characters"));
        }

        let c = &self.contact;
        let values = [
            &c.contact_person,
            &c.city,
            &c.region,
            &c.street,
            &c.mobile_phone,
            &c.email,
            &c.bik,
            &c.settlement_account,
            &c.correspondent_account,
        ];
        for ((field, max), value) in LIMITS.iter().zip(values) {
            if let Some(v) = value {
                if v.chars().count() > *max {
                    return Err(DomainError::validation(format!(
                        "{field} longer than {max} characters"
                    )));
                }
            }
        }

        if let Some(email) = &c.email {
            if !email.is_empty() && !email.contains('@') {
                return Err(DomainError::validation("email must contain '@'"));
            }
        }
        Ok(())
    }
}

impl Entity for Party {
    type Id = TaxId;

    fn id(&self) -> &Self::Id {
        &self.tax_id
    }
}
