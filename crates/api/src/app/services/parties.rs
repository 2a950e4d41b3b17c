use stockyard_auth::permissions::{
    CUSTOMERS_DELETE, CUSTOMERS_READ, CUSTOMERS_WRITE, SUPPLIERS_DELETE, SUPPLIERS_READ,
    SUPPLIERS_WRITE,
};
use stockyard_auth::{Permission, Principal};
use stockyard_core::TaxId;
use stockyard_parties::{Party, PartyKind};

use super::AppServices;
use crate::app::dto::{PartyRequest, PartyView};
use crate::app::errors::{ApiError, ApiResult};
use crate::authz::require;

/// Suppliers and customers share one shape but not one policy.
struct PartyPolicy {
    read: Permission,
    write: Permission,
    delete: Permission,
}

impl PartyPolicy {
    fn for_kind(kind: PartyKind) -> Self {
        match kind {
            PartyKind::Supplier => Self {
                read: SUPPLIERS_READ,
                write: SUPPLIERS_WRITE,
                delete: SUPPLIERS_DELETE,
            },
            PartyKind::Customer => Self {
                read: CUSTOMERS_READ,
                write: CUSTOMERS_WRITE,
                delete: CUSTOMERS_DELETE,
            },
        }
    }
}

impl AppServices {
    pub async fn list_parties(&self, principal: &Principal, kind: PartyKind) -> ApiResult<Vec<PartyView>> {
        require(principal, &PartyPolicy::for_kind(kind).read)?;
        Ok(self.store.list_parties(kind).await?)
    }

    pub async fn get_party(&self, principal: &Principal, kind: PartyKind, tax_id: &str) -> ApiResult<PartyView> {
        require(principal, &PartyPolicy::for_kind(kind).read)?;
        let tax_id: TaxId = tax_id.parse()?;

        self.store
            .get_party(kind, &tax_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("{kind} {tax_id}")))
    }

    pub async fn create_party(
        &self,
        principal: &Principal,
        kind: PartyKind,
        req: PartyRequest,
    ) -> ApiResult<PartyView> {
        require(principal, &PartyPolicy::for_kind(kind).write)?;

        let tax_id = req
            .tax_id
            .ok_or_else(|| ApiError::Validation("tax_id is required".into()))?;
        let party = Party::new(tax_id, kind, req.company_name, req.contact)?;
        self.store.insert_party(&party).await?;

        tracing::info!(kind = %kind, tax_id = %party.tax_id, user = %principal.username, "party created");
        Ok(party)
    }

    pub async fn update_party(
        &self,
        principal: &Principal,
        kind: PartyKind,
        tax_id: &str,
        req: PartyRequest,
    ) -> ApiResult<PartyView> {
        require(principal, &PartyPolicy::for_kind(kind).write)?;
        let tax_id: TaxId = tax_id.parse()?;

        if req.tax_id.as_ref().is_some_and(|t| t != &tax_id) {
            return Err(ApiError::Validation("tax_id in body does not match path".into()));
        }
        let party = Party::new(tax_id, kind, req.company_name, req.contact)?;
        self.store.update_party(&party).await?;

        tracing::info!(kind = %kind, tax_id = %party.tax_id, user = %principal.username, "party updated");
        Ok(party)
    }

    pub async fn delete_party(&self, principal: &Principal, kind: PartyKind, tax_id: &str) -> ApiResult<()> {
        require(principal, &PartyPolicy::for_kind(kind).delete)?;
        let tax_id: TaxId = tax_id.parse()?;

        self.store.delete_party(kind, &tax_id).await?;
        tracing::info!(kind = %kind, tax_id = %tax_id, user = %principal.username, "party deleted");
        Ok(())
    }
}
