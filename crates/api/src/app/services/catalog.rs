use stockyard_auth::Principal;
use stockyard_auth::permissions::{PRODUCTS_DELETE, PRODUCTS_READ, PRODUCTS_WRITE};
use stockyard_core::Barcode;
use stockyard_products::Product;

use super::AppServices;
use crate::app::dto::{ProductRequest, ProductView};
use crate::app::errors::{ApiError, ApiResult};
use crate::authz::require;

impl AppServices {
    /// Every product with its current stock, recomputed on this call.
    pub async fn list_products(&self, principal: &Principal) -> ApiResult<Vec<ProductView>> {
        require(principal, &PRODUCTS_READ)?;

        let products = self.store.list_products().await?;
        let levels = self
            .store
            .stock_ledger(None)
            .await?
            .levels(products.iter().map(|p| &p.barcode));

        Ok(products
            .into_iter()
            .map(|product| ProductView {
                current_stock: levels.get(&product.barcode).copied().unwrap_or(0),
                product,
            })
            .collect())
    }

    pub async fn get_product(&self, principal: &Principal, barcode: &str) -> ApiResult<ProductView> {
        require(principal, &PRODUCTS_READ)?;
        let barcode: Barcode = barcode.parse()?;

        let product = self
            .store
            .get_product(&barcode)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("product {barcode}")))?;
        self.with_stock(product).await
    }

    pub async fn create_product(&self, principal: &Principal, req: ProductRequest) -> ApiResult<ProductView> {
        require(principal, &PRODUCTS_WRITE)?;

        let barcode = req
            .barcode
            .clone()
            .ok_or_else(|| ApiError::Validation("barcode is required".into()))?;
        let product = build_product(barcode, req)?;
        self.store.insert_product(&product).await?;

        tracing::info!(barcode = %product.barcode, user = %principal.username, "product created");
        self.with_stock(product).await
    }

    pub async fn update_product(
        &self,
        principal: &Principal,
        barcode: &str,
        req: ProductRequest,
    ) -> ApiResult<ProductView> {
        require(principal, &PRODUCTS_WRITE)?;
        let barcode: Barcode = barcode.parse()?;

        if req.barcode.as_ref().is_some_and(|b| b != &barcode) {
            return Err(ApiError::Validation("barcode in body does not match path".into()));
        }
        let product = build_product(barcode, req)?;
        self.store.update_product(&product).await?;

        tracing::info!(barcode = %product.barcode, user = %principal.username, "product updated");
        self.with_stock(product).await
    }

    pub async fn delete_product(&self, principal: &Principal, barcode: &str) -> ApiResult<()> {
        require(principal, &PRODUCTS_DELETE)?;
        let barcode: Barcode = barcode.parse()?;

        self.store.delete_product(&barcode).await?;
        tracing::info!(barcode = %barcode, user = %principal.username, "product deleted");
        Ok(())
    }

    async fn with_stock(&self, product: Product) -> ApiResult<ProductView> {
        let current_stock = self
            .store
            .stock_ledger(Some(&product.barcode))
            .await?
            .level_of(&product.barcode);
        Ok(ProductView {
            product,
            current_stock,
        })
    }
}

fn build_product(barcode: Barcode, req: ProductRequest) -> ApiResult<Product> {
    Ok(Product::new(
        barcode,
        req.name,
        req.category,
        req.unit,
        req.unit_price,
        req.storage_days,
    )?)
}
