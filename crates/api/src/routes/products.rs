//! Product route handlers.

use axum::{extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use storekeep_core::ProductId;

use super::{ApiJson, ApiPath, ApiQuery, Created, Data, PageQuery, double_option};
use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAccount, RequireAdmin};
use crate::models::{
    NewProduct, Page, PageRequest, Product, ProductFilter, ProductSort, ProductUpdate, User,
};
use crate::state::AppState;
use crate::validation::FieldErrors;

const MAX_NAME_LENGTH: usize = 200;
const MAX_CATEGORY_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 5000;
const MAX_SEARCH_LENGTH: usize = 200;
const MAX_IMAGE_URL_LENGTH: usize = 2048;

/// Listing query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Create body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub stock: u32,
    pub image_url: Option<String>,
}

/// Partial update body. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    /// `null` removes the image.
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl ProductQuery {
    fn validate(self, include_inactive: bool) -> Result<(ProductFilter, PageRequest)> {
        let mut errors = FieldErrors::new();
        let page = PageQuery {
            page: self.page,
            limit: self.limit,
        }
        .validate(&mut errors);

        let search = errors.optional_text("search", self.search.as_deref(), MAX_SEARCH_LENGTH);
        let category =
            errors.optional_text("category", self.category.as_deref(), MAX_CATEGORY_LENGTH);
        let min_price = self.min_price.map(|p| errors.amount("minPrice", p));
        let max_price = self.max_price.map(|p| errors.amount("maxPrice", p));
        if let (Some(min), Some(max)) = (min_price, max_price)
            && min > max
        {
            errors.add("minPrice", "must not exceed maxPrice");
        }
        errors.finish()?;

        let filter = ProductFilter {
            search,
            category,
            min_price,
            max_price,
            sort: self.sort,
            include_inactive,
        };
        Ok((filter, page))
    }
}

impl CreateProductRequest {
    fn validate(self) -> Result<NewProduct> {
        let mut errors = FieldErrors::new();
        let product = NewProduct {
            name: errors.text("name", &self.name, MAX_NAME_LENGTH),
            description: description(&mut errors, &self.description),
            category: errors.text("category", &self.category, MAX_CATEGORY_LENGTH),
            price: errors.amount("price", self.price),
            stock: errors.count("stock", self.stock),
            image_url: image_url(&mut errors, self.image_url.as_deref()),
        };
        errors.finish()?;
        Ok(product)
    }
}

impl UpdateProductRequest {
    fn validate(self) -> Result<ProductUpdate> {
        let mut errors = FieldErrors::new();
        let update = ProductUpdate {
            name: self
                .name
                .map(|name| errors.text("name", &name, MAX_NAME_LENGTH)),
            description: self
                .description
                .map(|text| description(&mut errors, &text)),
            category: self
                .category
                .map(|category| errors.text("category", &category, MAX_CATEGORY_LENGTH)),
            price: self.price.map(|price| errors.amount("price", price)),
            stock: self.stock.map(|stock| errors.count("stock", stock)),
            image_url: self
                .image_url
                .map(|url| image_url(&mut errors, url.as_deref())),
            is_active: self.is_active,
        };
        errors.finish()?;
        Ok(update)
    }
}

fn description(errors: &mut FieldErrors, text: &str) -> String {
    let text = text.trim();
    if text.chars().count() > MAX_DESCRIPTION_LENGTH {
        errors.add(
            "description",
            format!("must be at most {MAX_DESCRIPTION_LENGTH} characters"),
        );
    }
    text.to_string()
}

fn image_url(errors: &mut FieldErrors, url: Option<&str>) -> Option<String> {
    let url = errors.optional_text("imageUrl", url, MAX_IMAGE_URL_LENGTH)?;
    match Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        _ => errors.add("imageUrl", "must be an http(s) URL"),
    }
    Some(url)
}

/// List products. Admins also see deactivated ones.
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    OptionalAccount(account): OptionalAccount,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Data<Page<Product>>> {
    let is_admin = account.as_ref().is_some_and(User::is_admin);
    let (filter, page) = query.validate(is_admin)?;

    let products = ProductRepository::new(state.pool())
        .list(&filter, page)
        .await?;
    Ok(Data(products))
}

/// One product. Deactivated products are only visible to admins.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAccount(account): OptionalAccount,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Data<Product>> {
    let is_admin = account.as_ref().is_some_and(User::is_admin);

    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|product| product.is_active || is_admin)
        .map(Data)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// Create a product.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<CreateProductRequest>,
) -> Result<Created<Product>> {
    let product = body.validate()?;
    let product = ProductRepository::new(state.pool()).create(&product).await?;

    tracing::info!(product_id = %product.id, "product created");
    Ok(Created(product))
}

/// Update a product.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<UpdateProductRequest>,
) -> Result<Data<Product>> {
    let update = body.validate()?;
    let product = ProductRepository::new(state.pool())
        .update(id, &update)
        .await
        .map_err(not_found)?;

    Ok(Data(product))
}

/// Deactivate a product. It stays referenced by past orders.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .deactivate(id)
        .await
        .map_err(not_found)?;

    tracing::info!("product deactivated");
    Ok(StatusCode::NO_CONTENT)
}

fn not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(json: &str) -> ProductQuery {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_listing_defaults() {
        let (filter, page) = query("{}").validate(false).unwrap();
        assert_eq!(filter.sort, ProductSort::Newest);
        assert!(!filter.include_inactive);
        assert_eq!(page.limit, 20);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let (filter, _) = query(r#"{"search":"   ","category":" Kitchen "}"#)
            .validate(false)
            .unwrap();
        assert_eq!(filter.search, None);
        assert_eq!(filter.category.as_deref(), Some("Kitchen"));
    }

    #[test]
    fn test_inverted_price_range_is_rejected() {
        let err = query(r#"{"minPrice":"50","maxPrice":"10"}"#)
            .validate(false)
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_create_validation_collects_fields() {
        let body: CreateProductRequest = serde_json::from_str(
            r#"{"name":" ","category":"mugs","price":"-1","stock":3,"imageUrl":"ftp://x"}"#,
        )
        .unwrap();
        let AppError::Validation {
            fields: Some(fields),
            ..
        } = body.validate().unwrap_err()
        else {
            panic!("expected field errors");
        };
        assert!(fields.get("name").is_some());
        assert!(fields.get("price").is_some());
        assert!(fields.get("imageUrl").is_some());
        assert!(fields.get("category").is_none());
    }

    #[test]
    fn test_out_of_range_price_and_stock_are_validation_errors() {
        let body: CreateProductRequest = serde_json::from_str(
            r#"{"name":"Mug","category":"mugs","price":"100000000000","stock":4294967295}"#,
        )
        .unwrap();
        let AppError::Validation {
            fields: Some(fields),
            ..
        } = body.validate().unwrap_err()
        else {
            panic!("expected field errors");
        };
        assert!(fields.get("price").is_some());
        assert!(fields.get("stock").is_some());

        let body: UpdateProductRequest = serde_json::from_str(r#"{"stock":3000000000}"#).unwrap();
        let err = body.validate().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_update_can_clear_image() {
        let body: UpdateProductRequest = serde_json::from_str(r#"{"imageUrl":null}"#).unwrap();
        let update = body.validate().unwrap();
        assert_eq!(update.image_url, Some(None));
        assert!(update.name.is_none());
    }
}
