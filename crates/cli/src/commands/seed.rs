//! Seed the database with a demo catalog and coupons.
//!
//! Rows are matched by product name and coupon code, so running the command
//! again only inserts what is missing.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use storekeep_api::db::{CouponRepository, ProductRepository, RepositoryError};
use storekeep_api::models::{NewCoupon, NewProduct};
use storekeep_core::{CouponCode, CouponCodeError, CouponKind};

/// Errors that can occur while seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Invalid coupon code: {0}")]
    CouponCode(#[from] CouponCodeError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

struct DemoProduct {
    name: &'static str,
    category: &'static str,
    description: &'static str,
    /// Price in cents
    price: i64,
    stock: u32,
}

const PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        name: "Enamel Camp Mug",
        category: "Kitchen",
        description: "12 oz steel mug with a speckled enamel finish.",
        price: 1800,
        stock: 40,
    },
    DemoProduct {
        name: "Pour-Over Coffee Set",
        category: "Kitchen",
        description: "Ceramic dripper, glass carafe and 100 paper filters.",
        price: 4500,
        stock: 15,
    },
    DemoProduct {
        name: "Waxed Canvas Tote",
        category: "Bags",
        description: "Water-resistant tote with leather handles.",
        price: 6200,
        stock: 20,
    },
    DemoProduct {
        name: "Merino Beanie",
        category: "Apparel",
        description: "Rib-knit beanie in 100% merino wool.",
        price: 2999,
        stock: 35,
    },
    DemoProduct {
        name: "Trail Running Shoes",
        category: "Apparel",
        description: "Lightweight trail shoes with a 4 mm drop.",
        price: 12999,
        stock: 8,
    },
    DemoProduct {
        name: "Cast Iron Skillet",
        category: "Kitchen",
        description: "10 inch pre-seasoned skillet.",
        price: 3450,
        stock: 0,
    },
];

struct DemoCoupon {
    code: &'static str,
    kind: CouponKind,
    /// Percent, or cents for fixed coupons
    discount: i64,
    /// Cents
    min_order_amount: Option<i64>,
    max_usages: Option<i32>,
}

const COUPONS: &[DemoCoupon] = &[
    DemoCoupon {
        code: "WELCOME10",
        kind: CouponKind::Percentage,
        discount: 10,
        min_order_amount: None,
        max_usages: None,
    },
    DemoCoupon {
        code: "SAVE20",
        kind: CouponKind::Fixed,
        discount: 2000,
        min_order_amount: Some(5000),
        max_usages: Some(100),
    },
    DemoCoupon {
        code: "HALFOFF",
        kind: CouponKind::Percentage,
        discount: 50,
        min_order_amount: Some(10000),
        max_usages: Some(1),
    },
];

/// Insert any missing demo products and coupons.
///
/// # Errors
///
/// Returns `SeedError` if a database operation fails.
pub async fn run(pool: &PgPool) -> Result<(), SeedError> {
    let products = ProductRepository::new(pool);
    let mut inserted = 0;
    for demo in PRODUCTS {
        if products.find_by_name(demo.name).await?.is_some() {
            continue;
        }
        products
            .create(&NewProduct {
                name: demo.name.to_string(),
                description: demo.description.to_string(),
                category: demo.category.to_string(),
                price: Decimal::new(demo.price, 2),
                stock: demo.stock,
                image_url: None,
            })
            .await?;
        inserted += 1;
    }
    info!(
        inserted,
        skipped = PRODUCTS.len() - inserted,
        "Products seeded"
    );

    let coupons = CouponRepository::new(pool);
    let mut inserted = 0;
    for demo in COUPONS {
        let code = CouponCode::parse(demo.code)?;
        if coupons.get_by_code(&code).await?.is_some() {
            continue;
        }
        let discount = match demo.kind {
            CouponKind::Percentage => Decimal::from(demo.discount),
            CouponKind::Fixed => Decimal::new(demo.discount, 2),
        };
        coupons
            .create(&NewCoupon {
                code,
                kind: demo.kind,
                discount,
                min_order_amount: demo.min_order_amount.map(|cents| Decimal::new(cents, 2)),
                max_usages: demo.max_usages,
                expires_at: None,
                is_active: true,
            })
            .await?;
        inserted += 1;
    }
    info!(
        inserted,
        skipped = COUPONS.len() - inserted,
        "Coupons seeded"
    );

    Ok(())
}
