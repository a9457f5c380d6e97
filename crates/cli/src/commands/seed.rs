//! Seed the catalog with sample products.
//!
//! Products are matched by name, so re-running the command only inserts the
//! ones that are missing.

use rust_decimal::Decimal;
use thiserror::Error;

use himorganic_server::config::{ConfigError, ServerConfig};
use himorganic_server::models::Product;
use himorganic_server::store::{Filter, Store, StoreError};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct SampleProduct {
    name: &'static str,
    description: &'static str,
    price: i64,
    category: &'static str,
    stock: u32,
}

const SAMPLE_PRODUCTS: &[SampleProduct] = &[
    SampleProduct {
        name: "Wild Forest Honey",
        description: "Raw, unfiltered honey collected from Himalayan forest hives.",
        price: 450,
        category: "Honey",
        stock: 60,
    },
    SampleProduct {
        name: "Apricot Kernel Oil",
        description: "Cold-pressed oil from sun-dried Ladakhi apricot kernels.",
        price: 550,
        category: "Oils",
        stock: 40,
    },
    SampleProduct {
        name: "Plum Preserve",
        description: "Small-batch plum preserve with no added pectin.",
        price: 280,
        category: "Preserves",
        stock: 80,
    },
    SampleProduct {
        name: "Seabuckthorn Tea",
        description: "Loose-leaf tisane from wild seabuckthorn berries and leaves.",
        price: 320,
        category: "Teas",
        stock: 100,
    },
    SampleProduct {
        name: "Rhododendron Squash",
        description: "Floral squash made from spring rhododendron blossoms.",
        price: 240,
        category: "Beverages",
        stock: 50,
    },
    SampleProduct {
        name: "Hand-Pounded Red Rice",
        description: "Heirloom red rice from terraced mountain farms.",
        price: 380,
        category: "Grains",
        stock: 70,
    },
];

/// Insert any sample products missing from the catalog.
///
/// # Errors
///
/// Returns [`SeedError`] if configuration or storage fails.
pub async fn products() -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    let store = Store::open(&config.storage).await?;
    let products = store.collection::<Product>();

    let mut inserted = 0u32;
    for sample in SAMPLE_PRODUCTS {
        if products
            .exists(Filter::all().eq("name", sample.name))
            .await?
        {
            continue;
        }
        let mut product = Product::new(
            sample.name.to_string(),
            Decimal::from(sample.price),
            None,
        );
        product.description = sample.description.to_string();
        product.category = sample.category.to_string();
        product.stock = sample.stock;
        products.create(&product).await?;
        inserted += 1;
    }

    tracing::info!(
        inserted,
        skipped = SAMPLE_PRODUCTS.len() as u32 - inserted,
        "catalog seeding finished"
    );
    Ok(())
}
