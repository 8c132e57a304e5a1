//! Initial catalog of village artisan products.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use market_auth::UserRef;
use market_core::{Money, ProductId, UserId};
use market_products::{Approval, Product};

use crate::store::{MarketStore, StoreResult};

struct SeedProduct {
    name: &'static str,
    price: u64,
    image_url: &'static str,
}

const CATALOG: [SeedProduct; 8] = [
    SeedProduct {
        name: "Handwoven Bamboo Basket",
        price: 850,
        image_url: "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcQElLboj8ry3YOE-lAOfTcajrrBXEA7mh0n-A&s",
    },
    SeedProduct {
        name: "Terracotta Handcrafted Necklace",
        price: 650,
        image_url: "https://soul-india.in/cdn/shop/files/3951073353.jpg?v=1716037171&width=1200",
    },
    SeedProduct {
        name: "Coconut Shell Bowl Set",
        price: 1200,
        image_url: "https://ambihome.in/cdn/shop/files/PRRM1475.jpg?v=1747895368&width=3899",
    },
    SeedProduct {
        name: "Handmade Jute Bag",
        price: 950,
        image_url: "https://5.imimg.com/data5/SELLER/Default/2025/3/495234873/BX/KD/HI/40222619/jute-carry-bag.jpg",
    },
    SeedProduct {
        name: "Woolen Handmade Socks",
        price: 450,
        image_url: "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcSntv_aZg0bT508UrhxoTjq6eiT81CZ8Mudow&s",
    },
    SeedProduct {
        name: "Clay Water Pot",
        price: 700,
        image_url: "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcTGVSucJ33ZO-7VGrZ-PUHOXztbFZX42Hi3HQ&s",
    },
    SeedProduct {
        name: "Wooden Spice Box",
        price: 1100,
        image_url: "https://ii1.pepperfry.com/media/catalog/product/d/u/1100x1210/dudki-handmade-mango-wooden-spice-box-for-kitchen-for-kitchen-with-8-small-partitions-and-transparen-dgznxj.jpg",
    },
    SeedProduct {
        name: "Handloom Cotton Shawl",
        price: 1600,
        image_url: "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcTqguUcl70M6SwqbXGWdY2CrStRuULLrQBZHA&s",
    },
];

/// The principal recorded as approver of seeded products.
pub fn system_user() -> UserRef {
    UserRef {
        id: UserId::from_uuid(Uuid::nil()),
        username: "system".to_string(),
    }
}

/// Insert the catalog products that do not exist yet (matched by name).
///
/// Seeded products have no owner and are approved by [`system_user`].
/// Returns how many products were created.
#[instrument(skip(store), err)]
pub async fn seed_catalog<S>(store: &S, at: DateTime<Utc>) -> StoreResult<usize>
where
    S: MarketStore + ?Sized,
{
    let mut created = 0;
    for entry in &CATALOG {
        if store.product_by_name(entry.name).await?.is_some() {
            info!(name = entry.name, "catalog product already exists");
            continue;
        }

        let product = Product::seeded(
            ProductId::new(),
            entry.name,
            Money::from_major(entry.price),
            entry.image_url,
            Some(Approval {
                approved_at: at,
                approved_by: system_user(),
            }),
            at,
        );
        store.insert_product(product).await?;
        info!(name = entry.name, "created catalog product");
        created += 1;
    }

    info!(created, "catalog seeded");
    Ok(created)
}
