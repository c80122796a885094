//! Sample product generator.
//!
//! Produces records matching the product index mapping so a fresh cluster
//! can be filled with something to query.

use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use search_miner_shared::Document;

pub const CATEGORIES: &[&str] = &["Electronics", "Clothing", "Home & Kitchen", "Books", "Sports"];

const FIRST_PRODUCT_NUMBER: usize = 1000;

/// One generated product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleProduct {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub in_stock: bool,
    pub rating: f64,
    pub created_at: String,
}

impl SampleProduct {
    /// Generate the product at zero-based `position`.
    pub fn generate<R: Rng + ?Sized>(position: usize, rng: &mut R) -> Self {
        let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
        let created_at = Utc::now() - Duration::days(rng.gen_range(1..=365));

        Self {
            product_id: format!("PROD-{}", position + FIRST_PRODUCT_NUMBER),
            name: format!("Product {}", position + 1),
            category: category.to_string(),
            price: round_to(rng.gen_range(10.0..=1000.0), 2),
            in_stock: rng.gen_bool(0.5),
            rating: round_to(rng.gen_range(1.0..=5.0), 1),
            created_at: created_at.to_rfc3339(),
        }
    }

    pub fn into_document(self) -> Document {
        let mut document = Document::new();
        document.insert("product_id".to_string(), self.product_id.into());
        document.insert("name".to_string(), self.name.into());
        document.insert("category".to_string(), self.category.into());
        document.insert("price".to_string(), self.price.into());
        document.insert("in_stock".to_string(), self.in_stock.into());
        document.insert("rating".to_string(), self.rating.into());
        document.insert("created_at".to_string(), self.created_at.into());
        document
    }
}

/// Generate `count` products using the thread RNG.
pub fn generate_products(count: usize) -> Vec<SampleProduct> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|position| SampleProduct::generate(position, &mut rng))
        .collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_identifiers_follow_position() {
        let products = generate_products(3);
        let ids: Vec<&str> = products.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["PROD-1000", "PROD-1001", "PROD-1002"]);
        assert_eq!(products[2].name, "Product 3");
    }

    #[test]
    fn test_values_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();

        for position in 0..200 {
            let product = SampleProduct::generate(position, &mut rng);

            assert!(CATEGORIES.contains(&product.category.as_str()));
            assert!((10.0..=1000.0).contains(&product.price));
            assert!((1.0..=5.0).contains(&product.rating));
            assert_eq!(product.price, round_to(product.price, 2));
            assert_eq!(product.rating, round_to(product.rating, 1));

            let created = DateTime::parse_from_rfc3339(&product.created_at).unwrap();
            let age = now.signed_duration_since(created);
            assert!(age >= Duration::hours(23));
            assert!(age <= Duration::days(366));
        }
    }

    #[test]
    fn test_document_field_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let document = SampleProduct::generate(0, &mut rng).into_document();
        let keys: Vec<&str> = document.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["product_id", "name", "category", "price", "in_stock", "rating", "created_at"]
        );
    }
}
