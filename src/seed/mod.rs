//! Typed sample data for the `test` database, loaded from the embedded asset.

pub mod models;

use std::collections::HashSet;

use anyhow::{bail, Context};
use bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

pub use models::{CategorySeed, OrderItem, OrderSeed, ProductSeed, ShippingAddress, UserSeed};

const TEST_SEED: &str = include_str!("../../assets/seed/test.json");

/// Tolerance when comparing order totals against their items.
const TOTAL_EPSILON: f64 = 0.005;

/// The complete seed payload of the `test` database.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SeedSet {
    pub users: Vec<UserSeed>,
    pub products: Vec<ProductSeed>,
    pub orders: Vec<OrderSeed>,
    pub categories: Vec<CategorySeed>,
}

impl SeedSet {
    /// Parse and check the embedded asset.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_json(TEST_SEED).context("embedded seed asset is invalid")
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let seed: SeedSet = serde_json::from_str(raw).context("failed to parse seed data")?;
        seed.validate()?;
        Ok(seed)
    }

    /// Unique fields stay unique and denormalized references resolve.
    pub fn validate(&self) -> anyhow::Result<()> {
        let usernames = unique_values("users.username", self.users.iter().map(|u| &u.username))?;
        unique_values("users.email", self.users.iter().map(|u| &u.email))?;
        let products = unique_values("products.name", self.products.iter().map(|p| &p.name))?;
        unique_values(
            "orders.orderNumber",
            self.orders.iter().map(|o| &o.order_number),
        )?;
        let categories =
            unique_values("categories.name", self.categories.iter().map(|c| &c.name))?;

        for category in &self.categories {
            if let Some(parent) = &category.parent_category {
                if !categories.contains(parent.as_str()) {
                    bail!(
                        "category '{}' has unknown parent '{}'",
                        category.name,
                        parent
                    );
                }
            }
        }
        for product in &self.products {
            if !categories.contains(product.category.as_str()) {
                bail!(
                    "product '{}' references unknown category '{}'",
                    product.name,
                    product.category
                );
            }
        }
        for order in &self.orders {
            if !usernames.contains(order.user_id.as_str()) {
                bail!(
                    "order '{}' references unknown user '{}'",
                    order.order_number,
                    order.user_id
                );
            }
            for item in &order.items {
                if !products.contains(item.product_name.as_str()) {
                    bail!(
                        "order '{}' references unknown product '{}'",
                        order.order_number,
                        item.product_name
                    );
                }
            }
            if (order.items_total() - order.total_amount).abs() > TOTAL_EPSILON {
                bail!(
                    "order '{}' total {} does not match its items ({})",
                    order.order_number,
                    order.total_amount,
                    order.items_total()
                );
            }
        }
        Ok(())
    }
}

fn unique_values<'a>(
    label: &str,
    values: impl Iterator<Item = &'a String>,
) -> anyhow::Result<HashSet<&'a str>> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value.as_str()) {
            bail!("duplicate value '{}' for {}", value, label);
        }
    }
    Ok(seen)
}

/// Serialize typed records into store documents.
pub fn to_documents<T: Serialize>(records: &[T]) -> anyhow::Result<Vec<Document>> {
    records
        .iter()
        .map(|record| bson::to_document(record).context("failed to encode seed record"))
        .collect()
}

/// Prefix a document with a freshly generated `_id`.
pub fn with_identifier(document: Document) -> Document {
    let mut identified = Document::new();
    identified.insert("_id", ObjectId::new());
    identified.extend(document);
    identified
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;

    #[test]
    fn embedded_asset_has_expected_shape() {
        let seed = SeedSet::load().unwrap();
        assert_eq!(seed.users.len(), 5);
        assert_eq!(seed.products.len(), 5);
        assert_eq!(seed.orders.len(), 3);
        assert_eq!(seed.categories.len(), 4);
    }

    #[test]
    fn timestamps_become_native_datetimes() {
        let seed = SeedSet::load().unwrap();
        let documents = to_documents(&seed.users).unwrap();
        assert!(matches!(documents[0].get("createdAt"), Some(Bson::DateTime(_))));
        assert_eq!(documents[0].get_str("firstName").unwrap(), "John");
    }

    #[test]
    fn root_categories_store_null_parent() {
        let seed = SeedSet::load().unwrap();
        let documents = to_documents(&seed.categories).unwrap();
        assert_eq!(documents[0].get("parentCategory"), Some(&Bson::Null));
    }

    #[test]
    fn identifiers_are_fresh_and_first() {
        let first = with_identifier(bson::doc! { "name": "x" });
        let second = with_identifier(bson::doc! { "name": "x" });
        assert_eq!(first.keys().next().map(String::as_str), Some("_id"));
        assert_ne!(
            first.get_object_id("_id").unwrap(),
            second.get_object_id("_id").unwrap()
        );
    }

    #[test]
    fn dangling_order_reference_is_rejected() {
        let mut seed = SeedSet::load().unwrap();
        seed.orders[0].user_id = "nobody".to_string();
        let err = seed.validate().unwrap_err();
        assert!(err.to_string().contains("nobody"));
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let mut seed = SeedSet::load().unwrap();
        seed.users[1].email = seed.users[0].email.clone();
        assert!(seed.validate().is_err());
    }
}
