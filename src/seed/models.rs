use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sample user profile for the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSeed {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub city: String,
    pub is_active: bool,
    #[serde(serialize_with = "bson::serde_helpers::chrono_datetime_as_bson_datetime::serialize")]
    pub created_at: DateTime<Utc>,
}

/// Sample listing for the `products` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSeed {
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Name of a [`CategorySeed`].
    pub category: String,
    pub stock: i32,
    pub tags: Vec<String>,
    #[serde(serialize_with = "bson::serde_helpers::chrono_datetime_as_bson_datetime::serialize")]
    pub created_at: DateTime<Utc>,
}

/// Line of an order; the product is referenced by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_name: String,
    pub quantity: i32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub zip_code: String,
}

/// Sample order for the `orders` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSeed {
    pub order_number: String,
    /// Username of the buyer, denormalized.
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: String,
    pub shipping_address: ShippingAddress,
    #[serde(serialize_with = "bson::serde_helpers::chrono_datetime_as_bson_datetime::serialize")]
    pub order_date: DateTime<Utc>,
}

impl OrderSeed {
    /// Sum of `quantity * price` over the items.
    pub fn items_total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| f64::from(item.quantity) * item.price)
            .sum()
    }
}

/// Sample entry for the `categories` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySeed {
    pub name: String,
    pub description: String,
    pub parent_category: Option<String>,
}
