//! Declarative description of what the bootstrap procedure provisions.

use std::collections::HashSet;
use std::fmt;

use anyhow::{anyhow, bail};
use bson::Document;

/// Sort direction of one index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// Numeric form used in index key documents.
    pub const fn as_i32(self) -> i32 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

/// Index specification: ordered `(field, direction)` pairs plus uniqueness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub keys: Vec<(String, Direction)>,
    pub unique: bool,
    /// Overrides the store's default name.
    pub name: Option<String>,
}

impl IndexSpec {
    /// Single-field ascending index.
    pub fn ascending(field: &str) -> Self {
        Self {
            keys: vec![(field.to_string(), Direction::Ascending)],
            unique: false,
            name: None,
        }
    }

    /// Single-field descending index.
    pub fn descending(field: &str) -> Self {
        Self {
            keys: vec![(field.to_string(), Direction::Descending)],
            unique: false,
            name: None,
        }
    }

    /// Append another key to a compound index.
    pub fn then(mut self, field: &str, direction: Direction) -> Self {
        self.keys.push((field.to_string(), direction));
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Explicit name if set, otherwise the store default, e.g. `orderDate_-1` or
    /// `category_1_price_-1`.
    pub fn name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.keys
            .iter()
            .map(|(field, direction)| format!("{}_{}", field, direction.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Key document in declaration order.
    pub fn key_document(&self) -> Document {
        let mut keys = Document::new();
        for (field, direction) in &self.keys {
            keys.insert(field.clone(), direction.as_i32());
        }
        keys
    }

    /// Same keys in the same order with the same uniqueness. Names are ignored.
    pub fn is_equivalent(&self, other: &IndexSpec) -> bool {
        self.keys == other.keys && self.unique == other.unique
    }
}

/// How a collection comes into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creation {
    /// Created by name before anything is written to it.
    Explicit,
    /// Created by the first insert or index build.
    Implicit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub name: String,
    pub creation: Creation,
    pub seed: Vec<Document>,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn explicit(name: &str) -> Self {
        Self {
            name: name.to_string(),
            creation: Creation::Explicit,
            seed: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn implicit(name: &str) -> Self {
        Self {
            creation: Creation::Implicit,
            ..Self::explicit(name)
        }
    }

    pub fn with_seed(mut self, seed: Vec<Document>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }
}

/// Authorization role granted to a principal on its own database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    ReadWrite,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::ReadWrite => "readWrite",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential scoped to a single database.
#[derive(Clone, PartialEq, Eq)]
pub struct PrincipalSpec {
    pub name: String,
    pub secret: String,
    pub role: Role,
}

impl PrincipalSpec {
    pub fn read_write(name: &str, secret: &str) -> Self {
        Self {
            name: name.to_string(),
            secret: secret.to_string(),
            role: Role::ReadWrite,
        }
    }
}

impl fmt::Debug for PrincipalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrincipalSpec")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSpec {
    pub name: String,
    pub collections: Vec<CollectionSpec>,
    pub principal: PrincipalSpec,
}

impl DatabaseSpec {
    pub fn new(name: &str, principal: PrincipalSpec) -> Self {
        Self {
            name: name.to_string(),
            collections: Vec::new(),
            principal,
        }
    }

    pub fn with_collection(mut self, collection: CollectionSpec) -> Self {
        self.collections.push(collection);
        self
    }
}

/// The full set of databases the procedure ensures exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub databases: Vec<DatabaseSpec>,
}

impl Catalog {
    pub fn new(databases: Vec<DatabaseSpec>) -> Self {
        Self { databases }
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseSpec> {
        self.databases.iter().find(|db| db.name == name)
    }

    pub fn collection_count(&self) -> usize {
        self.databases.iter().map(|db| db.collections.len()).sum()
    }

    /// Declared indexes, not counting the implicit `_id_` index.
    pub fn index_count(&self) -> usize {
        self.collections().map(|(_, c)| c.indexes.len()).sum()
    }

    pub fn seed_count(&self) -> usize {
        self.collections().map(|(_, c)| c.seed.len()).sum()
    }

    /// Every collection paired with the database it lives in.
    pub fn collections(&self) -> impl Iterator<Item = (&DatabaseSpec, &CollectionSpec)> {
        self.databases
            .iter()
            .flat_map(|db| db.collections.iter().map(move |c| (db, c)))
    }

    /// Reject catalogs the store would refuse or silently merge.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut databases = HashSet::new();
        for db in &self.databases {
            if db.name.is_empty() {
                bail!("database name must not be empty");
            }
            if !databases.insert(db.name.as_str()) {
                bail!("database '{}' declared twice", db.name);
            }
            if db.principal.name.is_empty() {
                return Err(anyhow!("principal for database '{}' has no name", db.name));
            }

            let mut collections = HashSet::new();
            for collection in &db.collections {
                if collection.name.is_empty() {
                    bail!("collection name in database '{}' must not be empty", db.name);
                }
                if !collections.insert(collection.name.as_str()) {
                    bail!(
                        "collection '{}.{}' declared twice",
                        db.name,
                        collection.name
                    );
                }

                let mut indexes = HashSet::new();
                for index in &collection.indexes {
                    if index.keys.is_empty() {
                        bail!(
                            "index on '{}.{}' has no keys",
                            db.name,
                            collection.name
                        );
                    }
                    if !indexes.insert(index.name()) {
                        bail!(
                            "index '{}' on '{}.{}' declared twice",
                            index.name(),
                            db.name,
                            collection.name
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        Catalog::new(vec![DatabaseSpec::new(
            "shop",
            PrincipalSpec::read_write("shop_user", "secret"),
        )
        .with_collection(
            CollectionSpec::implicit("orders")
                .with_index(IndexSpec::ascending("orderNumber").unique())
                .with_index(IndexSpec::descending("orderDate")),
        )])
    }

    #[test]
    fn index_name_matches_store_default() {
        let compound = IndexSpec::ascending("category").then("price", Direction::Descending);
        assert_eq!(compound.name(), "category_1_price_-1");
        assert_eq!(IndexSpec::descending("orderDate").name(), "orderDate_-1");
    }

    #[test]
    fn key_document_preserves_order() {
        let compound = IndexSpec::ascending("b").then("a", Direction::Descending);
        let keys: Vec<_> = compound.key_document().keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn equivalence_considers_uniqueness() {
        let plain = IndexSpec::ascending("email");
        assert!(plain.is_equivalent(&IndexSpec::ascending("email")));
        assert!(!plain.is_equivalent(&IndexSpec::ascending("email").unique()));
    }

    #[test]
    fn explicit_name_does_not_affect_equivalence() {
        let renamed = IndexSpec::ascending("orderNumber")
            .unique()
            .named("order_number_unique");
        assert_eq!(renamed.name(), "order_number_unique");
        assert!(renamed.is_equivalent(&IndexSpec::ascending("orderNumber").unique()));
    }

    #[test]
    fn principal_debug_hides_secret() {
        let rendered = format!("{:?}", PrincipalSpec::read_write("u", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn counts_and_validation() {
        let catalog = sample();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.collection_count(), 1);
        assert_eq!(catalog.index_count(), 2);
        assert_eq!(catalog.seed_count(), 0);
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let mut catalog = sample();
        catalog.databases[0].collections[0]
            .indexes
            .push(IndexSpec::descending("orderDate"));
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("orderDate_-1"));
    }

    #[test]
    fn duplicate_database_is_rejected() {
        let mut catalog = sample();
        let copy = catalog.databases[0].clone();
        catalog.databases.push(copy);
        assert!(catalog.validate().is_err());
    }
}
