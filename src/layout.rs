//! Persisted-state layout: what the catalog declares versus what a store holds.

use std::fmt;

use provision_kernel::{Catalog, DatabaseHandle, Store, StoreError};

const ID_INDEX: &str = "_id_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionLayout {
    pub name: String,
    pub documents: u64,
    /// Index names, sorted, including `_id_`.
    pub indexes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseLayout {
    pub name: String,
    pub principal: String,
    pub collections: Vec<CollectionLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Layout {
    pub databases: Vec<DatabaseLayout>,
}

impl Layout {
    /// State a fresh volume should be in after one successful run.
    pub fn declared(catalog: &Catalog) -> Self {
        let databases = catalog
            .databases
            .iter()
            .map(|db| {
                let mut collections: Vec<_> = db
                    .collections
                    .iter()
                    .map(|c| {
                        let mut indexes: Vec<_> = std::iter::once(ID_INDEX.to_string())
                            .chain(c.indexes.iter().map(|i| i.name()))
                            .collect();
                        indexes.sort();
                        CollectionLayout {
                            name: c.name.clone(),
                            documents: c.seed.len() as u64,
                            indexes,
                        }
                    })
                    .collect();
                collections.sort_by(|a, b| a.name.cmp(&b.name));
                DatabaseLayout {
                    name: db.name.clone(),
                    principal: db.principal.name.clone(),
                    collections,
                }
            })
            .collect();
        Self { databases }
    }

    /// Read back the catalogued databases from a store.
    pub async fn observe(store: &dyn Store, catalog: &Catalog) -> Result<Self, StoreError> {
        let mut databases = Vec::with_capacity(catalog.databases.len());

        for db in &catalog.databases {
            let handle = DatabaseHandle::new(store, &db.name);
            let mut names = handle.list_collections().await?;
            names.sort();

            let mut collections = Vec::with_capacity(names.len());
            for name in names {
                let documents = handle.count_documents(&name).await?;
                let mut indexes = handle.list_indexes(&name).await?;
                indexes.sort();
                collections.push(CollectionLayout {
                    name,
                    documents,
                    indexes,
                });
            }

            databases.push(DatabaseLayout {
                name: db.name.clone(),
                principal: db.principal.name.clone(),
                collections,
            });
        }

        Ok(Self { databases })
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseLayout> {
        self.databases.iter().find(|db| db.name == name)
    }

    /// Indexes across all collections, including one `_id_` per collection.
    pub fn index_count(&self) -> usize {
        self.databases
            .iter()
            .flat_map(|db| db.collections.iter())
            .map(|c| c.indexes.len())
            .sum()
    }
}

impl DatabaseLayout {
    pub fn collection(&self, name: &str) -> Option<&CollectionLayout> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn collection_names(&self) -> Vec<&str> {
        self.collections.iter().map(|c| c.name.as_str()).collect()
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10} {:<12} {:>9}  {:<16} indexes",
            "database", "collection", "documents", "principal"
        )?;
        for db in &self.databases {
            for c in &db.collections {
                let indexes: Vec<_> = c
                    .indexes
                    .iter()
                    .filter(|name| name.as_str() != ID_INDEX)
                    .map(String::as_str)
                    .collect();
                let indexes = if indexes.is_empty() {
                    "-".to_string()
                } else {
                    indexes.join(", ")
                };
                writeln!(
                    f,
                    "{:<10} {:<12} {:>9}  {:<16} {}",
                    db.name, c.name, c.documents, db.principal, indexes
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn declared_layout_counts() {
        let catalog = catalog::fixed().unwrap();
        let layout = Layout::declared(&catalog);
        let test = layout.database("test").unwrap();
        assert_eq!(
            test.collection_names(),
            vec!["categories", "orders", "products", "users"]
        );
        assert_eq!(test.collection("users").unwrap().documents, 5);
        // 15 declared plus one `_id_` per collection (6 collections).
        assert_eq!(layout.index_count(), 21);
    }

    #[test]
    fn table_lists_every_collection() {
        let catalog = catalog::fixed().unwrap();
        let rendered = Layout::declared(&catalog).to_string();
        assert!(rendered.contains("BaseMap"));
        assert!(rendered.contains("terrain_user"));
        assert!(rendered.contains("orderNumber_1"));
        assert_eq!(rendered.lines().count(), 1 + 6);
    }
}
