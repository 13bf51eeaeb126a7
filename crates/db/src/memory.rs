//! In-process store with the same observable semantics as the real server.
//! Backs the dry-run plan and the test suites.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};

use provision_kernel::{
    reconcile_index, DuplicateTarget, Ensured, ExistingIndex, IndexSpec, PrincipalSpec, Store,
    StoreError,
};

const ID_INDEX: &str = "_id_";
const ADMIN_DATABASE: &str = "admin";

/// Failure to simulate on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// No server reachable.
    Offline,
    /// The administrative credential is rejected.
    BadCredentials,
    /// Reads succeed, every write is refused.
    ReadOnly,
}

#[derive(Debug, Clone)]
struct MemIndex {
    name: String,
    spec: IndexSpec,
}

#[derive(Debug, Default)]
struct MemCollection {
    documents: Vec<Document>,
    indexes: Vec<MemIndex>,
}

impl MemCollection {
    fn new() -> Self {
        Self {
            documents: Vec::new(),
            indexes: vec![MemIndex {
                name: ID_INDEX.to_string(),
                spec: IndexSpec::ascending("_id").unique(),
            }],
        }
    }

    /// Values of the index keys; missing fields compare as null.
    fn key_of(spec: &IndexSpec, document: &Document) -> Vec<Bson> {
        spec.keys
            .iter()
            .map(|(field, _)| document.get(field).cloned().unwrap_or(Bson::Null))
            .collect()
    }

    fn unique_violation(&self, candidates: &[Document]) -> Option<String> {
        for index in self.indexes.iter().filter(|i| i.spec.unique) {
            let mut seen: Vec<Vec<Bson>> = self
                .documents
                .iter()
                .map(|d| Self::key_of(&index.spec, d))
                .collect();
            for candidate in candidates {
                let key = Self::key_of(&index.spec, candidate);
                if seen.contains(&key) {
                    return Some(format!(
                        "E11000 duplicate key error index: {} dup key: {:?}",
                        index.name, key
                    ));
                }
                seen.push(key);
            }
        }
        None
    }
}

#[derive(Debug, Default)]
struct State {
    databases: BTreeMap<String, BTreeMap<String, MemCollection>>,
    /// (database, principal name) pairs.
    principals: BTreeSet<(String, String)>,
}

impl State {
    fn collection_mut(&mut self, database: &str, collection: &str) -> &mut MemCollection {
        self.databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_insert_with(MemCollection::new)
    }

    fn collection(&self, database: &str, collection: &str) -> Option<&MemCollection> {
        self.databases.get(database)?.get(collection)
    }
}

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    failure: Option<FailureMode>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that fails every call the way `mode` describes.
    pub fn failing(mode: FailureMode) -> Self {
        Self {
            state: Mutex::default(),
            failure: Some(mode),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Internal(anyhow::anyhow!("memory store lock poisoned")))
    }

    fn check_read(&self) -> Result<(), StoreError> {
        match self.failure {
            Some(FailureMode::Offline) => Err(StoreError::connection(
                "no servers available: connection refused",
            )),
            Some(FailureMode::BadCredentials) => {
                Err(StoreError::authentication("SCRAM authentication failed"))
            }
            Some(FailureMode::ReadOnly) | None => Ok(()),
        }
    }

    fn check_write(&self, action: &str) -> Result<(), StoreError> {
        self.check_read()?;
        if self.failure == Some(FailureMode::ReadOnly) {
            return Err(StoreError::permission(format!(
                "not authorized to {}",
                action
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn authenticate(&self) -> Result<(), StoreError> {
        self.check_read()
    }

    async fn create_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Ensured, StoreError> {
        self.check_write("create collection")?;
        let mut state = self.lock()?;
        if state.collection(database, collection).is_some() {
            return Ok(Ensured::AlreadyExists);
        }
        state.collection_mut(database, collection);
        Ok(Ensured::Created)
    }

    async fn insert_documents(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError> {
        self.check_write("insert")?;
        if documents.is_empty() {
            return Err(StoreError::invalid_document("empty insert batch"));
        }

        let documents: Vec<Document> = documents
            .into_iter()
            .map(|mut document| {
                if !document.contains_key("_id") {
                    document.insert("_id", ObjectId::new());
                }
                document
            })
            .collect();

        let mut state = self.lock()?;
        let target = state.collection_mut(database, collection);
        if let Some(message) = target.unique_violation(&documents) {
            return Err(StoreError::duplicate(DuplicateTarget::Document, message));
        }

        let inserted = documents.len();
        target.documents.extend(documents);
        Ok(inserted)
    }

    async fn count_documents(&self, database: &str, collection: &str) -> Result<u64, StoreError> {
        self.check_read()?;
        let state = self.lock()?;
        Ok(state
            .collection(database, collection)
            .map_or(0, |c| c.documents.len() as u64))
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
    ) -> Result<Ensured, StoreError> {
        self.check_write("create index")?;
        if index.keys.is_empty() {
            return Err(StoreError::invalid_document("index has no keys"));
        }

        let name = index.name();
        let mut state = self.lock()?;
        let target = state.collection_mut(database, collection);

        let present: Vec<ExistingIndex> = target
            .indexes
            .iter()
            .map(|i| ExistingIndex {
                name: i.name.clone(),
                spec: Some(i.spec.clone()),
            })
            .collect();
        if let Some(outcome) = reconcile_index(index, &present)? {
            return Ok(outcome);
        }

        let candidate = MemIndex {
            name,
            spec: index.clone(),
        };
        if index.unique {
            let check = MemCollection {
                documents: Vec::new(),
                indexes: vec![candidate.clone()],
            };
            if let Some(message) = check.unique_violation(&target.documents) {
                return Err(StoreError::duplicate(DuplicateTarget::Document, message));
            }
        }

        target.indexes.push(candidate);
        Ok(Ensured::Created)
    }

    async fn create_principal(
        &self,
        database: &str,
        principal: &PrincipalSpec,
    ) -> Result<(), StoreError> {
        self.check_write("create user")?;
        let mut state = self.lock()?;
        let key = (database.to_string(), principal.name.clone());
        if !state.principals.insert(key) {
            return Err(StoreError::duplicate(
                DuplicateTarget::Principal,
                format!("User \"{}@{}\" already exists", principal.name, database),
            ));
        }
        // User documents live in the control namespace.
        state
            .collection_mut(ADMIN_DATABASE, "system.users")
            .documents
            .push(bson::doc! {
                "_id": format!("{}.{}", database, principal.name),
                "user": principal.name.as_str(),
                "db": database,
                "roles": [{ "role": principal.role.as_str(), "db": database }],
            });
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        self.check_read()?;
        let state = self.lock()?;
        Ok(state.databases.keys().cloned().collect())
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>, StoreError> {
        self.check_read()?;
        let state = self.lock()?;
        Ok(state
            .databases
            .get(database)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<String>, StoreError> {
        self.check_read()?;
        let state = self.lock()?;
        Ok(state
            .collection(database, collection)
            .map(|c| c.indexes.iter().map(|i| i.name.clone()).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[tokio::test]
    async fn insert_assigns_identifiers_and_counts() {
        let store = MemoryStore::new();
        let inserted = store
            .insert_documents("shop", "users", vec![doc! { "n": 1 }, doc! { "n": 2 }])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.count_documents("shop", "users").await.unwrap(), 2);
        assert_eq!(
            store.list_indexes("shop", "users").await.unwrap(),
            vec!["_id_".to_string()]
        );
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates() {
        let store = MemoryStore::new();
        store
            .create_index("shop", "users", &IndexSpec::ascending("email").unique())
            .await
            .unwrap();
        store
            .insert_documents("shop", "users", vec![doc! { "email": "a@example.com" }])
            .await
            .unwrap();

        let err = store
            .insert_documents("shop", "users", vec![doc! { "email": "a@example.com" }])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateKey {
                target: DuplicateTarget::Document,
                ..
            }
        ));
        assert_eq!(store.count_documents("shop", "users").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unique_index_over_duplicate_data_fails() {
        let store = MemoryStore::new();
        store
            .insert_documents(
                "shop",
                "users",
                vec![doc! { "city": "Oslo" }, doc! { "city": "Oslo" }],
            )
            .await
            .unwrap();
        let err = store
            .create_index("shop", "users", &IndexSpec::ascending("city").unique())
            .await
            .unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn repeated_index_is_not_duplicated() {
        let store = MemoryStore::new();
        let spec = IndexSpec::descending("createdAt");
        assert_eq!(
            store.create_index("shop", "users", &spec).await.unwrap(),
            Ensured::Created
        );
        assert_eq!(
            store.create_index("shop", "users", &spec).await.unwrap(),
            Ensured::AlreadyExists
        );
        assert_eq!(store.list_indexes("shop", "users").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn renamed_equivalent_index_is_a_recoverable_duplicate() {
        let store = MemoryStore::new();
        store
            .create_index(
                "shop",
                "orders",
                &IndexSpec::ascending("orderNumber").unique().named("by_number"),
            )
            .await
            .unwrap();
        let err = store
            .create_index("shop", "orders", &IndexSpec::ascending("orderNumber").unique())
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(
            store.list_indexes("shop", "orders").await.unwrap(),
            vec!["_id_".to_string(), "by_number".to_string()]
        );
    }

    #[tokio::test]
    async fn duplicate_principal_is_recoverable() {
        let store = MemoryStore::new();
        let principal = PrincipalSpec::read_write("shop_user", "pw");
        store.create_principal("shop", &principal).await.unwrap();
        let err = store.create_principal("shop", &principal).await.unwrap_err();
        assert!(err.is_recoverable());
        assert!(store
            .list_databases()
            .await
            .unwrap()
            .contains(&"admin".to_string()));
    }

    #[tokio::test]
    async fn explicit_collection_is_reported_once() {
        let store = MemoryStore::new();
        assert_eq!(
            store.create_collection("BaseMap", "init").await.unwrap(),
            Ensured::Created
        );
        assert_eq!(
            store.create_collection("BaseMap", "init").await.unwrap(),
            Ensured::AlreadyExists
        );
        assert_eq!(
            store.list_collections("BaseMap").await.unwrap(),
            vec!["init".to_string()]
        );
    }

    #[tokio::test]
    async fn failure_modes_map_to_taxonomy() {
        let offline = MemoryStore::failing(FailureMode::Offline);
        assert!(matches!(
            offline.authenticate().await,
            Err(StoreError::Connection { .. })
        ));

        let rejected = MemoryStore::failing(FailureMode::BadCredentials);
        assert!(matches!(
            rejected.authenticate().await,
            Err(StoreError::Authentication { .. })
        ));

        let read_only = MemoryStore::failing(FailureMode::ReadOnly);
        assert!(read_only.authenticate().await.is_ok());
        assert!(matches!(
            read_only.create_collection("db", "c").await,
            Err(StoreError::Permission { .. })
        ));
    }
}
