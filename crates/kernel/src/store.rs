//! The connection seam every bootstrap step goes through.

use async_trait::async_trait;
use bson::Document;

use crate::catalog::{IndexSpec, PrincipalSpec};
use crate::error::{DuplicateTarget, StoreError};

/// Result of a create request that may find its target already in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    Created,
    AlreadyExists,
}

/// Index already present on a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingIndex {
    pub name: String,
    /// `None` when the keys are not plain ascending/descending (text, hashed, geo).
    pub spec: Option<IndexSpec>,
}

impl ExistingIndex {
    fn is_equivalent(&self, index: &IndexSpec) -> bool {
        self.spec
            .as_ref()
            .is_some_and(|spec| spec.is_equivalent(index))
    }
}

/// Decide what a create request means given the indexes already in place.
///
/// `Ok(Some(AlreadyExists))` when an equivalent index carries the requested name,
/// `Ok(None)` when the index has to be built. The same name on a different shape
/// is fatal; an equivalent shape under another name is a recoverable duplicate.
pub fn reconcile_index(
    index: &IndexSpec,
    existing: &[ExistingIndex],
) -> Result<Option<Ensured>, StoreError> {
    let name = index.name();

    if let Some(same_name) = existing.iter().find(|e| e.name == name) {
        if same_name.is_equivalent(index) {
            return Ok(Some(Ensured::AlreadyExists));
        }
        return Err(StoreError::Internal(anyhow::anyhow!(
            "index '{}' already exists with different options",
            name
        )));
    }

    if let Some(equivalent) = existing.iter().find(|e| e.is_equivalent(index)) {
        return Err(StoreError::duplicate(
            DuplicateTarget::Index,
            format!("equivalent index already exists as '{}'", equivalent.name),
        ));
    }

    Ok(None)
}

/// Administrative connection to a document store.
///
/// Implementations own the connection for the whole run; steps never select an
/// ambient "current database" and instead name it on every call, usually through
/// a [`DatabaseHandle`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Human-readable backend label for logs.
    fn backend(&self) -> &'static str;

    /// Prove the administrative credential against the control namespace.
    async fn authenticate(&self) -> Result<(), StoreError>;

    async fn create_collection(&self, database: &str, collection: &str)
        -> Result<Ensured, StoreError>;

    /// Insert a batch, returning how many documents were written.
    async fn insert_documents(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError>;

    async fn count_documents(&self, database: &str, collection: &str) -> Result<u64, StoreError>;

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
    ) -> Result<Ensured, StoreError>;

    async fn create_principal(
        &self,
        database: &str,
        principal: &PrincipalSpec,
    ) -> Result<(), StoreError>;

    async fn list_databases(&self) -> Result<Vec<String>, StoreError>;

    async fn list_collections(&self, database: &str) -> Result<Vec<String>, StoreError>;

    /// Index names on a collection, including `_id_`.
    async fn list_indexes(&self, database: &str, collection: &str)
        -> Result<Vec<String>, StoreError>;
}

/// A store paired with the database every call is scoped to.
#[derive(Clone, Copy)]
pub struct DatabaseHandle<'a> {
    store: &'a dyn Store,
    name: &'a str,
}

impl<'a> DatabaseHandle<'a> {
    pub fn new(store: &'a dyn Store, name: &'a str) -> Self {
        Self { store, name }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub async fn create_collection(&self, collection: &str) -> Result<Ensured, StoreError> {
        self.store.create_collection(self.name, collection).await
    }

    pub async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError> {
        self.store
            .insert_documents(self.name, collection, documents)
            .await
    }

    pub async fn count_documents(&self, collection: &str) -> Result<u64, StoreError> {
        self.store.count_documents(self.name, collection).await
    }

    pub async fn create_index(
        &self,
        collection: &str,
        index: &IndexSpec,
    ) -> Result<Ensured, StoreError> {
        self.store.create_index(self.name, collection, index).await
    }

    pub async fn create_principal(&self, principal: &PrincipalSpec) -> Result<(), StoreError> {
        self.store.create_principal(self.name, principal).await
    }

    pub async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        self.store.list_collections(self.name).await
    }

    pub async fn list_indexes(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        self.store.list_indexes(self.name, collection).await
    }
}
