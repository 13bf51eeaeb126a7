//! Store backed by the official MongoDB driver.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, Credential, IndexOptions};
use mongodb::{Client, IndexModel};

use provision_kernel::settings::{AdminSettings, DatabaseSettings};
use provision_kernel::{
    reconcile_index, Direction, DuplicateTarget, Ensured, ExistingIndex, IndexSpec, PrincipalSpec,
    Store, StoreError,
};

/// Server error codes the bootstrap distinguishes.
mod codes {
    pub const UNAUTHORIZED: i32 = 13;
    pub const AUTHENTICATION_FAILED: i32 = 18;
    pub const NAMESPACE_EXISTS: i32 = 48;
    /// Same keys already indexed under another name.
    pub const INDEX_OPTIONS_CONFLICT: i32 = 85;
    /// Same name already used for different keys.
    pub const INDEX_KEY_SPECS_CONFLICT: i32 = 86;
    pub const DUPLICATE_KEY: i32 = 11000;
    pub const USER_ALREADY_EXISTS: i32 = 51003;
}

/// Map a server error code onto the bootstrap taxonomy.
pub fn classify_code(code: i32, message: impl Into<String>) -> StoreError {
    let message = message.into();
    match code {
        codes::UNAUTHORIZED => StoreError::permission(message),
        codes::AUTHENTICATION_FAILED => StoreError::authentication(message),
        codes::NAMESPACE_EXISTS => StoreError::duplicate(DuplicateTarget::Collection, message),
        codes::INDEX_OPTIONS_CONFLICT => StoreError::duplicate(DuplicateTarget::Index, message),
        codes::DUPLICATE_KEY => StoreError::duplicate(DuplicateTarget::Document, message),
        codes::USER_ALREADY_EXISTS => StoreError::duplicate(DuplicateTarget::Principal, message),
        codes::INDEX_KEY_SPECS_CONFLICT => StoreError::Internal(anyhow::anyhow!(
            "index name reused for different keys: {}",
            message
        )),
        other => StoreError::Internal(anyhow::anyhow!("server error {}: {}", other, message)),
    }
}

/// Map a driver error onto the bootstrap taxonomy.
pub fn classify(error: MongoError) -> StoreError {
    match *error.kind {
        ErrorKind::Authentication { ref message, .. } => {
            StoreError::authentication(message.clone())
        }
        ErrorKind::ServerSelection { ref message, .. }
        | ErrorKind::ConnectionPoolCleared { ref message, .. }
        | ErrorKind::DnsResolve { ref message, .. } => StoreError::connection(message.clone()),
        ErrorKind::Io(ref io) => StoreError::connection(io.to_string()),
        ErrorKind::Command(ref command) => classify_code(command.code, command.message.clone()),
        ErrorKind::Write(WriteFailure::WriteError(ref write)) => {
            classify_code(write.code, write.message.clone())
        }
        ErrorKind::BulkWrite(ref failure) => {
            match failure.write_errors.as_ref().and_then(|errors| errors.first()) {
                Some(first) => classify_code(first.code, first.message.clone()),
                None => StoreError::Internal(anyhow::Error::new(error.clone())),
            }
        }
        ErrorKind::BsonSerialization(ref inner) => StoreError::invalid_document(inner.to_string()),
        _ => StoreError::Internal(anyhow::Error::new(error.clone())),
    }
}

/// Administrative connection to a MongoDB deployment.
pub struct MongoStore {
    client: Client,
    admin_source: String,
}

impl MongoStore {
    /// Build a client carrying the administrative credential. No I/O happens
    /// until [`Store::authenticate`] is called.
    pub async fn connect(
        database: &DatabaseSettings,
        admin: &AdminSettings,
    ) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&database.uri).await.map_err(classify)?;
        options.app_name = Some(database.app_name.clone());
        options.server_selection_timeout = Some(database.server_selection_timeout());
        options.credential = Some(
            Credential::builder()
                .username(admin.username.clone())
                .password(admin.password.clone())
                .source(admin.source.clone())
                .build(),
        );

        let client = Client::with_options(options).map_err(classify)?;

        tracing::debug!(
            target: "provision-db",
            uri = %database.uri,
            username = %admin.username,
            "mongodb client configured"
        );

        Ok(Self {
            client,
            admin_source: admin.source.clone(),
        })
    }

    fn collection(&self, database: &str, collection: &str) -> mongodb::Collection<Document> {
        self.client.database(database).collection::<Document>(collection)
    }

    /// Full index definitions on a collection; empty if it does not exist yet.
    async fn existing_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<ExistingIndex>, StoreError> {
        let mut cursor = match self.collection(database, collection).list_indexes(None).await {
            Ok(cursor) => cursor,
            Err(error) if is_namespace_not_found(&error) => return Ok(Vec::new()),
            Err(error) => return Err(classify(error)),
        };

        let mut present = Vec::new();
        while cursor.advance().await.map_err(classify)? {
            let model = cursor.deserialize_current().map_err(classify)?;
            if let Some(existing) = existing_index(&model) {
                present.push(existing);
            }
        }
        Ok(present)
    }
}

/// Translate a server index definition. Keys that are not numeric directions
/// (text, hashed, 2dsphere) leave the shape unknown.
pub fn existing_index(model: &IndexModel) -> Option<ExistingIndex> {
    let options = model.options.as_ref();
    let name = options.and_then(|o| o.name.clone())?;
    let unique = options.and_then(|o| o.unique).unwrap_or(false);

    let keys: Option<Vec<(String, Direction)>> = model
        .keys
        .iter()
        .map(|(field, value)| direction(value).map(|d| (field.clone(), d)))
        .collect();

    Some(ExistingIndex {
        name,
        spec: keys.map(|keys| IndexSpec {
            keys,
            unique,
            name: None,
        }),
    })
}

fn direction(value: &Bson) -> Option<Direction> {
    let number = match value {
        Bson::Int32(n) => f64::from(*n),
        Bson::Int64(n) => *n as f64,
        Bson::Double(n) => *n,
        _ => return None,
    };
    if number > 0.0 {
        Some(Direction::Ascending)
    } else if number < 0.0 {
        Some(Direction::Descending)
    } else {
        None
    }
}

#[async_trait]
impl Store for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn authenticate(&self) -> Result<(), StoreError> {
        self.client
            .database(&self.admin_source)
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn create_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Ensured, StoreError> {
        match self
            .client
            .database(database)
            .create_collection(collection, None)
            .await
            .map_err(classify)
        {
            Ok(()) => Ok(Ensured::Created),
            Err(StoreError::DuplicateKey {
                target: DuplicateTarget::Collection,
                ..
            }) => Ok(Ensured::AlreadyExists),
            Err(other) => Err(other),
        }
    }

    async fn insert_documents(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError> {
        if documents.is_empty() {
            return Err(StoreError::invalid_document("empty insert batch"));
        }
        let result = self
            .collection(database, collection)
            .insert_many(documents, None)
            .await
            .map_err(classify)?;
        Ok(result.inserted_ids.len())
    }

    async fn count_documents(&self, database: &str, collection: &str) -> Result<u64, StoreError> {
        self.collection(database, collection)
            .count_documents(doc! {}, None)
            .await
            .map_err(classify)
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
    ) -> Result<Ensured, StoreError> {
        let present = self.existing_indexes(database, collection).await?;
        if let Some(outcome) = reconcile_index(index, &present)? {
            return Ok(outcome);
        }

        let options = IndexOptions::builder()
            .name(index.name())
            .unique(index.unique)
            .build();
        let model = IndexModel::builder()
            .keys(index.key_document())
            .options(options)
            .build();

        self.collection(database, collection)
            .create_index(model, None)
            .await
            .map_err(classify)?;
        Ok(Ensured::Created)
    }

    async fn create_principal(
        &self,
        database: &str,
        principal: &PrincipalSpec,
    ) -> Result<(), StoreError> {
        let command = doc! {
            "createUser": principal.name.as_str(),
            "pwd": principal.secret.as_str(),
            "roles": [{ "role": principal.role.as_str(), "db": database }],
        };
        self.client
            .database(database)
            .run_command(command, None)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        self.client
            .list_database_names(None, None)
            .await
            .map_err(classify)
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>, StoreError> {
        self.client
            .database(database)
            .list_collection_names(None)
            .await
            .map_err(classify)
    }

    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<String>, StoreError> {
        match self.collection(database, collection).list_index_names().await {
            Ok(names) => Ok(names),
            // Listing indexes on a collection that does not exist yet.
            Err(error) if is_namespace_not_found(&error) => Ok(Vec::new()),
            Err(error) => Err(classify(error)),
        }
    }
}

fn is_namespace_not_found(error: &MongoError) -> bool {
    const NAMESPACE_NOT_FOUND: i32 = 26;
    matches!(*error.kind, ErrorKind::Command(ref command) if command.code == NAMESPACE_NOT_FOUND)
}
