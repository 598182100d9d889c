use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::SecurityEvent};

#[async_trait]
pub trait SecurityEventRepository: Send + Sync {
    async fn create(&self, event: SecurityEvent) -> AppResult<SecurityEvent>;
    async fn find_by_session(&self, test_session_id: &str) -> AppResult<Vec<SecurityEvent>>;
}

pub struct MongoSecurityEventRepository {
    collection: Collection<SecurityEvent>,
}

impl MongoSecurityEventRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("security_events");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for security_events collection");

        let session_index = IndexModel::builder()
            .keys(doc! { "test_session_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("test_session_id".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(session_index).await?;

        Ok(())
    }
}

#[async_trait]
impl SecurityEventRepository for MongoSecurityEventRepository {
    async fn create(&self, event: SecurityEvent) -> AppResult<SecurityEvent> {
        self.collection.insert_one(&event).await?;
        Ok(event)
    }

    async fn find_by_session(&self, test_session_id: &str) -> AppResult<Vec<SecurityEvent>> {
        let events = self
            .collection
            .find(doc! { "test_session_id": test_session_id })
            .sort(doc! { "timestamp": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(events)
    }
}
