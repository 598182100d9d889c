use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::{SessionStatus, TestSession},
};

#[async_trait]
pub trait TestSessionRepository: Send + Sync {
    async fn create(&self, session: TestSession) -> AppResult<TestSession>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestSession>>;
    async fn update(&self, session: TestSession) -> AppResult<TestSession>;
    /// All sessions for a (student, test) pair, most recent attempt first.
    async fn find_by_student_and_test(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> AppResult<Vec<TestSession>>;
    async fn count_by_student_and_test(&self, student_id: &str, test_id: &str)
        -> AppResult<usize>;
    async fn find_by_test(&self, test_id: &str) -> AppResult<Vec<TestSession>>;
    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<TestSession>>;
    async fn find_in_progress(&self) -> AppResult<Vec<TestSession>>;
}

pub struct MongoTestSessionRepository {
    collection: Collection<TestSession>,
}

impl MongoTestSessionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("test_sessions");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for test_sessions collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let student_test_index = IndexModel::builder()
            .keys(doc! { "student_id": 1, "test_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("student_test".to_string())
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(IndexOptions::builder().name("status".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(student_test_index).await?;
        self.collection.create_index(status_index).await?;

        Ok(())
    }
}

#[async_trait]
impl TestSessionRepository for MongoTestSessionRepository {
    async fn create(&self, session: TestSession) -> AppResult<TestSession> {
        self.collection.insert_one(&session).await?;
        Ok(session)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestSession>> {
        let session = self.collection.find_one(doc! { "id": id }).await?;
        Ok(session)
    }

    async fn update(&self, session: TestSession) -> AppResult<TestSession> {
        self.collection
            .replace_one(doc! { "id": &session.id }, &session)
            .await?;
        Ok(session)
    }

    async fn find_by_student_and_test(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> AppResult<Vec<TestSession>> {
        let sessions = self
            .collection
            .find(doc! {
                "student_id": student_id,
                "test_id": test_id,
            })
            .sort(doc! { "attempt_number": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(sessions)
    }

    async fn count_by_student_and_test(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> AppResult<usize> {
        let count = self
            .collection
            .count_documents(doc! {
                "student_id": student_id,
                "test_id": test_id,
            })
            .await?;
        Ok(count as usize)
    }

    async fn find_by_test(&self, test_id: &str) -> AppResult<Vec<TestSession>> {
        let sessions = self
            .collection
            .find(doc! { "test_id": test_id })
            .sort(doc! { "start_time": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(sessions)
    }

    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<TestSession>> {
        let sessions = self
            .collection
            .find(doc! { "student_id": student_id })
            .sort(doc! { "start_time": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(sessions)
    }

    async fn find_in_progress(&self) -> AppResult<Vec<TestSession>> {
        let sessions = self
            .collection
            .find(doc! { "status": SessionStatus::InProgress.as_str() })
            .await?
            .try_collect()
            .await?;
        Ok(sessions)
    }
}
