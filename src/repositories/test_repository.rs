use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::{Test, TestStatus},
};

#[async_trait]
pub trait TestRepository: Send + Sync {
    async fn create(&self, test: Test) -> AppResult<Test>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Test>>;
    async fn update(&self, test: Test) -> AppResult<Test>;
    async fn list(&self, offset: i64, limit: i64) -> AppResult<(Vec<Test>, i64)>;
    async fn list_by_status(
        &self,
        status: TestStatus,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Test>, i64)>;
    async fn list_by_instructor(
        &self,
        instructor_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Test>, i64)>;
    /// True when any published test still references the question. Such
    /// questions may only be revised through versioning.
    async fn is_question_in_published_test(&self, question_id: &str) -> AppResult<bool>;
}

fn status_str(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Draft => "draft",
        TestStatus::Published => "published",
        TestStatus::Archived => "archived",
    }
}

pub struct MongoTestRepository {
    collection: Collection<Test>,
}

impl MongoTestRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("tests");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for tests collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(IndexOptions::builder().name("status".to_string()).build())
            .build();

        let instructor_index = IndexModel::builder()
            .keys(doc! { "instructor_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("instructor_id".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(status_index).await?;
        self.collection.create_index(instructor_index).await?;

        Ok(())
    }

    async fn list_with_filter(
        &self,
        filter: mongodb::bson::Document,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Test>, i64)> {
        let total = self.collection.count_documents(filter.clone()).await?;

        let tests = self
            .collection
            .find(filter)
            .skip(offset as u64)
            .limit(limit)
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;

        Ok((tests, total as i64))
    }
}

#[async_trait]
impl TestRepository for MongoTestRepository {
    async fn create(&self, test: Test) -> AppResult<Test> {
        self.collection.insert_one(&test).await?;
        Ok(test)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Test>> {
        let test = self.collection.find_one(doc! { "id": id }).await?;
        Ok(test)
    }

    async fn update(&self, test: Test) -> AppResult<Test> {
        self.collection
            .replace_one(doc! { "id": &test.id }, &test)
            .await?;
        Ok(test)
    }

    async fn list(&self, offset: i64, limit: i64) -> AppResult<(Vec<Test>, i64)> {
        self.list_with_filter(doc! {}, offset, limit).await
    }

    async fn list_by_status(
        &self,
        status: TestStatus,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Test>, i64)> {
        self.list_with_filter(doc! { "status": status_str(status) }, offset, limit)
            .await
    }

    async fn list_by_instructor(
        &self,
        instructor_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Test>, i64)> {
        self.list_with_filter(doc! { "instructor_id": instructor_id }, offset, limit)
            .await
    }

    async fn is_question_in_published_test(&self, question_id: &str) -> AppResult<bool> {
        let hit = self
            .collection
            .find_one(doc! {
                "status": "published",
                "question_ids": question_id,
            })
            .await?;
        Ok(hit.is_some())
    }
}
