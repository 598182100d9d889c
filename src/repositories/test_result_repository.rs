use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{db::Database, errors::AppResult, models::domain::TestResult};

/// Filter/sort parameters for result listings.
#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    pub test_id: Option<String>,
    pub student_id: Option<String>,
    pub status: Option<String>,
    pub grade: Option<String>,
    pub min_percentage: Option<u32>,
    pub max_percentage: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum ResultSort {
    #[default]
    CreatedAt,
    Score,
    Percentage,
}

impl ResultFilter {
    fn to_document(&self) -> Document {
        let mut filter = doc! {};

        if let Some(test_id) = &self.test_id {
            filter.insert("test_id", test_id);
        }
        if let Some(student_id) = &self.student_id {
            filter.insert("student_id", student_id);
        }
        if let Some(status) = &self.status {
            filter.insert("status", status);
        }
        if let Some(grade) = &self.grade {
            filter.insert("grade", grade);
        }

        let mut percentage = doc! {};
        if let Some(min) = self.min_percentage {
            percentage.insert("$gte", min);
        }
        if let Some(max) = self.max_percentage {
            percentage.insert("$lte", max);
        }
        if !percentage.is_empty() {
            filter.insert("percentage", percentage);
        }

        filter
    }
}

#[async_trait]
pub trait TestResultRepository: Send + Sync {
    async fn create(&self, result: TestResult) -> AppResult<TestResult>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestResult>>;
    async fn find_by_session(&self, test_session_id: &str) -> AppResult<Option<TestResult>>;
    async fn find_by_test(&self, test_id: &str) -> AppResult<Vec<TestResult>>;
    async fn find_by_test_and_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> AppResult<Option<TestResult>>;
    /// Results for one student in chronological order.
    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<TestResult>>;
    async fn update(&self, result: TestResult) -> AppResult<TestResult>;
    async fn list(
        &self,
        filter: ResultFilter,
        sort: ResultSort,
        descending: bool,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<TestResult>, i64)>;
}

pub struct MongoTestResultRepository {
    collection: Collection<TestResult>,
}

impl MongoTestResultRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("test_results");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for test_results collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        // One result per session, enforced at the store.
        let session_index = IndexModel::builder()
            .keys(doc! { "test_session_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("session_unique".to_string())
                    .build(),
            )
            .build();

        let test_index = IndexModel::builder()
            .keys(doc! { "test_id": 1 })
            .options(IndexOptions::builder().name("test_id".to_string()).build())
            .build();

        let student_index = IndexModel::builder()
            .keys(doc! { "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("student_id".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(session_index).await?;
        self.collection.create_index(test_index).await?;
        self.collection.create_index(student_index).await?;

        Ok(())
    }
}

#[async_trait]
impl TestResultRepository for MongoTestResultRepository {
    async fn create(&self, result: TestResult) -> AppResult<TestResult> {
        self.collection.insert_one(&result).await?;
        Ok(result)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestResult>> {
        let result = self.collection.find_one(doc! { "id": id }).await?;
        Ok(result)
    }

    async fn find_by_session(&self, test_session_id: &str) -> AppResult<Option<TestResult>> {
        let result = self
            .collection
            .find_one(doc! { "test_session_id": test_session_id })
            .await?;
        Ok(result)
    }

    async fn find_by_test(&self, test_id: &str) -> AppResult<Vec<TestResult>> {
        let results = self
            .collection
            .find(doc! { "test_id": test_id })
            .await?
            .try_collect()
            .await?;
        Ok(results)
    }

    async fn find_by_test_and_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> AppResult<Option<TestResult>> {
        let result = self
            .collection
            .find_one(doc! {
                "test_id": test_id,
                "student_id": student_id,
            })
            .await?;
        Ok(result)
    }

    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<TestResult>> {
        let results = self
            .collection
            .find(doc! { "student_id": student_id })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(results)
    }

    async fn update(&self, result: TestResult) -> AppResult<TestResult> {
        self.collection
            .replace_one(doc! { "id": &result.id }, &result)
            .await?;
        Ok(result)
    }

    async fn list(
        &self,
        filter: ResultFilter,
        sort: ResultSort,
        descending: bool,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<TestResult>, i64)> {
        let filter = filter.to_document();
        let total = self.collection.count_documents(filter.clone()).await?;

        let direction = if descending { -1 } else { 1 };
        let sort_doc = match sort {
            ResultSort::CreatedAt => doc! { "created_at": direction },
            ResultSort::Score => doc! { "total_score": direction },
            ResultSort::Percentage => doc! { "percentage": direction },
        };

        let results = self
            .collection
            .find(filter)
            .skip(offset as u64)
            .limit(limit)
            .sort(sort_doc)
            .await?
            .try_collect()
            .await?;

        Ok((results, total as i64))
    }
}
