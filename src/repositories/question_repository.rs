use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::Question};

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn create(&self, question: Question) -> AppResult<Question>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Question>>;
    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Question>>;
    async fn update(&self, question: Question) -> AppResult<Question>;
    async fn delete(&self, id: &str) -> AppResult<()>;
    async fn list_by_creator(
        &self,
        created_by: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Question>, i64)>;
}

pub struct MongoQuestionRepository {
    collection: Collection<Question>,
}

impl MongoQuestionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("questions");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for questions collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let creator_index = IndexModel::builder()
            .keys(doc! { "created_by": 1 })
            .options(IndexOptions::builder().name("created_by".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(creator_index).await?;

        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for MongoQuestionRepository {
    async fn create(&self, question: Question) -> AppResult<Question> {
        self.collection.insert_one(&question).await?;
        Ok(question)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Question>> {
        let question = self.collection.find_one(doc! { "id": id }).await?;
        Ok(question)
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Question>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let questions = self
            .collection
            .find(doc! { "id": { "$in": ids } })
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }

    async fn update(&self, question: Question) -> AppResult<Question> {
        self.collection
            .replace_one(doc! { "id": &question.id }, &question)
            .await?;
        Ok(question)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.collection.delete_one(doc! { "id": id }).await?;
        Ok(())
    }

    async fn list_by_creator(
        &self,
        created_by: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Question>, i64)> {
        let filter = doc! { "created_by": created_by };

        let total = self.collection.count_documents(filter.clone()).await?;

        let questions = self
            .collection
            .find(filter)
            .skip(offset as u64)
            .limit(limit)
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;

        Ok((questions, total as i64))
    }
}
