use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::StudentAnswer,
};

#[async_trait]
pub trait StudentAnswerRepository: Send + Sync {
    /// Writes the answer for `(test_session_id, question_id)` in one atomic
    /// upsert. A re-submission for the same question replaces the prior
    /// payload: last write wins, no conflict error.
    async fn upsert(&self, answer: StudentAnswer) -> AppResult<StudentAnswer>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<StudentAnswer>>;
    async fn find_by_session(&self, test_session_id: &str) -> AppResult<Vec<StudentAnswer>>;
    async fn find_by_session_and_question(
        &self,
        test_session_id: &str,
        question_id: &str,
    ) -> AppResult<Option<StudentAnswer>>;
    /// Overwrites grading fields (score, correctness, feedback) only.
    async fn update_grading(&self, answer: StudentAnswer) -> AppResult<StudentAnswer>;
}

pub struct MongoStudentAnswerRepository {
    collection: Collection<StudentAnswer>,
}

impl MongoStudentAnswerRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("student_answers");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for student_answers collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let session_question_index = IndexModel::builder()
            .keys(doc! { "test_session_id": 1, "question_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("session_question_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(session_question_index).await?;

        Ok(())
    }
}

#[async_trait]
impl StudentAnswerRepository for MongoStudentAnswerRepository {
    async fn upsert(&self, answer: StudentAnswer) -> AppResult<StudentAnswer> {
        let filter = doc! {
            "test_session_id": &answer.test_session_id,
            "question_id": &answer.question_id,
        };

        let update = doc! {
            "$set": {
                "answer": to_bson(&answer.answer)?,
                "time_spent_seconds": answer.time_spent_seconds,
                "marked_for_review": answer.marked_for_review,
                "is_correct": to_bson(&answer.is_correct)?,
                "score": to_bson(&answer.score)?,
                "modified_at": to_bson(&answer.modified_at)?,
            },
            "$setOnInsert": {
                "id": &answer.id,
                "test_session_id": &answer.test_session_id,
                "question_id": &answer.question_id,
                "feedback": to_bson(&answer.feedback)?,
                "created_at": to_bson(&answer.created_at)?,
            },
        };

        let stored = self
            .collection
            .find_one_and_update(filter, update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| {
                AppError::DatabaseError("upsert returned no student answer document".to_string())
            })?;

        Ok(stored)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<StudentAnswer>> {
        let answer = self.collection.find_one(doc! { "id": id }).await?;
        Ok(answer)
    }

    async fn find_by_session(&self, test_session_id: &str) -> AppResult<Vec<StudentAnswer>> {
        let answers = self
            .collection
            .find(doc! { "test_session_id": test_session_id })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(answers)
    }

    async fn find_by_session_and_question(
        &self,
        test_session_id: &str,
        question_id: &str,
    ) -> AppResult<Option<StudentAnswer>> {
        let answer = self
            .collection
            .find_one(doc! {
                "test_session_id": test_session_id,
                "question_id": question_id,
            })
            .await?;
        Ok(answer)
    }

    async fn update_grading(&self, answer: StudentAnswer) -> AppResult<StudentAnswer> {
        self.collection
            .update_one(
                doc! { "id": &answer.id },
                doc! {
                    "$set": {
                        "score": to_bson(&answer.score)?,
                        "is_correct": to_bson(&answer.is_correct)?,
                        "feedback": to_bson(&answer.feedback)?,
                        "modified_at": to_bson(&answer.modified_at)?,
                    },
                },
            )
            .await?;
        Ok(answer)
    }
}
