use std::sync::Arc;

use async_trait::async_trait;
use services::{ContentStore, TimelineTarget};
use storage::repository::{
    LessonRepository, NewLessonRecord, Storage, StorageError, TopicRepository,
};
use tutor_core::model::{Lesson, LessonId, TopicId};

struct OfflineLessons;

fn refused() -> StorageError {
    StorageError::Connection("connection refused".into())
}

#[async_trait]
impl LessonRepository for OfflineLessons {
    async fn complete_lesson(&self, _id: LessonId) -> Result<(), StorageError> {
        Err(refused())
    }

    async fn uncomplete_lesson(&self, _id: LessonId) -> Result<(), StorageError> {
        Err(refused())
    }

    async fn create_lesson(
        &self,
        _topic_id: TopicId,
        _lesson: &NewLessonRecord,
    ) -> Result<Lesson, StorageError> {
        Err(refused())
    }

    async fn update_lesson(
        &self,
        _id: LessonId,
        _lesson: &NewLessonRecord,
    ) -> Result<(), StorageError> {
        Err(refused())
    }

    async fn delete_lesson(&self, _id: LessonId) -> Result<(), StorageError> {
        Err(refused())
    }
}

#[tokio::test]
async fn completion_survives_a_failed_backend_call() {
    let storage = Storage::demo();
    let store = ContentStore::new(
        Arc::clone(&storage.topics),
        Arc::new(OfflineLessons),
        Arc::clone(&storage.quizzes),
    );
    let topic = TopicId::new(1);
    store.load_topic(topic).await.unwrap();

    let changed = store.complete_lesson(topic, LessonId::new(1)).await.unwrap();
    assert!(changed);

    let view = store.timeline(topic).unwrap();
    assert!(view.rows[0].completed);
    assert!(!view.rows[1].locked);
    assert_eq!(view.completed_lessons, 1);

    let summary = store
        .summaries()
        .into_iter()
        .find(|s| s.id == topic)
        .unwrap();
    assert_eq!(summary.completed_lessons, 1);
}

#[tokio::test]
async fn uncompletion_survives_a_failed_backend_call() {
    let storage = Storage::demo();
    storage.lessons.complete_lesson(LessonId::new(1)).await.unwrap();
    let store = ContentStore::new(
        Arc::clone(&storage.topics),
        Arc::new(OfflineLessons),
        Arc::clone(&storage.quizzes),
    );
    let topic = TopicId::new(1);
    store.load_topic(topic).await.unwrap();

    assert!(store.uncomplete_lesson(topic, LessonId::new(1)).await.unwrap());
    let view = store.timeline(topic).unwrap();
    assert!(!view.rows[0].completed);
    assert!(view.rows[1].locked);
}

#[tokio::test]
async fn failed_lesson_creation_leaves_the_cache_alone() {
    let storage = Storage::demo();
    let store = ContentStore::new(
        Arc::clone(&storage.topics),
        Arc::new(OfflineLessons),
        Arc::clone(&storage.quizzes),
    );
    let topic = TopicId::new(1);
    store.load_topic(topic).await.unwrap();

    let err = store.create_lesson(topic, "Hooks", "").await.unwrap_err();
    assert!(matches!(err, services::ContentError::Storage(StorageError::Connection(_))));
    assert_eq!(store.topic(topic).unwrap().lessons().len(), 3);
}

#[tokio::test]
async fn completion_reaches_the_backend() {
    let storage = Storage::demo();
    let store = ContentStore::from_storage(&storage);
    let topic = TopicId::new(1);
    store.load_topic(topic).await.unwrap();
    store.complete_lesson(topic, LessonId::new(1)).await.unwrap();

    let fresh = storage.topics.get_topic(topic).await.unwrap();
    assert!(fresh.lesson(LessonId::new(1)).unwrap().is_completed());
}

#[tokio::test]
async fn timeline_interleaves_demo_topic() {
    let storage = Storage::demo();
    let store = ContentStore::from_storage(&storage);
    let topic = TopicId::new(1);
    store.load_topic(topic).await.unwrap();

    let view = store.timeline(topic).unwrap();
    let targets: Vec<TimelineTarget> = view.rows.iter().map(|r| r.target).collect();
    assert_eq!(targets.len(), 4);
    assert!(matches!(targets[2], TimelineTarget::Quiz(_)));
    let locked: Vec<bool> = view.rows.iter().map(|r| r.locked).collect();
    assert_eq!(locked, vec![false, true, true, true]);
}
