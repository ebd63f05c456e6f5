use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use storage::repository::{
    LessonRepository, NewLessonRecord, NewQuestionRecord, NewQuizRecord, NewTopicRecord,
    QuizRepository, Storage, StorageError, TopicRepository,
};
use tutor_core::model::{
    Lesson, LessonId, Question, QuestionId, Quiz, QuizId, Topic, TopicId, TopicSummary,
};
use tutor_core::timeline::Timeline;

use super::view::TimelineView;
use crate::error::ContentError;

/// Cached list entry; `detail` is filled once the topic itself is fetched.
#[derive(Debug, Clone)]
struct TopicEntry {
    summary: TopicSummary,
    detail: Option<Topic>,
}

/// In-memory cache of the learner's topics, refreshed from the backend.
///
/// The cache lock is never held across a request.
#[derive(Clone)]
pub struct ContentStore {
    topics: Arc<dyn TopicRepository>,
    lessons: Arc<dyn LessonRepository>,
    quizzes: Arc<dyn QuizRepository>,
    cache: Arc<RwLock<Vec<TopicEntry>>>,
}

impl ContentStore {
    #[must_use]
    pub fn new(
        topics: Arc<dyn TopicRepository>,
        lessons: Arc<dyn LessonRepository>,
        quizzes: Arc<dyn QuizRepository>,
    ) -> Self {
        Self {
            topics,
            lessons,
            quizzes,
            cache: Arc::new(RwLock::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(
            Arc::clone(&storage.topics),
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.quizzes),
        )
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<TopicEntry>> {
        self.cache
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<TopicEntry>> {
        self.cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Reload the topic list. A failed request leaves an empty list.
    pub async fn refresh_topics(&self) -> Vec<TopicSummary> {
        let summaries = match self.topics.list_topics().await {
            Ok(summaries) => summaries,
            Err(err) => {
                log::error!("failed to load topics: {err}");
                Vec::new()
            }
        };

        let mut cache = self.write();
        let previous = std::mem::take(&mut *cache);
        *cache = summaries
            .iter()
            .map(|summary| TopicEntry {
                summary: summary.clone(),
                detail: previous
                    .iter()
                    .find(|entry| entry.summary.id == summary.id)
                    .and_then(|entry| entry.detail.clone()),
            })
            .collect();
        summaries
    }

    /// Fetch a topic with its lessons and quizzes and cache it.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::UnknownTopic` if the backend has no such topic.
    pub async fn load_topic(&self, id: TopicId) -> Result<Topic, ContentError> {
        let topic = self.topics.get_topic(id).await.map_err(|err| match err {
            StorageError::NotFound => ContentError::UnknownTopic(id),
            other => other.into(),
        })?;

        let mut cache = self.write();
        let entry = TopicEntry {
            summary: topic.summary(),
            detail: Some(topic.clone()),
        };
        match cache.iter_mut().find(|e| e.summary.id == id) {
            Some(slot) => *slot = entry,
            None => cache.push(entry),
        }
        Ok(topic)
    }

    /// # Errors
    ///
    /// Returns `ContentError::Topic` for a blank name before any request is
    /// made, or the storage failure.
    pub async fn create_topic(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<TopicSummary, ContentError> {
        let record = validated_record(name, description)?;
        let summary = self.topics.create_topic(&record).await?;
        self.write().push(TopicEntry {
            summary: summary.clone(),
            detail: None,
        });
        log::info!("created topic {} ({})", summary.name, summary.id);
        Ok(summary)
    }

    /// # Errors
    ///
    /// Returns `ContentError::Topic` for a blank name, or
    /// `ContentError::UnknownTopic` if the backend has no such topic.
    pub async fn update_topic(
        &self,
        id: TopicId,
        name: &str,
        description: Option<&str>,
    ) -> Result<(), ContentError> {
        let record = validated_record(name, description)?;
        self.topics
            .update_topic(id, &record)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => ContentError::UnknownTopic(id),
                other => other.into(),
            })?;

        let mut cache = self.write();
        if let Some(entry) = cache.iter_mut().find(|e| e.summary.id == id) {
            entry.summary.name.clone_from(&record.name);
            entry.summary.description.clone_from(&record.description);
            if let Some(detail) = entry.detail.as_mut() {
                detail.rename(record.name, record.description)?;
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ContentError::UnknownTopic` if the backend has no such topic.
    pub async fn delete_topic(&self, id: TopicId) -> Result<(), ContentError> {
        self.topics.delete_topic(id).await.map_err(|err| match err {
            StorageError::NotFound => ContentError::UnknownTopic(id),
            other => other.into(),
        })?;
        self.write().retain(|e| e.summary.id != id);
        Ok(())
    }

    /// Mark a lesson completed locally, then tell the backend.
    ///
    /// The local change stands even if the backend call fails. Returns
    /// `true` if the lesson was not completed before.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::UnknownTopic` if the topic is not loaded,
    /// `ContentError::Locked` if earlier lessons are unfinished, or
    /// `ContentError::Topic` if the lesson is not part of the topic.
    pub async fn complete_lesson(
        &self,
        topic_id: TopicId,
        lesson_id: LessonId,
    ) -> Result<bool, ContentError> {
        let changed = {
            let mut cache = self.write();
            let entry = cache
                .iter_mut()
                .find(|e| e.summary.id == topic_id)
                .ok_or(ContentError::UnknownTopic(topic_id))?;
            let detail = entry
                .detail
                .as_mut()
                .ok_or(ContentError::UnknownTopic(topic_id))?;
            if Timeline::for_topic(detail).lesson_accessible(lesson_id) == Some(false) {
                return Err(ContentError::Locked);
            }
            let changed = detail.complete_lesson(lesson_id)?;
            entry.summary.completed_lessons = detail.completed_lessons();
            changed
        };

        if let Err(err) = self.lessons.complete_lesson(lesson_id).await {
            log::error!("failed to record completion of lesson {lesson_id}: {err}");
        }
        Ok(changed)
    }

    /// Mark a lesson not completed, locally first like `complete_lesson`.
    ///
    /// Later lessons keep their completion; they only read as locked again
    /// until this one is finished. Returns `true` if the lesson was completed
    /// before.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::UnknownTopic` if the topic is not loaded, or
    /// `ContentError::Topic` if the lesson is not part of the topic.
    pub async fn uncomplete_lesson(
        &self,
        topic_id: TopicId,
        lesson_id: LessonId,
    ) -> Result<bool, ContentError> {
        let changed = {
            let mut cache = self.write();
            let entry = cache
                .iter_mut()
                .find(|e| e.summary.id == topic_id)
                .ok_or(ContentError::UnknownTopic(topic_id))?;
            let detail = entry
                .detail
                .as_mut()
                .ok_or(ContentError::UnknownTopic(topic_id))?;
            let changed = detail.uncomplete_lesson(lesson_id)?;
            entry.summary.completed_lessons = detail.completed_lessons();
            changed
        };

        if let Err(err) = self.lessons.uncomplete_lesson(lesson_id).await {
            log::error!("failed to record lesson {lesson_id} as not completed: {err}");
        }
        Ok(changed)
    }

    /// Append a lesson to a topic.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Lesson` for a blank title before any request is
    /// made, or `ContentError::UnknownTopic` if the backend has no such topic.
    pub async fn create_lesson(
        &self,
        topic_id: TopicId,
        title: &str,
        content: &str,
    ) -> Result<Lesson, ContentError> {
        let draft = Lesson::new(LessonId::new(0), title, content)?;
        let record = NewLessonRecord {
            title: draft.title().to_owned(),
            content: draft.content().to_owned(),
            order_index: self.next_position(topic_id, |t| t.lessons().len()),
        };
        let lesson = self
            .lessons
            .create_lesson(topic_id, &record)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => ContentError::UnknownTopic(topic_id),
                other => other.into(),
            })?;
        log::info!("created lesson {} in topic {topic_id}", lesson.id());
        self.reload(topic_id).await;
        Ok(lesson)
    }

    /// Change a lesson's title and content; its position and completion stay.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Lesson` for a blank title, or
    /// `ContentError::UnknownLesson` if the backend has no such lesson.
    pub async fn update_lesson(
        &self,
        topic_id: TopicId,
        lesson_id: LessonId,
        title: &str,
        content: &str,
    ) -> Result<(), ContentError> {
        let draft = Lesson::new(lesson_id, title, content)?;
        let record = NewLessonRecord {
            title: draft.title().to_owned(),
            content: draft.content().to_owned(),
            order_index: None,
        };
        self.lessons
            .update_lesson(lesson_id, &record)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => ContentError::UnknownLesson(lesson_id),
                other => other.into(),
            })?;
        self.reload(topic_id).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ContentError::UnknownLesson` if the backend has no such lesson.
    pub async fn delete_lesson(
        &self,
        topic_id: TopicId,
        lesson_id: LessonId,
    ) -> Result<(), ContentError> {
        self.lessons
            .delete_lesson(lesson_id)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => ContentError::UnknownLesson(lesson_id),
                other => other.into(),
            })?;
        self.reload(topic_id).await;
        Ok(())
    }

    /// Append an empty quiz to a topic.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::EmptyQuizTitle` before any request is made, or
    /// `ContentError::UnknownTopic` if the backend has no such topic.
    pub async fn create_quiz(
        &self,
        topic_id: TopicId,
        title: &str,
        description: Option<&str>,
    ) -> Result<Quiz, ContentError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ContentError::EmptyQuizTitle);
        }
        let record = NewQuizRecord {
            title: title.to_owned(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(ToOwned::to_owned),
            order_index: self.next_position(topic_id, |t| t.quizzes().len()),
        };
        let quiz = self
            .quizzes
            .create_quiz(topic_id, &record)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => ContentError::UnknownTopic(topic_id),
                other => other.into(),
            })?;
        log::info!("created quiz {} in topic {topic_id}", quiz.id());
        self.reload(topic_id).await;
        Ok(quiz)
    }

    /// Append a question to a quiz.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Question` for a blank prompt, no options or an
    /// out-of-range answer before any request is made, or
    /// `ContentError::UnknownQuiz` if the backend has no such quiz.
    pub async fn add_question(
        &self,
        topic_id: TopicId,
        quiz_id: QuizId,
        prompt: &str,
        options: &[&str],
        correct_answer: usize,
    ) -> Result<Question, ContentError> {
        let prompt = prompt.trim();
        let options: Vec<String> = options.iter().map(|o| o.trim().to_owned()).collect();
        Question::new(QuestionId::new(0), prompt, options.clone(), correct_answer)?;

        let order_index = self
            .topic(topic_id)
            .and_then(|t| t.quiz(quiz_id).map(Quiz::question_count))
            .and_then(|count| i64::try_from(count + 1).ok());
        let record = NewQuestionRecord {
            question: prompt.to_owned(),
            options,
            correct_answer,
            order_index,
        };
        let question = self
            .quizzes
            .add_question(quiz_id, &record)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => ContentError::UnknownQuiz(quiz_id),
                other => other.into(),
            })?;
        self.reload(topic_id).await;
        Ok(question)
    }

    /// # Errors
    ///
    /// Returns `ContentError::UnknownQuiz` if the backend has no such quiz.
    pub async fn delete_quiz(
        &self,
        topic_id: TopicId,
        quiz_id: QuizId,
    ) -> Result<(), ContentError> {
        self.quizzes
            .delete_quiz(quiz_id)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => ContentError::UnknownQuiz(quiz_id),
                other => other.into(),
            })?;
        self.reload(topic_id).await;
        Ok(())
    }

    /// Position after the last cached entry, or `None` to let the backend append.
    fn next_position(&self, topic_id: TopicId, count: impl Fn(&Topic) -> usize) -> Option<i64> {
        let cache = self.read();
        let topic = detail(&cache, topic_id).ok()?;
        i64::try_from(count(topic) + 1).ok()
    }

    /// Refetch a topic after an edit. The edit itself already succeeded.
    async fn reload(&self, topic_id: TopicId) {
        if let Err(err) = self.load_topic(topic_id).await {
            log::warn!("failed to reload topic {topic_id} after an edit: {err}");
        }
    }

    /// Presentation rows for a loaded topic.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::UnknownTopic` if the topic is not loaded.
    pub fn timeline(&self, topic_id: TopicId) -> Result<TimelineView, ContentError> {
        let cache = self.read();
        let topic = detail(&cache, topic_id)?;
        Ok(TimelineView::from_topic(topic))
    }

    /// A lesson the learner is allowed to open.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Locked` while earlier lessons are unfinished.
    pub fn open_lesson(
        &self,
        topic_id: TopicId,
        lesson_id: LessonId,
    ) -> Result<Lesson, ContentError> {
        let cache = self.read();
        let topic = detail(&cache, topic_id)?;
        match Timeline::for_topic(topic).lesson_accessible(lesson_id) {
            Some(true) => topic
                .lesson(lesson_id)
                .cloned()
                .ok_or(ContentError::UnknownLesson(lesson_id)),
            Some(false) => Err(ContentError::Locked),
            None => Err(ContentError::UnknownLesson(lesson_id)),
        }
    }

    /// # Errors
    ///
    /// Returns `ContentError::Locked` while earlier lessons are unfinished.
    pub fn ensure_quiz_unlocked(
        &self,
        topic_id: TopicId,
        quiz_id: QuizId,
    ) -> Result<(), ContentError> {
        let cache = self.read();
        let topic = detail(&cache, topic_id)?;
        match Timeline::for_topic(topic).quiz_accessible(quiz_id) {
            Some(true) => Ok(()),
            Some(false) => Err(ContentError::Locked),
            None => Err(ContentError::UnknownQuiz(quiz_id)),
        }
    }

    /// Fetch the current version of a quiz, falling back to the cached copy.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::UnknownQuiz` if neither the backend nor the
    /// cache has the quiz.
    pub async fn load_quiz(
        &self,
        topic_id: TopicId,
        quiz_id: QuizId,
    ) -> Result<Quiz, ContentError> {
        match self.quizzes.get_quiz(quiz_id).await {
            Ok(quiz) => {
                let mut cache = self.write();
                let topic = cache
                    .iter_mut()
                    .find(|e| e.summary.id == topic_id)
                    .and_then(|e| e.detail.as_mut());
                if let Some(topic) = topic {
                    if let Err(err) = topic.replace_quiz(quiz.clone()) {
                        log::warn!("fetched quiz is not part of topic {topic_id}: {err}");
                    }
                }
                Ok(quiz)
            }
            Err(err) => {
                log::error!("failed to load quiz {quiz_id}: {err}");
                let cache = self.read();
                let cached = detail(&cache, topic_id)
                    .ok()
                    .and_then(|topic| topic.quiz(quiz_id).cloned());
                match (cached, err) {
                    (Some(quiz), _) => Ok(quiz),
                    (None, StorageError::NotFound) => Err(ContentError::UnknownQuiz(quiz_id)),
                    (None, other) => Err(other.into()),
                }
            }
        }
    }

    /// Topics whose detail has been loaded.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        self.read()
            .iter()
            .filter_map(|e| e.detail.clone())
            .collect()
    }

    #[must_use]
    pub fn topic(&self, id: TopicId) -> Option<Topic> {
        self.read()
            .iter()
            .find(|e| e.summary.id == id)
            .and_then(|e| e.detail.clone())
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<TopicSummary> {
        self.read().iter().map(|e| e.summary.clone()).collect()
    }
}

fn detail(cache: &[TopicEntry], id: TopicId) -> Result<&Topic, ContentError> {
    cache
        .iter()
        .find(|e| e.summary.id == id)
        .and_then(|e| e.detail.as_ref())
        .ok_or(ContentError::UnknownTopic(id))
}

fn validated_record(
    name: &str,
    description: Option<&str>,
) -> Result<NewTopicRecord, ContentError> {
    let draft = Topic::new(TopicId::new(0), name, description.map(ToOwned::to_owned))?;
    Ok(NewTopicRecord {
        name: draft.name().to_owned(),
        description: draft.description().map(ToOwned::to_owned),
    })
}
