use std::path::PathBuf;

use storage::repository::{
    ChatRepository, LessonRepository, NewLessonRecord, NewQuestionRecord, NewQuizRecord,
    QuizRepository, SessionStore, Storage, StorageError, SubmittedAnswer, TopicRepository,
};
use storage::sqlite::SqliteRepository;
use tutor_core::model::{ChatMessage, LessonId, QuestionId, QuizId, TopicId};
use tutor_core::time::fixed_now;

async fn seeded(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    assert!(repo.seed_demo_content().await.expect("seed"));
    repo
}

/// A database file that is removed when the test ends.
struct TempDb(PathBuf);

impl TempDb {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("{name}-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        Self(path)
    }

    fn url(&self) -> String {
        format!("sqlite://{}", self.0.display())
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
        for suffix in ["-wal", "-shm"] {
            let mut side = self.0.clone().into_os_string();
            side.push(suffix);
            let _ = std::fs::remove_file(side);
        }
    }
}

#[tokio::test]
async fn seeding_loads_the_sample_topics_once() {
    let repo = seeded("memdb_content_seed").await;
    assert!(!repo.seed_demo_content().await.unwrap());

    let topics = repo.list_topics().await.unwrap();
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].name, "Introduction to React");
    assert_eq!(topics[0].lesson_count, 3);
    assert_eq!(topics[0].quiz_count, 1);
    assert_eq!(topics[1].name, "JavaScript Basics");

    let topic = repo.get_topic(TopicId::new(1)).await.unwrap();
    let lessons: Vec<_> = topic.lessons().iter().map(|l| l.id().value()).collect();
    assert_eq!(lessons, [1, 2, 3]);
    let quiz = &topic.quizzes()[0];
    assert_eq!(quiz.question_count(), 2);
    assert_eq!(quiz.questions()[0].correct_answer(), Some(0));
}

#[tokio::test]
async fn offline_progress_survives_a_restart() {
    let db = TempDb::new("tutor-offline-restart");

    let first = Storage::offline(&db.url()).await.expect("first run");
    first.lessons.complete_lesson(LessonId::new(1)).await.unwrap();
    first.lessons.complete_lesson(LessonId::new(2)).await.unwrap();
    drop(first);

    let second = Storage::offline(&db.url()).await.expect("second run");
    let topics = second.topics.list_topics().await.unwrap();
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].completed_lessons, 2);
    let topic = second.topics.get_topic(TopicId::new(1)).await.unwrap();
    assert!(topic.lesson(LessonId::new(2)).unwrap().is_completed());
    assert!(!topic.lesson(LessonId::new(3)).unwrap().is_completed());

    second.lessons.uncomplete_lesson(LessonId::new(2)).await.unwrap();
    let topic = second.topics.get_topic(TopicId::new(1)).await.unwrap();
    assert!(!topic.lesson(LessonId::new(2)).unwrap().is_completed());
}

#[tokio::test]
async fn offline_sessions_do_not_touch_the_database() {
    let db = TempDb::new("tutor-offline-session");
    let storage = Storage::offline(&db.url()).await.unwrap();
    assert!(storage.sessions.load_session().await.unwrap().is_none());

    let repo = SqliteRepository::connect(&db.url()).await.unwrap();
    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM auth_sessions")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn authored_lessons_and_quizzes_are_ordered_and_removable() {
    let repo = seeded("memdb_content_authoring").await;
    let topic = TopicId::new(2);

    let lesson = repo
        .create_lesson(
            topic,
            &NewLessonRecord {
                title: "  Closures ".into(),
                content: "Functions remember.".into(),
                order_index: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(lesson.title(), "Closures");

    repo.update_lesson(
        lesson.id(),
        &NewLessonRecord {
            title: "Closures and scope".into(),
            content: "Functions remember their scope.".into(),
            order_index: None,
        },
    )
    .await
    .unwrap();

    let quiz = repo
        .create_quiz(
            topic,
            &NewQuizRecord {
                title: "Scope check".into(),
                description: None,
                order_index: None,
            },
        )
        .await
        .unwrap();
    let question = repo
        .add_question(
            quiz.id(),
            &NewQuestionRecord {
                question: "Which keyword is block scoped?".into(),
                options: vec!["var".into(), "let".into()],
                correct_answer: 1,
                order_index: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(question.correct_answer(), Some(1));

    let loaded = repo.get_topic(topic).await.unwrap();
    let titles: Vec<_> = loaded.lessons().iter().map(|l| l.title()).collect();
    assert_eq!(titles.last(), Some(&"Closures and scope"));
    let stored = loaded.quiz(quiz.id()).unwrap();
    assert_eq!(stored.questions()[0].options(), ["var", "let"]);

    let err = repo
        .add_question(
            quiz.id(),
            &NewQuestionRecord {
                question: "Broken".into(),
                options: vec!["a".into()],
                correct_answer: 3,
                order_index: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Rejected { status: 422, .. }));

    let message = ChatMessage::learner("hello", fixed_now()).unwrap();
    repo.append_message(lesson.id(), &message).await.unwrap();
    repo.delete_lesson(lesson.id()).await.unwrap();
    assert!(repo.list_messages(lesson.id(), 10, 0).await.unwrap().is_empty());
    assert!(matches!(
        repo.delete_lesson(lesson.id()).await.unwrap_err(),
        StorageError::NotFound
    ));

    repo.delete_quiz(quiz.id()).await.unwrap();
    assert!(matches!(
        repo.get_quiz(quiz.id()).await.unwrap_err(),
        StorageError::NotFound
    ));
}

#[tokio::test]
async fn attempts_are_graded_and_listed_with_answers() {
    let repo = seeded("memdb_content_attempts").await;
    let record = repo
        .submit_attempt(
            QuizId::new(1),
            &[
                SubmittedAnswer {
                    question_id: QuestionId::new(1),
                    selected_answer: Some(0),
                },
                SubmittedAnswer {
                    question_id: QuestionId::new(2),
                    selected_answer: None,
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(record.score, Some(1));
    assert_eq!(record.total_questions, Some(2));

    let attempts = repo.list_attempts(QuizId::new(1)).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].answers, record.answers);
    assert_eq!(attempts[0].answers[1].selected_answer, None);
    assert!(repo.list_attempts(QuizId::new(2)).await.unwrap().is_empty());
}

#[tokio::test]
async fn chat_log_pages_and_rejects_unknown_lessons() {
    let repo = seeded("memdb_content_chat").await;
    let lesson = LessonId::new(1);
    for text in ["one", "two", "three"] {
        let message = ChatMessage::learner(text, fixed_now()).unwrap();
        repo.append_message(lesson, &message).await.unwrap();
    }
    let page = repo.list_messages(lesson, 2, 1).await.unwrap();
    let texts: Vec<_> = page.iter().map(ChatMessage::text).collect();
    assert_eq!(texts, ["two", "three"]);
    assert_eq!(page[0].created_at(), fixed_now());

    let stray = ChatMessage::learner("lost", fixed_now()).unwrap();
    assert!(matches!(
        repo.append_message(LessonId::new(99), &stray).await.unwrap_err(),
        StorageError::NotFound
    ));

    let reply = repo.tutor_reply("hi").await.unwrap();
    assert!(!reply.trim().is_empty());

    repo.clear_messages(lesson).await.unwrap();
    assert!(repo.list_messages(lesson, 10, 0).await.unwrap().is_empty());
}
