use std::sync::Arc;

use services::{AppServices, ContentError, MockTutor, QuizServiceError, QuizState};
use storage::repository::Storage;
use tutor_core::model::{LessonId, QuizId, TopicId};
use tutor_core::time::fixed_clock;

fn services() -> AppServices {
    AppServices::from_storage(&Storage::demo(), fixed_clock(), Arc::new(MockTutor))
}

#[tokio::test]
async fn quiz_unlocks_after_its_lesson_group_and_submits_on_completion() {
    let app = services();
    let topic = TopicId::new(1);
    let quiz = QuizId::new(1);
    app.content().load_topic(topic).await.unwrap();

    let locked = app.quizzes().start(topic, quiz).await.unwrap_err();
    assert!(matches!(
        locked,
        QuizServiceError::Content(ContentError::Locked)
    ));

    for lesson in [1, 2] {
        app.content()
            .complete_lesson(topic, LessonId::new(lesson))
            .await
            .unwrap();
    }

    let quizzes = app.quizzes();
    let mut run = quizzes.start(topic, quiz).await.unwrap();
    assert_eq!(run.total(), 2);

    run.select_answer(0).unwrap();
    let step = quizzes.advance(&mut run).await.unwrap();
    assert_eq!(step.state, QuizState::Answering(1));
    assert!(step.attempt.is_none());

    run.select_answer(1).unwrap();
    let step = quizzes.advance(&mut run).await.unwrap();
    assert_eq!(step.state, QuizState::Complete);
    let attempt = step.attempt.expect("submitted attempt");
    assert_eq!(attempt.score, Some(1));

    let review = run.review(Some(attempt.answers.as_slice()));
    assert!(review.from_backend);
    assert!((review.percentage - 50.0).abs() < f64::EPSILON);
    assert_eq!(review.mistakes().count(), 1);

    assert_eq!(quizzes.attempts(quiz).await.len(), 1);

    run.retry().unwrap();
    assert_eq!(run.state(), QuizState::Answering(0));
    assert_eq!(run.score(), 0);
}

#[tokio::test]
async fn unknown_quiz_is_reported() {
    let app = services();
    let topic = TopicId::new(1);
    app.content().load_topic(topic).await.unwrap();

    let err = app.quizzes().start(topic, QuizId::new(99)).await.unwrap_err();
    assert!(matches!(
        err,
        QuizServiceError::Content(ContentError::UnknownQuiz(_))
    ));
}

#[tokio::test]
async fn attempts_degrade_to_empty() {
    let app = services();
    assert!(app.quizzes().attempts(QuizId::new(42)).await.is_empty());
}
