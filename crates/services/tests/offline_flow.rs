use std::path::PathBuf;

use services::{AppConfig, AppServices, QuizState};
use tutor_core::model::{LessonId, QuizId, TopicId};
use tutor_core::time::fixed_clock;

/// Database file for one test, removed afterwards.
struct TempDb(PathBuf);

impl TempDb {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("{name}-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        Self(path)
    }

    fn config(&self) -> AppConfig {
        AppConfig {
            db_url: format!("sqlite://{}", self.0.display()),
            offline: true,
            ..AppConfig::default()
        }
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
async fn offline_progress_is_kept_between_runs() {
    let db = TempDb::new("tutor-services-offline");
    let topic = TopicId::new(1);

    {
        let app = AppServices::from_config(&db.config(), fixed_clock())
            .await
            .expect("first run");
        assert_eq!(app.content().refresh_topics().await.len(), 2);
        app.content().load_topic(topic).await.unwrap();
        for lesson in [1, 2] {
            app.content()
                .complete_lesson(topic, LessonId::new(lesson))
                .await
                .unwrap();
        }
    }

    let app = AppServices::from_config(&db.config(), fixed_clock())
        .await
        .expect("second run");
    let summaries = app.content().refresh_topics().await;
    assert_eq!(summaries[0].completed_lessons, 2);

    app.content().load_topic(topic).await.unwrap();
    let view = app.content().timeline(topic).unwrap();
    let locked: Vec<bool> = view.rows.iter().map(|r| r.locked).collect();
    assert_eq!(locked, [false, false, false, false]);

    let run = app.quizzes().start(topic, QuizId::new(1)).await.unwrap();
    assert_eq!(run.state(), QuizState::Answering(0));
}

#[tokio::test]
async fn offline_chat_history_is_kept_between_runs() {
    let db = TempDb::new("tutor-services-offline-chat");
    let topic = TopicId::new(1);

    {
        let app = AppServices::from_config(&db.config(), fixed_clock())
            .await
            .unwrap();
        let loaded = app.content().load_topic(topic).await.unwrap();
        let lesson = loaded.lesson(LessonId::new(1)).unwrap().clone();
        app.chat().enter_lesson(&lesson).await;
        app.chat().send(&lesson, "what is a component?").await.unwrap();
    }

    let app = AppServices::from_config(&db.config(), fixed_clock())
        .await
        .unwrap();
    let loaded = app.content().load_topic(topic).await.unwrap();
    let lesson = loaded.lesson(LessonId::new(1)).unwrap().clone();
    let history = app.chat().enter_lesson(&lesson).await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].text(), "what is a component?");
}
