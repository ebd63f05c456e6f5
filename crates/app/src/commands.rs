use std::error::Error;

use services::quizzes::{QuestionOptions, QuizError, QuizServiceError};
use services::{AppServices, AuthError, QuizState, TimelineTarget};
use tutor_core::model::{ChatMessage, LessonId, QuizId, Speaker, TopicId};

use crate::args::Command;
use crate::prompt::{Prompt, parse_choice};

type CmdResult = Result<(), Box<dyn Error>>;

pub async fn dispatch(app: &AppServices, command: Command) -> CmdResult {
    match command {
        Command::Help => {
            crate::args::print_usage();
            Ok(())
        }
        Command::Login => login(app).await,
        Command::Register => register(app).await,
        Command::Logout => {
            app.auth().logout().await;
            println!("Signed out.");
            Ok(())
        }
        Command::WhoAmI => whoami(app).await,
        Command::Topics => topics(app).await,
        Command::Topic(id) => topic(app, id).await,
        Command::CreateTopic { name, description } => {
            let created = app
                .content()
                .create_topic(&name, description.as_deref())
                .await?;
            println!("Created topic #{}: {}", created.id, created.name);
            Ok(())
        }
        Command::RenameTopic {
            id,
            name,
            description,
        } => {
            app.content()
                .update_topic(id, &name, description.as_deref())
                .await?;
            println!("Updated topic #{id}.");
            Ok(())
        }
        Command::DeleteTopic(id) => {
            app.content().delete_topic(id).await?;
            println!("Deleted topic #{id}.");
            Ok(())
        }
        Command::Complete { topic, lesson } => complete(app, topic, lesson).await,
        Command::Uncomplete { topic, lesson } => uncomplete(app, topic, lesson).await,
        Command::AddLesson {
            topic,
            title,
            content,
        } => {
            app.content().load_topic(topic).await?;
            let lesson = app
                .content()
                .create_lesson(topic, &title, content.as_deref().unwrap_or_default())
                .await?;
            println!("Added lesson #{}: {}", lesson.id(), lesson.title());
            Ok(())
        }
        Command::EditLesson {
            topic,
            lesson,
            title,
            content,
        } => edit_lesson(app, topic, lesson, &title, content.as_deref()).await,
        Command::DeleteLesson { topic, lesson } => {
            app.content().load_topic(topic).await?;
            app.content().delete_lesson(topic, lesson).await?;
            println!("Deleted lesson #{lesson}.");
            Ok(())
        }
        Command::AddQuiz {
            topic,
            title,
            description,
        } => {
            app.content().load_topic(topic).await?;
            let quiz = app
                .content()
                .create_quiz(topic, &title, description.as_deref())
                .await?;
            println!("Added quiz #{}: {}", quiz.id(), quiz.title());
            println!("Add questions with `tutor add-question {topic} {}`.", quiz.id());
            Ok(())
        }
        Command::AddQuestion { topic, quiz } => add_question(app, topic, quiz).await,
        Command::DeleteQuiz { topic, quiz } => {
            app.content().load_topic(topic).await?;
            app.content().delete_quiz(topic, quiz).await?;
            println!("Deleted quiz #{quiz}.");
            Ok(())
        }
        Command::Quiz { topic, quiz } => run_quiz(app, topic, quiz).await,
        Command::Chat { topic, lesson } => chat(app, topic, lesson).await,
    }
}

async fn login(app: &AppServices) -> CmdResult {
    let mut prompt = Prompt::new();
    let username = prompt.require("username: ").await?;
    let password = prompt.require("password: ").await?;
    let user = app.auth().login(&username, &password).await?;
    println!("Signed in as {}.", user.username);
    Ok(())
}

async fn register(app: &AppServices) -> CmdResult {
    let mut prompt = Prompt::new();
    let username = prompt.require("username: ").await?;
    let email = prompt.require("email: ").await?;
    let password = prompt.require("password: ").await?;
    let user = app.auth().register(&username, &email, &password).await?;
    println!("Welcome, {}.", user.username);
    Ok(())
}

async fn whoami(app: &AppServices) -> CmdResult {
    match app.auth().profile().await {
        Ok(user) => {
            match &user.email {
                Some(email) => println!("{} <{email}> (#{})", user.username, user.id),
                None => println!("{} (#{})", user.username, user.id),
            }
            Ok(())
        }
        Err(AuthError::NotSignedIn) => {
            println!("Not signed in.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn topics(app: &AppServices) -> CmdResult {
    let topics = app.content().refresh_topics().await;
    if topics.is_empty() {
        println!("No topics yet. Create one with `tutor create-topic <name>`.");
        return Ok(());
    }
    for topic in topics {
        println!(
            "#{:<4} {}  ({}/{} lessons, {} quizzes)",
            topic.id, topic.name, topic.completed_lessons, topic.lesson_count, topic.quiz_count
        );
        if let Some(description) = &topic.description {
            println!("      {description}");
        }
    }
    Ok(())
}

async fn topic(app: &AppServices, id: TopicId) -> CmdResult {
    let content = app.content();
    content.load_topic(id).await?;
    let view = content.timeline(id)?;

    println!(
        "{}  ({}/{} lessons complete)",
        view.topic_name, view.completed_lessons, view.total_lessons
    );
    if view.is_empty() {
        println!("  This topic has no lessons or quizzes yet.");
        return Ok(());
    }
    for row in &view.rows {
        let marker = if row.locked {
            "locked"
        } else if row.completed {
            "done"
        } else {
            "open"
        };
        match row.target {
            TimelineTarget::Lesson(lesson) => {
                println!("  [{marker:^6}] lesson #{lesson}: {}", row.title);
            }
            TimelineTarget::Quiz(quiz) => println!(
                "  [{marker:^6}] quiz   #{quiz}: {} ({} questions)",
                row.title,
                row.question_count.unwrap_or_default()
            ),
        }
    }
    if let Some(next) = view.next_lesson() {
        println!("Next up: {}", next.title);
    }
    Ok(())
}

async fn complete(app: &AppServices, topic: TopicId, lesson: LessonId) -> CmdResult {
    let content = app.content();
    content.load_topic(topic).await?;
    if content.complete_lesson(topic, lesson).await? {
        println!("Lesson #{lesson} marked complete.");
    } else {
        println!("Lesson #{lesson} was already complete.");
    }
    Ok(())
}

async fn uncomplete(app: &AppServices, topic: TopicId, lesson: LessonId) -> CmdResult {
    let content = app.content();
    content.load_topic(topic).await?;
    if content.uncomplete_lesson(topic, lesson).await? {
        println!("Lesson #{lesson} marked not complete.");
    } else {
        println!("Lesson #{lesson} was not complete.");
    }
    Ok(())
}

async fn edit_lesson(
    app: &AppServices,
    topic: TopicId,
    lesson: LessonId,
    title: &str,
    content: Option<&str>,
) -> CmdResult {
    let store = app.content();
    let loaded = store.load_topic(topic).await?;
    // Without new content the old body is kept.
    let body = match content {
        Some(body) => body.to_owned(),
        None => loaded
            .lesson(lesson)
            .map(|l| l.content().to_owned())
            .unwrap_or_default(),
    };
    store.update_lesson(topic, lesson, title, &body).await?;
    println!("Updated lesson #{lesson}.");
    Ok(())
}

async fn add_question(app: &AppServices, topic: TopicId, quiz: QuizId) -> CmdResult {
    app.content().load_topic(topic).await?;
    let mut prompt = Prompt::new();
    let question = prompt.require("question: ").await?;

    println!("Enter the options, one per line; an empty line ends the list.");
    let mut options = Vec::new();
    while let Some(option) = prompt.ask(&format!("  {}. ", option_label(options.len()))).await? {
        if option.is_empty() {
            break;
        }
        options.push(option);
    }

    let correct = loop {
        let input = prompt.require("correct option: ").await?;
        match parse_choice(&input) {
            Some(choice) if choice < options.len() => break choice,
            _ => println!("Pick one of the listed options."),
        }
    };

    let options: Vec<&str> = options.iter().map(String::as_str).collect();
    let added = app
        .content()
        .add_question(topic, quiz, &question, &options, correct)
        .await?;
    println!("Added question #{} to quiz #{quiz}.", added.id());
    Ok(())
}

fn option_label(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .and_then(|i| b'A'.checked_add(i))
        .map_or('?', char::from)
}

async fn run_quiz(app: &AppServices, topic: TopicId, quiz: QuizId) -> CmdResult {
    app.content().load_topic(topic).await?;
    let quizzes = app.quizzes();
    let mut runner = quizzes.start(topic, quiz).await?;
    let mut prompt = Prompt::new();
    println!("{}", runner.quiz().title());

    loop {
        if runner.state() == QuizState::Empty {
            println!("This quiz has no questions yet.");
            return Ok(());
        }

        if let Some(question) = runner.current_question() {
            println!();
            println!("Question {} of {}", question.number, question.total);
            println!("{}", question.prompt);
            let skippable = match &question.options {
                QuestionOptions::Choices(options) => {
                    for option in options {
                        println!("  {}. {}", option.label, option.text);
                    }
                    false
                }
                QuestionOptions::NoOptions => {
                    println!("  (no options available; press enter to skip)");
                    true
                }
            };
            let label = if question.is_last { "answer (last): " } else { "answer: " };

            let Some(input) = prompt.ask(label).await? else {
                return Ok(());
            };
            if !skippable {
                match parse_choice(&input).map(|choice| runner.select_answer(choice)) {
                    Some(Ok(())) => {}
                    Some(Err(err)) => {
                        println!("{err}");
                        continue;
                    }
                    None => {
                        println!("Pick one of the listed options.");
                        continue;
                    }
                }
            }

            match quizzes.advance(&mut runner).await {
                Ok(step) if step.state == QuizState::Complete => {
                    print_review(&runner, step.attempt.as_ref().map(|a| a.answers.as_slice()));
                    let again = prompt.ask("try again? [y/N] ").await?;
                    if again.as_deref().is_some_and(|a| a.eq_ignore_ascii_case("y")) {
                        runner.retry()?;
                        continue;
                    }
                    return Ok(());
                }
                Ok(_) => {}
                Err(QuizServiceError::Quiz(QuizError::NoSelection)) => {
                    println!("Select an answer first.");
                }
                Err(err) => return Err(err.into()),
            }
        } else {
            return Ok(());
        }
    }
}

fn print_review(
    runner: &services::QuizRunner,
    confirmed: Option<&[storage::repository::AttemptAnswerRecord]>,
) {
    let review = runner.review(confirmed);
    println!();
    println!(
        "Score: {}/{} ({:.0}%)",
        review.score, review.total, review.percentage
    );
    for item in review.mistakes() {
        println!("  Q{}: {}", item.number, item.prompt);
        println!(
            "    your answer: {}",
            item.selected_text.unwrap_or("(none)")
        );
        if let Some(correct) = item.correct_text {
            println!("    correct:     {correct}");
        }
    }
}

async fn chat(app: &AppServices, topic: TopicId, lesson_id: LessonId) -> CmdResult {
    let content = app.content();
    content.load_topic(topic).await?;
    let lesson = content.open_lesson(topic, lesson_id)?;
    let chat = app.chat();

    println!("{}", lesson.title());
    if !lesson.content().trim().is_empty() {
        println!();
        println!("{}", lesson.content());
    }
    println!();
    for message in chat.enter_lesson(&lesson).await {
        print_message(&message);
    }

    let mut prompt = Prompt::new();
    while let Some(line) = prompt.ask("you> ").await? {
        match line.as_str() {
            "" => {}
            "/quit" => break,
            "/reset" => {
                chat.reset(lesson.id()).await;
                for message in chat.enter_lesson(&lesson).await {
                    print_message(&message);
                }
            }
            "/done" => {
                if content.complete_lesson(topic, lesson.id()).await? {
                    println!("Lesson marked complete.");
                }
                break;
            }
            text => match chat.send(&lesson, text).await {
                Ok(reply) => print_message(&reply),
                Err(err) => println!("{err}"),
            },
        }
    }

    chat.leave_lesson(lesson.id());
    Ok(())
}

fn print_message(message: &ChatMessage) {
    let who = match message.speaker() {
        Speaker::Tutor => "tutor",
        Speaker::Learner => "you",
    };
    println!("{who}> {}", message.text());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_labels_follow_the_alphabet() {
        assert_eq!(option_label(0), 'A');
        assert_eq!(option_label(3), 'D');
        assert_eq!(parse_choice(&option_label(2).to_string()), Some(2));
    }
}
