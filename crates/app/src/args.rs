use std::fmt;

use services::AppConfig;
use tutor_core::model::{LessonId, QuizId, TopicId};

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { command: &'static str, name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidId { name: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidId { name, raw } => write!(f, "invalid {name}: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Login,
    Register,
    Logout,
    WhoAmI,
    Topics,
    Topic(TopicId),
    CreateTopic {
        name: String,
        description: Option<String>,
    },
    RenameTopic {
        id: TopicId,
        name: String,
        description: Option<String>,
    },
    DeleteTopic(TopicId),
    Complete {
        topic: TopicId,
        lesson: LessonId,
    },
    Uncomplete {
        topic: TopicId,
        lesson: LessonId,
    },
    AddLesson {
        topic: TopicId,
        title: String,
        content: Option<String>,
    },
    EditLesson {
        topic: TopicId,
        lesson: LessonId,
        title: String,
        content: Option<String>,
    },
    DeleteLesson {
        topic: TopicId,
        lesson: LessonId,
    },
    AddQuiz {
        topic: TopicId,
        title: String,
        description: Option<String>,
    },
    AddQuestion {
        topic: TopicId,
        quiz: QuizId,
    },
    DeleteQuiz {
        topic: TopicId,
        quiz: QuizId,
    },
    Quiz {
        topic: TopicId,
        quiz: QuizId,
    },
    Chat {
        topic: TopicId,
        lesson: LessonId,
    },
}

/// Global flags plus the command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub api_url: Option<String>,
    pub db_url: Option<String>,
    pub offline: bool,
    pub command: Command,
}

impl Args {
    pub fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut api_url = None;
        let mut db_url = None;
        let mut offline = false;
        let mut positional = Vec::new();

        let mut iter = argv.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--api" => api_url = Some(require_value(&mut iter, "--api")?),
                "--db" => db_url = Some(require_value(&mut iter, "--db")?),
                "--offline" => offline = true,
                "--help" | "-h" => positional.insert(0, "help".to_owned()),
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        Ok(Self {
            api_url,
            db_url,
            offline,
            command: Command::parse(positional)?,
        })
    }

    /// Layer the flags over the environment-derived config.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(api) = &self.api_url {
            config.api_url.clone_from(api);
        }
        if let Some(db) = &self.db_url {
            config.db_url.clone_from(db);
        }
        if self.offline {
            config.offline = true;
        }
    }
}

impl Command {
    fn parse(words: Vec<String>) -> Result<Self, ArgsError> {
        let mut words = words.into_iter();
        let Some(name) = words.next() else {
            return Ok(Command::Help);
        };

        let command = match name.as_str() {
            "help" => Command::Help,
            "login" => Command::Login,
            "register" => Command::Register,
            "logout" => Command::Logout,
            "whoami" => Command::WhoAmI,
            "topics" => Command::Topics,
            "topic" => Command::Topic(id(&mut words, "topic", "topic-id")?),
            "create-topic" => Command::CreateTopic {
                name: word(&mut words, "create-topic", "name")?,
                description: words.next(),
            },
            "rename-topic" => Command::RenameTopic {
                id: id(&mut words, "rename-topic", "topic-id")?,
                name: word(&mut words, "rename-topic", "name")?,
                description: words.next(),
            },
            "delete-topic" => Command::DeleteTopic(id(&mut words, "delete-topic", "topic-id")?),
            "complete" => Command::Complete {
                topic: id(&mut words, "complete", "topic-id")?,
                lesson: id(&mut words, "complete", "lesson-id")?,
            },
            "uncomplete" => Command::Uncomplete {
                topic: id(&mut words, "uncomplete", "topic-id")?,
                lesson: id(&mut words, "uncomplete", "lesson-id")?,
            },
            "add-lesson" => Command::AddLesson {
                topic: id(&mut words, "add-lesson", "topic-id")?,
                title: word(&mut words, "add-lesson", "title")?,
                content: words.next(),
            },
            "edit-lesson" => Command::EditLesson {
                topic: id(&mut words, "edit-lesson", "topic-id")?,
                lesson: id(&mut words, "edit-lesson", "lesson-id")?,
                title: word(&mut words, "edit-lesson", "title")?,
                content: words.next(),
            },
            "delete-lesson" => Command::DeleteLesson {
                topic: id(&mut words, "delete-lesson", "topic-id")?,
                lesson: id(&mut words, "delete-lesson", "lesson-id")?,
            },
            "add-quiz" => Command::AddQuiz {
                topic: id(&mut words, "add-quiz", "topic-id")?,
                title: word(&mut words, "add-quiz", "title")?,
                description: words.next(),
            },
            "add-question" => Command::AddQuestion {
                topic: id(&mut words, "add-question", "topic-id")?,
                quiz: id(&mut words, "add-question", "quiz-id")?,
            },
            "delete-quiz" => Command::DeleteQuiz {
                topic: id(&mut words, "delete-quiz", "topic-id")?,
                quiz: id(&mut words, "delete-quiz", "quiz-id")?,
            },
            "quiz" => Command::Quiz {
                topic: id(&mut words, "quiz", "topic-id")?,
                quiz: id(&mut words, "quiz", "quiz-id")?,
            },
            "chat" => Command::Chat {
                topic: id(&mut words, "chat", "topic-id")?,
                lesson: id(&mut words, "chat", "lesson-id")?,
            },
            _ => return Err(ArgsError::UnknownCommand(name)),
        };

        match words.next() {
            Some(extra) => Err(ArgsError::UnknownArg(extra)),
            None => Ok(command),
        }
    }

    /// Whether the command talks to the content backend and needs a session.
    pub fn needs_session(&self) -> bool {
        !matches!(
            self,
            Command::Help | Command::Login | Command::Register | Command::Logout
        )
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ArgsError::MissingValue { flag })
}

fn word(
    words: &mut impl Iterator<Item = String>,
    command: &'static str,
    name: &'static str,
) -> Result<String, ArgsError> {
    words
        .next()
        .ok_or(ArgsError::MissingArgument { command, name })
}

fn id<T: std::str::FromStr>(
    words: &mut impl Iterator<Item = String>,
    command: &'static str,
    name: &'static str,
) -> Result<T, ArgsError> {
    let raw = word(words, command, name)?;
    raw.parse().map_err(|_| ArgsError::InvalidId { name, raw })
}

pub fn print_usage() {
    eprintln!("Usage: tutor [--api <url>] [--db <sqlite_url>] [--offline] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  login | register | logout | whoami");
    eprintln!("  topics");
    eprintln!("  topic <topic-id>");
    eprintln!("  create-topic <name> [description]");
    eprintln!("  rename-topic <topic-id> <name> [description]");
    eprintln!("  delete-topic <topic-id>");
    eprintln!("  complete <topic-id> <lesson-id>");
    eprintln!("  uncomplete <topic-id> <lesson-id>");
    eprintln!("  add-lesson <topic-id> <title> [content]");
    eprintln!("  edit-lesson <topic-id> <lesson-id> <title> [content]");
    eprintln!("  delete-lesson <topic-id> <lesson-id>");
    eprintln!("  add-quiz <topic-id> <title> [description]");
    eprintln!("  add-question <topic-id> <quiz-id>   (prompts for text and options)");
    eprintln!("  delete-quiz <topic-id> <quiz-id>");
    eprintln!("  quiz <topic-id> <quiz-id>");
    eprintln!("  chat <topic-id> <lesson-id>   (/reset, /done, /quit)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TUTOR_API_URL, TUTOR_DB_URL, TUTOR_OFFLINE");
    eprintln!("  TUTOR_AI_API_KEY, TUTOR_AI_BASE_URL, TUTOR_AI_MODEL");
    eprintln!("  RUST_LOG (default info)");
}
