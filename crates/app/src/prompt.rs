use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Line-oriented stdin reader for the interactive commands.
pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `label` and read one trimmed line; `None` at end of input.
    pub async fn ask(&mut self, label: &str) -> io::Result<Option<String>> {
        print!("{label}");
        io::stdout().flush()?;
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_owned()))
    }

    /// Like `ask`, but end of input is an error.
    pub async fn require(&mut self, label: &str) -> io::Result<String> {
        self.ask(label).await?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "input closed")
        })
    }
}

/// Parse an option as a letter (`b`) or a 1-based number (`2`).
pub fn parse_choice(input: &str) -> Option<usize> {
    let input = input.trim();
    if let Ok(number) = input.parse::<usize>() {
        return number.checked_sub(1);
    }
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some(usize::from(c.to_ascii_uppercase() as u8 - b'A'))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_and_numbers_select_options() {
        assert_eq!(parse_choice("a"), Some(0));
        assert_eq!(parse_choice("C"), Some(2));
        assert_eq!(parse_choice("2"), Some(1));
    }

    #[test]
    fn junk_is_not_a_choice() {
        assert_eq!(parse_choice("0"), None);
        assert_eq!(parse_choice("ab"), None);
        assert_eq!(parse_choice(""), None);
        assert_eq!(parse_choice("?"), None);
    }
}
