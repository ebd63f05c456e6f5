/// One reviewed question.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewItem<'a> {
    /// 1-based.
    pub number: usize,
    pub prompt: &'a str,
    pub selected_answer: Option<usize>,
    pub selected_text: Option<&'a str>,
    /// `None` for a question whose options could not be read.
    pub correct_answer: Option<usize>,
    pub correct_text: Option<&'a str>,
    pub is_correct: bool,
}

/// End-of-quiz report.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizReview<'a> {
    pub items: Vec<ReviewItem<'a>>,
    pub score: usize,
    pub total: usize,
    pub percentage: f64,
    /// Whether the backend's copy of the attempt was used.
    pub from_backend: bool,
}

impl QuizReview<'_> {
    #[must_use]
    pub fn mistakes(&self) -> impl Iterator<Item = &ReviewItem<'_>> {
        self.items.iter().filter(|item| !item.is_correct)
    }
}
