use crate::date_text::DateExpressionError;
use crate::persistence::PersistenceError;

pub type CalendarResult<T> = Result<T, CalendarError>;

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    /// Free-text date that matches none of the supported PT forms.
    #[error(transparent)]
    DateExpression(#[from] DateExpressionError),
    #[error("academic year '{year}' is closed; the calendar cannot be changed")]
    ClosedYear { year: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl CalendarError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CalendarError::InvalidInput(message.into())
    }
}
