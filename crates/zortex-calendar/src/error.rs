use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("line {line}: malformed date section header {text:?}")]
    BadDateHeader { line: usize, text: String },
}

pub type CalendarResult<T> = Result<T, CalendarError>;
