use thiserror::Error;

pub type ParamsResult<T> = Result<T, ParamsError>;

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("Invalid distribution: {what}")]
    InvalidDistribution { what: String },
}
