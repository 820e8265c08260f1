//! Error type for `arbor-graph`, generic over the backing store's error.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error<E: std::error::Error + 'static> {
  #[error("span not found: {0}")]
  SpanNotFound(Uuid),

  #[error("span {0} is not a person")]
  NotAPerson(Uuid),

  #[error("store error: {0}")]
  Store(#[from] E),
}

pub type Result<T, E> = std::result::Result<T, Error<E>>;
