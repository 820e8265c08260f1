//! Error types for `arbor-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::span::SpanKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("span not found: {0}")]
  SpanNotFound(Uuid),

  #[error("connection not found: {0}")]
  ConnectionNotFound(Uuid),

  #[error("invalid date: {0}")]
  InvalidDate(String),

  #[error(
    "span {span_id} has kind {span_kind:?} but metadata for {metadata_kind:?}"
  )]
  MetadataKindMismatch {
    span_id:       Uuid,
    span_kind:     SpanKind,
    metadata_kind: SpanKind,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
