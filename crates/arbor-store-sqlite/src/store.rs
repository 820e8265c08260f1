//! [`SqliteStore`] — the SQLite implementation of [`GraphStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use arbor_core::{
  connection::{Connection, ConnectionKind, NewConnection},
  span::{AccessScope, NewSpan, Span, SpanKind, SpanMetadata},
  store::{GraphStore, SpanFilter, WriteBatch, WriteOp},
};

use crate::{
  Error, Result,
  encode::{
    RawConnection, RawSpan, encode_access, encode_connection_kind, encode_dt,
    encode_fuzzy_date, encode_metadata, encode_span_kind, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Arbor graph store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

const SPAN_COLUMNS: &str =
  "span_id, kind, name, start_date, end_date, access, owner_id, metadata, created_at";

const CONNECTION_COLUMNS: &str =
  "connection_id, kind, subject_id, object_id, connection_span_id";

/// SQL predicate gating a connection on the visibility of both endpoints.
/// `?A` is 1 for an unrestricted scope; `?B` is the principal id or NULL.
fn endpoint_access_sql(unrestricted_param: &str, owner_param: &str) -> String {
  format!(
    "({u} = 1
      OR ((s.access = 'public' OR s.owner_id = {o})
      AND (o.access = 'public' OR o.owner_id = {o})))",
    u = unrestricted_param,
    o = owner_param,
  )
}

/// Bindable parts of an [`AccessScope`].
fn scope_params(scope: AccessScope) -> (bool, Option<String>) {
  match scope {
    AccessScope::Unrestricted => (true, None),
    AccessScope::Anonymous => (false, None),
    AccessScope::Principal(p) => (false, Some(encode_uuid(p))),
  }
}

fn row_to_raw_span(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSpan> {
  Ok(RawSpan {
    span_id:    row.get(0)?,
    kind:       row.get(1)?,
    name:       row.get(2)?,
    start_date: row.get(3)?,
    end_date:   row.get(4)?,
    access:     row.get(5)?,
    owner_id:   row.get(6)?,
    metadata:   row.get(7)?,
    created_at: row.get(8)?,
  })
}

fn row_to_raw_connection(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawConnection> {
  Ok(RawConnection {
    connection_id:      row.get(0)?,
    kind:               row.get(1)?,
    subject_id:         row.get(2)?,
    object_id:          row.get(3)?,
    connection_span_id: row.get(4)?,
  })
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a fully-built span row inside an existing transaction.
  fn insert_span_tx(tx: &rusqlite::Transaction<'_>, span: &Span) -> Result<()> {
    tx.execute(
      "INSERT INTO spans (
         span_id, kind, name, start_date, end_date,
         access, owner_id, metadata, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
      rusqlite::params![
        encode_uuid(span.span_id),
        encode_span_kind(span.kind),
        span.name,
        span.start.as_ref().map(encode_fuzzy_date).transpose()?,
        span.end.as_ref().map(encode_fuzzy_date).transpose()?,
        encode_access(span.access),
        span.owner_id.map(encode_uuid),
        encode_metadata(&span.metadata)?,
        encode_dt(span.created_at),
      ],
    )?;
    Ok(())
  }

  /// Shared query body for subject/object-keyed connection lookups.
  async fn connections_by_endpoint(
    &self,
    span_id: Uuid,
    kind: Option<ConnectionKind>,
    scope: AccessScope,
    endpoint_column: &'static str,
  ) -> Result<Vec<Connection>> {
    let id_str = encode_uuid(span_id);
    let kind_str = kind.map(encode_connection_kind).map(str::to_owned);
    let (unrestricted, owner) = scope_params(scope);

    let raws: Vec<RawConnection> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT c.connection_id, c.kind, c.subject_id, c.object_id,
                  c.connection_span_id
           FROM connections c
           JOIN spans s ON s.span_id = c.subject_id
           JOIN spans o ON o.span_id = c.object_id
           WHERE c.{endpoint_column} = ?1
             AND (?2 IS NULL OR c.kind = ?2)
             AND {access}",
          access = endpoint_access_sql("?3", "?4"),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![id_str, kind_str, unrestricted, owner],
            row_to_raw_connection,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConnection::into_connection).collect()
  }
}

// ─── Write ops ───────────────────────────────────────────────────────────────

/// Execute one [`WriteOp`] inside a transaction.
fn apply_op(tx: &rusqlite::Transaction<'_>, op: &WriteOp) -> Result<()> {
  match op {
    WriteOp::UpsertConnection(c) => {
      tx.execute(
        "INSERT INTO connections (
           connection_id, kind, subject_id, object_id, connection_span_id
         ) VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (connection_id) DO UPDATE SET
           kind = excluded.kind,
           subject_id = excluded.subject_id,
           object_id = excluded.object_id,
           connection_span_id = excluded.connection_span_id",
        rusqlite::params![
          encode_uuid(c.connection_id),
          encode_connection_kind(c.kind),
          encode_uuid(c.subject_id),
          encode_uuid(c.object_id),
          encode_uuid(c.connection_span_id),
        ],
      )?;
    }
    WriteOp::DeleteConnection(id) => {
      // Carrier span goes in lock-step with its edge. The kind guard keeps a
      // miswired connection_span_id from taking a real entity down with it.
      let id_str = encode_uuid(*id);
      tx.execute(
        "DELETE FROM spans WHERE kind = 'connection' AND span_id IN
           (SELECT connection_span_id FROM connections WHERE connection_id = ?1)",
        rusqlite::params![id_str],
      )?;
      tx.execute(
        "DELETE FROM connections WHERE connection_id = ?1",
        rusqlite::params![id_str],
      )?;
    }
    WriteOp::DeleteSpan(id) => {
      tx.execute(
        "DELETE FROM spans WHERE span_id = ?1",
        rusqlite::params![encode_uuid(*id)],
      )?;
    }
    WriteOp::SetSpanDates { span_id, start, end } => {
      tx.execute(
        "UPDATE spans SET start_date = ?2, end_date = ?3 WHERE span_id = ?1",
        rusqlite::params![
          encode_uuid(*span_id),
          start.as_ref().map(encode_fuzzy_date).transpose()?,
          end.as_ref().map(encode_fuzzy_date).transpose()?,
        ],
      )?;
    }
    WriteOp::SetAccessLevel { span_id, access } => {
      tx.execute(
        "UPDATE spans SET access = ?2 WHERE span_id = ?1",
        rusqlite::params![encode_uuid(*span_id), encode_access(*access)],
      )?;
    }
  }
  Ok(())
}

// ─── GraphStore impl ─────────────────────────────────────────────────────────

impl GraphStore for SqliteStore {
  type Error = Error;

  // ── Spans ─────────────────────────────────────────────────────────────────

  async fn create_span(&self, input: NewSpan) -> Result<Span> {
    let span = Span {
      span_id:    Uuid::new_v4(),
      kind:       input.kind,
      name:       input.name,
      start:      input.start,
      end:        input.end,
      access:     input.access,
      owner_id:   input.owner_id,
      metadata:   input.metadata,
      created_at: Utc::now(),
    };
    span.validate().map_err(Error::Core)?;

    let row = span.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        SqliteStore::insert_span_tx(&tx, &row).map_err(into_call_error)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(span)
  }

  async fn find_span(&self, id: Uuid) -> Result<Option<Span>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSpan> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SPAN_COLUMNS} FROM spans WHERE span_id = ?1"),
              rusqlite::params![id_str],
              row_to_raw_span,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSpan::into_span).transpose()
  }

  async fn list_spans(&self, filter: SpanFilter) -> Result<Vec<Span>> {
    let kind_str = filter.kind.map(encode_span_kind).map(str::to_owned);
    let name = filter.name.clone();
    let access_str = filter.access.map(encode_access).map(str::to_owned);
    let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
    let offset = filter.offset.unwrap_or(0) as i64;

    let raws: Vec<RawSpan> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SPAN_COLUMNS} FROM spans
           WHERE (?1 IS NULL OR kind = ?1)
             AND (?2 IS NULL OR name = ?2 COLLATE NOCASE)
             AND (?3 IS NULL OR access = ?3)
           ORDER BY created_at
           LIMIT ?4 OFFSET ?5"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![kind_str, name, access_str, limit, offset],
            row_to_raw_span,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSpan::into_span).collect()
  }

  // ── Connections ───────────────────────────────────────────────────────────

  async fn create_connection(
    &self,
    input: NewConnection,
  ) -> Result<(Connection, Span)> {
    let kind_label = encode_connection_kind(input.kind);
    let subject_str = encode_uuid(input.subject_id);
    let object_str = encode_uuid(input.object_id);

    // Carrier span name comes from the endpoint names, fetched in the same
    // transaction that checks the endpoints exist.
    let carrier = Span {
      span_id:    Uuid::new_v4(),
      kind:       SpanKind::Connection,
      name:       String::new(), // filled below
      start:      input.start,
      end:        input.end,
      access:     input.access,
      owner_id:   input.owner_id,
      metadata:   SpanMetadata::empty_for(SpanKind::Connection),
      created_at: Utc::now(),
    };
    let connection = Connection {
      connection_id:      Uuid::new_v4(),
      kind:               input.kind,
      subject_id:         input.subject_id,
      object_id:          input.object_id,
      connection_span_id: carrier.span_id,
    };

    let subject_id = input.subject_id;
    let object_id = input.object_id;
    let mut carrier_row = carrier.clone();
    let connection_row = connection.clone();

    let carrier_name: String = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let name_of = |tx: &rusqlite::Transaction<'_>, id: &str, missing: Uuid| {
          tx.query_row(
            "SELECT name FROM spans WHERE span_id = ?1",
            rusqlite::params![id],
            |row| row.get::<_, String>(0),
          )
          .optional()?
          .ok_or_else(|| into_call_error(Error::SpanNotFound(missing)))
        };
        let subject_name = name_of(&tx, &subject_str, subject_id)?;
        let object_name = name_of(&tx, &object_str, object_id)?;

        carrier_row.name = format!("{subject_name} {kind_label} {object_name}");
        SqliteStore::insert_span_tx(&tx, &carrier_row).map_err(into_call_error)?;

        tx.execute(
          "INSERT INTO connections (
             connection_id, kind, subject_id, object_id, connection_span_id
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            encode_uuid(connection_row.connection_id),
            encode_connection_kind(connection_row.kind),
            encode_uuid(connection_row.subject_id),
            encode_uuid(connection_row.object_id),
            encode_uuid(connection_row.connection_span_id),
          ],
        )?;

        tx.commit()?;
        Ok(carrier_row.name)
      })
      .await?;

    let carrier = Span { name: carrier_name, ..carrier };
    Ok((connection, carrier))
  }

  async fn find_connection(&self, id: Uuid) -> Result<Option<Connection>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawConnection> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONNECTION_COLUMNS} FROM connections
                 WHERE connection_id = ?1"
              ),
              rusqlite::params![id_str],
              row_to_raw_connection,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawConnection::into_connection).transpose()
  }

  async fn find_connection_by_span(
    &self,
    connection_span_id: Uuid,
  ) -> Result<Option<Connection>> {
    let id_str = encode_uuid(connection_span_id);

    let raw: Option<RawConnection> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONNECTION_COLUMNS} FROM connections
                 WHERE connection_span_id = ?1"
              ),
              rusqlite::params![id_str],
              row_to_raw_connection,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawConnection::into_connection).transpose()
  }

  async fn connections_where_subject(
    &self,
    span_id: Uuid,
    kind: Option<ConnectionKind>,
    scope: AccessScope,
  ) -> Result<Vec<Connection>> {
    self
      .connections_by_endpoint(span_id, kind, scope, "subject_id")
      .await
  }

  async fn connections_where_object(
    &self,
    span_id: Uuid,
    kind: Option<ConnectionKind>,
    scope: AccessScope,
  ) -> Result<Vec<Connection>> {
    self
      .connections_by_endpoint(span_id, kind, scope, "object_id")
      .await
  }

  async fn connections_touching(
    &self,
    span_id: Uuid,
    scope: AccessScope,
  ) -> Result<Vec<Connection>> {
    let id_str = encode_uuid(span_id);
    let (unrestricted, owner) = scope_params(scope);

    let raws: Vec<RawConnection> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT c.connection_id, c.kind, c.subject_id, c.object_id,
                  c.connection_span_id
           FROM connections c
           JOIN spans s ON s.span_id = c.subject_id
           JOIN spans o ON o.span_id = c.object_id
           WHERE (c.subject_id = ?1 OR c.object_id = ?1)
             AND {access}",
          access = endpoint_access_sql("?2", "?3"),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![id_str, unrestricted, owner],
            row_to_raw_connection,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConnection::into_connection).collect()
  }

  async fn list_connections(
    &self,
    kind: Option<ConnectionKind>,
    limit: Option<usize>,
  ) -> Result<Vec<Connection>> {
    let kind_str = kind.map(encode_connection_kind).map(str::to_owned);
    let limit = limit.map(|l| l as i64).unwrap_or(-1);

    let raws: Vec<RawConnection> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONNECTION_COLUMNS} FROM connections
           WHERE (?1 IS NULL OR kind = ?1)
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str, limit], row_to_raw_connection)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConnection::into_connection).collect()
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn apply(&self, batch: WriteBatch) -> Result<()> {
    if batch.is_empty() {
      return Ok(());
    }

    self
      .conn
      .call(move |conn| {
        // The transaction is rolled back by RAII if any op errors.
        let tx = conn.transaction()?;
        for op in &batch.ops {
          apply_op(&tx, op).map_err(into_call_error)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(())
  }
}

/// Wrap a store error so it can cross the `tokio_rusqlite::Connection::call`
/// boundary, which only transports `tokio_rusqlite::Error`.
fn into_call_error(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}
