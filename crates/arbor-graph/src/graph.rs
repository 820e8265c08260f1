//! [`FamilyGraph`] — derived family relations by bounded edge traversal.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use arbor_core::{
  connection::ConnectionKind,
  span::{AccessScope, Span, SpanKind},
  store::GraphStore,
};

use crate::{
  Result,
  error::Error,
  labels::{ancestor_label, descendant_label},
};

// ─── Result type ─────────────────────────────────────────────────────────────

/// A person reached by relationship inference.
///
/// `generation` is the offset from the subject: positive is up (1 = parent's
/// level), negative is down, zero is the subject's own level.
#[derive(Debug, Clone, Serialize)]
pub struct Relative {
  pub span:       Span,
  pub label:      String,
  pub generation: i32,
}

// ─── Traversal direction ─────────────────────────────────────────────────────

/// Which way a family walk follows the parent→child edges. Fixed for the
/// whole walk, so the visited set inside one walk only needs span ids — the
/// (id, direction) key the cycle guard requires is implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
  /// child → parent (edge object → subject).
  Ancestors,
  /// parent → child (edge subject → object).
  Descendants,
}

// ─── FamilyGraph ─────────────────────────────────────────────────────────────

/// Relationship-inference engine over a [`GraphStore`].
///
/// Every query is access-filtered by the scope given at construction;
/// relatives the caller may not see are simply absent from the results.
pub struct FamilyGraph<'a, S> {
  store: &'a S,
  scope: AccessScope,
}

impl<'a, S: GraphStore> FamilyGraph<'a, S> {
  pub fn new(store: &'a S, scope: AccessScope) -> Self {
    Self { store, scope }
  }

  // ── Core walks ────────────────────────────────────────────────────────

  /// Resolve `id` to a person span or fail.
  async fn require_person(&self, id: Uuid) -> Result<Span, S::Error> {
    let span = self
      .store
      .find_span(id)
      .await
      .map_err(Error::Store)?
      .ok_or(Error::SpanNotFound(id))?;
    if span.kind != SpanKind::Person {
      return Err(Error::NotAPerson(id));
    }
    Ok(span)
  }

  /// Breadth-first walk along family edges, depth-bounded and cycle-safe.
  ///
  /// Returns each reached person with its generation (1 = one step). The
  /// root itself is never included. Edges whose far endpoint no longer
  /// resolves are skipped with a debug log.
  async fn family_walk(
    &self,
    root: Uuid,
    direction: Direction,
    max_generations: u32,
  ) -> Result<Vec<(Span, u32)>, S::Error> {
    let mut visited: HashSet<Uuid> = HashSet::from([root]);
    let mut reached: Vec<(Span, u32)> = Vec::new();
    let mut frontier = vec![root];

    for generation in 1..=max_generations {
      if frontier.is_empty() {
        break;
      }
      let mut next = Vec::new();

      for id in frontier {
        let edges = match direction {
          Direction::Ancestors => self
            .store
            .connections_where_object(id, Some(ConnectionKind::Family), self.scope)
            .await
            .map_err(Error::Store)?,
          Direction::Descendants => self
            .store
            .connections_where_subject(id, Some(ConnectionKind::Family), self.scope)
            .await
            .map_err(Error::Store)?,
        };

        for edge in edges {
          let neighbour = match direction {
            Direction::Ancestors => edge.subject_id,
            Direction::Descendants => edge.object_id,
          };
          if !visited.insert(neighbour) {
            continue;
          }
          match self.store.find_span(neighbour).await.map_err(Error::Store)? {
            Some(span) if span.kind == SpanKind::Person => {
              reached.push((span, generation));
              next.push(neighbour);
            }
            Some(span) => {
              tracing::debug!(
                connection = %edge.connection_id,
                endpoint = %span.span_id,
                kind = ?span.kind,
                "family edge endpoint is not a person; skipping"
              );
            }
            None => {
              tracing::debug!(
                connection = %edge.connection_id,
                missing = %neighbour,
                "skipping dangling family edge"
              );
            }
          }
        }
      }

      frontier = next;
    }

    Ok(reached)
  }

  /// Direct parents of `id` (generation 1 ancestors).
  async fn parents_of(&self, id: Uuid) -> Result<Vec<Span>, S::Error> {
    let walk = self.family_walk(id, Direction::Ancestors, 1).await?;
    Ok(walk.into_iter().map(|(span, _)| span).collect())
  }

  /// Direct children of `id` (generation 1 descendants).
  async fn children_of(&self, id: Uuid) -> Result<Vec<Span>, S::Error> {
    let walk = self.family_walk(id, Direction::Descendants, 1).await?;
    Ok(walk.into_iter().map(|(span, _)| span).collect())
  }

  /// Partners of `id` via relationship edges, queried in both directions —
  /// storage order of a symmetric bond is arbitrary.
  async fn partners_of(&self, id: Uuid) -> Result<Vec<Span>, S::Error> {
    let mut edges = self
      .store
      .connections_where_subject(id, Some(ConnectionKind::Relationship), self.scope)
      .await
      .map_err(Error::Store)?;
    edges.extend(
      self
        .store
        .connections_where_object(id, Some(ConnectionKind::Relationship), self.scope)
        .await
        .map_err(Error::Store)?,
    );

    let mut seen = HashSet::new();
    let mut partners = Vec::new();
    for edge in edges {
      let Some(other) = edge.other_endpoint(id) else { continue };
      if !seen.insert(other) {
        continue;
      }
      match self.store.find_span(other).await.map_err(Error::Store)? {
        Some(span) if span.kind == SpanKind::Person => partners.push(span),
        Some(_) => {}
        None => tracing::debug!(
          connection = %edge.connection_id,
          missing = %other,
          "skipping dangling relationship edge"
        ),
      }
    }
    Ok(partners)
  }

  /// Sibling spans of `id`: anyone sharing at least one parent.
  async fn sibling_spans(&self, id: Uuid) -> Result<Vec<Span>, S::Error> {
    let mut seen = HashSet::from([id]);
    let mut siblings = Vec::new();
    for parent in self.parents_of(id).await? {
      for child in self.children_of(parent.span_id).await? {
        if seen.insert(child.span_id) {
          siblings.push(child);
        }
      }
    }
    Ok(siblings)
  }

  // ── Query surface ─────────────────────────────────────────────────────

  /// Ancestors of `id` up to `max_generations` (1 = parents). All parent
  /// lines contribute, including blended families with more than two
  /// parents at a generation.
  pub async fn ancestors(
    &self,
    id: Uuid,
    max_generations: u32,
  ) -> Result<Vec<Relative>, S::Error> {
    self.require_person(id).await?;
    let walk = self.family_walk(id, Direction::Ancestors, max_generations).await?;
    let relatives = walk
      .into_iter()
      .map(|(span, g)| (span, ancestor_label(g), g as i32))
      .collect();
    Ok(finish(id, relatives))
  }

  /// Descendants of `id` up to `max_generations` (1 = children).
  pub async fn descendants(
    &self,
    id: Uuid,
    max_generations: u32,
  ) -> Result<Vec<Relative>, S::Error> {
    self.require_person(id).await?;
    let walk = self
      .family_walk(id, Direction::Descendants, max_generations)
      .await?;
    let relatives = walk
      .into_iter()
      .map(|(span, g)| (span, descendant_label(g), -(g as i32)))
      .collect();
    Ok(finish(id, relatives))
  }

  /// Persons sharing at least one parent with `id`.
  pub async fn siblings(&self, id: Uuid) -> Result<Vec<Relative>, S::Error> {
    self.require_person(id).await?;
    let relatives = self
      .sibling_spans(id)
      .await?
      .into_iter()
      .map(|span| (span, "sibling".to_string(), 0))
      .collect();
    Ok(finish(id, relatives))
  }

  /// Siblings of each of `id`'s parents.
  pub async fn uncles_and_aunts(&self, id: Uuid) -> Result<Vec<Relative>, S::Error> {
    self.require_person(id).await?;
    let parents = self.parents_of(id).await?;
    let parent_ids: HashSet<Uuid> = parents.iter().map(|p| p.span_id).collect();

    let mut relatives = Vec::new();
    for parent in &parents {
      for sibling in self.sibling_spans(parent.span_id).await? {
        if !parent_ids.contains(&sibling.span_id) {
          relatives.push((sibling, "uncle/aunt".to_string(), 1));
        }
      }
    }
    Ok(finish(id, relatives))
  }

  /// Children of each uncle/aunt.
  pub async fn cousins(&self, id: Uuid) -> Result<Vec<Relative>, S::Error> {
    let uncles = self.uncles_and_aunts(id).await?;
    let mut relatives = Vec::new();
    for uncle in uncles {
      for child in self.children_of(uncle.span.span_id).await? {
        relatives.push((child, "cousin".to_string(), 0));
      }
    }
    Ok(finish(id, relatives))
  }

  /// Children of each sibling (blood path only).
  pub async fn nephews_and_nieces(&self, id: Uuid) -> Result<Vec<Relative>, S::Error> {
    self.require_person(id).await?;
    let mut relatives = Vec::new();
    for sibling in self.sibling_spans(id).await? {
      for child in self.children_of(sibling.span_id).await? {
        relatives.push((child, "nephew/niece".to_string(), -1));
      }
    }
    Ok(finish(id, relatives))
  }

  /// Children of the partner's siblings — reached by marriage, reported
  /// separately from the blood variant so callers can label provenance.
  pub async fn extra_nephews_and_nieces(
    &self,
    id: Uuid,
  ) -> Result<Vec<Relative>, S::Error> {
    self.require_person(id).await?;
    let mut relatives = Vec::new();
    for partner in self.partners_of(id).await? {
      for sibling in self.sibling_spans(partner.span_id).await? {
        for child in self.children_of(sibling.span_id).await? {
          relatives.push((child, "nephew/niece (by marriage)".to_string(), -1));
        }
      }
    }
    Ok(finish(id, relatives))
  }

  /// Partners of `id`'s parents who are not themselves `id`'s parent.
  pub async fn step_parents(&self, id: Uuid) -> Result<Vec<Relative>, S::Error> {
    self.require_person(id).await?;
    let parents = self.parents_of(id).await?;
    let parent_ids: HashSet<Uuid> = parents.iter().map(|p| p.span_id).collect();

    let mut relatives = Vec::new();
    for parent in &parents {
      for partner in self.partners_of(parent.span_id).await? {
        if !parent_ids.contains(&partner.span_id) {
          relatives.push((partner, "step-parent".to_string(), 1));
        }
      }
    }
    Ok(finish(id, relatives))
  }

  /// In-laws at the subject's own and parental generations: partners of
  /// siblings, plus the partner's parents and siblings. Labels carry the
  /// path used.
  pub async fn in_laws_and_out_laws(&self, id: Uuid) -> Result<Vec<Relative>, S::Error> {
    self.require_person(id).await?;
    let mut relatives = Vec::new();

    for sibling in self.sibling_spans(id).await? {
      for partner in self.partners_of(sibling.span_id).await? {
        relatives.push((partner, "sibling's partner".to_string(), 0));
      }
    }

    for partner in self.partners_of(id).await? {
      for parent in self.parents_of(partner.span_id).await? {
        relatives.push((parent, "partner's parent".to_string(), 1));
      }
      for sibling in self.sibling_spans(partner.span_id).await? {
        relatives.push((sibling, "partner's sibling".to_string(), 0));
      }
    }

    Ok(finish(id, relatives))
  }

  /// Partners of `id`'s children.
  pub async fn children_in_laws_and_out_laws(
    &self,
    id: Uuid,
  ) -> Result<Vec<Relative>, S::Error> {
    self.require_person(id).await?;
    let mut relatives = Vec::new();
    for child in self.children_of(id).await? {
      for partner in self.partners_of(child.span_id).await? {
        relatives.push((partner, "child's partner".to_string(), -1));
      }
    }
    Ok(finish(id, relatives))
  }

  /// Partners of `id`'s grandchildren.
  pub async fn grandchildren_in_laws_and_out_laws(
    &self,
    id: Uuid,
  ) -> Result<Vec<Relative>, S::Error> {
    self.require_person(id).await?;
    let walk = self.family_walk(id, Direction::Descendants, 2).await?;

    let mut relatives = Vec::new();
    for (span, generation) in walk {
      if generation != 2 {
        continue;
      }
      for partner in self.partners_of(span.span_id).await? {
        relatives.push((partner, "grandchild's partner".to_string(), -2));
      }
    }
    Ok(finish(id, relatives))
  }
}

// ─── Post-processing ─────────────────────────────────────────────────────────

/// Deduplicate by span id (first label wins), drop the subject, and order by
/// relevance: nearest generation first, then name.
fn finish(subject: Uuid, relatives: Vec<(Span, String, i32)>) -> Vec<Relative> {
  let mut seen = HashSet::from([subject]);
  let mut out: Vec<Relative> = relatives
    .into_iter()
    .filter(|(span, _, _)| seen.insert(span.span_id))
    .map(|(span, label, generation)| Relative { span, label, generation })
    .collect();
  out.sort_by(|a, b| {
    (a.generation.abs(), a.generation, a.span.name.as_str())
      .cmp(&(b.generation.abs(), b.generation, b.span.name.as_str()))
  });
  out
}
