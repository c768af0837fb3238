//! The read-only relationship dataset backing the visible graph.
//!
//! The dataset is one JSON object: keys are entity names, values are the
//! entity's outgoing relations. A missing key means the entity has no known
//! relations. The mapping is fetched once at startup and never mutated.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

/// One outgoing relation as it appears on the wire: the related entity's
/// name plus the relation label (`rel1` is the dataset's field name).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RelationRecord {
	/// Name of the related entity.
	pub name: String,
	/// Relation label, e.g. "朋友" or "同事".
	pub rel1: String,
}

/// Failure to obtain or decode the relationship dataset.
#[derive(Debug, Error)]
pub enum DataError {
	/// The HTTP request itself failed or returned a non-success status.
	#[error("relation dataset request failed: {0}")]
	Fetch(#[from] reqwest::Error),
	/// The response body was not the expected JSON mapping.
	#[error("relation dataset is not valid JSON: {0}")]
	Decode(#[from] serde_json::Error),
}

/// Immutable mapping from entity name to its outgoing relations.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct AdjacencySource(HashMap<String, Vec<RelationRecord>>);

impl AdjacencySource {
	/// Fetch and decode the dataset from `url`.
	pub async fn fetch(url: &str) -> Result<Self, DataError> {
		let body = reqwest::get(url).await?.error_for_status()?.text().await?;
		Ok(serde_json::from_str(&body)?)
	}

	/// Outgoing relations of `name`; empty when the entity is unknown.
	pub fn neighbors(&self, name: &str) -> &[RelationRecord] {
		self.0.get(name).map(Vec::as_slice).unwrap_or_default()
	}

	/// Whether the dataset has an entry for `name` at all.
	pub fn contains(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	/// Whether `name` has at least one outgoing relation. Drives the
	/// `has_more` flag on visible nodes, so it must not count empty entries.
	pub fn has_relations(&self, name: &str) -> bool {
		!self.neighbors(name).is_empty()
	}

	/// All entity names known to the dataset, in arbitrary order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}

	/// Number of entities with an entry.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the dataset has no entries (e.g. before load completes).
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl FromIterator<(String, Vec<RelationRecord>)> for AdjacencySource {
	fn from_iter<I: IntoIterator<Item = (String, Vec<RelationRecord>)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}
