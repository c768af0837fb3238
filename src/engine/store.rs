//! The visible-graph working set and its mutation algorithms.
//!
//! `VisibleGraph` owns what is currently on screen: an ordered node list, an
//! ordered edge list and a name index. The adjacency dataset is the source
//! of truth; this store only ever holds the part the user has revealed.
//!
//! Structural invariants, maintained by every operation:
//! - a name appears in the node list at most once, and the root is never
//!   removed;
//! - every non-root node records the `parent` that introduced it, and its
//!   `degree` is `parent.degree + 1`;
//! - a collapsed node (`expanded == false`) has no visible children, i.e.
//!   no node's `parent` points at it;
//! - every edge references two visible nodes, and at most one edge exists
//!   per ordered `(source, target)` pair.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::adjacency::AdjacencySource;

/// A visible entity, keyed by its unique name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityNode {
	/// Unique name; doubles as the node id handed to the renderer.
	pub name: String,
	/// Display label, always equal to `name`.
	pub label: String,
	/// Hop distance from the current root (the root itself is 0).
	pub degree: u32,
	/// Whether this node's one-hop neighbors have been merged in.
	pub expanded: bool,
	/// Whether the dataset knows at least one outgoing relation for it.
	pub has_more: bool,
	/// Name of the node that first introduced this one; `None` for the root.
	pub parent: Option<String>,
}

/// A visible labeled edge between two entities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationEdge {
	/// Name of the entity the relation points away from.
	pub source: String,
	/// Name of the entity the relation points at.
	pub target: String,
	/// Relation label, e.g. "朋友".
	pub label: String,
}

/// Read-only `(nodes, edges)` pair handed to the rendering layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphView {
	/// Visible nodes in introduction order (root first).
	pub nodes: Vec<EntityNode>,
	/// Visible edges in insertion order.
	pub edges: Vec<RelationEdge>,
}

/// Mutable working set of currently displayed nodes and edges.
#[derive(Clone, Debug, Default)]
pub struct VisibleGraph {
	nodes: Vec<EntityNode>,
	edges: Vec<RelationEdge>,
	index: HashMap<String, usize>,
}

impl VisibleGraph {
	/// Create an empty store; nothing is visible until [`retarget`] seeds it.
	///
	/// [`retarget`]: VisibleGraph::retarget
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether nothing is currently visible.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Number of visible nodes.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	/// Number of visible edges.
	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	/// Look up a visible node by name.
	pub fn get(&self, name: &str) -> Option<&EntityNode> {
		self.index.get(name).map(|&i| &self.nodes[i])
	}

	/// Clone the current node/edge sets for the rendering layer.
	pub fn snapshot(&self) -> GraphView {
		GraphView { nodes: self.nodes.clone(), edges: self.edges.clone() }
	}

	/// Switch to a new search target.
	///
	/// Returns `false` when the dataset has no entry for `root`; the store is
	/// then left empty so the caller can surface the no-data placeholder.
	/// Otherwise the previous graph is discarded wholesale and the store is
	/// reseeded via [`reset`](VisibleGraph::reset). Submitting the root the
	/// store is already seeded on keeps the working set, expansion state
	/// included; only a change of target discards it.
	pub fn retarget(&mut self, root: &str, source: &AdjacencySource) -> bool {
		if self.nodes.first().is_some_and(|node| node.name == root) {
			return true;
		}
		if !source.contains(root) {
			self.clear();
			debug!("retarget {root}: no dataset entry, store cleared");
			return false;
		}
		self.reset(root, source);
		true
	}

	/// Discard everything and seed the store with `root` plus its one-hop
	/// neighbors.
	///
	/// The root is inserted first (`degree` 0, expanded, `has_more` set), then
	/// one node and one edge per neighbor record. Records repeating an
	/// already-seeded name are skipped, first record wins; records relating
	/// the root to itself are skipped outright.
	pub fn reset(&mut self, root: &str, source: &AdjacencySource) {
		self.clear();
		self.insert_node(EntityNode {
			name: root.to_owned(),
			label: root.to_owned(),
			degree: 0,
			expanded: true,
			has_more: true,
			parent: None,
		});
		for record in source.neighbors(root) {
			if record.name == root || self.index.contains_key(&record.name) {
				continue;
			}
			self.insert_node(EntityNode {
				name: record.name.clone(),
				label: record.name.clone(),
				degree: 1,
				expanded: false,
				has_more: source.has_relations(&record.name),
				parent: Some(root.to_owned()),
			});
			self.edges.push(RelationEdge {
				source: root.to_owned(),
				target: record.name.clone(),
				label: record.rel1.clone(),
			});
		}
		debug!("reset to {root}: {} nodes, {} edges", self.nodes.len(), self.edges.len());
	}

	/// Merge `name`'s one-hop neighbors into the visible graph.
	///
	/// Neighbors already visible keep their node (and owner) but still gain
	/// the connecting edge unless that exact `(source, target)` pair exists;
	/// this is how revisiting an ancestor through a dataset cycle is merged
	/// rather than duplicated. A name with no dataset entry expands to zero
	/// neighbors. Expanding an unknown or already-expanded node is a no-op.
	pub fn expand(&mut self, name: &str, source: &AdjacencySource) {
		let Some(&at) = self.index.get(name) else {
			return;
		};
		if self.nodes[at].expanded {
			return;
		}
		let child_degree = self.nodes[at].degree + 1;

		let before = (self.nodes.len(), self.edges.len());
		for record in source.neighbors(name) {
			if record.name == name {
				continue;
			}
			if !self.index.contains_key(&record.name) {
				self.insert_node(EntityNode {
					name: record.name.clone(),
					label: record.name.clone(),
					degree: child_degree,
					expanded: false,
					has_more: source.has_relations(&record.name),
					parent: Some(name.to_owned()),
				});
			}
			let already_linked = self
				.edges
				.iter()
				.any(|e| e.source == name && e.target == record.name);
			if !already_linked {
				self.edges.push(RelationEdge {
					source: name.to_owned(),
					target: record.name.clone(),
					label: record.rel1.clone(),
				});
			}
		}
		self.nodes[at].expanded = true;
		debug!(
			"expand {name}: +{} nodes, +{} edges",
			self.nodes.len() - before.0,
			self.edges.len() - before.1
		);
	}

	/// Hide everything revealed through `name`, cascading transitively.
	///
	/// Walks the expansion tree with an explicit worklist (no recursion, so
	/// adversarially deep chains cannot blow the stack): starting from `name`,
	/// every node whose `parent` chain passes through it is marked removed.
	/// One sweep then drops the marked nodes, the collapsed node's own
	/// expansion edges, and any edge touching a removed node; the last rule
	/// covers cross-links that other branches had merged into the subtree,
	/// which would otherwise dangle. `name` itself stays visible with
	/// `expanded` cleared. Collapsing the root, a collapsed node or an
	/// unknown name is a no-op.
	pub fn collapse(&mut self, name: &str) {
		let Some(node) = self.get(name) else {
			return;
		};
		if !node.expanded || node.parent.is_none() {
			return;
		}

		let mut removed: HashSet<String> = HashSet::new();
		let mut worklist = vec![name.to_owned()];
		while let Some(current) = worklist.pop() {
			for child in self
				.nodes
				.iter()
				.filter(|n| n.parent.as_deref() == Some(current.as_str()))
			{
				if removed.insert(child.name.clone()) {
					worklist.push(child.name.clone());
				}
			}
		}

		self.nodes.retain(|n| !removed.contains(&n.name));
		self.edges.retain(|e| {
			e.source != name && !removed.contains(&e.source) && !removed.contains(&e.target)
		});
		self.rebuild_index();
		if let Some(&at) = self.index.get(name) {
			self.nodes[at].expanded = false;
		}
		debug!("collapse {name}: -{} nodes", removed.len());
	}

	fn clear(&mut self) {
		self.nodes.clear();
		self.edges.clear();
		self.index.clear();
	}

	fn insert_node(&mut self, node: EntityNode) {
		self.index.insert(node.name.clone(), self.nodes.len());
		self.nodes.push(node);
	}

	// Node removal is positional, so the name index is rebuilt afterwards.
	fn rebuild_index(&mut self) {
		self.index = self
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.name.clone(), i))
			.collect();
	}
}

#[cfg(test)]
mod tests {
	use super::super::adjacency::RelationRecord;
	use super::*;

	fn source(json: &str) -> AdjacencySource {
		serde_json::from_str(json).unwrap()
	}

	/// The two-hop dataset from the scenario: 甲 knows 乙, 乙 knows 丙.
	fn scenario_source() -> AdjacencySource {
		source(
			r#"{
				"甲": [{"name": "乙", "rel1": "朋友"}],
				"乙": [{"name": "丙", "rel1": "同事"}]
			}"#,
		)
	}

	fn names(graph: &VisibleGraph) -> Vec<&str> {
		graph.nodes.iter().map(|n| n.name.as_str()).collect()
	}

	/// Check every structural invariant the store promises.
	fn assert_consistent(graph: &VisibleGraph) {
		for (i, node) in graph.nodes.iter().enumerate() {
			assert_eq!(graph.index.get(&node.name), Some(&i), "index out of sync");
			assert_eq!(node.label, node.name);
			match &node.parent {
				None => assert_eq!(node.degree, 0, "non-root without parent"),
				Some(parent) => {
					let parent = graph.get(parent).expect("parent must stay visible");
					assert_eq!(node.degree, parent.degree + 1);
					assert!(parent.expanded, "collapsed node still owns a child");
				}
			}
		}
		for edge in &graph.edges {
			assert!(graph.get(&edge.source).is_some(), "dangling edge source");
			assert!(graph.get(&edge.target).is_some(), "dangling edge target");
		}
	}

	#[test]
	fn reset_seeds_root_and_neighbors() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();
		assert!(graph.retarget("甲", &src));

		assert_eq!(names(&graph), ["甲", "乙"]);
		let root = graph.get("甲").unwrap();
		assert_eq!((root.degree, root.expanded, root.has_more), (0, true, true));
		assert_eq!(root.parent, None);
		let child = graph.get("乙").unwrap();
		assert_eq!((child.degree, child.expanded, child.has_more), (1, false, true));
		assert_eq!(child.parent.as_deref(), Some("甲"));
		assert_eq!(
			graph.snapshot().edges,
			[RelationEdge { source: "甲".into(), target: "乙".into(), label: "朋友".into() }]
		);
		assert_consistent(&graph);
	}

	#[test]
	fn retarget_unknown_name_reports_empty_state() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);

		assert!(!graph.retarget("戊", &src));
		assert!(graph.is_empty());
		assert_eq!(graph.edge_count(), 0);
	}

	#[test]
	fn retarget_discards_previous_expansion_state() {
		let src = source(
			r#"{
				"甲": [{"name": "乙", "rel1": "朋友"}],
				"乙": [{"name": "丙", "rel1": "同事"}],
				"丁": [{"name": "戊", "rel1": "师徒"}]
			}"#,
		);
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);
		graph.expand("乙", &src);

		assert!(graph.retarget("丁", &src));
		assert_eq!(names(&graph), ["丁", "戊"]);
		assert!(graph.get("甲").is_none());
		assert_consistent(&graph);
	}

	#[test]
	fn retarget_to_the_current_root_keeps_expansion_state() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);
		graph.expand("乙", &src);
		let before = graph.snapshot();

		assert!(graph.retarget("甲", &src));
		assert_eq!(graph.snapshot(), before);
		assert!(graph.get("丙").is_some(), "expanded subtree survives");
		assert_consistent(&graph);
	}

	#[test]
	fn expand_merges_one_hop_neighbors() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);
		graph.expand("乙", &src);

		assert_eq!(names(&graph), ["甲", "乙", "丙"]);
		let grandchild = graph.get("丙").unwrap();
		assert_eq!(grandchild.degree, 2);
		assert_eq!(grandchild.parent.as_deref(), Some("乙"));
		assert!(!grandchild.has_more);
		assert!(graph.get("乙").unwrap().expanded);
		assert_eq!(graph.edge_count(), 2);
		assert_consistent(&graph);
	}

	#[test]
	fn expand_without_dataset_entry_just_flips_the_flag() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);
		graph.expand("乙", &src);

		// 丙 has no entry at all: zero neighbors, not an error.
		graph.expand("丙", &src);
		assert!(graph.get("丙").unwrap().expanded);
		assert_eq!(graph.node_count(), 3);
		assert_eq!(graph.edge_count(), 2);
	}

	#[test]
	fn expand_twice_is_idempotent() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);

		graph.expand("乙", &src);
		let once = graph.snapshot();
		graph.expand("乙", &src);
		assert_eq!(graph.snapshot(), once);
	}

	#[test]
	fn expand_unknown_name_is_a_noop() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);

		let before = graph.snapshot();
		graph.expand("丙", &src); // not visible yet
		assert_eq!(graph.snapshot(), before);
	}

	#[test]
	fn expand_then_collapse_round_trips_exactly() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);

		let before = graph.snapshot();
		graph.expand("乙", &src);
		graph.collapse("乙");
		assert_eq!(graph.snapshot(), before);
		assert_consistent(&graph);
	}

	#[test]
	fn scenario_walkthrough() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();

		assert!(graph.retarget("甲", &src));
		assert_eq!(names(&graph), ["甲", "乙"]);

		graph.expand("乙", &src);
		assert_eq!(names(&graph), ["甲", "乙", "丙"]);
		assert_eq!(
			graph.snapshot().edges,
			[
				RelationEdge { source: "甲".into(), target: "乙".into(), label: "朋友".into() },
				RelationEdge { source: "乙".into(), target: "丙".into(), label: "同事".into() },
			]
		);

		graph.collapse("乙");
		assert_eq!(names(&graph), ["甲", "乙"]);
		assert_eq!(graph.edge_count(), 1);
		assert!(!graph.get("乙").unwrap().expanded);
	}

	#[test]
	fn collapse_cascades_down_the_expansion_tree() {
		let src = source(
			r#"{
				"root": [{"name": "a", "rel1": "r"}],
				"a": [{"name": "b", "rel1": "r"}],
				"b": [{"name": "c", "rel1": "r"}],
				"c": [{"name": "d", "rel1": "r"}]
			}"#,
		);
		let mut graph = VisibleGraph::new();
		graph.retarget("root", &src);
		graph.expand("a", &src);
		graph.expand("b", &src);
		graph.expand("c", &src);
		assert_eq!(graph.node_count(), 5);

		graph.collapse("a");
		assert_eq!(names(&graph), ["root", "a"]);
		assert_eq!(graph.edge_count(), 1);
		assert!(!graph.get("a").unwrap().expanded);
		assert_consistent(&graph);
	}

	#[test]
	fn collapse_survives_deep_chains() {
		let chain: AdjacencySource = (0..500)
			.map(|i| {
				(
					format!("n{i}"),
					vec![RelationRecord { name: format!("n{}", i + 1), rel1: "next".into() }],
				)
			})
			.collect();
		let mut graph = VisibleGraph::new();
		graph.retarget("n0", &chain);
		for i in 1..500 {
			graph.expand(&format!("n{i}"), &chain);
		}
		assert_eq!(graph.node_count(), 501);

		graph.collapse("n1");
		assert_eq!(graph.node_count(), 2);
		assert_consistent(&graph);
	}

	#[test]
	fn collapse_without_children_just_flips_the_flag() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);
		graph.expand("乙", &src);
		graph.expand("丙", &src); // zero neighbors

		let nodes_before = graph.node_count();
		graph.collapse("丙");
		assert_eq!(graph.node_count(), nodes_before);
		assert!(!graph.get("丙").unwrap().expanded);
		assert_consistent(&graph);
	}

	#[test]
	fn collapse_root_is_a_noop() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);

		let before = graph.snapshot();
		graph.collapse("甲");
		assert_eq!(graph.snapshot(), before);
		assert!(graph.get("甲").unwrap().expanded);
	}

	#[test]
	fn collapse_collapsed_node_is_a_noop() {
		let src = scenario_source();
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);

		let before = graph.snapshot();
		graph.collapse("乙");
		assert_eq!(graph.snapshot(), before);
	}

	#[test]
	fn duplicate_neighbor_records_deduplicate_on_expand() {
		let src = source(
			r#"{
				"甲": [{"name": "乙", "rel1": "朋友"}],
				"乙": [
					{"name": "丙", "rel1": "同事"},
					{"name": "丙", "rel1": "同学"}
				]
			}"#,
		);
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);
		graph.expand("乙", &src);

		assert_eq!(names(&graph), ["甲", "乙", "丙"]);
		let links: Vec<_> = graph
			.snapshot()
			.edges
			.into_iter()
			.filter(|e| e.target == "丙")
			.collect();
		// First record wins; the second label never overwrites it.
		assert_eq!(
			links,
			[RelationEdge { source: "乙".into(), target: "丙".into(), label: "同事".into() }]
		);
	}

	#[test]
	fn duplicate_neighbor_records_deduplicate_on_reset() {
		let src = source(
			r#"{
				"甲": [
					{"name": "乙", "rel1": "朋友"},
					{"name": "乙", "rel1": "同事"}
				]
			}"#,
		);
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);

		assert_eq!(graph.node_count(), 2);
		assert_eq!(graph.edge_count(), 1);
		assert_eq!(graph.snapshot().edges[0].label, "朋友");
	}

	#[test]
	fn self_relations_are_skipped() {
		let src = source(
			r#"{
				"甲": [
					{"name": "甲", "rel1": "自己"},
					{"name": "乙", "rel1": "朋友"}
				]
			}"#,
		);
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);

		assert_eq!(names(&graph), ["甲", "乙"]);
		assert_eq!(graph.edge_count(), 1);
		assert_consistent(&graph);
	}

	#[test]
	fn cycle_back_into_an_ancestor_merges_instead_of_duplicating() {
		let src = source(
			r#"{
				"甲": [{"name": "乙", "rel1": "朋友"}],
				"乙": [{"name": "甲", "rel1": "朋友"}]
			}"#,
		);
		let mut graph = VisibleGraph::new();
		graph.retarget("甲", &src);
		graph.expand("乙", &src);

		// No duplicate 甲 node; the reverse edge coexists with the forward one.
		assert_eq!(graph.node_count(), 2);
		assert_eq!(graph.edge_count(), 2);
		assert_eq!(graph.get("甲").unwrap().parent, None);
		assert_consistent(&graph);

		graph.collapse("乙");
		assert_eq!(graph.node_count(), 2);
		assert_eq!(graph.edge_count(), 1);
		assert_consistent(&graph);
	}

	#[test]
	fn collapse_drops_cross_links_into_the_removed_subtree() {
		let src = source(
			r#"{
				"root": [
					{"name": "a", "rel1": "r"},
					{"name": "b", "rel1": "r"}
				],
				"a": [{"name": "c", "rel1": "r"}],
				"b": [{"name": "c", "rel1": "r"}]
			}"#,
		);
		let mut graph = VisibleGraph::new();
		graph.retarget("root", &src);
		graph.expand("a", &src); // introduces c under a
		graph.expand("b", &src); // merges a cross-link b -> c
		assert_eq!(graph.edge_count(), 4);

		graph.collapse("a");
		assert_eq!(names(&graph), ["root", "a", "b"]);
		// b -> c went with c even though b is still expanded.
		assert_eq!(graph.edge_count(), 2);
		assert_consistent(&graph);
	}
}
