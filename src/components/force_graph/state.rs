use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use crate::engine::GraphView;

pub const NODE_RADIUS: f64 = 5.0;
pub const HIT_RADIUS: f64 = 12.0;
pub const TOGGLE_RADIUS: f64 = 7.0;
pub const EDGE_CURVE: f64 = 20.0;

/// World-space center of a node's expand/collapse badge (upper right).
pub fn toggle_center(x: f64, y: f64) -> (f64, f64) {
	(x + NODE_RADIUS + 7.0, y - NODE_RADIUS - 7.0)
}

#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub name: String,
	pub label: String,
	pub degree: u32,
	pub expanded: bool,
	pub has_more: bool,
}

impl NodeInfo {
	// The root is collapse-proof, so it never gets a badge.
	pub fn can_toggle(&self) -> bool {
		self.has_more && self.degree > 0
	}
}

/// A directed snapshot edge resolved to simulation indices. The physics
/// graph is undirected and folds reciprocal edges into one, so everything
/// that gets drawn per direction lives here instead of in edge user data.
#[derive(Clone, Debug)]
pub struct RenderEdge {
	pub source: DefaultNodeIdx,
	pub target: DefaultNodeIdx,
	pub label: String,
	pub curve: f64,
}

/// What a pointer position lands on, checked badge first.
#[derive(Clone, Debug, PartialEq)]
pub enum HitTarget {
	Toggle(String),
	Node(DefaultNodeIdx),
	Background,
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<DefaultNodeIdx>,
	pub neighbors: HashSet<DefaultNodeIdx>,
	pub highlight_t: f64,
	pub prev_node: Option<DefaultNodeIdx>,
	pub prev_neighbors: HashSet<DefaultNodeIdx>,
	delay_t: f64,
}

pub struct ForceGraphState {
	pub graph: ForceGraph<NodeInfo>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	pub flow_time: f64,
	pub edges: Vec<RenderEdge>,
}

fn simulation_parameters() -> SimulationParameters {
	SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	}
}

impl ForceGraphState {
	pub fn new(view: &GraphView, width: f64, height: f64) -> Self {
		let mut state = Self {
			graph: ForceGraph::new(simulation_parameters()),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			animation_running: true,
			flow_time: 0.0,
			edges: Vec::new(),
		};
		state.apply(view);
		state
	}

	/// Rebuild the simulation from a fresh snapshot, keeping the positions
	/// and pins of nodes that survived so expand/collapse never rearranges
	/// the rest of the layout. New nodes are seeded beside the node that
	/// revealed them; the root is always pinned.
	pub fn apply(&mut self, view: &GraphView) {
		let mut prior: HashMap<String, (f32, f32, bool)> = HashMap::new();
		self.graph.visit_nodes(|node| {
			prior.insert(
				node.data.user_data.name.clone(),
				(node.x(), node.y(), node.data.is_anchor),
			);
		});

		let mut graph = ForceGraph::new(simulation_parameters());
		let mut name_to_idx = HashMap::new();
		let mut placed: HashMap<&str, (f32, f32)> = HashMap::new();
		let mut edges = Vec::new();

		for (i, node) in view.nodes.iter().enumerate() {
			let angle = (i as f64) * 2.0 * PI / view.nodes.len() as f64;
			let (x, y, pinned) = if let Some(&at) = prior.get(&node.name) {
				at
			} else if node.parent.is_none() {
				(0.0, 0.0, false)
			} else if let Some(&(px, py)) =
				node.parent.as_deref().and_then(|p| placed.get(p))
			{
				(
					px + (60.0 * angle.cos()) as f32,
					py + (60.0 * angle.sin()) as f32,
					false,
				)
			} else {
				(
					(150.0 * angle.cos()) as f32,
					(150.0 * angle.sin()) as f32,
					false,
				)
			};

			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor: node.degree == 0 || pinned,
				user_data: NodeInfo {
					name: node.name.clone(),
					label: node.label.clone(),
					degree: node.degree,
					expanded: node.expanded,
					has_more: node.has_more,
				},
			});
			placed.insert(node.name.as_str(), (x, y));
			name_to_idx.insert(node.name.as_str(), idx);
		}

		// A pair linked in both directions gets bowed so neither edge hides
		// the other; each edge bends toward its own left-hand side.
		let mut pair_count: HashMap<(&str, &str), u32> = HashMap::new();
		for edge in &view.edges {
			let pair = unordered(edge.source.as_str(), edge.target.as_str());
			*pair_count.entry(pair).or_insert(0) += 1;
		}

		// The simulation graph is undirected and would fold a reciprocal
		// pair into one edge, so it only gets a structural spring per pair;
		// the labeled directed edges are kept aside for drawing.
		let mut springs: HashSet<(DefaultNodeIdx, DefaultNodeIdx)> = HashSet::new();
		for edge in &view.edges {
			if let (Some(&src), Some(&tgt)) = (
				name_to_idx.get(edge.source.as_str()),
				name_to_idx.get(edge.target.as_str()),
			) {
				let spring = if src <= tgt { (src, tgt) } else { (tgt, src) };
				if springs.insert(spring) {
					graph.add_edge(src, tgt, EdgeData::default());
				}
				let parallel =
					pair_count[&unordered(edge.source.as_str(), edge.target.as_str())] > 1;
				edges.push(RenderEdge {
					source: src,
					target: tgt,
					label: edge.label.clone(),
					curve: if parallel { EDGE_CURVE } else { 0.0 },
				});
			}
		}

		// A snapshot sharing no nodes with the old one is a retarget, not an
		// expand step; bring the camera back to the root.
		if view.nodes.iter().all(|n| !prior.contains_key(&n.name)) {
			self.transform = ViewTransform {
				x: self.width / 2.0,
				y: self.height / 2.0,
				k: 1.0,
			};
			self.pan = PanState::default();
		}

		self.graph = graph;
		self.edges = edges;
		// Simulation indices were reassigned wholesale.
		self.drag = DragState::default();
		self.hover = HoverState::default();
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn hit_test(&self, sx: f64, sy: f64) -> HitTarget {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut toggle = None;
		let mut body = None;
		self.graph.visit_nodes(|node| {
			let (x, y) = (node.x() as f64, node.y() as f64);
			if node.data.user_data.can_toggle() {
				let (cx, cy) = toggle_center(x, y);
				let (dx, dy) = (cx - gx, cy - gy);
				if (dx * dx + dy * dy).sqrt() < TOGGLE_RADIUS + 2.0 {
					toggle = Some(node.data.user_data.name.clone());
				}
			}
			let (dx, dy) = (x - gx, y - gy);
			// HIT_RADIUS is in world-space, scales with zoom like nodes
			if (dx * dx + dy * dy).sqrt() < HIT_RADIUS {
				body = Some(node.index());
			}
		});
		match (toggle, body) {
			(Some(name), _) => HitTarget::Toggle(name),
			(None, Some(idx)) => HitTarget::Node(idx),
			(None, None) => HitTarget::Background,
		}
	}

	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Save previous state for fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for edge in &self.edges {
				if edge.source == idx {
					self.hover.neighbors.insert(edge.target);
				} else if edge.target == idx {
					self.hover.neighbors.insert(edge.source);
				}
			}
		}
	}

	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f32) {
		self.graph.update(dt);
		self.flow_time += dt as f64;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt as f64).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

fn unordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
	if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::{EntityNode, RelationEdge};

	fn view(nodes: &[(&str, u32, Option<&str>)], edges: &[(&str, &str)]) -> GraphView {
		GraphView {
			nodes: nodes
				.iter()
				.map(|&(name, degree, parent)| EntityNode {
					name: name.to_string(),
					label: name.to_string(),
					degree,
					expanded: false,
					has_more: true,
					parent: parent.map(str::to_string),
				})
				.collect(),
			edges: edges
				.iter()
				.map(|&(source, target)| RelationEdge {
					source: source.to_string(),
					target: target.to_string(),
					label: format!("{source}-{target}"),
				})
				.collect(),
		}
	}

	fn find(state: &ForceGraphState, name: &str) -> Option<(DefaultNodeIdx, f32, f32)> {
		let mut found = None;
		state.graph.visit_nodes(|node| {
			if node.data.user_data.name == name {
				found = Some((node.index(), node.x(), node.y()));
			}
		});
		found
	}

	#[test]
	fn apply_keeps_surviving_positions_and_seeds_new_nodes_beside_their_parent() {
		let mut state = ForceGraphState::new(
			&view(&[("甲", 0, None), ("乙", 1, Some("甲"))], &[("甲", "乙")]),
			800.0,
			600.0,
		);
		for _ in 0..30 {
			state.tick(0.016);
		}
		let (_, bx, by) = find(&state, "乙").unwrap();

		state.apply(&view(
			&[("甲", 0, None), ("乙", 1, Some("甲")), ("丙", 2, Some("乙"))],
			&[("甲", "乙"), ("乙", "丙")],
		));

		assert_eq!(find(&state, "甲").map(|(_, x, y)| (x, y)), Some((0.0, 0.0)));
		let (_, bx2, by2) = find(&state, "乙").unwrap();
		assert_eq!((bx, by), (bx2, by2));
		let (_, cx, cy) = find(&state, "丙").unwrap();
		let dist = f64::from(cx - bx2).hypot(f64::from(cy - by2));
		assert!((dist - 60.0).abs() < 1.0, "seeded {dist} away from its parent");
	}

	#[test]
	fn apply_drops_removed_nodes_and_their_edges() {
		let mut state = ForceGraphState::new(
			&view(
				&[("甲", 0, None), ("乙", 1, Some("甲")), ("丙", 2, Some("乙"))],
				&[("甲", "乙"), ("乙", "丙")],
			),
			800.0,
			600.0,
		);

		state.apply(&view(
			&[("甲", 0, None), ("乙", 1, Some("甲"))],
			&[("甲", "乙")],
		));

		assert!(find(&state, "丙").is_none());
		assert_eq!(state.edges.len(), 1);
	}

	#[test]
	fn apply_carries_drag_pins_forward() {
		let snapshot = view(&[("甲", 0, None), ("乙", 1, Some("甲"))], &[("甲", "乙")]);
		let mut state = ForceGraphState::new(&snapshot, 800.0, 600.0);
		let (idx, ..) = find(&state, "乙").unwrap();
		state.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.is_anchor = true;
			}
		});

		state.apply(&snapshot);

		let mut pinned = false;
		state.graph.visit_nodes(|node| {
			if node.data.user_data.name == "乙" {
				pinned = node.data.is_anchor;
			}
		});
		assert!(pinned);
	}

	#[test]
	fn apply_recenters_the_camera_only_for_a_fresh_graph() {
		let mut state =
			ForceGraphState::new(&view(&[("甲", 0, None)], &[]), 800.0, 600.0);

		state.transform = ViewTransform { x: -250.0, y: 40.0, k: 2.5 };
		state.apply(&view(&[("丁", 0, None)], &[]));
		assert_eq!(state.transform.x, 400.0);
		assert_eq!(state.transform.y, 300.0);
		assert_eq!(state.transform.k, 1.0);

		state.transform = ViewTransform { x: -250.0, y: 40.0, k: 2.5 };
		state.apply(&view(
			&[("丁", 0, None), ("戊", 1, Some("丁"))],
			&[("丁", "戊")],
		));
		assert_eq!(state.transform.x, -250.0);
	}

	#[test]
	fn hit_test_separates_badge_node_and_background() {
		let state = ForceGraphState::new(
			&view(&[("甲", 0, None), ("乙", 1, Some("甲"))], &[("甲", "乙")]),
			800.0,
			600.0,
		);
		let (root_idx, ..) = find(&state, "甲").unwrap();
		let (b_idx, bx, by) = find(&state, "乙").unwrap();
		let (tx, ty) = toggle_center(f64::from(bx), f64::from(by));

		// transform is (width/2, height/2) at k=1, so screen = world + center
		assert_eq!(
			state.hit_test(400.0 + tx, 300.0 + ty),
			HitTarget::Toggle("乙".to_string())
		);
		assert_eq!(
			state.hit_test(400.0 + f64::from(bx), 300.0 + f64::from(by)),
			HitTarget::Node(b_idx)
		);
		// the root has no badge, a click that close lands on the body
		assert_eq!(state.hit_test(400.0, 300.0), HitTarget::Node(root_idx));
		assert_eq!(state.hit_test(700.0, 100.0), HitTarget::Background);
	}

	#[test]
	fn parallel_opposite_edges_are_flagged_for_curving() {
		let state = ForceGraphState::new(
			&view(
				&[("甲", 0, None), ("乙", 1, Some("甲")), ("丙", 1, Some("甲"))],
				&[("甲", "乙"), ("乙", "甲"), ("甲", "丙")],
			),
			800.0,
			600.0,
		);

		let curves: HashMap<String, f64> = state
			.edges
			.iter()
			.map(|edge| (edge.label.clone(), edge.curve))
			.collect();
		assert_eq!(curves["甲-乙"], EDGE_CURVE);
		assert_eq!(curves["乙-甲"], EDGE_CURVE);
		assert_eq!(curves["甲-丙"], 0.0);
	}

	#[test]
	fn reciprocal_relations_survive_with_their_own_labels() {
		let mut snapshot = view(&[("甲", 0, None), ("乙", 1, Some("甲"))], &[]);
		snapshot.edges = vec![
			RelationEdge {
				source: "甲".to_string(),
				target: "乙".to_string(),
				label: "朋友".to_string(),
			},
			RelationEdge {
				source: "乙".to_string(),
				target: "甲".to_string(),
				label: "同事".to_string(),
			},
		];
		let state = ForceGraphState::new(&snapshot, 800.0, 600.0);

		let (a_idx, ..) = find(&state, "甲").unwrap();
		let (b_idx, ..) = find(&state, "乙").unwrap();
		let drawn: Vec<_> = state
			.edges
			.iter()
			.map(|edge| (edge.source, edge.target, edge.label.as_str()))
			.collect();
		assert_eq!(drawn, [(a_idx, b_idx, "朋友"), (b_idx, a_idx, "同事")]);

		// the undirected simulation carries one spring for the pair
		let mut springs = 0;
		state.graph.visit_edges(|_, _, _| springs += 1);
		assert_eq!(springs, 1);
	}
}
