use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::NavigateOptions;
use leptos_router::hooks::{use_navigate, use_query_map};
use log::{error, info};

use crate::components::SearchPanel;
use crate::components::force_graph::ForceGraphCanvas;
use crate::engine::{AdjacencySource, VisibleGraph};

/// Relation dataset consumed by the explorer.
const DATA_URL: &str = "https://gw.alipayobjects.com/os/antfincdn/d%24NIkFATzN/relation.json";

/// Relationship explorer page.
#[component]
pub fn Home() -> impl IntoView {
	let adjacency: RwSignal<Option<AdjacencySource>> = RwSignal::new(None);
	let load_error: RwSignal<Option<String>> = RwSignal::new(None);
	let search_name = RwSignal::new(String::new());
	let not_found = RwSignal::new(false);
	let graph = RwSignal::new(VisibleGraph::new());

	spawn_local(async move {
		match AdjacencySource::fetch(DATA_URL).await {
			Ok(source) => {
				info!("relation dataset loaded: {} people", source.len());
				adjacency.set(Some(source));
			}
			Err(err) => {
				error!("relation dataset failed to load: {err}");
				load_error.set(Some(err.to_string()));
			}
		}
	});

	let view_snapshot = Memo::new(move |_| graph.with(|g| g.snapshot()));

	let names = Memo::new(move |_| {
		adjacency.with(|maybe| {
			maybe
				.as_ref()
				.map(|source| {
					let mut all: Vec<String> = source.names().map(str::to_owned).collect();
					all.sort();
					all
				})
				.unwrap_or_default()
		})
	});

	// Address bar drives the search target, and vice versa; both directions
	// compare first so the two effects cannot ping-pong.
	let query = use_query_map();
	Effect::new(move |_| {
		if let Some(name) = query.with(|q| q.get("name")) {
			if !name.is_empty() && search_name.with_untracked(|current| *current != name) {
				search_name.set(name);
			}
		}
	});

	let navigate = use_navigate();
	Effect::new(move |_| {
		let name = search_name.get();
		if name.is_empty() {
			return;
		}
		let current = query.with_untracked(|q| q.get("name").unwrap_or_default());
		if current != name {
			navigate(
				&format!("/?name={}", js_sys::encode_uri_component(&name)),
				NavigateOptions {
					replace: true,
					..Default::default()
				},
			);
		}
	});

	// Reseeds the visible graph whenever the target changes, or once the
	// dataset arrives with a target already waiting.
	Effect::new(move |_| {
		let name = search_name.get();
		adjacency.with(|maybe| {
			let Some(source) = maybe else {
				return;
			};
			if name.is_empty() {
				return;
			}
			let known = source.contains(&name);
			graph.update(|g| {
				g.retarget(&name, source);
			});
			not_found.set(!known);
		});
	});

	// RwSignal::set notifies even when the value is unchanged; searching the
	// current target again must not reseed and drop the expanded subtrees.
	let on_search = move |name: String| {
		if search_name.with_untracked(|current| *current != name) {
			search_name.set(name);
		}
	};

	let on_toggle = move |name: String| {
		adjacency.with_untracked(|maybe| {
			let Some(source) = maybe else {
				return;
			};
			graph.update(|g| match g.get(&name).map(|node| node.expanded) {
				Some(true) => g.collapse(&name),
				Some(false) => g.expand(&name, source),
				None => {}
			});
		});
	};

	let status = Memo::new(move |_| {
		if let Some(err) = load_error.get() {
			return Some(format!("数据加载失败：{err}"));
		}
		if adjacency.with(|maybe| maybe.is_none()) {
			return Some("数据正在加载中…".to_owned());
		}
		if not_found.get() {
			return Some("未找到该人物，请换一个名字".to_owned());
		}
		if view_snapshot.with(|v| v.nodes.is_empty()) {
			return Some("请选择搜索对象".to_owned());
		}
		None
	});

	view! {
		<div class="fullscreen-graph">
			<ForceGraphCanvas view=view_snapshot on_toggle=on_toggle fullscreen=true />
			<div class="graph-overlay">
				<h1>"人物知识图谱分析"</h1>
				<SearchPanel names=names on_search=on_search />
				<p class="stats">
					"节点数量 " {move || view_snapshot.with(|v| v.nodes.len())}
					" · 边数量 " {move || view_snapshot.with(|v| v.edges.len())}
				</p>
				<p class="subtitle">
					"拖拽节点调整布局，滚轮缩放，点击节点角标展开或收起关系"
				</p>
			</div>
			<Show when=move || status.with(|s| s.is_some())>
				<div class="status-overlay">
					<p>{move || status.get().unwrap_or_default()}</p>
				</div>
			</Show>
		</div>
	}
}
