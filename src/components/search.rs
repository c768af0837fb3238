use leptos::prelude::*;

/// How many suggestions the dropdown shows at most.
const SUGGESTION_LIMIT: usize = 4;

/// Search box with live name suggestions and a random-pick shortcut.
#[component]
pub fn SearchPanel(
	/// Every name the dataset can be searched for.
	#[prop(into)] names: Signal<Vec<String>>,
	/// Fired with the chosen name on submit, suggestion click or random pick.
	#[prop(into)] on_search: Callback<String>,
) -> impl IntoView {
	let input = RwSignal::new(String::new());
	let show_suggestions = RwSignal::new(false);

	let suggestions = Memo::new(move |_| {
		let needle = input.get();
		names.with(|all| matching_names(all, &needle))
	});

	let submit = move |name: String| {
		if name.is_empty() {
			return;
		}
		input.set(name.clone());
		show_suggestions.set(false);
		on_search.run(name);
	};

	let pick_random = move |_| {
		let pick = names.with_untracked(|all| {
			if all.is_empty() {
				None
			} else {
				let at = (js_sys::Math::random() * all.len() as f64) as usize;
				all.get(at.min(all.len() - 1)).cloned()
			}
		});
		if let Some(name) = pick {
			submit(name);
		}
	};

	view! {
		<div class="search-panel">
			<div class="search-row">
				<input
					type="text"
					placeholder="输入人名关键字查询"
					prop:value=input
					on:input=move |ev| {
						input.set(event_target_value(&ev));
						show_suggestions.set(true);
					}
					on:keydown=move |ev| {
						if ev.key() == "Enter" {
							submit(input.get_untracked());
						}
					}
					// Suggestion picks fire on mousedown, before this blur.
					on:blur=move |_| show_suggestions.set(false)
				/>
				<button on:click=move |_| submit(input.get_untracked())>"搜索"</button>
				<button on:click=pick_random>"随机一下"</button>
			</div>
			<Show when=move || {
				show_suggestions.get() && !suggestions.with(|s| s.is_empty())
			}>
				<ul class="suggestions">
					{move || {
						suggestions
							.get()
							.into_iter()
							.map(|name| {
								let pick = name.clone();
								view! {
									<li on:mousedown=move |_| submit(pick.clone())>{name}</li>
								}
							})
							.collect_view()
					}}
				</ul>
			</Show>
		</div>
	}
}

/// Names containing the keyword, capped at [`SUGGESTION_LIMIT`]. An empty
/// keyword matches nothing so the dropdown stays closed until typing starts.
fn matching_names(all: &[String], needle: &str) -> Vec<String> {
	if needle.is_empty() {
		return Vec::new();
	}
	all.iter()
		.filter(|name| name.contains(needle))
		.take(SUGGESTION_LIMIT)
		.cloned()
		.collect()
}
