use leptos::prelude::*;

/// 404 Not Found Page
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<div class="not-found">
			<h1>"404"</h1>
			<p>"页面不存在"</p>
			<a href="/">"返回图谱"</a>
		</div>
	}
}
