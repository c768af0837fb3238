use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{ForceGraphState, NODE_RADIUS, NodeInfo, TOGGLE_RADIUS, toggle_center};

const ROOT_COLOR: &str = "#2f54eb";
const NODE_COLOR: &str = "#1890ff";
// Lighter with distance from the root, capped at three hops out.
const DEGREE_COLORS: &[&str] = &["#d6e4ff", "#adc6ff", "#85a5ff", "#597ef7"];

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, dash, gap, arrow_size) = (1.5 / k, 8.0 / k, 4.0 / k, 8.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.hover.highlight_t);

	let mut at = HashMap::new();
	state.graph.visit_nodes(|node| {
		at.insert(node.index(), (node.x() as f64, node.y() as f64));
	});

	for edge in &state.edges {
		let (Some(&(x1, y1)), Some(&(x2, y2))) = (at.get(&edge.source), at.get(&edge.target))
		else {
			continue;
		};
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let is_highlighted =
			state.is_highlighted(edge.source) && state.is_highlighted(edge.target);

		// Base values when no highlight active
		// When highlighting: highlighted edges brighten, others dim
		// t=0: all edges at base (0.6), t=1: highlighted at 0.9, others at 0.15
		let (edge_alpha, arrow_alpha, width) = if is_highlighted {
			(0.6 + 0.3 * t, 0.8 + 0.1 * t, line_width * (1.0 + 0.3 * t))
		} else {
			(0.6 - 0.45 * t, 0.8 - 0.45 * t, line_width * (1.0 - 0.3 * t))
		};

		let (ux, uy) = (dx / dist, dy / dist);
		let start = (x1 + ux * NODE_RADIUS, y1 + uy * NODE_RADIUS);
		let end = (
			x2 - ux * (NODE_RADIUS + arrow_size),
			y2 - uy * (NODE_RADIUS + arrow_size),
		);
		// Left-hand perpendicular; opposite-direction twins bow apart.
		let (mx, my) = ((start.0 + end.0) / 2.0, (start.1 + end.1) / 2.0);
		let control = (mx - uy * edge.curve, my + ux * edge.curve);

		ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {})", edge_alpha));
		ctx.set_line_width(width);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(dash_offset);
		ctx.begin_path();
		ctx.move_to(start.0, start.1);
		ctx.quadratic_curve_to(control.0, control.1, end.0, end.1);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());

		// Arrowhead follows the curve's end tangent.
		let (tdx, tdy) = (end.0 - control.0, end.1 - control.1);
		let tlen = (tdx * tdx + tdy * tdy).sqrt().max(0.001);
		let (ax, ay) = (tdx / tlen, tdy / tlen);
		let tip = (end.0 + ax * arrow_size, end.1 + ay * arrow_size);
		let back = end;
		let (px, py) = (-ay * arrow_size * 0.5, ax * arrow_size * 0.5);
		ctx.set_fill_style_str(&format!("rgba(100, 180, 255, {})", arrow_alpha));
		ctx.begin_path();
		ctx.move_to(tip.0, tip.1);
		ctx.line_to(back.0 + px, back.1 + py);
		ctx.line_to(back.0 - px, back.1 - py);
		ctx.close_path();
		ctx.fill();

		if !edge.label.is_empty() {
			// Quadratic midpoint, nudged off the path so dashes do not cross
			// the glyphs.
			let (bx, by) = (
				0.25 * start.0 + 0.5 * control.0 + 0.25 * end.0,
				0.25 * start.1 + 0.5 * control.1 + 0.25 * end.1,
			);
			let offset = 5.0 / k;
			ctx.set_fill_style_str(&format!("rgba(180, 210, 255, {})", edge_alpha + 0.1));
			ctx.set_font(&format!("{}px sans-serif", 9.0 / k.max(0.5)));
			ctx.set_text_align("center");
			let _ = ctx.fill_text(&edge.label, bx - uy * offset, by + ux * offset);
			ctx.set_text_align("start");
		}
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn node_color(info: &NodeInfo) -> &'static str {
	if info.degree == 0 { ROOT_COLOR } else { NODE_COLOR }
}

fn draw_captions(
	ctx: &CanvasRenderingContext2d,
	info: &NodeInfo,
	x: f64,
	y: f64,
	radius: f64,
	k: f64,
	alpha: f64,
) {
	ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha));
	ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
	let _ = ctx.fill_text(&info.label, x + radius + 3.0, y + 3.0);

	if info.degree > 0 {
		let shade = DEGREE_COLORS[(info.degree as usize - 1).min(DEGREE_COLORS.len() - 1)];
		ctx.set_fill_style_str(shade);
		ctx.set_global_alpha(alpha);
		ctx.set_font(&format!("{}px sans-serif", 8.0 / k.max(0.5)));
		let _ = ctx.fill_text(
			&format!("第{}度", info.degree),
			x + radius + 3.0,
			y + 3.0 + 11.0 / k.max(0.5),
		);
		ctx.set_global_alpha(1.0);
	}
}

fn draw_toggle(ctx: &CanvasRenderingContext2d, info: &NodeInfo, x: f64, y: f64, alpha: f64) {
	let (cx, cy) = toggle_center(x, y);
	ctx.set_global_alpha(alpha);
	ctx.begin_path();
	let _ = ctx.arc(cx, cy, TOGGLE_RADIUS, 0.0, 2.0 * PI);
	ctx.set_fill_style_str("#16213e");
	ctx.fill();
	ctx.set_stroke_style_str("rgba(100, 180, 255, 0.9)");
	ctx.set_line_width(1.2);
	ctx.stroke();

	let arm = TOGGLE_RADIUS - 3.5;
	ctx.begin_path();
	ctx.move_to(cx - arm, cy);
	ctx.line_to(cx + arm, cy);
	if !info.expanded {
		ctx.move_to(cx, cy - arm);
		ctx.line_to(cx, cy + arm);
	}
	ctx.set_stroke_style_str("rgba(255, 255, 255, 0.9)");
	ctx.stroke();
	ctx.set_global_alpha(1.0);
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.transform.k,
	);

	state.graph.visit_nodes(|node| {
		let idx = node.index();
		if has_highlight && state.is_highlighted(idx) {
			return;
		}
		let info = &node.data.user_data;
		let (x, y) = (node.x() as f64, node.y() as f64);
		let (alpha, radius) = (1.0 - 0.7 * t, NODE_RADIUS * (1.0 - 0.15 * t));

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node_color(info));
		ctx.fill();
		ctx.set_global_alpha(1.0);

		draw_captions(ctx, info, x, y, radius, k, alpha * 0.8);
		if info.can_toggle() {
			draw_toggle(ctx, info, x, y, alpha);
		}
	});

	if !has_highlight {
		return;
	}

	state.graph.visit_nodes(|node| {
		let idx = node.index();
		if !state.is_highlighted(idx) {
			return;
		}
		let info = &node.data.user_data;
		let (x, y) = (node.x() as f64, node.y() as f64);
		let is_hovered = state.is_hovered(idx);
		let is_neighbor =
			state.hover.neighbors.contains(&idx) || state.hover.prev_neighbors.contains(&idx);

		let (radius, glow_radius) = if is_hovered {
			(
				NODE_RADIUS * (1.0 + 0.35 * t),
				NODE_RADIUS * (1.8 + 1.2 * t),
			)
		} else if is_neighbor {
			(NODE_RADIUS * (1.0 + 0.2 * t), NODE_RADIUS * (1.4 + 0.6 * t))
		} else {
			(NODE_RADIUS, 0.0)
		};

		if glow_radius > 0.0 && t > 0.01 {
			let gradient = ctx
				.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius)
				.unwrap();
			let alpha = if is_hovered { 0.35 * t } else { 0.2 * t };
			gradient
				.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha))
				.unwrap();
			gradient
				.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", alpha * 0.3))
				.unwrap();
			gradient
				.add_color_stop(1.0, "rgba(255, 255, 255, 0)")
				.unwrap();
			ctx.begin_path();
			let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
			ctx.fill();
		}

		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node_color(info));
		ctx.fill();

		if is_hovered && t > 0.01 {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		draw_captions(ctx, info, x, y, radius, k, 1.0);
		if info.can_toggle() {
			draw_toggle(ctx, info, x, y, 1.0);
		}
	});
}
