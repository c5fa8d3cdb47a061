use crate::config::{LayoutConfig, RenderConfig};
use crate::layout::{EdgeLayout, Layout, NodeLayout};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

const LABEL_PAD_X: f32 = 6.0;
const LABEL_PAD_Y: f32 = 4.0;
const LANE_HEADER_GAP: f32 = 28.0;
const MAX_LABEL_NUDGES: usize = 6;
const PORT_DOT_RADIUS: f32 = 3.0;
const PORT_DOT_GAP: f32 = 9.0;
/// Ports beyond this are summarised instead of drawn.
const MAX_PORT_DOTS: usize = 18;

/// Renders a layout to a standalone SVG document.
pub fn render_svg(layout: &Layout, theme: &Theme, config: &LayoutConfig) -> String {
    let (min_x, min_y) = origin(layout, config.margin);
    let width = (layout.width - min_x).max(200.0);
    let height = (layout.height - min_y).max(200.0);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"{min_x:.2} {min_y:.2} {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect x=\"{min_x:.2}\" y=\"{min_y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{}\"/>",
        theme.background
    ));

    if let Some(top) = layout.nodes.values().map(|n| n.y).reduce(f32::min) {
        for lane in &layout.lanes {
            let x = lane.x + config.node_width / 2.0;
            let y = top - LANE_HEADER_GAP;
            svg.push_str(&format!(
                "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">{}</text>",
                theme.font_family,
                theme.font_size,
                theme.lane_label_color,
                escape_xml(lane.key.label())
            ));
        }
    }

    for edge in &layout.edges {
        svg.push_str(&edge_svg(edge));
    }

    let label_positions = compute_edge_label_positions(&layout.edges, theme);
    for (edge, placed) in layout.edges.iter().zip(label_positions) {
        let Some((x, y, w, h)) = placed else {
            continue;
        };
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.8\"/>",
            x - w / 2.0,
            y - h / 2.0,
            theme.edge_label_background,
            edge.style.color
        ));
        svg.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            y + theme.font_size * 0.35,
            theme.font_family,
            theme.font_size * 0.85,
            theme.edge_label_text_color,
            escape_xml(&edge.label)
        ));
    }

    for node in layout.nodes.values() {
        svg.push_str(&node_svg(node, theme));
    }

    svg.push_str("</svg>");
    svg
}

/// Top-left corner of the view box, leaving `margin` around every node.
fn origin(layout: &Layout, margin: f32) -> (f32, f32) {
    let mut min_x = 0.0f32;
    let mut min_y = 0.0f32;
    for node in layout.nodes.values() {
        min_x = min_x.min(node.x - margin);
        min_y = min_y.min(node.y - LANE_HEADER_GAP - margin);
    }
    (min_x, min_y)
}

fn edge_svg(edge: &EdgeLayout) -> String {
    let d = points_to_path(&edge.points);
    let dash = edge
        .style
        .dasharray
        .as_deref()
        .map(|dash| format!(" stroke-dasharray=\"{dash}\""))
        .unwrap_or_default();
    format!(
        "<path d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.1}\"{dash} data-kind=\"{}\"/>",
        edge.style.color,
        edge.style.width,
        edge.kind.as_str()
    )
}

fn node_svg(node: &NodeLayout, theme: &Theme) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"8\" ry=\"8\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.2\"/>",
        node.x, node.y, node.width, node.height, node.color, theme.node_border_color
    ));
    let (cx, _) = node.center();
    out.push_str(&format!(
        "<text x=\"{cx:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">{}</text>",
        node.y + node.height * 0.38,
        theme.font_family,
        theme.font_size,
        theme.node_text_color,
        escape_xml(&node.name)
    ));
    out.push_str(&format!(
        "<text x=\"{cx:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        node.y + node.height * 0.62,
        theme.font_family,
        theme.font_size * 0.8,
        theme.node_text_color,
        escape_xml(node.device_type.tag())
    ));

    let shown = node.ports.len().min(MAX_PORT_DOTS);
    if shown > 0 {
        let row_width = (shown as f32 - 1.0) * PORT_DOT_GAP;
        let start_x = cx - row_width / 2.0;
        let y = node.y + node.height - PORT_DOT_RADIUS * 3.0;
        for (i, port) in node.ports.iter().take(shown).enumerate() {
            let fill = if port.occupied {
                &theme.port_occupied_color
            } else {
                &theme.port_free_color
            };
            out.push_str(&format!(
                "<circle cx=\"{:.2}\" cy=\"{y:.2}\" r=\"{PORT_DOT_RADIUS}\" fill=\"{fill}\"><title>port {}</title></circle>",
                start_x + i as f32 * PORT_DOT_GAP,
                port.index
            ));
        }
        if node.ports.len() > shown {
            let used = node.ports.iter().filter(|p| p.occupied).count();
            out.push_str(&format!(
                "<title>{used}/{} ports in use</title>",
                node.ports.len()
            ));
        }
    }
    out
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

/// Places each edge label at its midpoint, nudging it down until it stops
/// overlapping labels placed earlier. Returns `(center_x, center_y, w, h)`.
fn compute_edge_label_positions(
    edges: &[EdgeLayout],
    theme: &Theme,
) -> Vec<Option<(f32, f32, f32, f32)>> {
    let mut occupied: Vec<(f32, f32, f32, f32)> = Vec::new();
    let mut positions = Vec::with_capacity(edges.len());

    for edge in edges {
        if edge.label.is_empty() {
            positions.push(None);
            continue;
        }
        let w = edge.label.chars().count() as f32 * theme.font_size * 0.5 + LABEL_PAD_X * 2.0;
        let h = theme.font_size + LABEL_PAD_Y * 2.0;
        let (mid_x, mid_y) = edge_midpoint(edge);
        let mut offset = 0.0;
        let mut placed = None;

        for _ in 0..MAX_LABEL_NUDGES {
            let y = mid_y + offset;
            let rect = (mid_x - w / 2.0, y - h / 2.0, w, h);
            if !collides(&rect, &occupied) {
                occupied.push(rect);
                placed = Some((mid_x, y, w, h));
                break;
            }
            offset += h + 4.0;
        }

        // Out of nudges: keep the midpoint but still claim the space.
        let placed = placed.unwrap_or_else(|| {
            occupied.push((mid_x - w / 2.0, mid_y - h / 2.0, w, h));
            (mid_x, mid_y, w, h)
        });
        positions.push(Some(placed));
    }

    positions
}

fn edge_midpoint(edge: &EdgeLayout) -> (f32, f32) {
    match (edge.points.first(), edge.points.last()) {
        (Some(a), Some(b)) => ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0),
        _ => (0.0, 0.0),
    }
}

fn collides(rect: &(f32, f32, f32, f32), occupied: &[(f32, f32, f32, f32)]) -> bool {
    occupied.iter().any(|(x, y, w, h)| {
        rect.0 < x + w && rect.0 + rect.2 > *x && rect.1 < y + h && rect.1 + rect.3 > *y
    })
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    opt.fontdb_mut().load_system_fonts();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Connection, Device, DeviceType, Filters, PersistedPositions, Snapshot};
    use crate::layout::compute_layout;

    fn layout_for(snapshot: &Snapshot) -> Layout {
        compute_layout(
            snapshot,
            &Filters::default(),
            &PersistedPositions::new(),
            &Theme::light(),
            &LayoutConfig::default(),
        )
    }

    #[test]
    fn render_svg_basic() {
        let snapshot = Snapshot::new(
            vec![
                Device::new(1, "Core <A>", DeviceType::Switch, 4),
                Device::new(2, "Access", DeviceType::Switch, 4),
            ],
            vec![
                Connection::new(1, (1, 1), (2, 1)),
                Connection::new(2, (1, 2), (2, 2)),
            ],
        );
        let layout = layout_for(&snapshot);
        let svg = render_svg(&layout, &Theme::light(), &LayoutConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Core &lt;A&gt;"));
        assert!(svg.contains("[STACK 2x]"));
        assert!(svg.contains("data-kind=\"stack\""));
        assert!(svg.contains("stroke-dasharray"));
    }

    #[test]
    fn empty_layout_still_renders_a_document() {
        let layout = layout_for(&Snapshot::default());
        let svg = render_svg(&layout, &Theme::dark(), &LayoutConfig::default());
        assert!(svg.contains("<svg"));
        assert!(svg.contains(&Theme::dark().background));
    }

    #[test]
    fn overlapping_labels_are_nudged_apart() {
        let snapshot = Snapshot::new(
            vec![
                Device::new(1, "r1", DeviceType::Router, 4),
                Device::new(2, "srv", DeviceType::Server, 4),
            ],
            vec![
                Connection::new(1, (1, 1), (2, 1)),
                Connection::new(2, (1, 2), (2, 2)),
            ],
        );
        let layout = layout_for(&snapshot);
        let placed = compute_edge_label_positions(&layout.edges, &Theme::light());
        let a = placed[0].unwrap();
        let b = placed[1].unwrap();
        assert_ne!(a.1, b.1);
    }

    #[test]
    fn view_box_uses_configured_margin() {
        let snapshot = Snapshot::new(vec![Device::new(1, "r1", DeviceType::Router, 1)], Vec::new());
        let config = LayoutConfig {
            origin_x: 0.0,
            margin: 75.0,
            ..LayoutConfig::default()
        };
        let layout = compute_layout(
            &snapshot,
            &Filters::default(),
            &PersistedPositions::new(),
            &Theme::light(),
            &config,
        );
        let svg = render_svg(&layout, &Theme::light(), &config);
        assert!(svg.contains("viewBox=\"-75.00 "));
    }

    #[test]
    fn label_left_at_its_midpoint_still_blocks_later_labels() {
        let snapshot = Snapshot::new(
            vec![
                Device::new(1, "r1", DeviceType::Router, 1),
                Device::new(2, "srv", DeviceType::Server, 1),
            ],
            vec![Connection::new(1, (1, 1), (2, 1))],
        );
        let theme = Theme::light();
        let base = layout_for(&snapshot).edges.remove(0);
        let at = |x: f32, y: f32| {
            let mut edge = base.clone();
            edge.points = vec![(x, y), (x, y)];
            edge
        };
        let (_, _, w, h) = compute_edge_label_positions(&[at(0.0, 0.0)], &theme)[0].unwrap();
        let step = h + 4.0;

        // Every nudge slot of a label centred at the origin is half covered.
        let mut edges: Vec<EdgeLayout> = (0..MAX_LABEL_NUDGES)
            .map(|i| at(w * 0.5, i as f32 * step))
            .collect();
        edges.push(at(0.0, 0.0));
        // Overlaps only the label that ran out of nudges.
        edges.push(at(-w * 0.75, 0.0));

        let placed = compute_edge_label_positions(&edges, &theme);
        let stuck = placed[MAX_LABEL_NUDGES].unwrap();
        assert_eq!((stuck.0, stuck.1), (0.0, 0.0));
        let last = placed[MAX_LABEL_NUDGES + 1].unwrap();
        assert_eq!(last.1, step);
    }
}
