use crate::ir::DeviceType;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Firewall pairs closer than this horizontally are joined top/bottom.
    pub ha_vertical_threshold: f32,
    /// Edges shorter than this cycle through all four sides.
    pub close_distance: f32,
    /// Spacing between parallel edges that share a device pair.
    pub parallel_edge_gap: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            ha_vertical_threshold: 50.0,
            close_distance: 250.0,
            parallel_edge_gap: 12.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeStyleConfig {
    pub normal_width: f32,
    pub ha_width: f32,
    pub ha_dasharray: String,
    pub stack_base_width: f32,
    pub stack_width_step: f32,
    pub stack_max_width: f32,
    pub stack_dasharray: String,
}

impl Default for EdgeStyleConfig {
    fn default() -> Self {
        Self {
            normal_width: 2.0,
            ha_width: 3.0,
            ha_dasharray: "6 4".to_string(),
            stack_base_width: 3.0,
            stack_width_step: 1.0,
            stack_max_width: 8.0,
            stack_dasharray: "12 4 2 4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Lane order by device type. Types not listed share one trailing lane.
    pub lane_order: Vec<DeviceType>,
    pub origin_x: f32,
    pub lane_spacing: f32,
    pub baseline_y: f32,
    pub node_spacing: f32,
    pub node_width: f32,
    pub node_height: f32,
    pub margin: f32,
    pub routing: RoutingConfig,
    pub edge: EdgeStyleConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            lane_order: DeviceType::default_priority(),
            origin_x: 100.0,
            lane_spacing: 300.0,
            baseline_y: 300.0,
            node_spacing: 150.0,
            node_width: 180.0,
            node_height: 80.0,
            margin: 40.0,
            routing: RoutingConfig::default(),
            edge: EdgeStyleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::light();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    ha_vertical_threshold: Option<f32>,
    close_distance: Option<f32>,
    parallel_edge_gap: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeStyleConfigFile {
    normal_width: Option<f32>,
    ha_width: Option<f32>,
    ha_dasharray: Option<String>,
    stack_base_width: Option<f32>,
    stack_width_step: Option<f32>,
    stack_max_width: Option<f32>,
    stack_dasharray: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    lane_order: Option<Vec<String>>,
    origin_x: Option<f32>,
    lane_spacing: Option<f32>,
    baseline_y: Option<f32>,
    node_spacing: Option<f32>,
    node_width: Option<f32>,
    node_height: Option<f32>,
    margin: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    background: Option<String>,
    line_color: Option<String>,
    ha_line_color: Option<String>,
    stack_line_color: Option<String>,
    edge_label_background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    routing: Option<RoutingConfigFile>,
    edges: Option<EdgeStyleConfigFile>,
    width: Option<f32>,
    height: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 config document and layers it over the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::from_name(theme_name) {
            Some(theme) => config.theme = theme,
            None => tracing::warn!(theme = theme_name, "unknown theme name, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.ha_line_color {
            config.theme.ha_line_color = v;
        }
        if let Some(v) = vars.stack_line_color {
            config.theme.stack_line_color = v;
        }
        if let Some(v) = vars.edge_label_background {
            config.theme.edge_label_background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(order) = layout.lane_order {
            config.layout.lane_order = order.iter().map(|tag| DeviceType::from_tag(tag)).collect();
        }
        if let Some(v) = layout.origin_x {
            config.layout.origin_x = v;
        }
        if let Some(v) = layout.lane_spacing {
            config.layout.lane_spacing = v;
        }
        if let Some(v) = layout.baseline_y {
            config.layout.baseline_y = v;
        }
        if let Some(v) = layout.node_spacing {
            config.layout.node_spacing = v;
        }
        if let Some(v) = layout.node_width {
            config.layout.node_width = v;
        }
        if let Some(v) = layout.node_height {
            config.layout.node_height = v;
        }
        if let Some(v) = layout.margin {
            config.layout.margin = v;
        }
    }

    if let Some(routing) = parsed.routing {
        if let Some(v) = routing.ha_vertical_threshold {
            config.layout.routing.ha_vertical_threshold = v;
        }
        if let Some(v) = routing.close_distance {
            config.layout.routing.close_distance = v;
        }
        if let Some(v) = routing.parallel_edge_gap {
            config.layout.routing.parallel_edge_gap = v;
        }
    }

    if let Some(edges) = parsed.edges {
        if let Some(v) = edges.normal_width {
            config.layout.edge.normal_width = v;
        }
        if let Some(v) = edges.ha_width {
            config.layout.edge.ha_width = v;
        }
        if let Some(v) = edges.ha_dasharray {
            config.layout.edge.ha_dasharray = v;
        }
        if let Some(v) = edges.stack_base_width {
            config.layout.edge.stack_base_width = v;
        }
        if let Some(v) = edges.stack_width_step {
            config.layout.edge.stack_width_step = v;
        }
        if let Some(v) = edges.stack_max_width {
            config.layout.edge.stack_max_width = v;
        }
        if let Some(v) = edges.stack_dasharray {
            config.layout.edge.stack_dasharray = v;
        }
    }

    if let Some(v) = parsed.width {
        config.render.width = v;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
    }

    config.render.background = config.theme.background.clone();

    Ok(config)
}
