use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ir::DeviceType;

/// Neutral gray returned for anything the resolver does not recognise.
pub const FALLBACK_COLOR: &str = "#9CA3AF";

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("static regex"));

// Cable colors as typed into the documentation forms (English and German).
const CABLE_COLORS: &[(&str, &str)] = &[
    ("black", "#1F2937"),
    ("schwarz", "#1F2937"),
    ("white", "#F3F4F6"),
    ("weiss", "#F3F4F6"),
    ("weiß", "#F3F4F6"),
    ("gray", "#6B7280"),
    ("grey", "#6B7280"),
    ("grau", "#6B7280"),
    ("red", "#DC2626"),
    ("rot", "#DC2626"),
    ("orange", "#EA580C"),
    ("yellow", "#EAB308"),
    ("gelb", "#EAB308"),
    ("green", "#16A34A"),
    ("grün", "#16A34A"),
    ("gruen", "#16A34A"),
    ("blue", "#2563EB"),
    ("blau", "#2563EB"),
    ("light blue", "#38BDF8"),
    ("hellblau", "#38BDF8"),
    ("cyan", "#06B6D4"),
    ("türkis", "#14B8A6"),
    ("tuerkis", "#14B8A6"),
    ("turquoise", "#14B8A6"),
    ("purple", "#9333EA"),
    ("violet", "#7C3AED"),
    ("violett", "#7C3AED"),
    ("lila", "#9333EA"),
    ("pink", "#DB2777"),
    ("rosa", "#F472B6"),
    ("brown", "#92400E"),
    ("braun", "#92400E"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub mode: ThemeMode,
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub node_text_color: String,
    pub node_border_color: String,
    pub line_color: String,
    pub ha_line_color: String,
    pub stack_line_color: String,
    pub edge_label_background: String,
    pub edge_label_text_color: String,
    pub lane_label_color: String,
    pub port_free_color: String,
    pub port_occupied_color: String,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            mode: ThemeMode::Light,
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            background: "#FFFFFF".to_string(),
            node_text_color: "#FFFFFF".to_string(),
            node_border_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            ha_line_color: "#DC2626".to_string(),
            stack_line_color: "#7C3AED".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
            edge_label_text_color: "#1C2430".to_string(),
            lane_label_color: "#4B5563".to_string(),
            port_free_color: "#D1D5DB".to_string(),
            port_occupied_color: "#22C55E".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            background: "#111827".to_string(),
            node_text_color: "#F9FAFB".to_string(),
            node_border_color: "#E5E7EB".to_string(),
            line_color: "#94A3B8".to_string(),
            ha_line_color: "#F87171".to_string(),
            stack_line_color: "#A78BFA".to_string(),
            edge_label_background: "#1F2937".to_string(),
            edge_label_text_color: "#F9FAFB".to_string(),
            lane_label_color: "#D1D5DB".to_string(),
            port_free_color: "#4B5563".to_string(),
            port_occupied_color: "#4ADE80".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" | "default" => Some(Self::light()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

/// Fill color for a device box. Unknown tags get [`FALLBACK_COLOR`].
pub fn device_color(device_type: &DeviceType, theme: &Theme) -> &'static str {
    let dark = theme.mode == ThemeMode::Dark;
    match device_type {
        DeviceType::Router => pick(dark, "#2563EB", "#3B82F6"),
        DeviceType::Firewall => pick(dark, "#DC2626", "#EF4444"),
        DeviceType::Switch => pick(dark, "#16A34A", "#22C55E"),
        DeviceType::AccessPoint => pick(dark, "#0891B2", "#06B6D4"),
        DeviceType::Server => pick(dark, "#7C3AED", "#8B5CF6"),
        DeviceType::Nas => pick(dark, "#9333EA", "#A855F7"),
        DeviceType::Workstation => pick(dark, "#475569", "#64748B"),
        DeviceType::Printer => pick(dark, "#78716C", "#A8A29E"),
        DeviceType::Plc => pick(dark, "#EA580C", "#F97316"),
        DeviceType::Hmi => pick(dark, "#D97706", "#F59E0B"),
        DeviceType::Sensor => pick(dark, "#CA8A04", "#EAB308"),
        DeviceType::Actuator => pick(dark, "#B45309", "#D97706"),
        DeviceType::IndustrialGateway => pick(dark, "#0D9488", "#14B8A6"),
        DeviceType::Other | DeviceType::Unrecognized(_) => FALLBACK_COLOR,
    }
}

fn pick(dark: bool, light_value: &'static str, dark_value: &'static str) -> &'static str {
    if dark { dark_value } else { light_value }
}

/// Best-match hex color for a free-text cable color name.
///
/// Exact names win, then literal hex codes, then the longest known name
/// contained in the input ("dark blue" -> blue). Black is lifted to a visible
/// gray on dark backgrounds.
pub fn cable_color(name: &str, theme: &Theme) -> String {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return FALLBACK_COLOR.to_string();
    }

    let resolved = CABLE_COLORS
        .iter()
        .find(|(key, _)| *key == normalized)
        .map(|(_, hex)| (*hex).to_string())
        .or_else(|| hex_literal(&normalized))
        .or_else(|| {
            CABLE_COLORS
                .iter()
                .filter_map(|(key, hex)| normalized.find(key).map(|at| (key, hex, at)))
                // Longest name by characters, earliest in the input on a tie.
                .max_by_key(|(key, _, at)| (key.chars().count(), std::cmp::Reverse(*at)))
                .map(|(_, hex, _)| (*hex).to_string())
        });

    match resolved {
        Some(hex) if theme.mode == ThemeMode::Dark && hex == "#1F2937" => "#6B7280".to_string(),
        Some(hex) => hex,
        None => FALLBACK_COLOR.to_string(),
    }
}

fn hex_literal(input: &str) -> Option<String> {
    let caps = HEX_COLOR_RE.captures(input)?;
    let digits = caps.get(1)?.as_str();
    let expanded: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };
    Some(format!("#{}", expanded.to_ascii_uppercase()))
}
