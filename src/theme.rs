use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterColor {
    pub border: String,
    pub tint: String,
}

impl ClusterColor {
    fn new(border: &str, tint: &str) -> Self {
        Self {
            border: border.to_string(),
            tint: tint.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub node_font_size: f32,
    pub cluster_font_size: f32,
    pub background: String,
    pub node_fill: String,
    pub node_border: String,
    pub text_color: String,
    pub edge_color: String,
    pub edge_label_color: String,
    pub empty_cluster_tint: String,
    pub cluster_palette: Vec<ClusterColor>,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "Inter, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 14.0,
            node_font_size: 16.0,
            cluster_font_size: 22.0,
            background: "#FFFFFF".to_string(),
            node_fill: "#FFFFFF".to_string(),
            node_border: "#D1D5DB".to_string(),
            text_color: "#111827".to_string(),
            edge_color: "#374151".to_string(),
            edge_label_color: "#1F2937".to_string(),
            empty_cluster_tint: "transparent".to_string(),
            cluster_palette: default_palette(),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: "#1E1E1E".to_string(),
            node_fill: "#2D2D2D".to_string(),
            node_border: "#555555".to_string(),
            text_color: "#F9FAFB".to_string(),
            edge_color: "#E5E7EB".to_string(),
            edge_label_color: "#F9FAFB".to_string(),
            ..Self::light()
        }
    }

    pub fn for_mode(dark_mode: bool) -> Self {
        if dark_mode { Self::dark() } else { Self::light() }
    }

    pub fn cluster_color(&self, index: usize) -> Option<&ClusterColor> {
        if self.cluster_palette.is_empty() {
            return None;
        }
        self.cluster_palette.get(index % self.cluster_palette.len())
    }
}

fn default_palette() -> Vec<ClusterColor> {
    vec![
        ClusterColor::new("#FF8C00", "rgba(255, 140, 0, 0.1)"),
        ClusterColor::new("#1E90FF", "rgba(30, 144, 255, 0.1)"),
        ClusterColor::new("#32CD32", "rgba(50, 205, 50, 0.1)"),
        ClusterColor::new("#BA55D3", "rgba(186, 85, 211, 0.1)"),
        ClusterColor::new("#FF69B4", "rgba(255, 105, 180, 0.1)"),
        ClusterColor::new("#DAA520", "rgba(218, 165, 32, 0.1)"),
    ]
}

/// 64-bit FNV-1a over the seed bytes followed by the id bytes.
fn fnv1a(seed: u64, id: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in seed.to_le_bytes().iter().chain(id.as_bytes()) {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Palette slot for a cluster. Never equal to the parent's slot when the palette
/// has more than one entry.
pub fn palette_index(
    cluster_id: &str,
    depth: usize,
    parent_index: Option<usize>,
    palette_len: usize,
    seed: u64,
) -> usize {
    if palette_len == 0 {
        return 0;
    }
    let base = (fnv1a(seed, cluster_id) % palette_len as u64) as usize;
    let mut index = (base + depth) % palette_len;
    if palette_len > 1 && parent_index == Some(index) {
        index = (index + 1) % palette_len;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_index_is_deterministic() {
        let a = palette_index("vpc", 1, None, 6, 0);
        let b = palette_index("vpc", 1, None, 6, 0);
        assert_eq!(a, b);
        assert!(a < 6);
    }

    #[test]
    fn palette_index_avoids_parent_slot() {
        for parent in 0..6 {
            let idx = palette_index("subnet", 2, Some(parent), 6, 7);
            assert_ne!(idx, parent);
        }
    }

    #[test]
    fn seed_changes_assignment_for_some_ids() {
        let ids = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let differs = ids
            .iter()
            .any(|id| palette_index(id, 0, None, 6, 1) != palette_index(id, 0, None, 6, 2));
        assert!(differs);
    }

    #[test]
    fn dark_theme_only_changes_colors() {
        let light = Theme::light();
        let dark = Theme::dark();
        assert_eq!(light.font_size, dark.font_size);
        assert_ne!(light.background, dark.background);
        assert_eq!(light.cluster_palette, dark.cluster_palette);
    }
}
