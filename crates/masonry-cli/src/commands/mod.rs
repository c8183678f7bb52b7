pub mod assign;
pub mod resolve;
pub mod simulate;

use std::path::Path;

use masonry_core::{Layout, MasonryConfig};

/// Load `masonry.toml`, or the defaults when no path is given.
pub fn load_config(path: Option<&str>) -> anyhow::Result<MasonryConfig> {
    match path {
        Some(path) => Ok(MasonryConfig::from_file(Path::new(path))?),
        None => Ok(MasonryConfig::default()),
    }
}

/// One line per column: `col 0 (350.0): 0, 5, 4`.
pub fn format_layout(layout: &Layout) -> String {
    layout
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let items: Vec<String> = col.items.iter().map(|it| it.to_string()).collect();
            format!("col {i} ({:.1}): {}", col.aggregate_height, items.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
