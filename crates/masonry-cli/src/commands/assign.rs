use anyhow::{Context, bail};
use masonry_core::{Layout, MasonryConfig};
use masonry_layout::{Assignment, assign, resolve_columns};

use super::{format_layout, load_config};

pub fn run(config: Option<&str>, heights: &str, width: Option<f64>, format: &str) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let heights = parse_heights(heights)?;
    let assignment = compute(&config, &heights, width);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&assignment)?);
        }
        _ => {
            let layout = Layout {
                columns: assignment.columns,
                gap: config.layout.gap,
                smooth_transitions: config.layout.smooth_transitions,
                strategy: config.layout.strategy,
            };
            println!("{}", format_layout(&layout));
            println!(
                "strategy={} swaps={} variance={:.4}",
                config.layout.strategy.label(),
                assignment.stats.swaps,
                assignment.stats.variance
            );
        }
    }

    Ok(())
}

fn parse_heights(raw: &str) -> anyhow::Result<Vec<f64>> {
    let heights: Vec<f64> = serde_json::from_str(raw).context("heights must be a JSON array of numbers")?;
    if let Some(bad) = heights.iter().find(|h| !h.is_finite() || **h < 0.0) {
        bail!("heights must be non-negative, got {bad}");
    }
    Ok(heights)
}

fn compute(config: &MasonryConfig, heights: &[f64], width: Option<f64>) -> Assignment {
    let layout = &config.layout;
    let columns = match width {
        Some(width) => resolve_columns(width, layout.columns, &layout.breakpoints),
        None => layout.columns,
    };
    assign(layout.strategy, heights, columns, layout.balance_threshold)
}
