use masonry_layout::resolve_columns;

use super::load_config;

pub fn run(config: Option<&str>, width: f64) -> anyhow::Result<()> {
    let config = load_config(config)?;
    println!("{}", columns_for(&config.layout, width));
    Ok(())
}

fn columns_for(layout: &masonry_core::LayoutConfig, width: f64) -> usize {
    resolve_columns(width, layout.columns, &layout.breakpoints)
}
