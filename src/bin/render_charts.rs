#![cfg(not(tarpaulin_include))]

use ps_dashboard::config::load_config;
use ps_dashboard::filter::{FilterSpec, filter};
use ps_dashboard::graph::{ChartName, render_chart};
use ps_dashboard::loader::load_records;
use ps_dashboard::table::AggregateTable;
use std::path::{Path, PathBuf};

/// Render every chart for the initial selection into a directory.
///
/// Usage: `render_charts [OUT_DIR] [CONFIG]`, OUT_DIR defaults to `charts`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let out_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("charts"));
    let config_path = args.next().map(PathBuf::from);

    let config = load_config(config_path.as_deref())?;
    let store = load_records(&config.data.csv_path)?;
    let options = store.options().ok_or("no records loaded")?;
    let table = AggregateTable::aggregate(store.records());

    let spec = FilterSpec::initial(&options);
    let rows = filter(table.rows(), &spec);
    log::info!(
        "Rendering {} charts from {} of {} aggregate rows",
        ChartName::ALL.len(),
        rows.len(),
        table.len()
    );

    std::fs::create_dir_all(&out_dir)?;
    for name in ChartName::ALL {
        let png = render_chart(name, &rows, config.charts)?;
        let file_path = Path::new(&out_dir).join(format!("{}.png", name.slug()));
        std::fs::write(&file_path, png)?;
        println!("Created {} chart at {}", name.slug(), file_path.display());
    }

    Ok(())
}
