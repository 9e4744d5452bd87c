//! Utility to inspect the reference dataset and print the normalized rows.
//!
//! Usage: `inspect_dataset [DATA_DIR]`. Without an argument the directory
//! comes from the `DATA_DIR` setting.

use credito_pme_api::config::Config;
use credito_pme_api::dataset;
use std::path::PathBuf;

fn display<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string)
}

/// Main entry point for the dataset inspection utility.
///
/// Locates the dataset file, parses it and lists each company with its
/// canonical fields. Fails when no dataset file is found.
fn main() -> anyhow::Result<()> {
    let data_dir = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => Config::from_env()?.data_dir,
    };

    let (path, format) = dataset::locate(&data_dir)?;
    let table = dataset::load_file(&path, format)?;

    println!("File:   {}", path.display());
    println!("Format: {:?}", format);
    println!("Rows:   {}", table.len());
    println!();

    for row in table.rows() {
        println!("- {}", row.name);
        println!("  receita_anual:        {}", display(&row.annual_revenue));
        println!("  divida_total:         {}", display(&row.total_debt));
        println!("  prazo_pagamento_dias: {}", display(&row.payment_term_days));
        println!("  setor:                {}", display(&row.sector));
        println!("  rating:               {}", display(&row.rating));
        println!("  noticias_recentes:    {}", display(&row.recent_news));
    }

    Ok(())
}
