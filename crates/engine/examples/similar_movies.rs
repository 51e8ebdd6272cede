//! Example: "more like this" and personalized picks from a MovieLens dump
//!
//! Reads `u.data` and `u.item` from the directory given as the first
//! argument (default `data/`) and prints recommendations.
//!
//! Run with:
//! ```bash
//! cargo run --example similar_movies -- data/ "star wars" 196
//! ```

use anyhow::{Context, Result};
use cinematch_core::{init_logging, LogConfig, LogFormat};
use cinematch_engine::{CinematchEngine, DatasetConfig, EngineConfig};
use std::path::PathBuf;

fn main() -> Result<()> {
    init_logging(&LogConfig {
        format: LogFormat::Pretty,
        ..Default::default()
    })?;

    let mut args = std::env::args().skip(1);
    let dir = PathBuf::from(args.next().unwrap_or_else(|| "data".to_string()));
    let query = args.next().unwrap_or_else(|| "toy story".to_string());
    let user_id: i64 = args.next().as_deref().unwrap_or("1").parse()?;

    let config = EngineConfig {
        dataset: DatasetConfig {
            ratings_path: dir.join("u.data"),
            items_path: dir.join("u.item"),
        },
        ..Default::default()
    };
    let engine = CinematchEngine::new(config);
    engine.bootstrap().context("Failed to bootstrap from dataset")?;

    println!("\n=== More like \"{}\" ===", query);
    match engine.find_item_by_name(&query)? {
        Some(item_id) => {
            for rec in engine.similar_items(&item_id, 10)? {
                println!("{:>6.3}  {}", rec.score, engine.display_title(&rec.item_id)?);
            }
        }
        None => println!("No movie matches \"{}\"", query),
    }

    println!("\n=== Picks for user {} ===", user_id);
    for rec in engine.recommend_for_user(user_id, 50, 10)? {
        println!("{:>6.3}  {}", rec.score, engine.display_title(&rec.item_id)?);
    }

    println!("\n=== Top comedies ===");
    for rec in engine.top_by_genre("Comedy", 5)? {
        println!("{:>6.3}  {}", rec.score, engine.display_title(&rec.item_id)?);
    }

    Ok(())
}
