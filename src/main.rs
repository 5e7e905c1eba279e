//! Robsidian - Obsidian-like markdown note application
//!
//! Notes live in a vault; Quarto projects inside it can be previewed,
//! rendered and scaffolded through the external `quarto` tool.

mod app;
mod commands;
mod core;
mod quarto;
mod ui;
mod workbench;

use anyhow::Context;
use app::RobsidianApp;
use eframe::egui;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    tracing::info!("Starting Robsidian...");

    // Subprocess I/O runs here; the UI thread only spawns onto it
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("robsidian-io")
        .build()
        .context("Failed to start async runtime")?;
    let handle = runtime.handle().clone();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Robsidian"),
        ..Default::default()
    };

    eframe::run_native(
        "Robsidian",
        native_options,
        Box::new(move |cc| Ok(Box::new(RobsidianApp::new(cc, handle)))),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {}", e))?;

    // Dropping the runtime reaps any preview servers still attached to it
    drop(runtime);
    Ok(())
}
