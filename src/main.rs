use std::process::ExitCode;

use eframe::egui;
use lgtmify::{app::LgtmApp, cli, log_err, logger};

fn main() -> ExitCode {
    // -- CLI / headless mode -------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        return cli::run(args);
    }

    // -- GUI mode ------------------------------------------------------

    // Session log (overwrites the previous session's log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 768.0])
            .with_title("lgtmify")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    match eframe::run_native(
        "lgtmify",
        options,
        Box::new(|cc| Box::new(LgtmApp::new(cc))),
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_err!("failed to start GUI: {}", e);
            eprintln!("error: failed to start GUI: {}", e);
            ExitCode::FAILURE
        }
    }
}
