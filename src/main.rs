#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use eframe::egui;
use image_renamer::app::ImageRenamer;
use image_renamer::config::Config;
use image_renamer::session::Session;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let session = match Session::open(&config) {
        Ok(session) => session,
        Err(e) => {
            log::error!("{e}");
            let _ = rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Error)
                .set_title("Image Renamer")
                .set_description(e.to_string())
                .show();
            return Ok(());
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_maximized(true)
            .with_decorations(false),
        ..Default::default()
    };
    eframe::run_native(
        "Image Renamer",
        options,
        Box::new(|cc| Ok(Box::new(ImageRenamer::new(cc, session)))),
    )
}
