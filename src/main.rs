mod app;
mod audio;
mod catalog;
mod config;
mod error;
mod gesture;
mod logging;
mod mpris;
mod runtime;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
