use clap::Parser;
use log::warn;
use snafu::ErrorCompat;

mod args;
mod dashboard;

use crate::args::Args;
use crate::dashboard::source::SheetCache;

pub fn main() {
    let args = Args::parse();
    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let mut cache = SheetCache::new();
    match dashboard::run_dashboard(&args, &mut cache) {
        Ok(()) => {}
        Err(e) => {
            warn!("Error occured: {:?}", e);
            eprintln!("An error occured: {}", e);
            if let Some(bt) = ErrorCompat::backtrace(&e) {
                eprintln!("trace:\n{}", bt);
            }
            std::process::exit(1);
        }
    }
}
