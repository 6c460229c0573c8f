//! Print a week from the local cache only, without contacting any remote service.
//!
//! Usage: `week-from-cache [YYYY-MM-DD]` (defaults to the current week)

use chrono::{NaiveDate, Utc};

use week_fridge::cache::Cache;
use week_fridge::config::{default_cache_path, default_config_path, Settings};
use week_fridge::time::local_datetime;

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::load_or_default(&default_config_path()?)?;
    settings.normalize();
    let view = settings.view()?;

    let anchor = match std::env::args().nth(1) {
        None => Utc::now(),
        Some(arg) => {
            let date = NaiveDate::parse_from_str(&arg, "%Y-%m-%d")?;
            local_datetime(date, chrono::NaiveTime::MIN, &view.tz).with_timezone(&Utc)
        },
    };

    let cache = Cache::from_file(&default_cache_path()?)?;
    match cache.build_week(&view, anchor) {
        Some(week) => week_fridge::utils::print_week(&week),
        None => println!("Nothing has been synced yet."),
    }
    Ok(())
}
