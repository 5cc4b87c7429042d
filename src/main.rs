use sqlpeek::config;
use sqlpeek::core::db::connection::Database;
use sqlpeek::repl;
use tracing::info;

fn main() {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt::init();

    info!("Starting sqlpeek...");

    let config = match config::load_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    // Optional database path argument; a missing file is fatal at startup.
    let args: Vec<String> = std::env::args().collect();
    let database = match args.get(1) {
        Some(path) => match Database::open(path) {
            Ok(db) => Some(db),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    repl::run_repl(database, &config);
}
