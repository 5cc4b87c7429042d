use crate::config::Config;
use crate::core::db::catalog::{self, Catalog};
use crate::core::db::connection::Database;
use crate::core::db::query::run_query;
use crate::core::{Result, SqlpeekError};
use crate::results_grid::{ResultsGrid, RowLabels};
use std::io::{self, Write};
use std::time::Duration;
use tracing::info;

/// Represents a parsed REPL command.
#[derive(Debug, PartialEq)]
pub enum Command {
    Open(String),
    Tables,
    Browse(String),
    Reload,
    Export(String),
    Help,
    Quit,
    Sql(String),
    Unknown(String),
}

/// Parses a user input string into a corresponding `Command`.
///
/// If the input starts with a colon (`:`), it is interpreted as a command.
/// Otherwise, it is treated as a SQL query.
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if !input.starts_with(':') {
        return Command::Sql(input.to_string());
    }
    let trimmed = &input[1..];
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.is_empty() {
        return Command::Unknown(input.to_string());
    }
    match parts[0] {
        "open" => {
            if parts.len() >= 2 {
                Command::Open(parts[1].to_string())
            } else {
                Command::Unknown(input.to_string())
            }
        }
        "tables" => Command::Tables,
        "browse" => {
            if parts.len() >= 2 {
                Command::Browse(parts[1].to_string())
            } else {
                Command::Unknown(input.to_string())
            }
        }
        "reload" => Command::Reload,
        "export" => {
            if parts.len() >= 2 {
                Command::Export(parts[1].to_string())
            } else {
                Command::Unknown(input.to_string())
            }
        }
        "help" => Command::Help,
        "quit" => Command::Quit,
        _ => Command::Unknown(input.to_string()),
    }
}

/// Interactive viewer session: the open database, its catalog snapshot and
/// the shared result grid.
pub struct Session {
    database: Option<Database>,
    catalog: Option<Catalog>,
    grid: ResultsGrid,
    busy_timeout_ms: Option<u64>,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Session {
            database: None,
            catalog: None,
            grid: ResultsGrid::with_viewport_rows(config.max_display_rows()),
            busy_timeout_ms: config.busy_timeout_ms(),
        }
    }

    /// Opens a database and builds its catalog. Replaces any previously
    /// open database wholesale.
    pub fn open(&mut self, path: &str) -> Result<()> {
        let mut db = Database::open(path)?;
        if let Some(ms) = self.busy_timeout_ms {
            db = db.with_busy_timeout(Duration::from_millis(ms));
        }
        let catalog = Catalog::build(&db)?;
        info!(path, objects = catalog.len(), "database opened");
        self.database = Some(db);
        self.catalog = Some(catalog);
        Ok(())
    }

    /// Rebuilds the catalog snapshot for the current database.
    pub fn reload(&mut self) -> Result<()> {
        match &self.database {
            Some(db) => {
                self.catalog = Some(Catalog::build(db)?);
                Ok(())
            }
            None => Err(SqlpeekError::App(
                "No database open. Use :open <path> first.".to_string(),
            )),
        }
    }

    /// Names of the cataloged tables and views, sorted for display.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .catalog
            .as_ref()
            .map(|c| c.names().into_iter().map(String::from).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Fetches all rows of a cataloged table into the grid.
    pub fn browse(&mut self, name: &str) -> Result<String> {
        let db = self.database.as_ref().ok_or_else(|| {
            SqlpeekError::App("No database open. Use :open <path> first.".to_string())
        })?;
        let descriptor = self
            .catalog
            .as_ref()
            .and_then(|c| c.get(name))
            .ok_or_else(|| {
                SqlpeekError::Catalog(format!("Unknown table or view: {}", name))
            })?;
        let result = catalog::read_table(db, descriptor)?;
        self.grid.fill(&result, RowLabels::Position);
        Ok(self.grid.render())
    }

    /// Runs ad-hoc SQL through the query engine into the grid. Errors come
    /// back as renderable results, so this never fails.
    pub fn sql(&mut self, text: &str) -> Option<String> {
        let db = self.database.as_ref()?;
        let result = run_query(db, text);
        self.grid.fill(&result, RowLabels::FirstValue);
        Some(self.grid.render())
    }

    /// Exports the current grid contents.
    pub fn export(&self, format: &str) -> Result<String> {
        self.grid.export(format)
    }
}

fn print_help() {
    println!("Commands:");
    println!("  :open <path>     Open a database file");
    println!("  :tables          List tables and views");
    println!("  :browse <name>   Show all rows of a table or view");
    println!("  :reload          Rebuild the catalog from the database");
    println!("  :export <fmt>    Export the current grid (csv, json, markdown)");
    println!("  :help            Show this help");
    println!("  :quit            Exit");
    println!("Anything else is executed as SQL.");
}

/// Runs the viewer shell: reads commands from standard input, dispatches
/// them against the session, and prints grids. Exits on `:quit` or EOF.
pub fn run_repl(database: Option<Database>, config: &Config) {
    let mut session = Session::new(config);
    if let Some(mut db) = database {
        if let Some(ms) = config.busy_timeout_ms() {
            db = db.with_busy_timeout(Duration::from_millis(ms));
        }
        let path = db.path().display().to_string();
        session.database = Some(db);
        match session.reload() {
            Ok(()) => println!("Opened {} ({} objects)", path, session.table_names().len()),
            Err(e) => eprintln!("Failed to read schema: {}", e),
        }
    }

    println!("Welcome to sqlpeek! Type :help for commands, :quit to exit.");
    let mut input = String::new();
    loop {
        print!("> ");
        io::stdout().flush().expect("Failed to flush stdout");
        input.clear();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break, // EOF or unreadable input ends the session
            Ok(_) => {}
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_command(trimmed) {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Open(path) => match session.open(&path) {
                Ok(()) => println!(
                    "Opened {} ({} objects)",
                    path,
                    session.table_names().len()
                ),
                Err(e) => eprintln!("{}", e),
            },
            Command::Tables => {
                let names = session.table_names();
                if names.is_empty() {
                    println!("No tables. Use :open <path> to open a database.");
                } else {
                    for name in names {
                        println!("{}", name);
                    }
                }
            }
            Command::Browse(name) => match session.browse(&name) {
                Ok(rendered) => print!("{}", rendered),
                Err(e) => eprintln!("{}", e),
            },
            Command::Reload => match session.reload() {
                Ok(()) => println!("Catalog reloaded ({} objects)", session.table_names().len()),
                Err(e) => eprintln!("{}", e),
            },
            Command::Export(format) => match session.export(&format) {
                Ok(exported) => print!("{}", exported),
                Err(e) => eprintln!("{}", e),
            },
            Command::Sql(text) => match session.sql(&text) {
                Some(rendered) => print!("{}", rendered),
                None => println!("No database open. Use :open <path> first."),
            },
            Command::Unknown(cmd) => {
                eprintln!("Unknown command: {}. Type :help for help.", cmd);
            }
        }
    }
}
