/// Schema Catalog Module
///
/// This module builds the table/view inventory for an opened database using
/// only generic metadata queries, so it works for any schema without
/// compile-time knowledge of table shapes. The catalog is a point-in-time
/// snapshot: structural changes made through the query engine are not
/// reflected until the catalog is rebuilt wholesale.
use crate::core::db::connection::Database;
use crate::core::db::query::{run_select, QueryResult};
use crate::core::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::collections::HashMap;
use tracing::debug;

/// Kind of schema object tracked by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
}

/// Describes one table or view: its kind and ordered column names.
///
/// The column order is authoritative and matches the order produced by
/// [`read_table`], which the grid relies on when assigning row numbers by
/// position.
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    /// Object name, unique within a database.
    pub name: String,
    /// Whether this is a table or a view.
    pub kind: ObjectKind,
    /// Ordered column names. May be empty when the engine reports no
    /// columns and the stored creation SQL is absent or unparseable.
    pub columns: Vec<String>,
}

impl TableDescriptor {
    /// Builds the row-fetch statement for this object.
    ///
    /// Tables are ordered by rowid so that two consecutive reads of an
    /// unmodified table return rows in the same order. Views have no
    /// rowid, so they are read in engine order.
    fn select_sql(&self) -> String {
        if self.columns.is_empty() {
            return format!("SELECT * FROM {}", quote_ident(&self.name));
        }
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        match self.kind {
            ObjectKind::Table => format!(
                "SELECT {} FROM {} ORDER BY rowid",
                columns,
                quote_ident(&self.name)
            ),
            ObjectKind::View => format!("SELECT {} FROM {}", columns, quote_ident(&self.name)),
        }
    }
}

/// In-memory inventory of a database's tables and views.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: HashMap<String, TableDescriptor>,
}

impl Catalog {
    /// Builds a catalog by scanning `sqlite_master`.
    ///
    /// One metadata query lists every (kind, name, creation SQL) triple;
    /// rows whose kind is neither table nor view (indexes, triggers) are
    /// skipped, never an error. Each surviving entry gets a describe-query
    /// for its ordered column list. A failing describe-query fails the
    /// build as a whole; partial catalogs are not a supported state.
    pub fn build(db: &Database) -> Result<Self> {
        let conn = db.connect()?;
        let mut stmt = conn.prepare("SELECT type, name, sql FROM sqlite_master")?;
        let entries = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut tables = HashMap::new();
        for (kind, name, creation_sql) in entries {
            let kind = match kind.as_str() {
                "table" => ObjectKind::Table,
                "view" => ObjectKind::View,
                _ => continue,
            };
            let columns = discover_columns(&conn, &name, kind, creation_sql.as_deref())?;
            tables.insert(
                name.clone(),
                TableDescriptor {
                    name,
                    kind,
                    columns,
                },
            );
        }

        debug!(objects = tables.len(), "catalog built");
        Ok(Catalog { tables })
    }

    /// Returns the cataloged names.
    ///
    /// Iteration order is stable for the lifetime of this catalog instance
    /// but not across rebuilds.
    pub fn names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Looks up the descriptor for `name`, if cataloged.
    pub fn get(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.get(name)
    }

    /// Iterates over all descriptors.
    pub fn iter(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Fetches all rows of a cataloged table or view, in stable row order.
///
/// Column order in the result equals the descriptor's recorded column
/// order. Runs on its own scoped connection.
pub fn read_table(db: &Database, table: &TableDescriptor) -> Result<QueryResult> {
    let conn = db.connect()?;
    let result = run_select(&conn, &table.select_sql())?;
    Ok(result)
}

/// Determines the ordered column list for one table or view.
///
/// The primary strategy is the engine's structured `PRAGMA table_info`
/// introspection. When that reports nothing, fall back to a tolerant parse
/// of the stored creation SQL, degrading to an empty column list when the
/// text is absent or unparseable.
fn discover_columns(
    conn: &Connection,
    name: &str,
    kind: ObjectKind,
    creation_sql: Option<&str>,
) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "PRAGMA table_info('{}')",
        name.replace('\'', "''")
    ))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    if !columns.is_empty() {
        return Ok(columns);
    }

    let parsed = match (kind, creation_sql) {
        (_, None) => Vec::new(),
        (ObjectKind::Table, Some(sql)) => columns_from_table_sql(sql),
        (ObjectKind::View, Some(sql)) => columns_from_view_sql(sql),
    };
    if parsed.is_empty() {
        debug!(object = name, "no columns discovered");
    }
    Ok(parsed)
}

/// Matches `identifier` followed by a type token at the start of a column
/// definition, with optional quoting.
static COLUMN_DEF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^["`\[]?([A-Za-z_][A-Za-z0-9_]*)["`\]]?\s+[A-Za-z]"#).expect("column def regex")
});

/// Captures the projection list of a view's SELECT body.
static VIEW_BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bselect\b(.*?)\bfrom\b").expect("view body regex"));

/// Matches `... AS alias` inside a projection list.
static VIEW_ALIAS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bas\s+["`\[]?([A-Za-z_][A-Za-z0-9_]*)"#).expect("view alias regex")
});

/// Extracts column names from a `CREATE TABLE` statement body.
///
/// Splits the parenthesized body on top-level commas and keeps segments
/// that look like `identifier type ...`, skipping table-level constraint
/// clauses. Returns an empty list when the text does not look like a
/// column list at all.
fn columns_from_table_sql(sql: &str) -> Vec<String> {
    let body = match (sql.find('('), sql.rfind(')')) {
        (Some(open), Some(close)) if close > open => &sql[open + 1..close],
        _ => return Vec::new(),
    };

    let mut columns = Vec::new();
    for segment in split_top_level(body) {
        let segment = segment.trim();
        let lowered = segment.to_lowercase();
        if ["primary", "foreign", "unique", "check", "constraint"]
            .iter()
            .any(|kw| lowered.starts_with(kw))
        {
            continue;
        }
        if let Some(caps) = COLUMN_DEF_RE.captures(segment) {
            columns.push(caps[1].to_string());
        }
    }
    columns
}

/// Extracts column aliases from a `CREATE VIEW ... AS SELECT` statement.
///
/// Only explicitly aliased columns are recoverable from the text; a
/// projection without aliases yields an empty list.
fn columns_from_view_sql(sql: &str) -> Vec<String> {
    let body = match VIEW_BODY_RE.captures(sql) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(""),
        None => return Vec::new(),
    };
    VIEW_ALIAS_RE
        .captures_iter(body)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Splits a column-definition body on commas outside parentheses, so
/// `DECIMAL(10, 2)` and inline `CHECK (x IN (1, 2))` stay intact.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in body.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                segments.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    segments.push(&body[start..]);
    segments
}

/// Quotes an identifier for embedding in generated SQL.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value;
    use tempfile::NamedTempFile;

    fn setup_test_database() -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        let conn = Connection::open(file.path()).unwrap();
        conn.execute_batch(
            "
            CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                age INTEGER
            );
            CREATE TABLE posts (
                id INTEGER PRIMARY KEY,
                user_id INTEGER,
                title TEXT,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );
            CREATE VIEW adult_users AS SELECT name, age FROM users WHERE age >= 18;
            CREATE INDEX idx_users_age ON users(age);
            CREATE TRIGGER trg_users AFTER INSERT ON users BEGIN
                UPDATE users SET age = age WHERE id = NEW.id;
            END;
            INSERT INTO users (name, age) VALUES ('Alice', 28);
            INSERT INTO users (name, age) VALUES ('Bob', 17);
            INSERT INTO users (name, age) VALUES ('Charlie', 35);
        ",
        )
        .unwrap();
        file
    }

    #[test]
    fn test_catalog_lists_tables_and_views_only() {
        let file = setup_test_database();
        let db = Database::open(file.path()).unwrap();
        let catalog = Catalog::build(&db).unwrap();

        let mut names = catalog.names();
        names.sort_unstable();
        assert_eq!(names, vec!["adult_users", "posts", "users"]);
    }

    #[test]
    fn test_catalog_records_ordered_columns() {
        let file = setup_test_database();
        let db = Database::open(file.path()).unwrap();
        let catalog = Catalog::build(&db).unwrap();

        let users = catalog.get("users").unwrap();
        assert_eq!(users.kind, ObjectKind::Table);
        assert_eq!(users.columns, vec!["id", "name", "age"]);

        let view = catalog.get("adult_users").unwrap();
        assert_eq!(view.kind, ObjectKind::View);
        assert_eq!(view.columns, vec!["name", "age"]);
    }

    #[test]
    fn test_catalog_is_a_snapshot() {
        let file = setup_test_database();
        let db = Database::open(file.path()).unwrap();
        let catalog = Catalog::build(&db).unwrap();

        db.connect()
            .unwrap()
            .execute("CREATE TABLE later (id INTEGER)", [])
            .unwrap();

        // The old snapshot does not see the new table; a rebuild does.
        assert!(catalog.get("later").is_none());
        let rebuilt = Catalog::build(&db).unwrap();
        assert!(rebuilt.get("later").is_some());
    }

    #[test]
    fn test_read_table_column_and_row_order() {
        let file = setup_test_database();
        let db = Database::open(file.path()).unwrap();
        let catalog = Catalog::build(&db).unwrap();
        let users = catalog.get("users").unwrap();

        let first = read_table(&db, users).unwrap();
        assert_eq!(first.columns, users.columns);
        assert_eq!(first.rows.len(), 3);
        assert_eq!(first.rows[0][1], Value::Text("Alice".to_string()));

        // Determinism: a second read returns the identical sequence.
        let second = read_table(&db, users).unwrap();
        assert_eq!(first.rows, second.rows);
    }

    #[test]
    fn test_read_table_on_view() {
        let file = setup_test_database();
        let db = Database::open(file.path()).unwrap();
        let catalog = Catalog::build(&db).unwrap();
        let view = catalog.get("adult_users").unwrap();

        let result = read_table(&db, view).unwrap();
        assert_eq!(result.columns, vec!["name", "age"]);
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_columns_from_table_sql() {
        let sql = r#"CREATE TABLE t (
            id INTEGER PRIMARY KEY,
            "quoted" TEXT,
            amount DECIMAL(10, 2),
            bare,
            PRIMARY KEY (id),
            CHECK (amount > 0)
        )"#;
        assert_eq!(columns_from_table_sql(sql), vec!["id", "quoted", "amount"]);
    }

    #[test]
    fn test_columns_from_table_sql_unparseable() {
        assert!(columns_from_table_sql("CREATE TABLE t").is_empty());
        assert!(columns_from_table_sql("not sql at all").is_empty());
    }

    #[test]
    fn test_columns_from_view_sql() {
        let sql = "CREATE VIEW v AS SELECT a AS first, b + 1 AS second FROM t";
        assert_eq!(columns_from_view_sql(sql), vec!["first", "second"]);
        assert!(columns_from_view_sql("CREATE VIEW v AS SELECT a, b FROM t").is_empty());
    }

    #[test]
    fn test_select_sql_shapes() {
        let table = TableDescriptor {
            name: "users".to_string(),
            kind: ObjectKind::Table,
            columns: vec!["id".to_string(), "name".to_string()],
        };
        assert_eq!(
            table.select_sql(),
            "SELECT \"id\", \"name\" FROM \"users\" ORDER BY rowid"
        );

        let view = TableDescriptor {
            name: "v".to_string(),
            kind: ObjectKind::View,
            columns: vec!["a".to_string()],
        };
        assert_eq!(view.select_sql(), "SELECT \"a\" FROM \"v\"");

        let bare = TableDescriptor {
            name: "t".to_string(),
            kind: ObjectKind::Table,
            columns: Vec::new(),
        };
        assert_eq!(bare.select_sql(), "SELECT * FROM \"t\"");
    }
}
