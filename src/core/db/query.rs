/// Query Execution Module
///
/// This module executes arbitrary user-supplied SQL against a database and
/// normalizes the heterogeneous per-statement outcomes (row count, result
/// set, error) into one uniform result shape for the grid. The statement's
/// leading keywords decide both the result shape and the commit discipline
/// before execution, because SQLite does not expose a uniform "rows
/// affected" vs. "result set" signal in a single polling call.
use crate::core::db::connection::Database;
use crate::core::SqlpeekError;
use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::{debug, warn};

/// Represents the uniform result of a SQL query execution.
///
/// For statements with a result set, `columns` are the engine-reported
/// labels and `rows` all returned rows in engine order. For the mutating
/// statement kinds, both collapse to a single synthetic column and row.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column labels, one per cell position in each row.
    pub columns: Vec<String>,
    /// Rows of dynamically-typed scalar values.
    pub rows: Vec<Vec<Value>>,
    /// Number of rows returned.
    pub row_count: usize,
}

impl QueryResult {
    /// Creates a new QueryResult from column labels and row data.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let row_count = rows.len();
        QueryResult {
            columns,
            rows,
            row_count,
        }
    }
}

/// Category assigned to a captured execution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// SQLite rejected or aborted the statement (syntax or runtime).
    SyntaxOrRuntime,
    /// A value could not be marshalled into the expected shape.
    Type,
    /// Anything else.
    Unknown,
}

impl ErrorCategory {
    /// Column label used when the error is packaged as a result.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::SyntaxOrRuntime => "sql error",
            ErrorCategory::Type => "type error",
            ErrorCategory::Unknown => "unknown error",
        }
    }
}

/// A classified execution failure, constructed at the point of failure and
/// never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    pub category: ErrorCategory,
    pub message: String,
}

impl QueryError {
    fn from_sqlite(err: rusqlite::Error) -> Self {
        let category = match &err {
            rusqlite::Error::SqliteFailure(_, _) => ErrorCategory::SyntaxOrRuntime,
            rusqlite::Error::InvalidColumnType(_, _, _)
            | rusqlite::Error::FromSqlConversionFailure(_, _, _)
            | rusqlite::Error::IntegralValueOutOfRange(_, _)
            | rusqlite::Error::Utf8Error(_)
            | rusqlite::Error::InvalidColumnIndex(_) => ErrorCategory::Type,
            _ => ErrorCategory::Unknown,
        };
        QueryError {
            category,
            message: err.to_string(),
        }
    }

    fn from_error(err: SqlpeekError) -> Self {
        match err {
            SqlpeekError::Database(e) => QueryError::from_sqlite(e),
            other => QueryError {
                category: ErrorCategory::Unknown,
                message: other.to_string(),
            },
        }
    }

    /// Packages this error as a degenerate successful result: a single
    /// column labeled with the category and a single row carrying the
    /// message text. The grid renders it exactly like any other result.
    pub fn into_result(self) -> QueryResult {
        QueryResult::new(
            vec![self.category.label().to_string()],
            vec![vec![Value::Text(self.message)]],
        )
    }
}

/// Statement kinds distinguished by the result-shape contract.
///
/// The match is a case-sensitive comparison of the statement's leading
/// tokens after newline normalization: lowercase `insert into` or a
/// leading space takes the default path. UPDATE, CREATE, SELECT and
/// pragmas are all `Other` and report whatever columns the engine does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    InsertInto,
    DeleteFrom,
    DropView,
    DropTable,
    Other,
}

impl StatementKind {
    /// Classifies a normalized statement by its leading tokens.
    pub fn classify(sql: &str) -> Self {
        if sql.starts_with("INSERT INTO") {
            StatementKind::InsertInto
        } else if sql.starts_with("DELETE FROM") {
            StatementKind::DeleteFrom
        } else if sql.starts_with("DROP VIEW") {
            StatementKind::DropView
        } else if sql.starts_with("DROP TABLE") {
            StatementKind::DropTable
        } else {
            StatementKind::Other
        }
    }
}

/// Executes one query string and returns a uniform result.
///
/// Failures never propagate: any engine error is captured, categorized and
/// returned as a degenerate result via [`QueryError::into_result`], so the
/// caller needs no failure branch for query execution.
pub fn run_query(db: &Database, sql: &str) -> QueryResult {
    match execute(db, sql) {
        Ok(result) => result,
        Err(err) => {
            warn!(category = err.category.label(), "query failed: {}", err.message);
            err.into_result()
        }
    }
}

/// Executes one query string, keeping the error channel distinct.
///
/// The query text is taken as-is apart from newline normalization; no
/// rewriting or sanitization is applied. Mutating statement kinds run
/// inside an explicit transaction committed before return, so the change
/// is visible to any subsequent connection. The scoped connection is
/// released on every exit path.
pub fn execute(db: &Database, sql: &str) -> std::result::Result<QueryResult, QueryError> {
    let text = sql.replace('\n', " ");
    let kind = StatementKind::classify(&text);
    debug!(?kind, "executing query");

    let mut conn = db.connect().map_err(QueryError::from_error)?;
    match kind {
        StatementKind::InsertInto | StatementKind::DeleteFrom => {
            let tx = conn.transaction().map_err(QueryError::from_sqlite)?;
            let affected = tx.execute(&text, []).map_err(QueryError::from_sqlite)?;
            tx.commit().map_err(QueryError::from_sqlite)?;
            Ok(QueryResult::new(
                vec!["rows affected".to_string()],
                vec![vec![Value::Integer(affected as i64)]],
            ))
        }
        StatementKind::DropView | StatementKind::DropTable => {
            let tx = conn.transaction().map_err(QueryError::from_sqlite)?;
            tx.execute(&text, []).map_err(QueryError::from_sqlite)?;
            tx.commit().map_err(QueryError::from_sqlite)?;
            Ok(QueryResult::new(
                vec!["status".to_string()],
                vec![vec![Value::Text("complete".to_string())]],
            ))
        }
        StatementKind::Other => run_select(&conn, &text).map_err(QueryError::from_sqlite),
    }
}

/// Prepares and runs a statement, collecting the engine-reported column
/// labels and all rows in engine order.
pub(crate) fn run_select(conn: &Connection, sql: &str) -> rusqlite::Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let column_count = stmt.column_count();

    let rows = stmt
        .query_map([], |row| {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(row.get::<_, Value>(i)?);
            }
            Ok(values)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(QueryResult::new(columns, rows))
}

/// Formats a scalar value for display.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(t) => t.clone(),
        Value::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn setup_test_database() -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        let conn = Connection::open(file.path()).unwrap();
        conn.execute_batch(
            "
            CREATE TABLE test (
                id INTEGER PRIMARY KEY,
                name TEXT,
                value REAL
            );
            INSERT INTO test (name, value) VALUES ('Alice', 123.45);
            INSERT INTO test (name, value) VALUES ('Bob', 678.90);
            INSERT INTO test (name, value) VALUES (NULL, NULL);
        ",
        )
        .unwrap();
        file
    }

    #[test]
    fn test_statement_classification() {
        assert_eq!(
            StatementKind::classify("INSERT INTO t VALUES (1)"),
            StatementKind::InsertInto
        );
        assert_eq!(
            StatementKind::classify("DELETE FROM t"),
            StatementKind::DeleteFrom
        );
        assert_eq!(StatementKind::classify("DROP VIEW v"), StatementKind::DropView);
        assert_eq!(
            StatementKind::classify("DROP TABLE t"),
            StatementKind::DropTable
        );
        assert_eq!(
            StatementKind::classify("SELECT * FROM t"),
            StatementKind::Other
        );
        assert_eq!(
            StatementKind::classify("UPDATE t SET x = 1"),
            StatementKind::Other
        );

        // The match is case-sensitive and does not trim.
        assert_eq!(
            StatementKind::classify("insert into t VALUES (1)"),
            StatementKind::Other
        );
        assert_eq!(
            StatementKind::classify(" DROP TABLE t"),
            StatementKind::Other
        );
    }

    #[test]
    fn test_select_returns_typed_rows() {
        let file = setup_test_database();
        let db = Database::open(file.path()).unwrap();

        let result = run_query(&db, "SELECT id, name, value FROM test ORDER BY id");
        assert_eq!(result.columns, vec!["id", "name", "value"]);
        assert_eq!(result.row_count, 3);
        assert_eq!(
            result.rows[0],
            vec![
                Value::Integer(1),
                Value::Text("Alice".to_string()),
                Value::Real(123.45)
            ]
        );
        assert_eq!(result.rows[2][1], Value::Null);
    }

    #[test]
    fn test_insert_reports_rows_affected_and_commits() {
        let file = setup_test_database();
        let db = Database::open(file.path()).unwrap();

        let result = run_query(&db, "INSERT INTO test (name, value) VALUES ('Dora', 1.0)");
        assert_eq!(result.columns, vec!["rows affected"]);
        assert_eq!(result.rows, vec![vec![Value::Integer(1)]]);

        // Durably visible to a separate connection.
        let conn = Connection::open(file.path()).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM test", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_delete_reports_rows_affected() {
        let file = setup_test_database();
        let db = Database::open(file.path()).unwrap();

        let result = run_query(&db, "DELETE FROM test");
        assert_eq!(result.columns, vec!["rows affected"]);
        assert_eq!(result.rows, vec![vec![Value::Integer(3)]]);

        let conn = Connection::open(file.path()).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM test", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_drop_table_reports_status() {
        let file = setup_test_database();
        let db = Database::open(file.path()).unwrap();

        let result = run_query(&db, "DROP TABLE test");
        assert_eq!(result.columns, vec!["status"]);
        assert_eq!(result.rows, vec![vec![Value::Text("complete".to_string())]]);

        let conn = Connection::open(file.path()).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'test'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_malformed_sql_becomes_degenerate_result() {
        let file = setup_test_database();
        let db = Database::open(file.path()).unwrap();

        let result = run_query(&db, "SELEC * FROM test");
        assert_eq!(result.columns, vec!["sql error"]);
        assert_eq!(result.row_count, 1);
        match &result.rows[0][0] {
            Value::Text(msg) => assert!(msg.contains("syntax error")),
            other => panic!("Expected error text, got {:?}", other),
        }
    }

    #[test]
    fn test_newlines_are_normalized() {
        let file = setup_test_database();
        let db = Database::open(file.path()).unwrap();

        let result = run_query(&db, "INSERT INTO\ntest (name, value)\nVALUES ('Eve', 2.0)");
        assert_eq!(result.columns, vec!["rows affected"]);
        assert_eq!(result.rows, vec![vec![Value::Integer(1)]]);
    }

    #[test]
    fn test_error_category_mapping() {
        let err = QueryError::from_sqlite(rusqlite::Error::InvalidColumnType(
            0,
            "id".to_string(),
            rusqlite::types::Type::Text,
        ));
        assert_eq!(err.category, ErrorCategory::Type);

        let err = QueryError::from_sqlite(rusqlite::Error::ExecuteReturnedResults);
        assert_eq!(err.category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_error_packaging() {
        let err = QueryError {
            category: ErrorCategory::Unknown,
            message: "something odd".to_string(),
        };
        let result = err.into_result();
        assert_eq!(result.columns, vec!["unknown error"]);
        assert_eq!(
            result.rows,
            vec![vec![Value::Text("something odd".to_string())]]
        );
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::Null), "NULL");
        assert_eq!(format_value(&Value::Integer(42)), "42");
        assert_eq!(format_value(&Value::Real(1.5)), "1.5");
        assert_eq!(format_value(&Value::Text("hi".to_string())), "hi");
        assert_eq!(
            format_value(&Value::Blob(vec![1, 2, 3, 4, 5])),
            "<BLOB: 5 bytes>"
        );
    }
}
