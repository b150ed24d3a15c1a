use super::{CalendarStore, PersistenceError, PersistenceResult, validate_book};
use crate::book::CalendarBook;
use crate::config::EngineConfig;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

const ENTITY_TABLES: [&str; 8] = [
    "academic_years",
    "holidays",
    "interruptions",
    "class_groups",
    "periods",
    "modules",
    "lessons",
    "student_lessons",
];

/// Stores a [`CalendarBook`] in SQLite, one `(id, json)` table per entity.
pub struct SqliteCalendarStore {
    connection: Mutex<Connection>,
}

impl SqliteCalendarStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let mut ddl = String::from(
            r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS engine_config (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                config_json TEXT NOT NULL
            );
            "#,
        );
        for table in ENTITY_TABLES {
            ddl.push_str(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (id INTEGER PRIMARY KEY, json TEXT NOT NULL);\n"
            ));
        }
        connection.execute_batch(&ddl)?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::InvalidData("sqlite connection lock poisoned".into()))
    }

    fn save_table<T: Serialize>(tx: &Transaction, table: &str, rows: &BTreeMap<i32, T>) -> PersistenceResult<()> {
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        let mut stmt = tx.prepare(&format!("INSERT INTO {table} (id, json) VALUES (?1, ?2)"))?;
        for (id, row) in rows {
            let json = serde_json::to_string(row)?;
            stmt.execute(params![id, json])?;
        }
        Ok(())
    }

    fn load_table<T: DeserializeOwned>(conn: &Connection, table: &str) -> PersistenceResult<BTreeMap<i32, T>> {
        let mut stmt = conn.prepare(&format!("SELECT id, json FROM {table} ORDER BY id ASC"))?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i32>(0)?, row.get::<_, String>(1)?)))?;
        let mut out = BTreeMap::new();
        for row in rows {
            let (id, json) = row?;
            out.insert(id, serde_json::from_str(&json)?);
        }
        Ok(out)
    }
}

impl CalendarStore for SqliteCalendarStore {
    fn save_book(&self, book: &CalendarBook) -> PersistenceResult<()> {
        validate_book(book)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let config_json = serde_json::to_string(book.config())?;
        tx.execute("DELETE FROM engine_config", [])?;
        tx.execute(
            "INSERT INTO engine_config (id, config_json) VALUES (1, ?1)",
            params![config_json],
        )?;

        Self::save_table(&tx, "academic_years", &book.years)?;
        Self::save_table(&tx, "holidays", &book.holidays)?;
        Self::save_table(&tx, "interruptions", &book.interruptions)?;
        Self::save_table(&tx, "class_groups", &book.classes)?;
        Self::save_table(&tx, "periods", &book.periods)?;
        Self::save_table(&tx, "modules", &book.modules)?;
        Self::save_table(&tx, "lessons", &book.lessons)?;
        Self::save_table(&tx, "student_lessons", &book.student_records)?;
        tx.commit()?;
        Ok(())
    }

    fn load_book(&self) -> PersistenceResult<Option<CalendarBook>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT config_json FROM engine_config WHERE id = 1")?;
        let config_json: Option<String> = stmt.query_row([], |row| row.get(0)).optional()?;
        let Some(config_json) = config_json else {
            return Ok(None);
        };
        let config: EngineConfig = serde_json::from_str(&config_json)?;

        let mut book = CalendarBook::with_config(config);
        book.years = Self::load_table(&conn, "academic_years")?;
        book.holidays = Self::load_table(&conn, "holidays")?;
        book.interruptions = Self::load_table(&conn, "interruptions")?;
        book.classes = Self::load_table(&conn, "class_groups")?;
        book.periods = Self::load_table(&conn, "periods")?;
        book.modules = Self::load_table(&conn, "modules")?;
        book.lessons = Self::load_table(&conn, "lessons")?;
        book.student_records = Self::load_table(&conn, "student_lessons")?;

        validate_book(&book)?;
        Ok(Some(book))
    }
}
