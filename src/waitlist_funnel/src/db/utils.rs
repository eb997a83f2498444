use anyhow::{anyhow, Result};
use rusqlite::Connection;
use sha2::{Digest, Sha256};

pub fn create_tables_if_not_exist(conn: &Connection) -> Result<()> {
    let table_exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='KeyValue')",
            [],
            |row| row.get::<_, bool>(0),
        )
        .unwrap_or(false);

    if !table_exists {
        conn.execute_batch(
            "
            BEGIN;

            -- One JSON document per key, e.g. the visitor profile
            CREATE TABLE KeyValue (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );

            COMMIT;
            ",
        )
        .map_err(|e| anyhow!("Failed to create tables: {}", e))?;
    }

    Ok(())
}

pub fn generate_hash_id(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_creation_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables_if_not_exist(&conn).unwrap();
        create_tables_if_not_exist(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM KeyValue", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn hash_id_is_stable_hex() {
        let id = generate_hash_id("a@b.co");
        assert_eq!(id.len(), 64);
        assert_eq!(id, generate_hash_id("a@b.co"));
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
