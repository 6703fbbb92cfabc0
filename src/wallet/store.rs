use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::wallet::migrations::BASE_MIGRATION;
use crate::wallet::{WalletRecord, WalletSource};

/// Canonical demo balances, matching the seeded fixture data.
pub const DEMO_SEED: [(&str, u64); 4] = [
    ("alaska", 45_000),
    ("amex_mr", 120_000),
    ("chase_ur", 30_000),
    ("delta", 25_000),
];

pub struct WalletStore {
    conn: Connection,
}

impl WalletStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    /// Wallet rows are keyed by (user, program): writing an existing key
    /// replaces the stored points.
    pub fn upsert_wallet(&self, user_email: &str, program: &str, points: u64) -> Result<()> {
        self.conn.execute(
            r#"
INSERT INTO wallets(user_email, program, points, updated_at)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(user_email, program) DO UPDATE SET
    points = excluded.points,
    updated_at = excluded.updated_at
"#,
            params![
                user_email,
                program,
                points as i64,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn delete_wallet(&self, user_email: &str, program: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM wallets WHERE user_email = ?1 AND program = ?2",
            params![user_email, program],
        )?;
        Ok(deleted > 0)
    }

    pub fn wallets_for(&self, user_email: &str) -> Result<Vec<WalletRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT user_email, program, points, updated_at
FROM wallets
WHERE user_email = ?1
ORDER BY program ASC
"#,
        )?;
        let rows = stmt
            .query_map(params![user_email], |row| row_to_wallet_record(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Resets the user's wallets to the canonical demo balances. Idempotent:
    /// prior rows (including duplicates from older schemas) are cleared
    /// first.
    pub fn seed_demo(&self, user_email: &str) -> Result<usize> {
        self.conn.execute(
            "DELETE FROM wallets WHERE user_email = ?1",
            params![user_email],
        )?;
        for (program, points) in DEMO_SEED {
            self.upsert_wallet(user_email, program, points)?;
        }
        Ok(DEMO_SEED.len())
    }
}

impl WalletSource for WalletStore {
    fn load_wallets(&self, user_email: &str) -> Result<Vec<WalletRecord>> {
        self.wallets_for(user_email)
    }
}

fn row_to_wallet_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<WalletRecord> {
    let points: i64 = row.get(2)?;
    let updated_at_raw: String = row.get(3)?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(WalletRecord {
        user_email: row.get(0)?,
        program: row.get(1)?,
        points: points.max(0) as u64,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::WalletStore;
    use crate::wallet::WalletSource;

    const USER: &str = "demo@points.local";

    #[test]
    fn upsert_replaces_points_for_same_key() {
        let store = WalletStore::open_in_memory().expect("open store");
        store.upsert_wallet(USER, "amex_mr", 40_000).expect("insert");
        store.upsert_wallet(USER, "amex_mr", 55_000).expect("update");
        let rows = store.load_wallets(USER).expect("load");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].points, 55_000);
    }

    #[test]
    fn delete_reports_whether_a_row_existed() {
        let store = WalletStore::open_in_memory().expect("open store");
        store.upsert_wallet(USER, "delta", 25_000).expect("insert");
        assert!(store.delete_wallet(USER, "delta").expect("delete"));
        assert!(!store.delete_wallet(USER, "delta").expect("delete again"));
    }

    #[test]
    fn seed_is_idempotent() {
        let store = WalletStore::open_in_memory().expect("open store");
        store.upsert_wallet(USER, "united", 9_000).expect("insert");
        let first = store.seed_demo(USER).expect("seed");
        let second = store.seed_demo(USER).expect("seed again");
        assert_eq!(first, second);
        let rows = store.load_wallets(USER).expect("load");
        assert_eq!(rows.len(), first);
        assert!(rows.iter().all(|r| r.program != "united"));
    }

    #[test]
    fn wallets_are_scoped_per_user() {
        let store = WalletStore::open_in_memory().expect("open store");
        store.upsert_wallet(USER, "alaska", 45_000).expect("insert");
        store
            .upsert_wallet("other@points.local", "alaska", 1)
            .expect("insert other");
        let rows = store.load_wallets(USER).expect("load");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].points, 45_000);
    }
}
