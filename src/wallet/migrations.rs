pub const BASE_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS wallets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_email TEXT NOT NULL,
    program TEXT NOT NULL,
    points INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(user_email, program)
);
CREATE INDEX IF NOT EXISTS idx_wallets_user
    ON wallets(user_email);
"#;
