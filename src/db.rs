// ==========================================
// 班次产量对账系统 - SQLite 连接初始化
// ==========================================
// 职责:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表（幂等）与 schema_version 读取
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS production_record (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    machine TEXT NOT NULL DEFAULT '',
    packaging TEXT NOT NULL DEFAULT '',
    classification TEXT NOT NULL DEFAULT '',
    units_per_box REAL NOT NULL DEFAULT 0,
    net_weight_per_unit_kg REAL NOT NULL DEFAULT 0,
    batch_recipe_kg REAL NOT NULL DEFAULT 0,
    shift1_target REAL NOT NULL DEFAULT 0,
    shift1_actual_kg REAL NOT NULL DEFAULT 0,
    shift1_actual_boxes REAL NOT NULL DEFAULT 0,
    shift2_target REAL NOT NULL DEFAULT 0,
    shift2_actual_kg REAL NOT NULL DEFAULT 0,
    shift2_actual_boxes REAL NOT NULL DEFAULT 0,
    daily_plan_boxes REAL NOT NULL DEFAULT 0,
    boxes_for_target REAL NOT NULL DEFAULT 0,
    recipe_batch_units REAL NOT NULL DEFAULT 0,
    efficiency_shift1 REAL NOT NULL DEFAULT 0,
    efficiency_shift2 REAL NOT NULL DEFAULT 0,
    total_actual_kg REAL NOT NULL DEFAULT 0,
    total_actual_boxes REAL NOT NULL DEFAULT 0,
    plan_vs_actual_delta_kg REAL NOT NULL DEFAULT 0,
    total_efficiency REAL NOT NULL DEFAULT 0,
    extra_json TEXT NOT NULL DEFAULT '{}',
    revision INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_production_record_code
    ON production_record(code);

CREATE TABLE IF NOT EXISTS product_master (
    code TEXT PRIMARY KEY,
    description TEXT NOT NULL DEFAULT '',
    machine TEXT NOT NULL DEFAULT '',
    packaging TEXT NOT NULL DEFAULT '',
    classification TEXT NOT NULL DEFAULT '',
    units_per_box REAL NOT NULL DEFAULT 0,
    net_weight_per_unit_kg REAL NOT NULL DEFAULT 0,
    batch_recipe_kg REAL NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS import_batch (
    batch_id TEXT PRIMARY KEY,
    shift TEXT NOT NULL,
    source TEXT,
    total_rows INTEGER NOT NULL,
    created_rows INTEGER NOT NULL,
    updated_rows INTEGER NOT NULL,
    skipped_rows INTEGER NOT NULL,
    failed_rows INTEGER NOT NULL,
    diagnostics_json TEXT NOT NULL,
    notices_json TEXT NOT NULL,
    imported_at TEXT NOT NULL,
    elapsed_ms INTEGER NOT NULL
);
"#;

/// 建表（幂等），并登记当前 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![CURRENT_SCHEMA_VERSION, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
