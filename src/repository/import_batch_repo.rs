// ==========================================
// 班次产量对账系统 - 导入批次仓储
// ==========================================
// 职责: 记录每次班次导入的汇总（诊断 / 偏差提示以 JSON 保存）
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::import::ImportBatch;
use crate::domain::types::Shift;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

pub struct ImportBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportBatchRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入导入批次记录
    pub fn insert_batch(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO import_batch (
                batch_id, shift, source,
                total_rows, created_rows, updated_rows, skipped_rows, failed_rows,
                diagnostics_json, notices_json, imported_at, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                batch.batch_id,
                batch.shift.as_str(),
                batch.source,
                batch.total_rows,
                batch.created_rows,
                batch.updated_rows,
                batch.skipped_rows,
                batch.failed_rows,
                batch.diagnostics_json,
                batch.notices_json,
                batch
                    .imported_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
                batch.elapsed_ms,
            ],
        )?;
        Ok(())
    }

    /// 查询最近的导入批次
    ///
    /// # 参数
    /// - limit: 返回记录数限制
    pub fn recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT batch_id, shift, source,
                      total_rows, created_rows, updated_rows, skipped_rows, failed_rows,
                      diagnostics_json, notices_json, imported_at, elapsed_ms
               FROM import_batch
               ORDER BY imported_at DESC, rowid DESC
               LIMIT ?1"#,
        )?;
        let batches = stmt
            .query_map(params![limit as i64], map_batch)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(batches)
    }
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn map_batch(row: &Row<'_>) -> rusqlite::Result<ImportBatch> {
    let shift_raw: String = row.get(1)?;
    let shift = match shift_raw.as_str() {
        "SHIFT_1" => Shift::First,
        "SHIFT_2" => Shift::Second,
        other => {
            return Err(conversion_error(
                1,
                RepositoryError::FieldValueError {
                    field: "shift".to_string(),
                    message: format!("未知班次: {}", other),
                },
            ))
        }
    };
    let imported_raw: String = row.get(10)?;
    let imported_at = DateTime::parse_from_rfc3339(&imported_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(10, e))?;

    Ok(ImportBatch {
        batch_id: row.get(0)?,
        shift,
        source: row.get(2)?,
        total_rows: row.get(3)?,
        created_rows: row.get(4)?,
        updated_rows: row.get(5)?,
        skipped_rows: row.get(6)?,
        failed_rows: row.get(7)?,
        diagnostics_json: row.get(8)?,
        notices_json: row.get(9)?,
        imported_at,
        elapsed_ms: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn batch(id: &str, shift: Shift) -> ImportBatch {
        ImportBatch {
            batch_id: id.to_string(),
            shift,
            source: Some("turno.json".to_string()),
            total_rows: 5,
            created_rows: 3,
            updated_rows: 1,
            skipped_rows: 1,
            failed_rows: 0,
            diagnostics_json: "[]".to_string(),
            notices_json: "[]".to_string(),
            imported_at: Utc::now(),
            elapsed_ms: 12,
        }
    }

    #[test]
    fn test_insert_and_recent_batches() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let repo = ImportBatchRepository::new(Arc::new(Mutex::new(conn)));

        repo.insert_batch(&batch("B1", Shift::First)).unwrap();
        repo.insert_batch(&batch("B2", Shift::Second)).unwrap();

        let recent = repo.recent_batches(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].batch_id, "B2");
        assert_eq!(recent[0].shift, Shift::Second);
        assert_eq!(recent[1].created_rows, 3);

        assert_eq!(repo.recent_batches(1).unwrap().len(), 1);
    }
}
