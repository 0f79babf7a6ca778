// ==========================================
// 班次产量对账系统 - 生产记录 Store 实现
// ==========================================
// 职责: 实现生产记录数据访问（使用 rusqlite）
// 红线: Store 不含业务规则，只做数据 CRUD
// 并发: Arc<Mutex<Connection>> 串行化访问；变更通过 broadcast 通知订阅方
// ==========================================

use crate::domain::production::{
    DerivedMetrics, DerivedProduction, ProductionInput, ProductionRecord,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::production_repo::{ProductionStore, RecordSnapshotStream};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::StreamExt;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

/// 变更通知通道容量
const CHANGE_CHANNEL_CAPACITY: usize = 64;

const SELECT_COLUMNS: &str = r#"
    id, code, description, machine, packaging, classification,
    units_per_box, net_weight_per_unit_kg, batch_recipe_kg,
    shift1_target, shift1_actual_kg, shift1_actual_boxes,
    shift2_target, shift2_actual_kg, shift2_actual_boxes,
    daily_plan_boxes, boxes_for_target, recipe_batch_units,
    efficiency_shift1, efficiency_shift2, total_actual_kg, total_actual_boxes,
    plan_vs_actual_delta_kg, total_efficiency,
    extra_json, revision, created_at, updated_at
"#;

// ==========================================
// RecordChange - 记录变更事件
// ==========================================
#[derive(Debug, Clone, PartialEq)]
enum RecordChange {
    Created { id: String, code: String },
    Updated { id: String, code: String },
}

// ==========================================
// SqliteProductionStore
// ==========================================
#[derive(Clone)]
pub struct SqliteProductionStore {
    conn: Arc<Mutex<Connection>>,
    changes: broadcast::Sender<RecordChange>,
}

impl SqliteProductionStore {
    /// 创建新的 Store 实例
    ///
    /// # 参数
    /// - conn: 已完成建表的共享连接
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { conn, changes }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn notify(&self, change: RecordChange) {
        // 无订阅者时 send 返回 Err，属正常情况
        let _ = self.changes.send(change);
    }

    fn load_all(&self) -> RepositoryResult<Vec<ProductionRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_record ORDER BY created_at DESC, rowid DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn load_one(&self, column: &str, value: &str) -> RepositoryResult<Option<ProductionRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_record WHERE {} = ?1",
            SELECT_COLUMNS, column
        );
        let record = conn
            .query_row(&sql, params![value], map_record)
            .optional()?;
        Ok(record)
    }

    /// 执行 UPDATE，expected_revision 为 None 时不校验 revision
    fn write_update(
        &self,
        id: &str,
        record: &DerivedProduction,
        expected_revision: Option<i64>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let input = &record.input;
        let m = &record.metrics;
        let extra_json = serde_json::to_string(&input.extra)?;
        let now = format_ts(&Utc::now());

        let rows_affected = conn.execute(
            r#"UPDATE production_record SET
                code = ?1, description = ?2, machine = ?3, packaging = ?4, classification = ?5,
                units_per_box = ?6, net_weight_per_unit_kg = ?7, batch_recipe_kg = ?8,
                shift1_target = ?9, shift1_actual_kg = ?10, shift1_actual_boxes = ?11,
                shift2_target = ?12, shift2_actual_kg = ?13, shift2_actual_boxes = ?14,
                daily_plan_boxes = ?15, boxes_for_target = ?16, recipe_batch_units = ?17,
                efficiency_shift1 = ?18, efficiency_shift2 = ?19, total_actual_kg = ?20,
                total_actual_boxes = ?21, plan_vs_actual_delta_kg = ?22, total_efficiency = ?23,
                extra_json = ?24, updated_at = ?25, revision = revision + 1
               WHERE id = ?26 AND (?27 IS NULL OR revision = ?27)"#,
            params![
                input.code,
                input.description,
                input.machine,
                input.packaging,
                input.classification,
                input.units_per_box,
                input.net_weight_per_unit_kg,
                input.batch_recipe_kg,
                input.shift1_target,
                input.shift1_actual_kg,
                input.shift1_actual_boxes,
                input.shift2_target,
                input.shift2_actual_kg,
                input.shift2_actual_boxes,
                m.daily_plan_boxes,
                m.boxes_for_target,
                m.recipe_batch_units,
                m.efficiency_shift1,
                m.efficiency_shift2,
                m.total_actual_kg,
                m.total_actual_boxes,
                m.plan_vs_actual_delta_kg,
                m.total_efficiency,
                extra_json,
                now,
                id,
                expected_revision,
            ],
        )?;

        if rows_affected == 0 {
            // 判断是记录不存在还是 revision 冲突
            let actual: Option<i64> = conn
                .query_row(
                    "SELECT revision FROM production_record WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;

            return match (actual, expected_revision) {
                (Some(actual), Some(expected)) => {
                    warn!(
                        record_id = id,
                        expected, actual, "生产记录条件更新失败: revision 不匹配"
                    );
                    Err(RepositoryError::OptimisticLockFailure {
                        record_id: id.to_string(),
                        expected,
                        actual,
                    })
                }
                _ => Err(RepositoryError::NotFound {
                    entity: "ProductionRecord".to_string(),
                    id: id.to_string(),
                }),
            };
        }

        drop(conn);
        self.notify(RecordChange::Updated {
            id: id.to_string(),
            code: input.code.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl ProductionStore for SqliteProductionStore {
    async fn find_by_code(&self, code: &str) -> RepositoryResult<Option<ProductionRecord>> {
        self.load_one("code", code)
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<ProductionRecord>> {
        self.load_one("id", id)
    }

    async fn create(&self, record: &DerivedProduction) -> RepositoryResult<String> {
        let id = Uuid::new_v4().to_string();
        let input = &record.input;
        let m = &record.metrics;
        let extra_json = serde_json::to_string(&input.extra)?;
        let now = format_ts(&Utc::now());

        {
            let conn = self.get_conn()?;
            conn.execute(
                r#"INSERT INTO production_record (
                    id, code, description, machine, packaging, classification,
                    units_per_box, net_weight_per_unit_kg, batch_recipe_kg,
                    shift1_target, shift1_actual_kg, shift1_actual_boxes,
                    shift2_target, shift2_actual_kg, shift2_actual_boxes,
                    daily_plan_boxes, boxes_for_target, recipe_batch_units,
                    efficiency_shift1, efficiency_shift2, total_actual_kg, total_actual_boxes,
                    plan_vs_actual_delta_kg, total_efficiency,
                    extra_json, revision, created_at, updated_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                    ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, 1, ?26, ?26
                )"#,
                params![
                    id,
                    input.code,
                    input.description,
                    input.machine,
                    input.packaging,
                    input.classification,
                    input.units_per_box,
                    input.net_weight_per_unit_kg,
                    input.batch_recipe_kg,
                    input.shift1_target,
                    input.shift1_actual_kg,
                    input.shift1_actual_boxes,
                    input.shift2_target,
                    input.shift2_actual_kg,
                    input.shift2_actual_boxes,
                    m.daily_plan_boxes,
                    m.boxes_for_target,
                    m.recipe_batch_units,
                    m.efficiency_shift1,
                    m.efficiency_shift2,
                    m.total_actual_kg,
                    m.total_actual_boxes,
                    m.plan_vs_actual_delta_kg,
                    m.total_efficiency,
                    extra_json,
                    now,
                ],
            )?;
        }

        debug!(record_id = %id, code = %input.code, "生产记录已创建");
        self.notify(RecordChange::Created {
            id: id.clone(),
            code: input.code.clone(),
        });
        Ok(id)
    }

    async fn update(&self, id: &str, record: &DerivedProduction) -> RepositoryResult<()> {
        self.write_update(id, record, None)
    }

    async fn update_if_revision(
        &self,
        id: &str,
        record: &DerivedProduction,
        expected_revision: i64,
    ) -> RepositoryResult<()> {
        self.write_update(id, record, Some(expected_revision))
    }

    async fn list_all(&self) -> RepositoryResult<Vec<ProductionRecord>> {
        self.load_all()
    }

    fn watch_all(&self) -> RecordSnapshotStream {
        // 先订阅再读快照，避免漏掉两者之间的变更
        let receiver = self.changes.subscribe();
        let store = self.clone();

        futures::stream::unfold(
            (store, receiver, true),
            |(store, mut receiver, first)| async move {
                if !first {
                    match receiver.recv().await {
                        Ok(RecordChange::Created { id, code })
                        | Ok(RecordChange::Updated { id, code }) => {
                            debug!(record_id = %id, code = %code, "记录变更，刷新快照");
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "变更通知积压，直接刷新快照");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
                let snapshot = store.load_all();
                Some((snapshot, (store, receiver, false)))
            },
        )
        .boxed()
    }
}

// ==========================================
// 行映射
// ==========================================

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<ProductionRecord> {
    let extra_raw: String = row.get(24)?;
    let extra = serde_json::from_str(&extra_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(24, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_raw: String = row.get(26)?;
    let updated_raw: String = row.get(27)?;

    Ok(ProductionRecord {
        id: row.get(0)?,
        input: ProductionInput {
            code: row.get(1)?,
            description: row.get(2)?,
            machine: row.get(3)?,
            packaging: row.get(4)?,
            classification: row.get(5)?,
            units_per_box: row.get(6)?,
            net_weight_per_unit_kg: row.get(7)?,
            batch_recipe_kg: row.get(8)?,
            shift1_target: row.get(9)?,
            shift1_actual_kg: row.get(10)?,
            shift1_actual_boxes: row.get(11)?,
            shift2_target: row.get(12)?,
            shift2_actual_kg: row.get(13)?,
            shift2_actual_boxes: row.get(14)?,
            extra,
        },
        metrics: DerivedMetrics {
            daily_plan_boxes: row.get(15)?,
            boxes_for_target: row.get(16)?,
            recipe_batch_units: row.get(17)?,
            efficiency_shift1: row.get(18)?,
            efficiency_shift2: row.get(19)?,
            total_actual_kg: row.get(20)?,
            total_actual_boxes: row.get(21)?,
            plan_vs_actual_delta_kg: row.get(22)?,
            total_efficiency: row.get(23)?,
        },
        revision: row.get(25)?,
        created_at: parse_ts(&created_raw, 26)?,
        updated_at: parse_ts(&updated_raw, 27)?,
    })
}
