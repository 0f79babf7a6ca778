// ==========================================
// 班次产量对账系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::shift_config_trait::ShiftConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::targets::TargetsConfig;
use crate::domain::types::MergeConsistency;
use crate::engine::divergence::DivergenceThresholds;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![GLOBAL_SCOPE, key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置，解析失败回退默认值
    fn get_f64_or_default(&self, key: &str, default: f64) -> RepositoryResult<f64> {
        let raw = match self.get_global_config_value(key)? {
            Some(raw) => raw,
            None => return Ok(default),
        };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => {
                warn!(key, value = %raw, default, "配置值不是有效数字，使用默认值");
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 诊断输出（CLI report）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 更新产量目标（先校验，全部合规才写入）
    ///
    /// # 错误
    /// - ValidationError: 任一字段不合规（消息包含全部不合规项）
    pub fn update_targets(&self, targets: &TargetsConfig) -> RepositoryResult<()> {
        targets
            .validate()
            .map_err(|problems| RepositoryError::ValidationError(problems.join("; ")))?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        for (key, value) in [
            (config_keys::DAILY_TARGET_KG, targets.daily_target_kg),
            (config_keys::MONTHLY_TARGET_KG, targets.monthly_target_kg),
            (config_keys::CONVERSION_FACTOR, targets.conversion_factor),
            (
                config_keys::EFFICIENCY_TOLERANCE_PCT,
                targets.efficiency_tolerance_pct,
            ),
        ] {
            tx.execute(
                "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
                params![GLOBAL_SCOPE, key, value.to_string(), now],
            )?;
        }
        tx.commit()?;

        info!(
            daily = targets.daily_target_kg,
            monthly = targets.monthly_target_kg,
            factor = targets.conversion_factor,
            tolerance = targets.efficiency_tolerance_pct,
            "产量目标已更新"
        );
        Ok(())
    }
}

#[async_trait]
impl ShiftConfigReader for ConfigManager {
    async fn get_targets(&self) -> RepositoryResult<TargetsConfig> {
        let defaults = TargetsConfig::default();
        Ok(TargetsConfig {
            daily_target_kg: self
                .get_f64_or_default(config_keys::DAILY_TARGET_KG, defaults.daily_target_kg)?,
            monthly_target_kg: self
                .get_f64_or_default(config_keys::MONTHLY_TARGET_KG, defaults.monthly_target_kg)?,
            conversion_factor: self
                .get_f64_or_default(config_keys::CONVERSION_FACTOR, defaults.conversion_factor)?,
            efficiency_tolerance_pct: self.get_f64_or_default(
                config_keys::EFFICIENCY_TOLERANCE_PCT,
                defaults.efficiency_tolerance_pct,
            )?,
        })
    }

    async fn get_divergence_thresholds(&self) -> RepositoryResult<DivergenceThresholds> {
        let defaults = DivergenceThresholds::default();
        Ok(DivergenceThresholds {
            caution_pct: self
                .get_f64_or_default(config_keys::DIVERGENCE_CAUTION_PCT, defaults.caution_pct)?,
            attention_pct: self.get_f64_or_default(
                config_keys::DIVERGENCE_ATTENTION_PCT,
                defaults.attention_pct,
            )?,
        })
    }

    async fn get_merge_consistency(&self) -> RepositoryResult<MergeConsistency> {
        let value = self.get_config_or_default(
            config_keys::MERGE_CONSISTENCY,
            MergeConsistency::LastWriteWins.as_str(),
        )?;
        Ok(MergeConsistency::parse(&value))
    }

    async fn get_merge_max_retries(&self) -> RepositoryResult<u32> {
        let value = self.get_config_or_default(config_keys::MERGE_MAX_RETRIES, "3")?;
        Ok(value.trim().parse::<u32>().unwrap_or(3))
    }

    async fn is_catalog_enrichment_enabled(&self) -> RepositoryResult<bool> {
        let value = self.get_config_or_default(config_keys::CATALOG_ENRICHMENT_ENABLED, "1")?;
        Ok(!matches!(
            value.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 产量目标
    pub const DAILY_TARGET_KG: &str = "daily_target_kg";
    pub const MONTHLY_TARGET_KG: &str = "monthly_target_kg";
    pub const CONVERSION_FACTOR: &str = "conversion_factor";
    pub const EFFICIENCY_TOLERANCE_PCT: &str = "efficiency_tolerance_pct";

    // 班次偏差
    pub const DIVERGENCE_CAUTION_PCT: &str = "divergence_caution_pct";
    pub const DIVERGENCE_ATTENTION_PCT: &str = "divergence_attention_pct";

    // 合并
    pub const MERGE_CONSISTENCY: &str = "merge_consistency"; // LAST_WRITE_WINS / CONDITIONAL
    pub const MERGE_MAX_RETRIES: &str = "merge_max_retries";

    // 主数据补全
    pub const CATALOG_ENRICHMENT_ENABLED: &str = "catalog_enrichment_enabled";
}
