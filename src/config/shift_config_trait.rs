// ==========================================
// 班次产量对账系统 - 班次导入配置读取 Trait
// ==========================================
// 职责: 定义导入 / 报表所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::targets::TargetsConfig;
use crate::domain::types::MergeConsistency;
use crate::engine::divergence::DivergenceThresholds;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// MergeSettings - 单批次导入使用的合并参数
// ==========================================
// 每个批次开始时读取一次，批次内不变
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeSettings {
    pub consistency: MergeConsistency,
    pub max_retries: u32,
    pub thresholds: DivergenceThresholds,
    pub catalog_enrichment_enabled: bool,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            consistency: MergeConsistency::LastWriteWins,
            max_retries: 3,
            thresholds: DivergenceThresholds::default(),
            catalog_enrichment_enabled: true,
        }
    }
}

// ==========================================
// ShiftConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ShiftConfigReader: Send + Sync {
    /// 获取产量目标
    ///
    /// # 默认值
    /// - 1000 / 30000 / 1.0 / 5
    async fn get_targets(&self) -> RepositoryResult<TargetsConfig>;

    /// 获取偏差分级阈值
    ///
    /// # 默认值
    /// - caution 10%, attention 25%
    async fn get_divergence_thresholds(&self) -> RepositoryResult<DivergenceThresholds>;

    /// 获取合并一致性模式
    ///
    /// # 默认值
    /// - LAST_WRITE_WINS
    async fn get_merge_consistency(&self) -> RepositoryResult<MergeConsistency>;

    /// 获取条件更新冲突时的最大重试次数
    ///
    /// # 默认值
    /// - 3
    async fn get_merge_max_retries(&self) -> RepositoryResult<u32>;

    /// 是否启用产品主数据补全
    ///
    /// # 默认值
    /// - true
    async fn is_catalog_enrichment_enabled(&self) -> RepositoryResult<bool>;

    /// 一次读取全部合并参数
    async fn load_merge_settings(&self) -> RepositoryResult<MergeSettings> {
        Ok(MergeSettings {
            consistency: self.get_merge_consistency().await?,
            max_retries: self.get_merge_max_retries().await?,
            thresholds: self.get_divergence_thresholds().await?,
            catalog_enrichment_enabled: self.is_catalog_enrichment_enabled().await?,
        })
    }
}
