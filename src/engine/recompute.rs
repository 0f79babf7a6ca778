// ==========================================
// 班次产量对账系统 - 派生指标重算
// ==========================================
// 职责: 对全部已存记录重跑派生计算，修复过期/缺失的派生字段
// 红线: 派生结果与存储值完全一致时不写入（一致的存储零写入）
// 红线: 单条失败只计数，不中断整个重算
// ==========================================

use crate::domain::production::ProductionRecord;
use crate::domain::types::MergeConsistency;
use crate::engine::derivation::RecordDerivation;
use crate::repository::error::RepositoryResult;
use crate::repository::production_repo::ProductionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

// ==========================================
// RecomputeSummary - 重算汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecomputeSummary {
    pub scanned: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: Vec<RecomputeFailure>,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeFailure {
    pub record_id: String,
    pub code: String,
    pub reason: String,
}

pub struct RecomputePass<S>
where
    S: ProductionStore,
{
    store: Arc<S>,
    derivation: RecordDerivation,
    consistency: MergeConsistency,
}

impl<S> RecomputePass<S>
where
    S: ProductionStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            derivation: RecordDerivation,
            consistency: MergeConsistency::LastWriteWins,
        }
    }

    /// 条件更新模式下，重算写回按 revision 校验；冲突的记录计入失败
    pub fn with_consistency(mut self, consistency: MergeConsistency) -> Self {
        self.consistency = consistency;
        self
    }

    /// 执行重算
    ///
    /// # 返回
    /// - Ok(RecomputeSummary): 扫描/写回/未变/失败统计
    /// - Err: 仅在无法列出记录时返回
    #[instrument(skip(self), fields(consistency = self.consistency.as_str()))]
    pub async fn run(&self) -> RepositoryResult<RecomputeSummary> {
        let started = Instant::now();
        let records = self.store.list_all().await?;

        let mut summary = RecomputeSummary {
            scanned: records.len(),
            ..Default::default()
        };

        for record in records {
            match self.recompute_one(&record).await {
                Ok(true) => summary.updated += 1,
                Ok(false) => summary.unchanged += 1,
                Err(e) => {
                    error!(record_id = %record.id, code = %record.code(), error = %e, "记录重算写回失败");
                    summary.failed.push(RecomputeFailure {
                        record_id: record.id.clone(),
                        code: record.code().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        summary.elapsed_ms = started.elapsed().as_millis();
        info!(
            scanned = summary.scanned,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed.len(),
            elapsed_ms = summary.elapsed_ms as u64,
            "派生指标重算完成"
        );
        Ok(summary)
    }

    /// 重算单条记录，返回是否写回
    async fn recompute_one(&self, record: &ProductionRecord) -> RepositoryResult<bool> {
        let derived = self.derivation.derive(record.input.clone());
        let stale = record.metrics.diff_fields(&derived.metrics);
        if stale.is_empty() {
            return Ok(false);
        }

        debug!(record_id = %record.id, code = %record.code(), fields = ?stale, "派生字段过期，写回");
        match self.consistency {
            MergeConsistency::LastWriteWins => self.store.update(&record.id, &derived).await?,
            MergeConsistency::Conditional => {
                self.store
                    .update_if_revision(&record.id, &derived, record.revision)
                    .await?
            }
        }
        Ok(true)
    }
}
