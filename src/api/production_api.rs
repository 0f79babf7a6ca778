// ==========================================
// 班次产量对账系统 - 生产记录 API
// ==========================================
// 职责: 班次导入、重算、记录查询、报表、目标配置、产品主数据
// 架构: API 层 → Importer / Engine → Repository
// ==========================================

use std::path::Path;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ShiftConfigReader};
use crate::domain::import::{DivergenceFinding, ImportBatch, ImportSummary, RawRow};
use crate::domain::product::ProductMaster;
use crate::domain::production::ProductionRecord;
use crate::domain::targets::TargetsConfig;
use crate::domain::types::Shift;
use crate::engine::recompute::{RecomputePass, RecomputeSummary};
use crate::engine::report::{
    self, ClassificationShare, ConsolidatedTotals, DashboardSummary, ResultsMetrics,
    ShiftSummary, TargetAttainment,
};
use crate::importer::{ShiftImporter, ShiftImporterImpl};
use crate::repository::{
    ImportBatchRepository, ProductMasterRepository, ProductionStore, RecordSnapshotStream,
    SqliteProductionStore,
};
use tracing::info;

/// 导入器具体类型
pub type DefaultShiftImporter = ShiftImporterImpl<SqliteProductionStore, ConfigManager>;

// ==========================================
// ProductionApi - 生产记录 API
// ==========================================
pub struct ProductionApi {
    store: Arc<SqliteProductionStore>,
    importer: Arc<DefaultShiftImporter>,
    config_manager: Arc<ConfigManager>,
    product_repo: Arc<ProductMasterRepository>,
    batch_repo: Arc<ImportBatchRepository>,
}

impl ProductionApi {
    /// 创建新的ProductionApi实例
    pub fn new(
        store: Arc<SqliteProductionStore>,
        importer: Arc<DefaultShiftImporter>,
        config_manager: Arc<ConfigManager>,
        product_repo: Arc<ProductMasterRepository>,
        batch_repo: Arc<ImportBatchRepository>,
    ) -> Self {
        Self {
            store,
            importer,
            config_manager,
            product_repo,
            batch_repo,
        }
    }

    // ==========================================
    // 导入
    // ==========================================

    /// 导入一批已解析的班次行
    ///
    /// # 参数
    /// - shift_number: 班次编号（1 / 2）
    /// - rows: 原始行
    pub async fn import_shift(&self, shift_number: u8, rows: Vec<RawRow>) -> ApiResult<ImportSummary> {
        let shift = parse_shift(shift_number)?;
        Ok(self.importer.import_rows(shift, rows, None).await?)
    }

    /// 从文件导入班次数据（.json / .jsonl / .ndjson）
    pub async fn import_shift_file(&self, shift_number: u8, file_path: &str) -> ApiResult<ImportSummary> {
        let shift = parse_shift(shift_number)?;
        if file_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件路径不能为空".to_string()));
        }
        Ok(self.importer.import_file(shift, Path::new(file_path)).await?)
    }

    /// 最近的导入批次
    pub fn recent_batches(&self, limit: usize) -> ApiResult<Vec<ImportBatch>> {
        let limit = limit.clamp(1, 100);
        Ok(self.batch_repo.recent_batches(limit)?)
    }

    // ==========================================
    // 重算
    // ==========================================

    /// 对全部记录重跑派生计算（按当前一致性模式写回）
    pub async fn recompute_all(&self) -> ApiResult<RecomputeSummary> {
        let consistency = self.config_manager.get_merge_consistency().await?;
        let summary = RecomputePass::new(self.store.clone())
            .with_consistency(consistency)
            .run()
            .await?;
        Ok(summary)
    }

    // ==========================================
    // 记录查询
    // ==========================================

    /// 全部记录（created_at 倒序）
    pub async fn list_records(&self) -> ApiResult<Vec<ProductionRecord>> {
        Ok(self.store.list_all().await?)
    }

    /// 按主键查询记录
    pub async fn get_record(&self, id: &str) -> ApiResult<ProductionRecord> {
        if id.trim().is_empty() {
            return Err(ApiError::InvalidInput("记录ID不能为空".to_string()));
        }
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("生产记录(id={})不存在", id)))
    }

    /// 按产品编码查询记录
    pub async fn get_record_by_code(&self, code: &str) -> ApiResult<Option<ProductionRecord>> {
        Ok(self.store.find_by_code(code.trim()).await?)
    }

    /// 订阅全量快照
    pub fn watch_records(&self) -> RecordSnapshotStream {
        self.store.watch_all()
    }

    // ==========================================
    // 报表
    // ==========================================

    pub async fn get_dashboard_summary(&self) -> ApiResult<DashboardSummary> {
        let records = self.store.list_all().await?;
        Ok(report::dashboard_summary(&records))
    }

    pub async fn get_consolidated_totals(&self) -> ApiResult<ConsolidatedTotals> {
        let records = self.store.list_all().await?;
        Ok(report::consolidated_totals(&records))
    }

    pub async fn get_shift_summary(&self, shift_number: u8) -> ApiResult<ShiftSummary> {
        let shift = parse_shift(shift_number)?;
        let records = self.store.list_all().await?;
        Ok(report::shift_summary(&records, shift))
    }

    pub async fn get_classification_breakdown(&self) -> ApiResult<Vec<ClassificationShare>> {
        let records = self.store.list_all().await?;
        Ok(report::classification_breakdown(&records))
    }

    /// 结果指标（可按分类过滤）
    pub async fn get_results_metrics(&self, category: Option<&str>) -> ApiResult<ResultsMetrics> {
        let records = self.store.list_all().await?;
        Ok(report::results_metrics(&records, category))
    }

    /// 班次偏差报告（按当前阈值分级）
    pub async fn get_divergence_report(&self) -> ApiResult<Vec<DivergenceFinding>> {
        let thresholds = self.config_manager.get_divergence_thresholds().await?;
        let records = self.store.list_all().await?;
        Ok(report::divergence_report(&records, &thresholds))
    }

    pub async fn get_target_attainment(&self) -> ApiResult<TargetAttainment> {
        let targets = self.config_manager.get_targets().await?;
        let records = self.store.list_all().await?;
        Ok(report::target_attainment(&records, &targets))
    }

    // ==========================================
    // 目标配置
    // ==========================================

    pub async fn get_targets(&self) -> ApiResult<TargetsConfig> {
        Ok(self.config_manager.get_targets().await?)
    }

    /// 更新产量目标（校验失败返回 ValidationError）
    pub fn update_targets(&self, targets: &TargetsConfig) -> ApiResult<()> {
        self.config_manager.update_targets(targets)?;
        Ok(())
    }

    /// 全部 global 配置（JSON）
    pub fn get_config_snapshot(&self) -> ApiResult<serde_json::Value> {
        let snapshot = self.config_manager.get_config_snapshot()?;
        serde_json::from_str(&snapshot).map_err(|e| ApiError::InternalError(e.to_string()))
    }

    // ==========================================
    // 产品主数据
    // ==========================================

    pub fn upsert_product(&self, product: &ProductMaster) -> ApiResult<()> {
        self.product_repo.upsert(product)?;
        info!(code = %product.code, active = product.active, "产品主数据已保存");
        Ok(())
    }

    pub fn list_products(&self) -> ApiResult<Vec<ProductMaster>> {
        Ok(self.product_repo.list_all()?)
    }
}

fn parse_shift(shift_number: u8) -> ApiResult<Shift> {
    Shift::from_number(shift_number)
        .ok_or_else(|| ApiError::InvalidInput(format!("无效的班次: {}，应为 1 或 2", shift_number)))
}
