// ==========================================
// 班次产量对账系统 - 班次导入器实现
// ==========================================
// 职责: 整合导入流程，从原始行到生产记录
// 流程: 映射 → DQ 校验 → 主数据补全 → 合并 → 落库 → 批次记录
// 红线: 行按顺序逐条处理，每行等待写入完成；单行失败不中断批次
// ==========================================

use crate::config::{MergeSettings, ShiftConfigReader};
use crate::domain::import::{
    DqLevel, ImportBatch, ImportSummary, ImportedRow, RawRow, RowDiagnostic, RowOutcome,
    UpsertAction,
};
use crate::domain::product::ProductMaster;
use crate::domain::types::{MergeConsistency, Shift};
use crate::engine::merge::{ShiftMergePolicy, UpsertInstruction};
use crate::importer::dq_validator::DqValidator as DqValidatorImpl;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::shift_importer_trait::{
    DqValidator, FieldMapper, MappedRow, RowSource, ShiftImporter, SourceRow,
};
use crate::repository::{ImportBatchRepository, ProductCatalog, ProductionStore};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ShiftImporterImpl - 班次导入器实现
// ==========================================
pub struct ShiftImporterImpl<S, C>
where
    S: ProductionStore,
    C: ShiftConfigReader,
{
    // 数据访问层
    store: Arc<S>,
    catalog: Option<Arc<dyn ProductCatalog>>,
    batch_repo: Option<Arc<ImportBatchRepository>>,

    // 配置读取器
    config: Arc<C>,

    // 导入组件
    row_source: Box<dyn RowSource>,
    field_mapper: Box<dyn FieldMapper>,
    dq_validator: Box<dyn DqValidator>,
}

impl<S, C> ShiftImporterImpl<S, C>
where
    S: ProductionStore,
    C: ShiftConfigReader,
{
    /// 创建新的 ShiftImporter 实例
    ///
    /// # 参数
    /// - store: 生产记录存储
    /// - config: 配置读取器
    /// - row_source: 行来源
    /// - field_mapper: 字段映射器
    /// - dq_validator: DQ 校验器
    pub fn new(
        store: Arc<S>,
        config: Arc<C>,
        row_source: Box<dyn RowSource>,
        field_mapper: Box<dyn FieldMapper>,
        dq_validator: Box<dyn DqValidator>,
    ) -> Self {
        Self {
            store,
            catalog: None,
            batch_repo: None,
            config,
            row_source,
            field_mapper,
            dq_validator,
        }
    }

    /// 启用产品主数据补全
    pub fn with_catalog(mut self, catalog: Arc<dyn ProductCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// 记录导入批次
    pub fn with_batch_repo(mut self, batch_repo: Arc<ImportBatchRepository>) -> Self {
        self.batch_repo = Some(batch_repo);
        self
    }

    /// 读取合并参数，失败时使用默认值
    async fn load_settings(&self) -> MergeSettings {
        match self.config.load_merge_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "合并参数读取失败，使用默认值");
                MergeSettings::default()
            }
        }
    }

    /// 查询在用产品主数据（失败只告警）
    async fn lookup_catalog(&self, code: &str, settings: &MergeSettings) -> Option<ProductMaster> {
        if !settings.catalog_enrichment_enabled {
            return None;
        }
        let catalog = self.catalog.as_ref()?;
        match catalog.find_active_by_code(code).await {
            Ok(master) => master,
            Err(e) => {
                warn!(code = %code, error = %e, "产品主数据查询失败，跳过补全");
                None
            }
        }
    }

    /// 合并并写入单行
    ///
    /// # 一致性
    /// - LAST_WRITE_WINS: 读取 → 合并 → 覆盖写入
    /// - CONDITIONAL: 按 revision 条件写入，写冲突时重读重试，超过上限返回 MergeConflict
    pub async fn import_row(
        &self,
        shift: Shift,
        row: MappedRow,
        policy: &ShiftMergePolicy,
        settings: &MergeSettings,
    ) -> ImportResult<RowOutcome> {
        let code = row.input.code.clone();
        let master = self.lookup_catalog(&code, settings).await;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let existing = self.store.find_by_code(&code).await?;
            let outcome = policy.merge(shift, row.input.clone(), existing.as_ref(), master.as_ref());

            let written = match &outcome.instruction {
                UpsertInstruction::Create => self
                    .store
                    .create(&outcome.derived)
                    .await
                    .map(|id| (id, UpsertAction::Created)),
                UpsertInstruction::Update {
                    id,
                    expected_revision,
                } => {
                    let result = match settings.consistency {
                        MergeConsistency::LastWriteWins => {
                            self.store.update(id, &outcome.derived).await
                        }
                        MergeConsistency::Conditional => {
                            self.store
                                .update_if_revision(id, &outcome.derived, *expected_revision)
                                .await
                        }
                    };
                    result.map(|_| (id.clone(), UpsertAction::Updated))
                }
            };

            match written {
                Ok((record_id, action)) => {
                    debug!(row_number = row.row_number, code = %code, ?action, attempts, "行写入完成");
                    return Ok(RowOutcome {
                        row_number: row.row_number,
                        code,
                        record_id,
                        action,
                        attempts,
                        notices: outcome.notices,
                    });
                }
                Err(e)
                    if settings.consistency == MergeConsistency::Conditional
                        && e.is_write_conflict() =>
                {
                    if attempts > settings.max_retries {
                        return Err(ImportError::MergeConflict { code, attempts });
                    }
                    warn!(code = %code, attempts, error = %e, "写冲突，重读后重试");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// 写入批次记录（失败只告警）
    fn log_batch(&self, summary: &ImportSummary, source: Option<String>) {
        let repo = match &self.batch_repo {
            Some(repo) => repo,
            None => return,
        };
        let result = ImportBatch::from_summary(summary, source)
            .map_err(crate::repository::RepositoryError::from)
            .and_then(|batch| repo.insert_batch(&batch));
        if let Err(e) = result {
            warn!(batch_id = %summary.batch_id, error = %e, "导入批次记录写入失败");
        }
    }

    /// 执行一个导入批次
    ///
    /// # 参数
    /// - rows: 按源顺序的行（解析失败的行记为跳过并写入 ERROR 诊断）
    #[instrument(skip(self, rows, source), fields(shift = %shift, batch_id = tracing::field::Empty))]
    async fn run_batch(
        &self,
        shift: Shift,
        rows: Vec<SourceRow>,
        source: Option<String>,
    ) -> ImportResult<ImportSummary> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let total_rows = rows.len();
        info!(batch_id = %batch_id, total_rows, "开始导入班次数据");

        let settings = self.load_settings().await;
        let policy = ShiftMergePolicy::new(settings.thresholds);

        let mut summary = ImportSummary {
            batch_id: batch_id.clone(),
            shift,
            total_rows,
            created: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            diagnostics: Vec::new(),
            notices: Vec::new(),
            elapsed_ms: 0,
        };

        // === 步骤 1: 字段映射 ===
        let mut mapped_rows = Vec::with_capacity(total_rows);
        for (idx, source_row) in rows.into_iter().enumerate() {
            let mapped = source_row.and_then(|cells| {
                let imported = ImportedRow {
                    shift,
                    row_number: idx + 1,
                    cells,
                };
                self.field_mapper.map_row(&imported)
            });
            match mapped {
                Ok(mapped) => mapped_rows.push(mapped),
                Err(ImportError::ProductCodeMissing(row_number)) => {
                    warn!(row_number, "产品编码缺失，跳过该行");
                    summary.skipped += 1;
                    summary
                        .diagnostics
                        .push(DqValidatorImpl::missing_code(row_number));
                }
                Err(e) => {
                    warn!(row_number = idx + 1, error = %e, "行解析或字段映射失败，跳过该行");
                    summary.skipped += 1;
                    summary.diagnostics.push(RowDiagnostic {
                        row_number: idx + 1,
                        code: None,
                        level: DqLevel::Error,
                        field: "row".to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        // === 步骤 2: DQ 校验 ===
        for row in &mapped_rows {
            summary
                .diagnostics
                .extend(self.dq_validator.validate_row(shift, row));
        }
        summary
            .diagnostics
            .extend(self.dq_validator.detect_duplicates(&mapped_rows));
        debug!(
            mapped = mapped_rows.len(),
            diagnostics = summary.diagnostics.len(),
            "字段映射与 DQ 校验完成"
        );

        // === 步骤 3: 逐行合并写入 ===
        for row in mapped_rows {
            let row_number = row.row_number;
            let code = row.input.code.clone();
            match self.import_row(shift, row, &policy, &settings).await {
                Ok(outcome) => {
                    match outcome.action {
                        UpsertAction::Created => summary.created += 1,
                        UpsertAction::Updated => summary.updated += 1,
                    }
                    summary.notices.extend(outcome.notices);
                }
                Err(e) => {
                    error!(row_number, code = %code, error = %e, "行写入失败");
                    summary.failed += 1;
                    summary.diagnostics.push(RowDiagnostic {
                        row_number,
                        code: Some(code),
                        level: DqLevel::Error,
                        field: "record".to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        summary
            .diagnostics
            .sort_by_key(|d| d.row_number);
        summary.elapsed_ms = start_time.elapsed().as_millis();

        info!(
            batch_id = %batch_id,
            total = total_rows,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            notices = summary.notices.len(),
            elapsed_ms = summary.elapsed_ms as u64,
            "班次数据导入完成"
        );

        self.log_batch(&summary, source);
        Ok(summary)
    }
}

#[async_trait]
impl<S, C> ShiftImporter for ShiftImporterImpl<S, C>
where
    S: ProductionStore,
    C: ShiftConfigReader,
{
    async fn import_rows(
        &self,
        shift: Shift,
        rows: Vec<RawRow>,
        source: Option<String>,
    ) -> ImportResult<ImportSummary> {
        let rows = rows.into_iter().map(Ok).collect();
        self.run_batch(shift, rows, source).await
    }

    async fn import_file(&self, shift: Shift, path: &Path) -> ImportResult<ImportSummary> {
        let rows = self.row_source.read_rows(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "行来源读取失败");
            e
        })?;
        self.run_batch(shift, rows, Some(path.display().to_string()))
            .await
    }
}
