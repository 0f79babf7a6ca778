// ==========================================
// 班次导入集成测试
// ==========================================
// 测试目标: 1 班 → 2 班合并、行级跳过、偏差提示、主数据补全、
//           条件更新重试、批次记录
// ==========================================


use async_trait::async_trait;
use chrono::Utc;
use shift_reconcile::config::config_keys;
use shift_reconcile::domain::{
    CellValue, DerivedProduction, DivergenceLevel, DqLevel, MergeNotice, ProductMaster,
    ProductionRecord, Shift,
};
use shift_reconcile::importer::ShiftImporter;
use shift_reconcile::logging;
use shift_reconcile::repository::{
    ProductionStore, RecordSnapshotStream, RepositoryError, RepositoryResult,
    SqliteProductionStore,
};
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use test_helpers::{create_test_db, importer_for, raw_row, shift1_row, shift2_row, TestEnv};

// ==========================================
// 冲突注入 Store：前 N 次条件更新返回乐观锁冲突
// ==========================================
struct ConflictingStore {
    inner: SqliteProductionStore,
    conflicts_left: AtomicU32,
    conditional_calls: AtomicU32,
}

impl ConflictingStore {
    fn new(inner: SqliteProductionStore, conflicts: u32) -> Self {
        Self {
            inner,
            conflicts_left: AtomicU32::new(conflicts),
            conditional_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ProductionStore for ConflictingStore {
    async fn find_by_code(&self, code: &str) -> RepositoryResult<Option<ProductionRecord>> {
        self.inner.find_by_code(code).await
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<ProductionRecord>> {
        self.inner.find_by_id(id).await
    }

    async fn create(&self, record: &DerivedProduction) -> RepositoryResult<String> {
        self.inner.create(record).await
    }

    async fn update(&self, id: &str, record: &DerivedProduction) -> RepositoryResult<()> {
        self.inner.update(id, record).await
    }

    async fn update_if_revision(
        &self,
        id: &str,
        record: &DerivedProduction,
        expected_revision: i64,
    ) -> RepositoryResult<()> {
        self.conditional_calls.fetch_add(1, Ordering::SeqCst);
        let left = self.conflicts_left.load(Ordering::SeqCst);
        if left > 0 {
            self.conflicts_left.store(left - 1, Ordering::SeqCst);
            return Err(RepositoryError::OptimisticLockFailure {
                record_id: id.to_string(),
                expected: expected_revision,
                actual: expected_revision + 1,
            });
        }
        self.inner
            .update_if_revision(id, record, expected_revision)
            .await
    }

    async fn list_all(&self) -> RepositoryResult<Vec<ProductionRecord>> {
        self.inner.list_all().await
    }

    fn watch_all(&self) -> RecordSnapshotStream {
        self.inner.watch_all()
    }
}

fn product(code: &str, active: bool) -> ProductMaster {
    ProductMaster {
        code: code.to_string(),
        description: "Bolacha Agua e Sal".to_string(),
        machine: "M-02".to_string(),
        packaging: "Pacote".to_string(),
        classification: "Salgado".to_string(),
        units_per_box: 20.0,
        net_weight_per_unit_kg: 0.2,
        batch_recipe_kg: 40.0,
        active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ==========================================
// 两班次合并
// ==========================================

#[tokio::test]
async fn test_shift1_then_shift2_produces_full_record() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);
    let importer = env.importer();

    let s1 = importer
        .import_rows(Shift::First, vec![shift1_row("P-100")], None)
        .await
        .unwrap();
    assert_eq!(s1.created, 1);
    assert_eq!(s1.updated, 0);

    let s2 = importer
        .import_rows(Shift::Second, vec![shift2_row("P-100")], None)
        .await
        .unwrap();
    assert_eq!(s2.created, 0);
    assert_eq!(s2.updated, 1);
    // 90 vs 95 为正常区间，没有提示
    assert!(s2.notices.is_empty());

    let records = env.store.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];

    // 1 班字段保留
    assert_eq!(record.input.shift1_target, 100.0);
    assert_eq!(record.input.shift1_actual_kg, 90.0);
    assert_eq!(record.input.shift1_actual_boxes, 18.0);
    // 2 班字段写入
    assert_eq!(record.input.shift2_target, 100.0);
    assert_eq!(record.input.shift2_actual_kg, 95.0);
    // 2 班行没有描述字段，沿用已有记录
    assert_eq!(record.input.description, "Biscoito Maria");
    assert_eq!(record.input.units_per_box, 10.0);

    assert_eq!(record.metrics.efficiency_shift1, 90.0);
    assert_eq!(record.metrics.efficiency_shift2, 95.0);
    assert_eq!(record.metrics.total_actual_kg, 185.0);
    assert_eq!(record.metrics.total_actual_boxes, 37.0);
    assert_eq!(record.metrics.plan_vs_actual_delta_kg, -15.0);
    assert_eq!(record.metrics.total_efficiency, 92.5);
    assert_eq!(record.metrics.daily_plan_boxes, 40.0);
    assert_eq!(record.metrics.boxes_for_target, 40.0);
    assert_eq!(record.metrics.recipe_batch_units, 4.0);
    assert_eq!(record.revision, 2);
}

#[tokio::test]
async fn test_shift2_reimport_keeps_shift1_fields() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);
    let importer = env.importer();

    importer
        .import_rows(Shift::First, vec![shift1_row("P-1")], None)
        .await
        .unwrap();
    importer
        .import_rows(Shift::Second, vec![shift2_row("P-1")], None)
        .await
        .unwrap();

    // 再次导入 1 班，2 班字段不受影响
    let mut again = shift1_row("P-1");
    again.insert("KG".to_string(), CellValue::Number(100.0));
    importer
        .import_rows(Shift::First, vec![again], None)
        .await
        .unwrap();

    let record = env.store.find_by_code("P-1").await.unwrap().unwrap();
    assert_eq!(record.input.shift1_actual_kg, 100.0);
    assert_eq!(record.input.shift2_actual_kg, 95.0);
    assert_eq!(record.metrics.total_actual_kg, 195.0);
    assert_eq!(record.revision, 3);
}

#[tokio::test]
async fn test_shift2_without_shift1_reports_missing_first_shift() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);

    let summary = env
        .importer()
        .import_rows(Shift::Second, vec![shift2_row("P-9")], None)
        .await
        .unwrap();

    assert_eq!(summary.created, 1);
    assert!(summary
        .notices
        .iter()
        .any(|n| matches!(n, MergeNotice::MissingFirstShift { code } if code == "P-9")));

    let record = env.store.find_by_code("P-9").await.unwrap().unwrap();
    assert_eq!(record.input.shift1_actual_kg, 0.0);
    assert_eq!(record.metrics.efficiency_shift1, 0.0);
    assert_eq!(record.metrics.efficiency_shift2, 95.0);
}

// ==========================================
// 行级失败不中断批次
// ==========================================

#[tokio::test]
async fn test_missing_code_row_is_skipped() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);

    let rows = vec![
        shift1_row("A"),
        shift1_row("B"),
        raw_row(&[("CÓDIGO", CellValue::Empty), ("KG", 10.0.into())]),
        shift1_row("C"),
        shift1_row("D"),
    ];
    let summary = env
        .importer()
        .import_rows(Shift::First, rows, None)
        .await
        .unwrap();

    assert_eq!(summary.total_rows, 5);
    assert_eq!(summary.created, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.persisted(), 4);

    let errors: Vec<_> = summary
        .diagnostics
        .iter()
        .filter(|d| d.level == DqLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].row_number, 3);

    assert_eq!(env.store.list_all().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_non_numeric_and_negative_cells_are_diagnosed() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);

    let rows = vec![raw_row(&[
        ("CÓDIGO", "P-2".into()),
        ("1 TURNO", 100.0.into()),
        ("KG", "noventa".into()),
        ("CXS", (-3.0).into()),
    ])];
    let summary = env
        .importer()
        .import_rows(Shift::First, rows, None)
        .await
        .unwrap();

    assert_eq!(summary.created, 1);
    assert!(summary
        .diagnostics
        .iter()
        .any(|d| d.level == DqLevel::Info && d.field == "shift1_actual_kg"));
    assert!(summary
        .diagnostics
        .iter()
        .any(|d| d.level == DqLevel::Warning && d.field == "shift1_actual_boxes"));

    let record = env.store.find_by_code("P-2").await.unwrap().unwrap();
    assert_eq!(record.input.shift1_actual_kg, 0.0);
    assert_eq!(record.input.shift1_actual_boxes, -3.0);
}

#[tokio::test]
async fn test_duplicate_code_in_batch_later_row_wins() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);

    let mut second = shift1_row("P-3");
    second.insert("KG".to_string(), CellValue::Number(70.0));
    let summary = env
        .importer()
        .import_rows(Shift::First, vec![shift1_row("P-3"), second], None)
        .await
        .unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.updated, 1);
    assert!(summary
        .diagnostics
        .iter()
        .any(|d| d.level == DqLevel::Info && d.row_number == 2 && d.field == "code"));

    let record = env.store.find_by_code("P-3").await.unwrap().unwrap();
    assert_eq!(record.input.shift1_actual_kg, 70.0);
}

// ==========================================
// 偏差提示
// ==========================================

#[tokio::test]
async fn test_divergence_notice_on_shift2() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);
    let importer = env.importer();

    importer
        .import_rows(Shift::First, vec![shift1_row("P-4")], None)
        .await
        .unwrap();

    let mut low = shift2_row("P-4");
    low.insert("KG2".to_string(), CellValue::Number(45.0));
    let summary = importer
        .import_rows(Shift::Second, vec![low], None)
        .await
        .unwrap();

    let divergences = summary.divergences();
    assert_eq!(divergences.len(), 1);
    assert_eq!(divergences[0].code, "P-4");
    assert_eq!(divergences[0].level, DivergenceLevel::Attention);
}

#[tokio::test]
async fn test_divergence_thresholds_from_config() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);
    env.config
        .set_global_config_value(config_keys::DIVERGENCE_CAUTION_PCT, "2")
        .unwrap();
    let importer = env.importer();

    importer
        .import_rows(Shift::First, vec![shift1_row("P-5")], None)
        .await
        .unwrap();
    let summary = importer
        .import_rows(Shift::Second, vec![shift2_row("P-5")], None)
        .await
        .unwrap();

    // 90 vs 95 ≈ 5.4%，阈值 2% 时为 CAUTION
    let divergences = summary.divergences();
    assert_eq!(divergences.len(), 1);
    assert_eq!(divergences[0].level, DivergenceLevel::Caution);
}

// ==========================================
// 主数据补全
// ==========================================

#[tokio::test]
async fn test_catalog_fills_blank_master_fields() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);
    env.products.upsert(&product("P-6", true)).unwrap();

    let rows = vec![raw_row(&[
        ("CÓDIGO", "P-6".into()),
        ("DESCRIÇÃO PRODUTO", "Nome da planilha".into()),
        ("1 TURNO", 80.0.into()),
        ("KG", 80.0.into()),
    ])];
    env.importer()
        .import_rows(Shift::First, rows, None)
        .await
        .unwrap();

    let record = env.store.find_by_code("P-6").await.unwrap().unwrap();
    // 导入行优先
    assert_eq!(record.input.description, "Nome da planilha");
    // 空白字段由主数据补全
    assert_eq!(record.input.machine, "M-02");
    assert_eq!(record.input.classification, "Salgado");
    assert_eq!(record.input.units_per_box, 20.0);
    // 80 / (0.2 × 20) = 20
    assert_eq!(record.metrics.daily_plan_boxes, 20.0);
    assert_eq!(record.metrics.recipe_batch_units, 2.0);
}

#[tokio::test]
async fn test_inactive_or_disabled_catalog_is_ignored() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);
    env.products.upsert(&product("P-7", false)).unwrap();
    env.products.upsert(&product("P-8", true)).unwrap();
    env.config
        .set_global_config_value(config_keys::CATALOG_ENRICHMENT_ENABLED, "false")
        .unwrap();

    let rows = vec![
        raw_row(&[("CÓDIGO", "P-7".into()), ("KG", 10.0.into())]),
        raw_row(&[("CÓDIGO", "P-8".into()), ("KG", 10.0.into())]),
    ];
    env.importer()
        .import_rows(Shift::First, rows, None)
        .await
        .unwrap();

    for code in ["P-7", "P-8"] {
        let record = env.store.find_by_code(code).await.unwrap().unwrap();
        assert_eq!(record.input.machine, "");
        assert_eq!(record.input.units_per_box, 0.0);
    }
}

// ==========================================
// 条件更新重试
// ==========================================

#[tokio::test]
async fn test_conditional_update_retries_until_success() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);
    env.config
        .set_global_config_value(config_keys::MERGE_CONSISTENCY, "CONDITIONAL")
        .unwrap();
    env.config
        .set_global_config_value(config_keys::MERGE_MAX_RETRIES, "3")
        .unwrap();

    let store = Arc::new(ConflictingStore::new((*env.store).clone(), 2));
    let importer = importer_for(store.clone(), env.config.clone());

    importer
        .import_rows(Shift::First, vec![shift1_row("P-10")], None)
        .await
        .unwrap();
    let summary = importer
        .import_rows(Shift::Second, vec![shift2_row("P-10")], None)
        .await
        .unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(store.conditional_calls.load(Ordering::SeqCst), 3);

    let record = env.store.find_by_code("P-10").await.unwrap().unwrap();
    assert_eq!(record.input.shift2_actual_kg, 95.0);
    assert_eq!(record.revision, 2);
}

#[tokio::test]
async fn test_conditional_update_gives_up_after_max_retries() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);
    env.config
        .set_global_config_value(config_keys::MERGE_CONSISTENCY, "CONDITIONAL")
        .unwrap();
    env.config
        .set_global_config_value(config_keys::MERGE_MAX_RETRIES, "2")
        .unwrap();

    let store = Arc::new(ConflictingStore::new((*env.store).clone(), 100));
    let importer = importer_for(store.clone(), env.config.clone());

    importer
        .import_rows(Shift::First, vec![shift1_row("P-11"), shift1_row("P-12")], None)
        .await
        .unwrap();
    let summary = importer
        .import_rows(
            Shift::Second,
            vec![shift2_row("P-11"), shift2_row("P-12")],
            None,
        )
        .await
        .unwrap();

    // 每行 1 次 + 2 次重试
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.updated, 0);
    assert_eq!(store.conditional_calls.load(Ordering::SeqCst), 6);
    let conflicts: Vec<_> = summary
        .diagnostics
        .iter()
        .filter(|d| d.level == DqLevel::Error && d.field == "record")
        .collect();
    assert_eq!(conflicts.len(), 2);
    assert!(conflicts[0].message.contains("P-11"));

    // 未写入
    let record = env.store.find_by_code("P-11").await.unwrap().unwrap();
    assert_eq!(record.input.shift2_actual_kg, 0.0);
    assert_eq!(record.revision, 1);
}

#[tokio::test]
async fn test_last_write_wins_never_uses_conditional_update() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);

    let store = Arc::new(ConflictingStore::new((*env.store).clone(), 100));
    let importer = importer_for(store.clone(), env.config.clone());

    importer
        .import_rows(Shift::First, vec![shift1_row("P-13")], None)
        .await
        .unwrap();
    let summary = importer
        .import_rows(Shift::Second, vec![shift2_row("P-13")], None)
        .await
        .unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(store.conditional_calls.load(Ordering::SeqCst), 0);
}

// ==========================================
// 文件导入与批次记录
// ==========================================

#[tokio::test]
async fn test_import_file_logs_batch() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"[
            {{"CÓDIGO": "F-1", "1 TURNO": 100, "KG": 90, "CXS": 18, "LOTE": "L-7"}},
            {{"CÓDIGO": null, "KG": 5}}
        ]"#
    )
    .unwrap();

    let summary = env
        .importer()
        .import_file(Shift::First, file.path())
        .await
        .unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 1);

    let record = env.store.find_by_code("F-1").await.unwrap().unwrap();
    assert_eq!(record.input.extra["LOTE"], serde_json::json!("L-7"));

    let batches = env.batches.recent_batches(10).unwrap();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.batch_id, summary.batch_id);
    assert_eq!(batch.shift, Shift::First);
    assert_eq!(batch.created_rows, 1);
    assert_eq!(batch.skipped_rows, 1);
    assert_eq!(
        batch.source.as_deref(),
        Some(file.path().display().to_string().as_str())
    );
    assert!(batch.diagnostics_json.contains("code"));
}

#[tokio::test]
async fn test_import_file_skips_malformed_rows() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);

    // 第 3 行含数组单元格，第 5 行不是对象
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"[
            {{"CÓDIGO": "M-1", "1 TURNO": 100, "KG": 90}},
            {{"CÓDIGO": "M-2", "1 TURNO": 100, "KG": 80}},
            {{"CÓDIGO": "M-3", "1 TURNO": 100, "KG": 70, "OBS": [1, 2]}},
            {{"CÓDIGO": "M-4", "1 TURNO": 100, "KG": 60}},
            {{"CÓDIGO": "M-5", "1 TURNO": 100, "KG": 50}},
            "M-6"
        ]"#
    )
    .unwrap();

    let summary = env
        .importer()
        .import_file(Shift::First, file.path())
        .await
        .unwrap();
    assert_eq!(summary.total_rows, 6);
    assert_eq!(summary.created, 4);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 0);

    let errors: Vec<_> = summary
        .diagnostics
        .iter()
        .filter(|d| d.level == DqLevel::Error)
        .collect();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].row_number, 3);
    assert_eq!(errors[0].field, "row");
    assert_eq!(errors[1].row_number, 6);

    let records = env.store.list_all().await.unwrap();
    assert_eq!(records.len(), 4);
    assert!(env.store.find_by_code("M-3").await.unwrap().is_none());
    assert_eq!(
        env.store.find_by_code("M-4").await.unwrap().unwrap().input.shift1_actual_kg,
        60.0
    );

    let batches = env.batches.recent_batches(10).unwrap();
    assert_eq!(batches[0].skipped_rows, 2);
}

#[tokio::test]
async fn test_import_file_rejects_unsupported_format() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = TestEnv::new(&db_path);

    let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    let result = env.importer().import_file(Shift::First, file.path()).await;
    assert!(result.is_err());
    assert!(env.batches.recent_batches(10).unwrap().is_empty());
}
