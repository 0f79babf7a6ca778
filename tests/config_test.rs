// ==========================================
// 配置管理集成测试
// ==========================================
// 测试目标: ConfigManager 读写 config_kv，合并参数一次读取
// ==========================================


use shift_reconcile::config::{config_keys, ConfigManager, MergeSettings, ShiftConfigReader};
use shift_reconcile::domain::{MergeConsistency, TargetsConfig};
use test_helpers::create_test_db;

#[tokio::test]
async fn test_merge_settings_defaults() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    let settings = config.load_merge_settings().await.unwrap();
    assert_eq!(settings, MergeSettings::default());
}

#[tokio::test]
async fn test_merge_settings_overrides() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    config
        .set_global_config_value(config_keys::MERGE_CONSISTENCY, "conditional")
        .unwrap();
    config
        .set_global_config_value(config_keys::MERGE_MAX_RETRIES, "5")
        .unwrap();
    config
        .set_global_config_value(config_keys::DIVERGENCE_ATTENTION_PCT, "30")
        .unwrap();
    config
        .set_global_config_value(config_keys::CATALOG_ENRICHMENT_ENABLED, "0")
        .unwrap();

    let settings = config.load_merge_settings().await.unwrap();
    assert_eq!(settings.consistency, MergeConsistency::Conditional);
    assert_eq!(settings.max_retries, 5);
    assert_eq!(settings.thresholds.caution_pct, 10.0);
    assert_eq!(settings.thresholds.attention_pct, 30.0);
    assert!(!settings.catalog_enrichment_enabled);
}

#[tokio::test]
async fn test_targets_persist_across_managers() {
    let (_temp_file, db_path) = create_test_db().unwrap();

    let targets = TargetsConfig {
        daily_target_kg: 1500.0,
        monthly_target_kg: 45000.0,
        conversion_factor: 0.95,
        efficiency_tolerance_pct: 3.0,
    };
    ConfigManager::new(&db_path)
        .unwrap()
        .update_targets(&targets)
        .unwrap();

    // 新连接读取到同样的值
    let reader = ConfigManager::new(&db_path).unwrap();
    assert_eq!(reader.get_targets().await.unwrap(), targets);

    let snapshot: serde_json::Value =
        serde_json::from_str(&reader.get_config_snapshot().unwrap()).unwrap();
    assert_eq!(snapshot[config_keys::DAILY_TARGET_KG], "1500");
    assert_eq!(snapshot[config_keys::CONVERSION_FACTOR], "0.95");
}

#[tokio::test]
async fn test_invalid_targets_are_not_written() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    let invalid = TargetsConfig {
        daily_target_kg: 0.0,
        monthly_target_kg: 0.0,
        conversion_factor: 1.0,
        efficiency_tolerance_pct: 5.0,
    };
    let err = config.update_targets(&invalid).unwrap_err();
    // 两项不合规都出现在消息中
    assert_eq!(err.to_string().matches("必须").count(), 2);

    assert_eq!(
        config.get_global_config_value(config_keys::DAILY_TARGET_KG).unwrap(),
        None
    );
}
