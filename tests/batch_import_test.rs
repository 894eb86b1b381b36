// ==========================================
// 批量导入集成测试
// ==========================================
// 测试范围: 守恒、去重幂等、限速、进度、取消、注册库补全、持久化失败
// ==========================================

mod helpers;

use helpers::mock_registry::MockRegistry;
use profile_import::domain::{DuplicateStrategy, ImportBatchStatus, RowError, RowStatus};
use profile_import::enrichment::RegistryRecord;
use profile_import::logging;
use profile_import::{BatchImporter, ImportOptions, ProcessedImportRow};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use test_helpers::{distinct_rows, processed_row, FailingStore, FlakyStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn mixed_rows() -> Vec<ProcessedImportRow> {
    vec![
        processed_row(1, "Acme SARL", Some("12345678901234")),
        processed_row(2, "", Some("98765432109876")),
        processed_row(3, "Dupont & Fils", None),
        processed_row(4, "ACME SARL", Some("12345678901234")),
        processed_row(5, "Boulangerie Martin", Some("55566677788899")),
    ]
}

// ==========================================
// 守恒与幂等
// ==========================================

#[tokio::test]
async fn test_every_row_accounted_exactly_once() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = BatchImporter::new(test_helpers::create_test_store(&db_path), None);

    let rows = mixed_rows();
    let total = rows.len();
    let result = importer
        .run(rows, &ImportOptions::new("user-1"), &CancellationToken::new())
        .await;

    let mut seen = HashSet::new();
    for row_number in result
        .successful_rows
        .iter()
        .map(|r| r.row.row_number)
        .chain(result.skipped_rows.iter().map(|r| r.row_number))
        .chain(result.failed_rows.iter().map(|r| r.row.row_number))
    {
        assert!(seen.insert(row_number), "row {} counted twice", row_number);
    }
    assert_eq!(seen.len(), total);
    assert!(result.not_attempted.is_empty());
    assert_eq!(result.accounted_rows(), total);

    // 同批次内重复：第 4 行在第 1 行入库后被识别为重复
    let skipped: Vec<usize> = result.skipped_rows.iter().map(|r| r.row_number).collect();
    assert_eq!(skipped, vec![4]);

    let status = &result.batch_status;
    assert_eq!(status.total_rows, total);
    assert_eq!(status.processed, total);
    assert_eq!(status.successful, 3);
    assert_eq!(status.skipped, 1);
    assert_eq!(status.failed, 1);
    assert!(status.is_consistent());
    assert!(result.finished_at >= result.started_at);
}

#[tokio::test]
async fn test_rerun_with_skip_strategy_is_idempotent() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let store = test_helpers::create_test_store(&db_path);
    let importer = BatchImporter::new(store.clone(), None);
    let options = ImportOptions::new("user-1").with_duplicate_strategy(DuplicateStrategy::Skip);

    let mut rows = distinct_rows(4);
    rows.push(processed_row(5, "Sans SIRET", None));
    rows.push(processed_row(6, " ", Some("99999999999999")));

    let first = importer
        .run(rows.clone(), &options, &CancellationToken::new())
        .await;
    assert_eq!(first.successful_rows.len(), 5);
    assert_eq!(first.failed_rows.len(), 1);

    let second = importer.run(rows, &options, &CancellationToken::new()).await;
    assert_eq!(second.skipped_rows.len(), first.successful_rows.len());
    assert!(second.successful_rows.is_empty());
    assert_eq!(second.failed_rows.len(), 1);
    assert_ne!(first.batch_id, second.batch_id);

    assert_eq!(store.count_by_user("user-1").expect("count failed"), 5);
}

#[tokio::test]
async fn test_duplicates_scoped_per_user_and_create_strategy() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let store = test_helpers::create_test_store(&db_path);
    let importer = BatchImporter::new(store.clone(), None);
    let rows = distinct_rows(3);

    importer
        .run(rows.clone(), &ImportOptions::new("user-1"), &CancellationToken::new())
        .await;

    // 其他用户不受影响
    let other = importer
        .run(rows.clone(), &ImportOptions::new("user-2"), &CancellationToken::new())
        .await;
    assert_eq!(other.successful_rows.len(), 3);

    // create 策略：重复也创建
    let options = ImportOptions::new("user-1").with_duplicate_strategy(DuplicateStrategy::Create);
    let again = importer.run(rows, &options, &CancellationToken::new()).await;
    assert_eq!(again.successful_rows.len(), 3);
    assert!(again.skipped_rows.is_empty());

    assert_eq!(store.count_by_user("user-1").expect("count failed"), 6);
    assert_eq!(store.count_by_user("user-2").expect("count failed"), 3);
}

// ==========================================
// 限速与进度
// ==========================================

#[tokio::test]
async fn test_delay_between_rows() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = BatchImporter::new(test_helpers::create_test_store(&db_path), None);
    let options = ImportOptions::new("user-1")
        .with_batch_size(2)
        .with_delay(Duration::from_millis(100));

    let start = Instant::now();
    let result = importer
        .run(distinct_rows(5), &options, &CancellationToken::new())
        .await;
    let elapsed = start.elapsed();

    assert_eq!(result.successful_rows.len(), 5);
    assert!(
        elapsed >= Duration::from_millis(400),
        "elapsed {:?} shorter than 4 delays",
        elapsed
    );
    assert!(result.elapsed >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_progress_snapshots() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = BatchImporter::new(test_helpers::create_test_store(&db_path), None);

    let rows = mixed_rows();
    let total = rows.len();
    let (tx, mut rx) = mpsc::channel::<ImportBatchStatus>(total + 1);
    let options = ImportOptions::new("user-1").with_progress(tx);

    let result = importer
        .run(rows, &options, &CancellationToken::new())
        .await;

    let mut snapshots = Vec::new();
    while let Ok(snapshot) = rx.try_recv() {
        snapshots.push(snapshot);
    }

    assert_eq!(snapshots.len(), total + 1);
    assert_eq!(snapshots[0].processed, 0);
    assert_eq!(snapshots[0].total_rows, total);
    for (i, snapshot) in snapshots.iter().enumerate() {
        assert_eq!(snapshot.processed, i);
        assert!(snapshot.is_consistent());
    }
    assert_eq!(snapshots[1].current_action, "row 1 imported");
    assert!(snapshots[2].current_action.starts_with("row 2 failed"));
    assert_eq!(snapshots[4].current_action, "row 4 skipped (duplicate)");
    assert_eq!(snapshots.last(), Some(&result.batch_status));
}

#[tokio::test]
async fn test_closed_progress_receiver_does_not_abort() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = BatchImporter::new(test_helpers::create_test_store(&db_path), None);

    let (tx, rx) = mpsc::channel::<ImportBatchStatus>(1);
    drop(rx);
    let options = ImportOptions::new("user-1").with_progress(tx);

    let result = importer
        .run(distinct_rows(3), &options, &CancellationToken::new())
        .await;
    assert_eq!(result.successful_rows.len(), 3);
}

#[tokio::test]
async fn test_full_progress_channel_does_not_block_run() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = BatchImporter::new(test_helpers::create_test_store(&db_path), None);

    // 容量 1，且在 run 结束前不读取
    let (tx, mut rx) = mpsc::channel::<ImportBatchStatus>(1);
    let options = ImportOptions::new("user-1").with_progress(tx);

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        importer.run(distinct_rows(3), &options, &CancellationToken::new()),
    )
    .await
    .expect("run blocked on a full progress channel");

    assert_eq!(result.successful_rows.len(), 3);
    assert_eq!(result.batch_status.processed, 3);

    let first = rx.try_recv().expect("initial snapshot missing");
    assert_eq!(first.processed, 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_progress_consumed_concurrently() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = BatchImporter::new(test_helpers::create_test_store(&db_path), None);

    let (tx, mut rx) = mpsc::channel::<ImportBatchStatus>(1);
    let options = ImportOptions::new("user-1")
        .with_progress(tx)
        .with_delay(Duration::from_millis(20));

    let consumer = tokio::spawn(async move {
        let mut last = None;
        while let Some(snapshot) = rx.recv().await {
            assert!(snapshot.is_consistent());
            last = Some(snapshot);
        }
        last
    });

    let result = importer
        .run(distinct_rows(4), &options, &CancellationToken::new())
        .await;
    drop(options);

    let last = consumer
        .await
        .expect("consumer panicked")
        .expect("no snapshot received");
    assert_eq!(last, result.batch_status);
}

// ==========================================
// 取消
// ==========================================

#[tokio::test]
async fn test_cancel_before_start() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let store = test_helpers::create_test_store(&db_path);
    let importer = BatchImporter::new(store.clone(), None);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = importer
        .run(distinct_rows(3), &ImportOptions::new("user-1"), &cancel)
        .await;

    assert!(result.cancelled);
    assert_eq!(result.not_attempted.len(), 3);
    assert_eq!(result.batch_status.processed, 0);
    assert_eq!(result.accounted_rows(), 3);
    assert_eq!(store.count_by_user("user-1").expect("count failed"), 0);
}

#[tokio::test]
async fn test_cancel_during_delay() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = BatchImporter::new(test_helpers::create_test_store(&db_path), None);
    let options = ImportOptions::new("user-1").with_delay(Duration::from_millis(100));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let result = importer.run(distinct_rows(10), &options, &cancel).await;

    assert!(result.cancelled);
    assert!(!result.successful_rows.is_empty());
    assert!(!result.not_attempted.is_empty());
    assert_eq!(result.accounted_rows(), 10);
    assert_eq!(result.batch_status.processed, result.successful_rows.len());
    assert!(start.elapsed() < Duration::from_millis(900));

    // 未处理的行保持原顺序
    let first_pending = result.not_attempted[0].row_number;
    assert_eq!(first_pending, result.successful_rows.len() + 1);
}

// ==========================================
// 注册库补全
// ==========================================

fn registry_record() -> RegistryRecord {
    RegistryRecord {
        company_name: Some("ACME SOCIETE A RESPONSABILITE LIMITEE".to_string()),
        siren: Some("123456789".to_string()),
        siret: Some("12345678901234".to_string()),
        naf_code: Some("70.22Z".to_string()),
        legal_form: Some("SARL".to_string()),
        city: Some("Rennes".to_string()),
        employee_count: Some(42),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_enrichment_fills_blank_fields_only() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let store = test_helpers::create_test_store(&db_path);
    let registry = Arc::new(
        MockRegistry::new()
            .with_record("12345678901234", registry_record())
            .with_failure("55566677788899"),
    );
    let importer = BatchImporter::new(store.clone(), Some(registry.clone()));

    let mut enriched_row = processed_row(1, "Acme SARL", Some("12345678901234"));
    enriched_row.profile_data.employee_count = Some(12);
    let rows = vec![
        enriched_row,
        processed_row(2, "Inconnue", Some("98765432109876")),
        processed_row(3, "Panne Registre", Some("55566677788899")),
        processed_row(4, "Sans SIRET", None),
    ];
    let options = ImportOptions::new("user-1").with_enrichment(true, true);

    let result = importer
        .run(rows, &options, &CancellationToken::new())
        .await;

    assert_eq!(result.successful_rows.len(), 4);
    assert_eq!(
        registry.calls(),
        vec!["12345678901234", "98765432109876", "55566677788899"]
    );

    let first = &result.successful_rows[0];
    assert!(first.enriched);
    let profile = &first.row.profile_data;
    assert_eq!(profile.company_name.as_deref(), Some("Acme SARL"));
    assert_eq!(profile.employee_count, Some(12));
    assert_eq!(profile.naf_code.as_deref(), Some("70.22Z"));
    assert_eq!(profile.city.as_deref(), Some("Rennes"));

    let saved = store
        .find_by_id(&first.profile_id)
        .expect("find failed")
        .expect("profile missing");
    assert_eq!(saved.legal_form.as_deref(), Some("SARL"));

    let not_found = &result.successful_rows[1];
    assert!(!not_found.enriched);
    assert!(not_found
        .row
        .validation_warnings
        .contains(&"98765432109876 not found in registry".to_string()));

    let transient = &result.successful_rows[2];
    assert!(!transient.enriched);
    assert!(transient
        .row
        .validation_warnings
        .iter()
        .any(|w| w.starts_with("enrichment skipped")));

    assert_eq!(result.stats.enriched_rows, 1);
    assert!((result.stats.enrichment_rate - 25.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_enrichment_error_fails_row_when_not_skipped() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let store = test_helpers::create_test_store(&db_path);
    let registry = Arc::new(MockRegistry::new().with_failure("55566677788899"));
    let importer = BatchImporter::new(store.clone(), Some(registry));

    let rows = vec![
        processed_row(1, "Panne Registre", Some("55566677788899")),
        processed_row(2, "Acme", Some("12345678901234")),
    ];
    let options = ImportOptions::new("user-1").with_enrichment(true, false);

    let result = importer
        .run(rows, &options, &CancellationToken::new())
        .await;

    assert_eq!(result.failed_rows.len(), 1);
    assert!(matches!(result.failed_rows[0].error, RowError::Enrichment(_)));
    assert_eq!(result.successful_rows.len(), 1);
    assert_eq!(store.count_by_user("user-1").expect("count failed"), 1);
}

#[tokio::test]
async fn test_enrichment_disabled_skips_lookup() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let registry = Arc::new(MockRegistry::new().with_record("12345678901234", registry_record()));
    let importer = BatchImporter::new(test_helpers::create_test_store(&db_path), Some(registry.clone()));

    let rows = vec![processed_row(1, "Acme", Some("12345678901234"))];
    let result = importer
        .run(rows, &ImportOptions::new("user-1"), &CancellationToken::new())
        .await;

    assert!(registry.calls().is_empty());
    assert!(!result.successful_rows[0].enriched);
    assert_eq!(result.stats.enrichment_rate, 0.0);
}

// ==========================================
// 持久化失败
// ==========================================

#[tokio::test]
async fn test_persistence_failure_is_row_level() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let flaky = Arc::new(FlakyStore {
        inner: test_helpers::create_test_store(&db_path),
        failing_siret: "10000000000002".to_string(),
    });
    let importer = BatchImporter::new(flaky, None);

    let result = importer
        .run(distinct_rows(3), &ImportOptions::new("user-1"), &CancellationToken::new())
        .await;

    assert_eq!(result.successful_rows.len(), 2);
    assert_eq!(result.failed_rows.len(), 1);
    assert_eq!(result.failed_rows[0].row.row_number, 2);
    assert!(matches!(result.failed_rows[0].error, RowError::Persistence(_)));
}

#[tokio::test]
async fn test_all_rows_fail_when_store_unavailable() {
    logging::init_test();
    let importer = BatchImporter::new(Arc::new(FailingStore), None);

    let rows = distinct_rows(3);
    let result = importer
        .run(rows, &ImportOptions::new("user-1"), &CancellationToken::new())
        .await;

    assert!(result.successful_rows.is_empty());
    assert_eq!(result.failed_rows.len(), 3);
    assert!(result
        .failed_rows
        .iter()
        .all(|f| f.row.status == RowStatus::Valid && matches!(f.error, RowError::Persistence(_))));
    assert_eq!(result.stats.enrichment_rate, 0.0);
}
