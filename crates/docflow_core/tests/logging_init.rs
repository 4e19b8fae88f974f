use docflow_core::{init_logging, logging_status, LoggingConfig, LoggingError};

#[test]
fn init_logging_is_idempotent_and_rejects_conflicts() {
    let log_dir = tempfile::tempdir().unwrap();
    let other_dir = tempfile::tempdir().unwrap();
    let config = LoggingConfig {
        level: "info".to_string(),
        log_dir: log_dir.path().to_path_buf(),
    };

    init_logging(&config).expect("first init should succeed");
    init_logging(&config).expect("same config should be idempotent");

    let level_err = init_logging(&LoggingConfig {
        level: "debug".to_string(),
        ..config.clone()
    })
    .unwrap_err();
    assert!(matches!(level_err, LoggingError::Conflict(_)));

    let dir_err = init_logging(&LoggingConfig {
        log_dir: other_dir.path().to_path_buf(),
        ..config.clone()
    })
    .unwrap_err();
    assert!(matches!(dir_err, LoggingError::Conflict(_)));

    let invalid = init_logging(&LoggingConfig {
        level: "verbose".to_string(),
        ..config.clone()
    })
    .unwrap_err();
    assert_eq!(invalid, LoggingError::InvalidLevel("verbose".to_string()));

    let (level, dir) = logging_status().expect("logging should be active");
    assert_eq!(level, "info");
    assert_eq!(dir, log_dir.path());
}
