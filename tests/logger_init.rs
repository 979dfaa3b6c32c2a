//! The global subscriber can be installed once per process, so this file
//! holds a single test.

use stagefit::logging::{init_logger, LoggerOptions};
use stagefit::TrainError;

#[test]
fn test_logger_lifecycle() {
    // The level filter must come from the options alone.
    std::env::remove_var("RUST_LOG");
    let tmp = tempfile::tempdir().unwrap();

    // Invalid paths fail before anything is installed or created.
    let err = init_logger(&LoggerOptions { stdout: false, ..LoggerOptions::new("") });
    assert!(matches!(err, Err(TrainError::Logger(_))));
    let err = init_logger(&LoggerOptions { stdout: false, ..LoggerOptions::new(tmp.path()) });
    assert!(matches!(err, Err(TrainError::Logger(_))));
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);

    let log_file = tmp.path().join("logs").join("log.txt");
    let guard = init_logger(&LoggerOptions { stdout: false, ..LoggerOptions::new(&log_file) }).unwrap();
    assert_eq!(guard.log_file(), log_file.as_path());

    tracing::info!(epoch = 1, "epoch 1: train_loss 0.5000");
    tracing::debug!("hidden at info level");

    // Second installation is rejected.
    let again = init_logger(&LoggerOptions { stdout: false, ..LoggerOptions::new(tmp.path().join("other.txt")) });
    assert!(matches!(again, Err(TrainError::Logger(_))));

    drop(guard);
    let text = std::fs::read_to_string(&log_file).unwrap();
    assert!(text.contains("epoch 1: train_loss 0.5000"));
    assert!(text.contains("INFO"));
    assert!(text.contains("logger_init.rs"));
    assert!(!text.contains("hidden at info level"));
}
