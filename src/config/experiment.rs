use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::args::Overrides;
use crate::error::{Result, TrainError};

/// File copied from the hyperparameter file the run was started with.
pub const HPARAMS_FILE: &str = "hyperparams.yaml";
/// Command-line overrides of the run.
pub const OVERRIDES_FILE: &str = "overrides.yaml";
/// Checkpoint directory, relative to the experiment folder.
pub const SAVE_DIR: &str = "save";
/// Default log file, relative to the experiment folder.
pub const LOG_FILE: &str = "log.txt";

/// Layout of a prepared experiment folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentPaths {
    pub root: PathBuf,
    pub save_dir: PathBuf,
    pub log_file: PathBuf,
}

/// Creates `experiment_folder` and `experiment_folder/save`, copies the
/// hyperparameter file next to them and records the CLI overrides.
///
/// Safe to call again on an existing folder; the copies are overwritten and
/// existing checkpoints are left alone so the run can resume.
pub fn prepare_experiment_folder(
    experiment_folder: &Path,
    param_file: &Path,
    overrides: &Overrides,
) -> Result<ExperimentPaths> {
    let save_dir = experiment_folder.join(SAVE_DIR);
    fs::create_dir_all(&save_dir).map_err(|e| TrainError::io(&save_dir, e))?;

    let hparams_copy = experiment_folder.join(HPARAMS_FILE);
    fs::copy(param_file, &hparams_copy).map_err(|e| TrainError::io(param_file, e))?;

    let overrides_path = experiment_folder.join(OVERRIDES_FILE);
    let yaml = serde_yaml::to_string(overrides)
        .map_err(|e| TrainError::config(format!("could not serialise overrides: {e}")))?;
    fs::write(&overrides_path, yaml).map_err(|e| TrainError::io(&overrides_path, e))?;

    let log_file = overrides
        .log_file
        .clone()
        .unwrap_or_else(|| experiment_folder.join(LOG_FILE));

    debug!(root = %experiment_folder.display(), "experiment folder ready");
    Ok(ExperimentPaths {
        root: experiment_folder.to_path_buf(),
        save_dir,
        log_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(log_file: Option<PathBuf>) -> Overrides {
        Overrides {
            debug: false,
            debug_batches: 2,
            device: "cpu".to_string(),
            noprogressbar: true,
            ckpt_interval_minutes: 15.0,
            log_file,
        }
    }

    #[test]
    fn test_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let param_file = tmp.path().join("hp.yaml");
        fs::write(&param_file, "seed: 1\n").unwrap();
        let root = tmp.path().join("runs").join("exp1");

        let paths = prepare_experiment_folder(&root, &param_file, &overrides(None)).unwrap();
        assert!(paths.save_dir.is_dir());
        assert_eq!(paths.log_file, root.join("log.txt"));
        assert_eq!(fs::read_to_string(root.join(HPARAMS_FILE)).unwrap(), "seed: 1\n");
        let written = fs::read_to_string(root.join(OVERRIDES_FILE)).unwrap();
        assert!(written.contains("device: cpu"));

        // Second call keeps existing checkpoints.
        fs::write(paths.save_dir.join("keep.json"), "{}").unwrap();
        prepare_experiment_folder(&root, &param_file, &overrides(None)).unwrap();
        assert!(paths.save_dir.join("keep.json").exists());
    }

    #[test]
    fn test_explicit_log_file() {
        let tmp = tempfile::tempdir().unwrap();
        let param_file = tmp.path().join("hp.yaml");
        fs::write(&param_file, "").unwrap();
        let custom = tmp.path().join("custom.log");
        let paths =
            prepare_experiment_folder(&tmp.path().join("exp"), &param_file, &overrides(Some(custom.clone())))
                .unwrap();
        assert_eq!(paths.log_file, custom);
    }

    #[test]
    fn test_missing_param_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = prepare_experiment_folder(&tmp.path().join("exp"), &tmp.path().join("nope.yaml"), &overrides(None));
        assert!(matches!(err, Err(TrainError::Io { .. })));
    }
}
