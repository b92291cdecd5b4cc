// Tests for the worker running as a separate `treesum worker` process

use std::fs;

use tokio::sync::mpsc;

use treesum::hash::{Algorithm, ValidationResult};
use treesum::job::{JobController, JobOutcome, Operation, ProcessLauncher};

fn worker_launcher() -> ProcessLauncher {
    ProcessLauncher::new(env!("CARGO_BIN_EXE_treesum"), vec!["worker".to_string()])
}

#[tokio::test]
async fn test_generate_then_validate_through_worker_process() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("data/nested")).unwrap();
    fs::write(root.join("data/a.txt"), b"Hello, DevChallenge!").unwrap();
    fs::write(root.join("data/nested/b.txt"), b"foo").unwrap();

    let controller = JobController::connect(&worker_launcher()).await.unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let outcome = controller
        .submit(
            Operation::Generate {
                files: vec![root.join("data")],
                algorithm: Algorithm::Sha256,
                output_directory: root.clone(),
            },
            tx,
        )
        .unwrap()
        .wait()
        .await;

    let manifest_path = match outcome {
        JobOutcome::Generated { output_path } => output_path,
        other => panic!("expected Generated, got {:?}", other),
    };
    assert_eq!(manifest_path, root.join("checksum.sha256"));
    assert!(fs::read_to_string(&manifest_path).unwrap().starts_with(
        "27aec15f06ab185da46ee97a7905fd107df66df0853169932afeceec941ac5ff  data/a.txt\n"
    ));
    drop(rx);

    let (tx, _rx) = mpsc::unbounded_channel();
    let outcome = controller
        .submit(
            Operation::Validate {
                files: vec![root.join("data")],
                manifest_path,
            },
            tx,
        )
        .unwrap()
        .wait()
        .await;

    assert_eq!(
        outcome,
        JobOutcome::Validated {
            result: ValidationResult::Match { files: 2 }
        }
    );
}

#[tokio::test]
async fn test_worker_process_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    for i in 0..8 {
        fs::write(root.join(format!("blob{}.bin", i)), vec![i as u8; 4 * 1024 * 1024]).unwrap();
    }

    let controller = JobController::connect(&worker_launcher()).await.unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();

    let handle = controller
        .submit(
            Operation::Generate {
                files: vec![root.clone()],
                algorithm: Algorithm::Sha256,
                output_directory: root.join("out"),
            },
            tx,
        )
        .unwrap();
    controller.cancel_all();

    assert_eq!(handle.wait().await, JobOutcome::Cancelled);
    assert!(!root.join("out").exists());
}
