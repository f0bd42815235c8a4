use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;

fn write_ascii(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

const TRAIN: &str = "1 1.0 1.0\n-1 -1.0 -1.0\n1 1.0 -1.0\n-1 -1.0 1.0\n";

#[test]
fn trains_and_reports_on_ascii_input() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_ascii(&dir, "train.txt", TRAIN);
    let test = write_ascii(&dir, "test.txt", TRAIN);

    let out = Command::cargo_bin("parsgd")
        .unwrap()
        .args(["--ascii-training-file", train.to_str().unwrap()])
        .args(["--ascii-testing-file", test.to_str().unwrap()])
        .args(["--clf", "gd", "--lambda", "1e-3", "--rounds", "100"])
        .args(["--seed", "7"])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("acc on train: 1"));
    assert!(stdout.contains("acc on test: 1"));
    assert!(stdout.contains("classifier: "));
    assert!(stdout.contains("norm(w): "));
}

#[test]
fn sgd_with_threads_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_ascii(&dir, "train.txt", &TRAIN.repeat(16));
    let test = write_ascii(&dir, "test.txt", TRAIN);

    Command::cargo_bin("parsgd")
        .unwrap()
        .args(["--ascii-training-file", train.to_str().unwrap()])
        .args(["--ascii-testing-file", test.to_str().unwrap()])
        .args(["--clf", "sgd-lock", "--threads", "4", "--rounds", "5"])
        .args(["--lambda", "0.01", "--seed", "3", "--keep-histories"])
        .assert()
        .success();
}

#[test]
fn missing_training_file_flag_fails() {
    let dir = tempfile::tempdir().unwrap();
    let test = write_ascii(&dir, "test.txt", TRAIN);

    Command::cargo_bin("parsgd")
        .unwrap()
        .args(["--ascii-testing-file", test.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn mixed_formats_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_ascii(&dir, "train.txt", TRAIN);
    let test = write_ascii(&dir, "test.svm", "1 1:1.0\n");

    Command::cargo_bin("parsgd")
        .unwrap()
        .args(["--ascii-training-file", train.to_str().unwrap()])
        .args(["--svmlight-testing-file", test.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn non_positive_lambda_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_ascii(&dir, "train.txt", TRAIN);
    let test = write_ascii(&dir, "test.txt", TRAIN);

    Command::cargo_bin("parsgd")
        .unwrap()
        .args(["--ascii-training-file", train.to_str().unwrap()])
        .args(["--ascii-testing-file", test.to_str().unwrap()])
        .args(["--lambda", "0"])
        .assert()
        .failure();
}

#[test]
fn nonexistent_input_file_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let test = write_ascii(&dir, "test.txt", TRAIN);

    Command::cargo_bin("parsgd")
        .unwrap()
        .args(["--ascii-training-file", "/no/such/file.txt"])
        .args(["--ascii-testing-file", test.to_str().unwrap()])
        .assert()
        .failure();
}
