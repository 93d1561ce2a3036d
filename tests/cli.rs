use assert_cmd::Command;
use image::{GrayImage, Luma};
use predicates::prelude::*;
use tempfile::TempDir;

fn sample(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("in.png");
    let img = GrayImage::from_fn(8, 8, |x, y| Luma([((x * 31 + y * 17) % 256) as u8]));
    img.save(&path).unwrap();
    path
}

#[test]
fn resizes_and_reports_the_new_size() {
    let dir = TempDir::new().unwrap();
    let input = sample(&dir);
    let output = dir.path().join("out.png");

    Command::cargo_bin("liquidseam")
        .unwrap()
        .arg(&input)
        .arg(&output)
        .args(["--width", "6", "--height", "-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6x6"));

    let result = image::open(&output).unwrap();
    assert_eq!((result.width(), result.height()), (6, 6));
}

#[test]
fn enlarges_with_relative_sizes() {
    let dir = TempDir::new().unwrap();
    let input = sample(&dir);
    let output = dir.path().join("out.png");

    Command::cargo_bin("liquidseam")
        .unwrap()
        .arg(&input)
        .arg(&output)
        .args(["-W", "+5", "--energy", "grad-norm", "--order", "interleaved"])
        .assert()
        .success()
        .stdout(predicate::str::contains("13x8"));
}

#[test]
fn impossible_sizes_fail() {
    let dir = TempDir::new().unwrap();
    let input = sample(&dir);
    let output = dir.path().join("out.png");

    Command::cargo_bin("liquidseam")
        .unwrap()
        .arg(&input)
        .arg(&output)
        .args(["--width", "-8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("minimum"));
    assert!(!output.exists());
}

#[test]
fn unknown_energies_are_rejected() {
    let dir = TempDir::new().unwrap();
    let input = sample(&dir);

    Command::cargo_bin("liquidseam")
        .unwrap()
        .arg(&input)
        .arg(dir.path().join("out.png"))
        .args(["--energy", "forward"])
        .assert()
        .failure();
}

#[test]
fn missing_input_is_an_error() {
    let dir = TempDir::new().unwrap();
    Command::cargo_bin("liquidseam")
        .unwrap()
        .arg(dir.path().join("nope.png"))
        .arg(dir.path().join("out.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("liquidseam:"));
}
