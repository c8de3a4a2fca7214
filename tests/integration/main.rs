// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

use std::{
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};
use tempfile::TempDir;

fn disko() -> Command {
    Command::cargo_bin("disko").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

fn snapshot() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_files")
        .join("snapshot.json")
        .display()
        .to_string()
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(ext))
        .collect()
}

#[test]
fn test_help() {
    let cmd = disko().arg("--help").ok();
    assert!(cmd.is_ok());
    let (stdout, _) = get_cmd_output(cmd);
    for flag in [
        "--file",
        "--ms",
        "--nside",
        "--adaptive",
        "--matrix-free",
        "--show-sources",
        "--PNG",
        "--dry-run",
    ] {
        assert!(stdout.contains(flag), "--help doesn't mention {flag}");
    }
}

#[test]
fn test_dry_run() {
    let tmp_dir = TempDir::new().unwrap();
    let cmd = disko()
        .current_dir(tmp_dir.path())
        .args(["--file", &snapshot(), "--nside", "4", "--dry-run", "--no-progress-bars"])
        .ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "{stderr}");
    assert!(stdout.contains("Dry run -- exiting now."));
    assert!(files_with_extension(tmp_dir.path(), "fits").is_empty());
    assert!(tmp_dir.path().join("disko.log").exists());
}

#[test]
fn test_snapshot_run() {
    let tmp_dir = TempDir::new().unwrap();
    let out_dir = tmp_dir.path().join("images");
    let cmd = disko()
        .current_dir(tmp_dir.path())
        .args([
            "--file",
            &snapshot(),
            "--arcmin",
            "300",
            "--tikhonov",
            "--title",
            "snap",
            "--no-progress-bars",
            "--dir",
        ])
        .arg(&out_dir)
        .ok();
    let ok = cmd.is_ok();
    let (_, stderr) = get_cmd_output(cmd);
    assert!(ok, "{stderr}");

    let fits = files_with_extension(&out_dir, "fits");
    assert_eq!(fits.len(), 1);
    let name = fits[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("snap_") && name.ends_with("_UTC.fits"));

    let log = std::fs::read_to_string(tmp_dir.path().join("disko.log")).unwrap();
    assert!(log.contains("tikhonov"));
}

#[test]
fn test_save_toml_then_reuse() {
    let tmp_dir = TempDir::new().unwrap();
    let toml = tmp_dir.path().join("args.toml");
    let cmd = disko()
        .current_dir(tmp_dir.path())
        .args(["--file", &snapshot(), "--nside", "4", "--lasso", "--dry-run"])
        .arg("--save-toml")
        .arg(&toml)
        .ok();
    let ok = cmd.is_ok();
    let (_, stderr) = get_cmd_output(cmd);
    assert!(ok, "{stderr}");
    let contents = std::fs::read_to_string(&toml).unwrap();
    assert!(contents.contains("lasso = true"));
    assert!(contents.contains("nside = 4"));

    let cmd = disko()
        .current_dir(tmp_dir.path())
        .arg(&toml)
        .arg("--dry-run")
        .ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "{stderr}");
    assert!(stdout.contains("Solver: lasso"));
}

#[test]
fn test_missing_file_fails() {
    let tmp_dir = TempDir::new().unwrap();
    let cmd = disko()
        .current_dir(tmp_dir.path())
        .args(["--file", "does_not_exist.json", "--nside", "4"])
        .ok();
    assert!(cmd.is_err());
    let code = match &cmd {
        Err(e) => e.as_output().and_then(|o| o.status.code()),
        Ok(_) => None,
    };
    assert_eq!(code, Some(1));
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error:"), "{stderr}");
    assert!(stderr.contains("does_not_exist.json"));
}

#[test]
fn test_no_resolution_fails() {
    let tmp_dir = TempDir::new().unwrap();
    let cmd = disko()
        .current_dir(tmp_dir.path())
        .args(["--file", &snapshot()])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("--nside or --arcmin"), "{stderr}");
}
