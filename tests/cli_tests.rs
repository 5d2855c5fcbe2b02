use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// The binary, with configuration isolated from the user's own config file.
fn fetch_zip(config_dir: &Path) -> Command {
    let config = config_dir.join("config.toml");
    std::fs::write(&config, "").unwrap();
    let mut cmd = Command::cargo_bin("fetch-zip").unwrap();
    cmd.env("FETCH_ZIP_CONFIG", config);
    cmd
}

fn source_dir(root: &Path) -> std::path::PathBuf {
    let source = root.join("source");
    std::fs::create_dir_all(source.join("nested")).unwrap();
    std::fs::write(source.join("hello.txt"), "hello").unwrap();
    std::fs::write(source.join("nested/world.txt"), "world").unwrap();
    source
}

#[test]
fn test_help_command_succeeds() {
    let temp_dir = tempdir().unwrap();
    let mut cmd = fetch_zip(temp_dir.path());
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("single zip archive"));
}

#[test]
fn test_version_command_succeeds() {
    let temp_dir = tempdir().unwrap();
    let mut cmd = fetch_zip(temp_dir.path());
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("fetch-zip"));
}

#[test]
fn test_handlers_command_lists_defaults() {
    let temp_dir = tempdir().unwrap();
    let mut cmd = fetch_zip(temp_dir.path());
    cmd.arg("handlers");
    cmd.assert().success().stdout("git\nhttp\nlocal\n");
}

#[test]
fn test_zip_command_writes_archive() {
    let temp_dir = tempdir().unwrap();
    let source = source_dir(temp_dir.path());
    let output = temp_dir.path().join("out.zip");

    let mut cmd = fetch_zip(temp_dir.path());
    cmd.args([
        "zip",
        source.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Downloaded and zipped at"));

    let mut zip = zip::ZipArchive::new(std::fs::File::open(&output).unwrap()).unwrap();
    let mut content = String::new();
    zip.by_name("nested/world.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "world");
}

#[test]
fn test_zip_command_to_stdout() {
    let temp_dir = tempdir().unwrap();
    let source = source_dir(temp_dir.path());

    let mut cmd = fetch_zip(temp_dir.path());
    cmd.args(["zip", source.to_str().unwrap(), "-o", "-"]);
    let output = cmd.assert().success();
    let stdout = output.get_output().stdout.clone();
    assert!(stdout.starts_with(b"PK\x03\x04"));
    let zip = zip::ZipArchive::new(std::io::Cursor::new(stdout)).unwrap();
    assert_eq!(zip.len(), 3);
}

#[test]
fn test_zip_command_with_missing_output_dir() {
    let temp_dir = tempdir().unwrap();
    let source = source_dir(temp_dir.path());
    let output = temp_dir.path().join("missing/out.zip");

    let mut cmd = fetch_zip(temp_dir.path());
    cmd.args([
        "zip",
        source.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ]);
    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("output directory does not exist"));
}

#[test]
fn test_sha1_and_diff_commands() {
    let temp_dir = tempdir().unwrap();
    let source = source_dir(temp_dir.path());

    let mut cmd = fetch_zip(temp_dir.path());
    cmd.args(["sha1", source.to_str().unwrap()]);
    let output = cmd.assert().success();
    let sha1 = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert_eq!(sha1.len(), 40);
    assert!(sha1.chars().all(|c| c.is_ascii_hexdigit()));

    let mut cmd = fetch_zip(temp_dir.path());
    cmd.args(["diff", source.to_str().unwrap(), sha1.as_str()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("no change from source"));

    std::fs::write(source.join("hello.txt"), "changed").unwrap();
    let mut cmd = fetch_zip(temp_dir.path());
    cmd.args(["diff", source.to_str().unwrap(), sha1.as_str()]);
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("file from source is different"));
}

#[test]
fn test_missing_source_has_no_handler() {
    let temp_dir = tempdir().unwrap();
    let missing = temp_dir.path().join("does-not-exist");

    let mut cmd = fetch_zip(temp_dir.path());
    cmd.args(["sha1", missing.to_str().unwrap()]);
    cmd.assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("cannot be found"));
}

#[test]
fn test_unknown_handler_type() {
    let temp_dir = tempdir().unwrap();
    let source = source_dir(temp_dir.path());

    let mut cmd = fetch_zip(temp_dir.path());
    cmd.args(["--type", "svn", "sha1", source.to_str().unwrap()]);
    cmd.assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("handler 'svn' is not registered"));
}

#[test]
fn test_empty_directory_fails() {
    let temp_dir = tempdir().unwrap();
    let empty = temp_dir.path().join("empty");
    std::fs::create_dir(&empty).unwrap();

    let mut cmd = fetch_zip(temp_dir.path());
    cmd.args(["-t", "local", "sha1", empty.to_str().unwrap()]);
    cmd.assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("is empty"));
}

#[test]
fn test_invalid_config_file() {
    let temp_dir = tempdir().unwrap();
    let config = temp_dir.path().join("bad.toml");
    std::fs::write(&config, "[http]\ninsecure = \"sometimes\"\n").unwrap();

    let mut cmd = fetch_zip(temp_dir.path());
    cmd.args(["--config", config.to_str().unwrap(), "handlers"]);
    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("failed to load configuration"));
}
