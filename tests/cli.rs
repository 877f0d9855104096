use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const BINARY: &str = "zfq";
const SMALL: &str = "tests/samples/small.fastq";
const SMALL_MD5: &str = "1d6d5776e9b8f3747e4946c97ee21c0b";
type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn file_doesnt_exist() -> TestResult {
    let tmp = assert_fs::TempDir::new()?;
    let output = tmp.child("out.zfq");

    Command::cargo_bin(BINARY)?
        .args(["compress", "-i", "file_which_does_not_exist.fastq", "-o"])
        .arg(output.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such file or directory"));

    output.assert(predicate::path::missing());
    Ok(())
}

#[test]
fn compress_info_uncompress() -> TestResult {
    let tmp = assert_fs::TempDir::new()?;
    let container = tmp.child("small.zfq");
    let restored = tmp.child("small.fastq");

    Command::cargo_bin(BINARY)?
        .args(["compress", "-t", "2", "-i", SMALL, "-o"])
        .arg(container.path())
        .assert()
        .success();
    container.assert(predicate::path::is_file());

    Command::cargo_bin(BINARY)?
        .args(["info", "-i"])
        .arg(container.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"seq\":3"))
        .stdout(predicate::str::contains("\"nt\":12"))
        .stdout(predicate::str::contains(SMALL_MD5));

    Command::cargo_bin(BINARY)?
        .args(["uncompress", "-i"])
        .arg(container.path())
        .arg("-o")
        .arg(restored.path())
        .assert()
        .success();

    assert_eq!(std::fs::read(restored.path())?, std::fs::read(SMALL)?);
    Ok(())
}

#[test]
fn pretty_info() -> TestResult {
    let tmp = assert_fs::TempDir::new()?;
    let container = tmp.child("small.zfq");

    Command::cargo_bin(BINARY)?
        .args(["compress", "-i", SMALL, "-o"])
        .arg(container.path())
        .assert()
        .success();

    Command::cargo_bin(BINARY)?
        .args(["info", "--pretty", "-i"])
        .arg(container.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"seq\": 3"))
        .stdout(predicate::str::contains("\"modified\""));
    Ok(())
}

#[test]
fn decompress_to_gzip_and_remove() -> TestResult {
    let tmp = assert_fs::TempDir::new()?;
    let input = tmp.child("small.fastq");
    input.write_file(std::path::Path::new(SMALL))?;
    let container = tmp.child("small.zfq");
    let restored = tmp.child("restored.fastq.gz");

    Command::cargo_bin(BINARY)?
        .args(["compress", "-r", "--codec", "stored", "-i"])
        .arg(input.path())
        .arg("-o")
        .arg(container.path())
        .assert()
        .success();
    input.assert(predicate::path::missing());

    Command::cargo_bin(BINARY)?
        .args(["decompress", "-r", "-i"])
        .arg(container.path())
        .arg("-o")
        .arg(restored.path())
        .assert()
        .success();
    container.assert(predicate::path::missing());

    let bytes = std::fs::read(restored.path())?;
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    Ok(())
}

#[test]
fn malformed_input_fails() -> TestResult {
    let tmp = assert_fs::TempDir::new()?;
    let input = tmp.child("bad.fastq");
    input.write_str("@r1\nACGT\n+\nIII\n")?;
    let container = tmp.child("bad.zfq");

    Command::cargo_bin(BINARY)?
        .args(["compress", "-r", "-i"])
        .arg(input.path())
        .arg("-o")
        .arg(container.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed FastQ record at line 4"));

    input.assert(predicate::path::is_file());
    container.assert(predicate::path::missing());
    Ok(())
}

#[test]
fn info_on_fastq_fails() -> TestResult {
    Command::cargo_bin(BINARY)?
        .args(["info", "-i", SMALL])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid container"));
    Ok(())
}

#[test]
fn no_arguments_prints_help() -> TestResult {
    Command::cargo_bin(BINARY)?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
    Ok(())
}
