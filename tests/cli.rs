mod common;

use predicates::prelude::*;
use std::fs;
use assert_cmd::Command;
use tempfile::tempdir;

use common::{chunk, sign, write_region};

#[test]
fn test_cli_world_mode_writes_and_cleans_up() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let world = dir.path().join("world");
    let out = dir.path().join("out");

    write_region(
        &world.join("region/r.0.0.mca"),
        &[(7, chunk(vec![sign(100, 65, -20, ["#map", "Tower", "of", "Doom"])]))],
    );
    write_region(
        &world.join("region/r.1.0.mca"),
        &[(0, chunk(vec![sign(600, 65, 0, ["just a sign", "", "", ""])]))],
    );

    // 1. First run creates the output directory and one file.
    let mut cmd = Command::cargo_bin("mcsign")?;
    cmd.arg("--world").arg(&world).arg("-j").arg("2").arg(&out).write_stdin("0 0\n1 0\n");
    cmd.assert().success();

    let text = fs::read_to_string(out.join("signs.0.0.in"))?;
    assert_eq!(
        text,
        "{ \"x\": \"100\",  \"y\": \"65\",  \"z\": \"-20\", \"msg\": \"Tower of Doom (100, 65, -20)\" }\n"
    );
    assert!(!out.join("signs.1.0.in").exists());

    // 2. A stale file for a region without map signs is removed.
    fs::write(out.join("signs.1.0.in"), "stale")?;
    let mut cmd = Command::cargo_bin("mcsign")?;
    cmd.arg("--world").arg(&world).arg(&out).write_stdin("1 0\n");
    cmd.assert().success();
    assert!(!out.join("signs.1.0.in").exists());
    Ok(())
}

#[test]
fn test_cli_paths_mode_custom_format() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let region = dir.path().join("r.5.-5.mca");
    let out = dir.path().join("out");
    write_region(&region, &[(3, chunk(vec![sign(1, 2, 3, ["[poi]", "Well", "", ""])]))]);

    let mut cmd = Command::cargo_bin("mcsign")?;
    cmd.arg("-0")
        .arg("--marker")
        .arg("[poi]")
        .arg("--format")
        .arg(r"%2\t%x %z 100%%\n")
        .arg(&out)
        .write_stdin(format!("{}\0", region.display()));
    cmd.assert().success();

    assert_eq!(fs::read_to_string(out.join("signs.5.-5.in"))?, "Well\t1 3 100%\n");
    Ok(())
}

#[test]
fn test_cli_missing_region_is_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let out = dir.path().join("out");

    let mut cmd = Command::cargo_bin("mcsign")?;
    cmd.arg(&out)
        .env("MCSIGN_LOG", "warn")
        .write_stdin(format!("{}\n", dir.path().join("nope.mca").display()));
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("skipping region"));
    Ok(())
}

#[test]
fn test_cli_rejects_bad_format() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut cmd = Command::cargo_bin("mcsign")?;
    cmd.arg("--format").arg("%q").arg(dir.path()).write_stdin("");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown format directive '%q'"));
    Ok(())
}

#[test]
fn test_cli_rejects_bad_coordinates() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut cmd = Command::cargo_bin("mcsign")?;
    cmd.arg("--world")
        .arg(dir.path())
        .arg(dir.path().join("out"))
        .write_stdin("1 two\n");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid input token 'two'"));
    Ok(())
}
