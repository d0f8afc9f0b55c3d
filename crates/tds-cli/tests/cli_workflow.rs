use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const REFLECTION_COUNT: i32 = 36;

fn xdtds(workdir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xdtds"))
        .args(args)
        .arg("--workdir")
        .arg(workdir)
        .env_remove("RUST_LOG")
        .output()
        .expect("xdtds should start")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_inputs(workdir: &Path) {
    fs::write(
        workdir.join("xd.mas"),
        concat!(
            "XDPARFILE VERSION 2\n",
            "CELL  20.0000  20.0000  20.0000  90.0000  90.0000  90.0000\n",
            "SCALE 1\n",
            "END XDLSM\n",
        ),
    )
    .expect("xd.mas written");
    fs::write(
        workdir.join("xd.inp"),
        concat!(
            "XDPARFILE VERSION 2\n",
            "USAGE    12   3   0   0   1   1   0   1   0   0   0   0   0   0\n",
            "  0.100000E+01\n",
            "END\n",
        ),
    )
    .expect("xd.inp written");

    let mut hkl = String::from("XDNAME F^2 NDAT 7\n");
    for h in 1..=REFLECTION_COUNT {
        let intensity = 500.0 / f64::from(h);
        hkl.push_str(&format!(
            "{:4}{:4}{:4}{:4} {:11.6} {:11.6}  0.95\n",
            h,
            0,
            0,
            1,
            intensity,
            intensity / 25.0
        ));
    }
    fs::write(workdir.join("xd.hkl"), hkl).expect("xd.hkl written");
}

/// Fixture outputs of one refinement: every row accepted, sin(theta)/lambda
/// of a cubic 20 A cell, and twelve refined scale factors that fall off
/// with resolution.
fn write_refinement_fixtures(dir: &Path) {
    let mut fco = String::new();
    for line in 0..26 {
        fco.push_str(&format!("! fco header {}\n", line + 1));
    }
    for h in 1..=REFLECTION_COUNT {
        fco.push_str(&format!(
            "{:4}{:4}{:4} {:12.4} {:12.4} {:10.4} {:10.6} {:3}\n",
            h,
            0,
            0,
            100.0,
            100.0,
            4.0,
            f64::from(h) / 40.0,
            0
        ));
    }
    fs::write(dir.join("fixture.fco"), fco).expect("fixture fco written");
    fs::write(
        dir.join("fixture.res"),
        concat!(
            "XDPARFILE VERSION 2\n",
            "C(1)  0.123400E+00 0.456700E+00\n",
            "  0.100000E+01  0.998000E+00  0.994000E+00  0.988000E+00  0.980000E+00  0.970000E+00\n",
            "  0.958000E+00  0.944000E+00  0.928000E+00  0.910000E+00  0.890000E+00  0.868000E+00\n",
        ),
    )
    .expect("fixture res written");
}

/// A shell script standing in for xdlsm, run through `sh` so no execute
/// permission is needed.
fn write_stub_program(dir: &Path) -> String {
    write_refinement_fixtures(dir);
    let script = dir.join("xdlsm-stub.sh");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\ncp '{fco}' xd.fco\ncp '{res}' xd.res\necho \"$1\" >> '{log}'\n",
            fco = dir.join("fixture.fco").display(),
            res = dir.join("fixture.res").display(),
            log = dir.join("invocations.log").display(),
        ),
    )
    .expect("stub script written");
    script.display().to_string()
}

#[cfg(unix)]
#[test]
fn run_drives_the_refinement_program_and_reports_the_chain() {
    let workdir = TempDir::new().expect("tempdir should be created");
    let tools = TempDir::new().expect("tempdir should be created");
    write_inputs(workdir.path());
    let script = write_stub_program(tools.path());

    let output = xdtds(
        workdir.path(),
        &[
            "run",
            "--program",
            "sh",
            "--program-arg",
            script.as_str(),
            "--program-arg",
            "xd",
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));

    let stdout = stdout_of(&output);
    assert!(stdout.contains("TDS correction: 5 refinements, 12 scale factors, 2 cycles"));
    assert!(stdout.contains("Cycle 1: a="));
    assert!(stdout.contains("Cycle 2: a="));
    assert!(stdout.contains("Combined correction:"));
    assert!(stdout.contains("xd-tds-chain.json"));

    let invocations = fs::read_to_string(tools.path().join("invocations.log")).expect("log");
    assert_eq!(invocations.lines().collect::<Vec<_>>(), vec!["xd"; 5]);

    let hkl = fs::read_to_string(workdir.path().join("xd.hkl")).expect("final hkl");
    assert_eq!(hkl.matches("!TDS CORRECTION FACTOR: a=").count(), 1);
    assert!(workdir.path().join("xd03.hkl").is_file());

    let manifest: Value = serde_json::from_str(
        &fs::read_to_string(workdir.path().join("xd-tds-chain.json")).expect("manifest"),
    )
    .expect("manifest is json");
    assert_eq!(manifest["firstIndex"], 0);
    assert_eq!(manifest["entries"].as_array().map(Vec::len), Some(5));
}

#[test]
fn short_reflection_rows_exit_with_input_code() {
    let workdir = TempDir::new().expect("tempdir should be created");
    write_inputs(workdir.path());
    fs::write(
        workdir.path().join("xd.hkl"),
        "XDNAME F^2 NDAT 5\n   1   0   0   1  100.000000\n",
    )
    .expect("short hkl written");

    let output = xdtds(workdir.path(), &["run", "--program", "xdlsm-does-not-exist"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("ERROR: [INPUT.HKL_COLUMNS]"), "stderr: {}", stderr);
    assert!(stderr.contains("FATAL EXIT CODE: 2"));
    assert!(!workdir.path().join("xd00.hkl").exists());
}

#[test]
fn missing_refinement_program_exits_with_io_code() {
    let workdir = TempDir::new().expect("tempdir should be created");
    write_inputs(workdir.path());

    let output = xdtds(workdir.path(), &["run", "--program", "xdlsm-does-not-exist"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr_of(&output).contains("ERROR: [IO.XDLSM_EXEC]"));
    assert!(!workdir.path().join("xd00.hkl").exists());
}

#[test]
fn invalid_scale_count_is_rejected_before_touching_files() {
    let workdir = TempDir::new().expect("tempdir should be created");
    write_inputs(workdir.path());

    let output = xdtds(workdir.path(), &["run", "--scale-count", "1"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("INPUT.CONFIG_SCALE_COUNT"));
    assert!(!workdir.path().join("xd00.hkl").exists());
}

#[test]
fn apply_writes_annotated_corrected_reflections() {
    let workdir = TempDir::new().expect("tempdir should be created");
    write_inputs(workdir.path());

    let output = xdtds(
        workdir.path(),
        &[
            "apply",
            "--a",
            "0.5",
            "--b",
            "-0.2",
            "--resolution-source",
            "cell",
            "--output",
            "corrected.hkl",
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert!(stdout_of(&output).contains("to 36 reflections (0 dropped)"));

    let corrected = fs::read_to_string(workdir.path().join("corrected.hkl")).expect("output");
    assert!(corrected.contains("!TDS CORRECTION FACTOR: a=0.500, b=-0.200"));
    let original = fs::read_to_string(workdir.path().join("xd.hkl")).expect("input");
    assert!(!original.contains("!TDS CORRECTION FACTOR"));

    // h = 20 sits at sin(theta)/lambda 0.5: factor 1 + 0.5*0.25 - 0.2*0.125 = 1.1.
    let row = corrected
        .lines()
        .find(|line| line.starts_with("  20   0   0"))
        .expect("row 20 present");
    let intensity = row
        .split_whitespace()
        .nth(4)
        .and_then(|token| token.parse::<f64>().ok())
        .expect("intensity column");
    assert!((intensity - 25.0 / 1.1).abs() < 1.0e-5);
}

#[test]
fn apply_in_fco_mode_needs_the_calculated_file() {
    let workdir = TempDir::new().expect("tempdir should be created");
    write_inputs(workdir.path());

    let output = xdtds(workdir.path(), &["apply", "--a", "0.1", "--b", "0.0"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr_of(&output).contains("ERROR: [IO.FCO_READ]"));
}

#[test]
fn bin_writes_scaled_reflections_and_checks_the_fco() {
    let workdir = TempDir::new().expect("tempdir should be created");
    write_inputs(workdir.path());
    write_refinement_fixtures(workdir.path());
    fs::rename(workdir.path().join("fixture.fco"), workdir.path().join("xd.fco"))
        .expect("fco in place");

    let output = xdtds(workdir.path(), &["bin", "--scale-count", "6"]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains(
        "Assigned 36 reflections to 6 resolution bins up to sin(theta)/lambda 0.9000"
    ));
    assert!(stdout.contains("xd.fco maximum sin(theta)/lambda agrees"));

    let scaled = fs::read_to_string(workdir.path().join("xd_scaled.hkl")).expect("scaled");
    let batches = scaled
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(3))
        .collect::<Vec<_>>();
    assert_eq!(batches.first(), Some(&"1"));
    assert_eq!(batches.last(), Some(&"6"));
}
