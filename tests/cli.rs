use std::fs;
use std::path::Path;
use std::process::Command;

use causa::fixtures::{self, RecordBuilder, SciBuilder};
use causa::layout::BLOCK_B;
use tempfile::tempdir;

fn write_csv(path: &Path, rows: &[Vec<String>]) {
    let mut writer = csv::Writer::from_path(path).expect("create csv");
    for row in rows {
        writer.write_record(row).expect("write row");
    }
    writer.flush().expect("flush csv");
}

fn write_fixtures(dir: &Path) {
    let sci = SciBuilder::new()
        .propensity_row(40, "E")
        .propensity(40, BLOCK_B.start + 1, "I")
        .rows();
    write_csv(&dir.join("sci.csv"), &sci);

    let mut input = vec![fixtures::header()];
    input.push(RecordBuilder::new("K1").male().adult().yes(40).row());
    input.push(RecordBuilder::new("K2").female().neonate().yes(40).row());
    input.push(RecordBuilder::new("K3").male().yes(40).row());
    write_csv(&dir.join("input.csv"), &input);
}

#[test]
fn run_writes_every_output_file() {
    let tmp = tempdir().expect("temporary directory");
    write_fixtures(tmp.path());

    let exe = env!("CARGO_BIN_EXE_causa");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args([
            "run",
            "input.csv",
            "--sci",
            "sci.csv",
            "--hiv",
            "l",
            "--malaria",
            "V",
            "--checked-data",
            "--format",
            "classic",
            "--output-dir",
            "out",
        ])
        .output()
        .expect("run causa cli");

    assert!(output.status.success(), "CLI exited with {:?}", output.status);
    let out = tmp.path().join("out");
    for name in ["VA5_result.csv", "errorlogV5.txt", "checked_data.csv", "csmf.csv"] {
        assert!(out.join(name).exists(), "{name} missing");
    }

    let results = fs::read_to_string(out.join("VA5_result.csv")).expect("read results");
    let mut lines = results.lines();
    assert!(lines.next().is_some_and(|h| h.starts_with("ID,MALPREV,HIVPREV")));
    assert!(lines.next().is_some_and(|l| l.starts_with("K1,v,l,n/a")));
    assert_eq!(lines.count(), 1);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Acute resp infect incl pneumonia"));
}

#[test]
fn negative_top_is_rejected() {
    let tmp = tempdir().expect("temporary directory");
    write_fixtures(tmp.path());

    let status = Command::new(env!("CARGO_BIN_EXE_causa"))
        .current_dir(tmp.path())
        .args(["run", "input.csv", "--sci", "sci.csv", "--top", "-2"])
        .status()
        .expect("run causa cli");
    assert_eq!(status.code(), Some(1));
}

#[test]
fn indiv_writes_the_ranked_table() {
    let tmp = tempdir().expect("temporary directory");
    write_fixtures(tmp.path());

    let status = Command::new(env!("CARGO_BIN_EXE_causa"))
        .current_dir(tmp.path())
        .args(["indiv", "input.csv", "--sci", "sci.csv", "--top", "2", "--include-prop"])
        .status()
        .expect("run causa cli");
    assert!(status.success());

    let table = fs::read_to_string(tmp.path().join("indiv_prob.csv")).expect("read table");
    let mut lines = table.lines();
    assert_eq!(lines.next(), Some("ID,CAUSE1,PROB1,CAUSE2,PROB2"));
    assert!(lines.next().is_some_and(|l| l.starts_with("K1,Acute resp infect incl pneumonia,")));
    assert!(lines.next().is_some_and(|l| l.starts_with("K2,")));
    assert_eq!(lines.next(), None);
}

#[test]
fn run_without_sci_uses_the_data_directory() {
    let tmp = tempdir().expect("temporary directory");
    write_fixtures(tmp.path());
    let data = tmp.path().join("data");
    fs::create_dir(&data).expect("data directory");
    fs::rename(tmp.path().join("sci.csv"), data.join("probbase.csv")).expect("install SCI");

    let status = Command::new(env!("CARGO_BIN_EXE_causa"))
        .current_dir(tmp.path())
        .env("CAUSA_DATA_DIR", &data)
        .args(["run", "input.csv"])
        .status()
        .expect("run causa cli");
    assert!(status.success());
    assert!(tmp.path().join("VA5_result.csv").exists());

    let empty = tempdir().expect("empty data directory");
    let output = Command::new(env!("CARGO_BIN_EXE_causa"))
        .current_dir(tmp.path())
        .env("CAUSA_DATA_DIR", empty.path())
        .args(["run", "input.csv"])
        .output()
        .expect("run causa cli");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("probbase.csv"));
}
