use std::process::Command;

fn labscan() -> Command {
    Command::new(env!("CARGO_BIN_EXE_labscan"))
}

#[test]
fn tests_subcommand_lists_catalog() {
    let output = labscan().arg("tests").output().expect("failed to run binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("glucose_fasting"));
    assert!(stdout.contains("hba1c"));
    assert!(stdout.contains("mg/dL"));
}

#[test]
fn probe_rejects_unsupported_extension() {
    let output = labscan()
        .args(["probe", "notes.txt"])
        .output()
        .expect("failed to run binary");

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("format support: no"));
}

#[test]
fn extract_missing_file_reports_failed_result() {
    let output = labscan()
        .args(["extract", "/nonexistent/report.pdf"])
        .output()
        .expect("failed to run binary");

    // Failed extraction exits nonzero but still prints the result record
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"method\": \"failed\""));
    assert!(stdout.contains("\"requires_manual_review\": true"));
}
