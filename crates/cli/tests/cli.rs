use assert_cmd::Command;

fn stdout_of(args: &[&str]) -> String {
    let assert = Command::cargo_bin("provision-cli")
        .unwrap()
        .args(args)
        .env("PROVISION_TELEMETRY__FILTER", "off")
        .env_remove("RUST_LOG")
        .assert()
        .success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

#[test]
fn catalog_prints_declared_layout() {
    let stdout = stdout_of(&["catalog"]);
    assert!(stdout.contains("BaseMap"));
    assert!(stdout.contains("Terrain"));
    assert!(stdout.contains("email_1"));
    assert!(stdout.contains("orderNumber_1"));
    assert!(stdout.contains("test_user"));
}

#[test]
fn plan_reaches_final_phase_in_memory() {
    let stdout = stdout_of(&["plan"]);
    assert!(stdout.contains("phase reached:        principals-created"));
    assert!(stdout.contains("documents inserted:   17"));
    assert!(stdout.contains("indexes:              15 created, 0 existing"));
    assert!(stdout.contains("principals:           3 created, 0 existing"));
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("provision-cli")
        .unwrap()
        .arg("migrate")
        .assert()
        .failure();
}
