use assert_cmd::cargo::cargo_bin_cmd;
use std::fs;

mod common;

use common::{parse_json, prepare_fixture, read, stderr_text, stdout_text};

#[test]
fn parse_lists_every_package() {
    let (_tmp, project) = prepare_fixture("mvt-parse");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["parse", "ext/readme.md"])
        .assert()
        .success();

    let stdout = stdout_text(&assert);
    assert!(stdout.starts_with("✔ mvt parse: parsed 4 package(s)"), "{stdout}");
    for name in ["backports.configparser", "guessit", "six", "subliminal"] {
        assert!(
            stdout.contains(&format!("Parsed package: {name}\n")),
            "missing {name}: {stdout}"
        );
    }
}

#[test]
fn parse_reports_broken_rows_with_exit_code_one() {
    let (_tmp, project) = prepare_fixture("mvt-parse-broken");
    let manifest = project.join("ext/readme.md");
    let text = read(&manifest).replace(
        "ext | **`guessit`** | [3.1.1]",
        "ext | **`guessit`** [3.1.1]",
    );
    fs::write(&manifest, text).expect("write manifest");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["parse", "ext/readme.md"])
        .assert()
        .code(1);

    let stderr = stderr_text(&assert);
    assert!(stderr.contains("✗ mvt parse: 1 row(s)"), "{stderr}");
    assert!(stderr.contains("Failed to parse"), "{stderr}");
    assert!(stderr.contains("Parsed package: six"), "{stderr}");
    assert!(stderr.contains("Hint: fix the rows shown above"), "{stderr}");
}

#[test]
fn parse_missing_file_is_a_user_error() {
    let (_tmp, project) = prepare_fixture("mvt-parse-missing");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["--json", "parse", "nope/readme.md"])
        .assert()
        .code(1);

    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "user-error");
    assert_eq!(
        payload["message"],
        "mvt parse: `nope/readme.md` does not exist"
    );
}

#[test]
fn check_passes_when_every_module_exists() {
    let (_tmp, project) = prepare_fixture("mvt-check");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["check", "ext/readme.md"])
        .assert()
        .success();

    let stdout = stdout_text(&assert);
    assert!(stdout.contains("all modules found"), "{stdout}");
    assert!(stdout.trim_end().ends_with("Done."), "{stdout}");
}

#[test]
fn check_flags_missing_modules() {
    let (_tmp, project) = prepare_fixture("mvt-check-missing");
    fs::remove_file(project.join("ext/configparser.py")).expect("remove module");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["check", "ext/readme.md"])
        .assert()
        .code(1);

    let stderr = stderr_text(&assert);
    assert!(
        stderr.contains("XX configparser.py !!  NOT FOUND IN: [ext/configparser.py]"),
        "{stderr}"
    );
    assert!(!stderr.contains("XX six.py"), "{stderr}");
}

#[test]
fn gen_writes_requirements_for_the_host_project() {
    let (_tmp, project) = prepare_fixture("mvt-gen");

    cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["gen"])
        .assert()
        .success();

    assert_eq!(
        read(&project.join("requirements.txt")),
        "guessit==3.1.1\n\
         six==1.15.0\n\
         subliminal @ https://codeload.github.com/Diaoul/subliminal/tar.gz/76525cc2f6545aeeccf620ca46d40c2f0aa53c6d\n"
    );
}

#[test]
fn gen_all_packages_to_custom_outfile() {
    let (_tmp, project) = prepare_fixture("mvt-gen-all");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["--json", "gen", "-a", "-o", "out/all.txt"])
        .assert()
        .success();

    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["details"]["count"], 4);
    let text = read(&project.join("out/all.txt"));
    assert!(text.starts_with("backports.configparser==4.0.2\n"), "{text}");
    assert!(!project.join("requirements.txt").exists());
}

#[test]
fn gen_json_then_make_rebuilds_the_manifest() {
    let (_tmp, project) = prepare_fixture("mvt-make");

    cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["gen", "-a", "-j"])
        .assert()
        .success();
    let json = read(&project.join("requirements.json"));
    assert!(json.starts_with("[\n  {\"folder\":[\"ext\"],\"name\":\"backports.configparser\""), "{json}");

    cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["make", "-o", "rebuilt/readme.md"])
        .assert()
        .success();

    assert_eq!(
        read(&project.join("rebuilt/readme.md")),
        read(&project.join("ext/readme.md"))
    );
}

#[test]
fn make_rejects_invalid_json() {
    let (_tmp, project) = prepare_fixture("mvt-make-invalid");
    fs::write(project.join("requirements.json"), "{ not json").expect("write json");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["make"])
        .assert()
        .code(1);

    let stderr = stderr_text(&assert);
    assert!(stderr.contains("invalid requirements JSON"), "{stderr}");
    assert!(stderr.contains("Hint: regenerate it with `mvt gen --json`"), "{stderr}");
}

#[test]
fn sort_orders_rows_and_keeps_sorted_files() {
    let (_tmp, project) = prepare_fixture("mvt-sort");
    let ext_before = read(&project.join("ext/readme.md"));

    cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["sort"])
        .assert()
        .success();

    assert_eq!(read(&project.join("ext/readme.md")), ext_before);
    let lib = read(&project.join("lib/readme.md"));
    let bencode = lib.find("<code><b>bencode</b>.py</code>").expect("bencode row");
    let tornado = lib.find("**`tornado`**").expect("tornado row");
    assert!(bencode < tornado, "{lib}");
    assert!(lib.ends_with("- `lib3` only compatible with Python 3\n"), "{lib}");
}
