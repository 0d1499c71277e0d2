use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::json;
use std::fs;

mod common;

use common::{parse_json, prepare_fixture, read, stderr_text, stdout_text};

#[test]
fn remove_deletes_modules_and_unlinks_dependencies() {
    let (_tmp, project) = prepare_fixture("mvt-remove");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["remove", "guessit"])
        .assert()
        .success();

    let stdout = stdout_text(&assert);
    assert!(stdout.starts_with("✔ mvt remove: removed guessit"), "{stdout}");
    assert!(stdout.contains("Starting removal of `guessit`"), "{stdout}");
    assert!(
        stdout.contains("Removed `guessit` usage from dependency `six`"),
        "{stdout}"
    );
    assert!(
        stdout.contains("Possibly unused: `backports.configparser`, consider removing"),
        "{stdout}"
    );
    assert!(!project.join("ext/guessit").exists());

    let manifest = read(&project.join("ext/readme.md"));
    assert!(!manifest.contains("`guessit`"), "{manifest}");
    assert!(
        manifest.contains("ext | <code><b>six</b>.py</code> | [1.15.0](https://pypi.org/project/six/1.15.0/) | **`medusa`** | -"),
        "{manifest}"
    );
    assert!(
        manifest.contains("ext | `backports.configparser` | [4.0.2](https://pypi.org/project/backports.configparser/4.0.2/) | `<UNUSED>` |"),
        "{manifest}"
    );
    assert_eq!(
        read(&project.join("requirements.txt")),
        "six==1.15.0\n\
         subliminal @ https://codeload.github.com/Diaoul/subliminal/tar.gz/76525cc2f6545aeeccf620ca46d40c2f0aa53c6d\n"
    );
}

#[test]
fn remove_reports_libraries_still_using_the_package() {
    let (_tmp, project) = prepare_fixture("mvt-remove-used");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["--json", "remove", "SIX"])
        .assert()
        .success();

    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["details"]["package"], "six");
    assert_eq!(payload["details"]["still_used_by"], json!(["guessit"]));
    assert!(!project.join("ext/six.py").exists());
    assert!(project.join("ext/guessit").exists());
}

#[test]
fn remove_unknown_package_exits_with_user_error() {
    let (_tmp, project) = prepare_fixture("mvt-remove-unknown");
    let before = read(&project.join("ext/readme.md"));

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["remove", "requests"])
        .assert()
        .code(1);

    let stderr = stderr_text(&assert);
    assert!(
        stderr.contains("✗ mvt remove: Package `requests` not found"),
        "{stderr}"
    );
    assert_eq!(read(&project.join("ext/readme.md")), before);
}

#[test]
fn remove_requires_an_existing_listfile() {
    let (_tmp, project) = prepare_fixture("mvt-remove-nolist");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["--json", "remove", "six", "-f", "ext3/readme.md"])
        .assert()
        .code(1);

    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "user-error");
    assert_eq!(payload["details"]["path"], "ext3/readme.md");
}

#[test]
fn update_cmd_prints_the_vendor_command() {
    let (_tmp, project) = prepare_fixture("mvt-update-cmd");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["--json", "update", "subliminal", "--cmd"])
        .assert()
        .success();

    let payload = parse_json(&assert);
    assert_eq!(
        payload["details"]["command"],
        "mvt vendor \"subliminal @ https://github.com/Diaoul/subliminal/archive/develop.tar.gz\""
    );
}

#[test]
fn update_cmd_names_a_non_default_listfile() {
    let (_tmp, project) = prepare_fixture("mvt-update-lib");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["update", "tornado", "--cmd", "-f", "lib/readme.md"])
        .assert()
        .success();

    let stdout = stdout_text(&assert);
    assert!(
        stdout.contains("> mvt vendor -f lib/readme.md tornado"),
        "{stdout}"
    );
}

#[test]
fn update_unknown_package_is_a_user_error() {
    let (_tmp, project) = prepare_fixture("mvt-update-unknown");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["update", "requests", "--cmd"])
        .assert()
        .code(1);

    assert!(stderr_text(&assert).contains("Package `requests` not found."));
}

#[test]
fn vendor_rejects_unparseable_specs() {
    let (_tmp, project) = prepare_fixture("mvt-vendor-spec");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["vendor", "==1.0"])
        .assert()
        .code(1);

    let stderr = stderr_text(&assert);
    assert!(stderr.contains("unable to parse `==1.0`"), "{stderr}");
}

#[test]
fn vendor_refuses_to_rewrite_a_broken_manifest() {
    let (_tmp, project) = prepare_fixture("mvt-vendor-broken");
    let manifest = project.join("ext/readme.md");
    let broken = read(&manifest).replace("| **`medusa`** | -\next | <code>", "| -\next | <code>");
    fs::write(&manifest, &broken).expect("write manifest");

    let assert = cargo_bin_cmd!("mvt")
        .current_dir(&project)
        .args(["--json", "vendor", "six==1.16.0"])
        .assert()
        .code(1);

    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "user-error");
    assert_eq!(payload["details"]["rows"], json!([5]));
    assert_eq!(read(&manifest), broken);
}
