use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Seed one installed package under `<root>/packages/<name>***<version>/`,
/// with `files` created (empty) inside its `root/` tree.
fn seed_package(system_root: &Path, name: &str, version: &str, dependencies: &str, files: &[&str]) {
    let entry = system_root
        .join("packages")
        .join(format!("{name}***{version}"));
    let root = entry.join("root");
    fs::create_dir_all(&root).unwrap();

    for file in files {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
    }

    let manifest = format!(
        r#"{{
  "name": "{name}",
  "version": "{version}",
  "architecture": "amd64",
  "maintainer": "Test Maintainer <test@example.org>",
  "description": "test package {name}",
  "dependencies": "{dependencies}",
  "source": "deb"
}}"#
    );
    fs::write(entry.join("pkg-info.json"), manifest).unwrap();
}

fn debcell(system_root: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("debcell"));
    cmd.arg("--root").arg(system_root);
    cmd
}

#[test]
fn test_help_mentions_subcommands() {
    let mut cmd = Command::new(cargo::cargo_bin!("debcell"));
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_list_empty_registry() {
    let root_dir = tempdir().unwrap();

    debcell(root_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No packages installed."));
}

#[test]
fn test_list_and_show_installed_packages() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    seed_package(root, "base-system", "1.0", "", &["etc/hostname"]);
    seed_package(root, "hello", "2.0", "libgreet (>= 1.0)", &["usr/bin/hello"]);
    seed_package(root, "libgreet", "1.2", "", &["usr/lib/libgreet.so.1"]);

    debcell(root)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("base-system 1.0"))
        .stdout(predicate::str::contains("hello 2.0"))
        .stdout(predicate::str::contains("libgreet 1.2"));

    debcell(root)
        .args(["show", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Version: 2.0"))
        .stdout(predicate::str::contains("Dependencies: libgreet (>= 1.0)"));
}

#[test]
fn test_list_skips_corrupt_entries() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    seed_package(root, "base-system", "1.0", "", &[]);
    fs::create_dir_all(root.join("packages/garbage")).unwrap();

    debcell(root)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("base-system 1.0"))
        .stdout(predicate::str::contains("garbage").not());
}

#[test]
fn test_run_print_overlay_plan() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    seed_package(root, "base-system", "1.0", "", &["etc/hostname"]);
    seed_package(root, "hello", "2.0", "libgreet (>= 1.0)", &["usr/bin/hello"]);
    seed_package(root, "libgreet", "1.2", "", &["usr/lib/libgreet.so.1"]);

    debcell(root)
        .args(["run", "--print", "hello", "--", "/usr/bin/hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--overlay-src"))
        .stdout(predicate::str::contains("base-system***1.0/root"))
        .stdout(predicate::str::contains("hello***2.0/root"))
        .stdout(predicate::str::contains("libgreet***1.2/root"))
        .stdout(predicate::str::contains("--tmp-overlay /"))
        .stdout(predicate::str::contains("-- /usr/bin/hello"));
}

#[test]
fn test_run_print_symlink_merge_plan() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    seed_package(root, "base-system", "1.0", "", &["etc/hostname"]);
    seed_package(root, "hello", "2.0", "libgreet (>= 1.0)", &["usr/bin/hello"]);
    seed_package(root, "libgreet", "1.2", "", &["usr/lib/libgreet.so.1"]);

    debcell(root)
        .args([
            "run",
            "--print",
            "--mode",
            "symlink",
            "hello",
            "--",
            "/usr/bin/hello",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--symlink"))
        // usr is shared between hello and libgreet: a real directory.
        .stdout(predicate::str::contains("--dir /usr"))
        .stdout(predicate::str::contains("/packages/hello***2.0/root/usr/bin"));
}

#[test]
fn test_run_unresolved_dependency_names_the_constraint() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    seed_package(root, "base-system", "1.0", "", &[]);
    seed_package(root, "broken", "1.0", "missing (>= 1.0)", &["usr/bin/broken"]);

    debcell(root)
        .args(["run", "--print", "broken", "--", "/usr/bin/broken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing (>= 1.0)"));
}

#[test]
fn test_run_without_base_package_fails() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    seed_package(root, "hello", "2.0", "", &["usr/bin/hello"]);

    debcell(root)
        .args(["run", "--print", "hello", "--", "/usr/bin/hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base-system"));
}

#[test]
fn test_run_with_custom_base_package() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    seed_package(root, "rootfs", "0.1", "", &["etc/hostname"]);
    seed_package(root, "hello", "2.0", "", &["usr/bin/hello"]);

    debcell(root)
        .args([
            "run",
            "--print",
            "--base",
            "rootfs",
            "hello",
            "--",
            "/usr/bin/hello",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("rootfs***0.1/root"));
}

#[test]
fn test_remove_deletes_the_entry() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    seed_package(root, "base-system", "1.0", "", &[]);
    seed_package(root, "hello", "2.0", "", &["usr/bin/hello"]);

    debcell(root).args(["remove", "hello"]).assert().success();

    assert!(!root.join("packages/hello***2.0").exists());
    debcell(root)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("hello").not());
}

#[test]
fn test_remove_missing_package_fails() {
    let root_dir = tempdir().unwrap();
    seed_package(root_dir.path(), "base-system", "1.0", "", &[]);

    debcell(root_dir.path())
        .args(["remove", "absent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not installed"));
}

#[test]
fn test_install_rejects_non_deb_file() {
    let root_dir = tempdir().unwrap();
    let bogus = root_dir.path().join("bogus.txt");
    fs::write(&bogus, "not an archive").unwrap();

    debcell(root_dir.path())
        .arg("install")
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not look like a .deb"));
}
