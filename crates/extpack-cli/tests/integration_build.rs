//! End-to-end tests for the `extpack` binary.
//!
//! Builds use a stand-in esbuild script under `node_modules/.bin` so they run
//! without Node.js. It writes one bundle and one source map per entry point.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ENTRIES: [&str; 4] = ["background", "content", "inpage", "popup"];

/// Extension project with two static assets and the four entry sources.
fn create_extension_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::create_dir_all(root.join("public")).unwrap();
    fs::write(
        root.join("public/manifest.json"),
        r#"{"manifest_version":3,"name":"demo","version":"1.0.0"}"#,
    )
    .unwrap();
    fs::write(root.join("public/icon.png"), [0x89, b'P', b'N', b'G']).unwrap();

    fs::create_dir_all(root.join("src")).unwrap();
    for entry in ENTRIES {
        fs::write(
            root.join("src").join(format!("{entry}.ts")),
            format!("console.log('{entry}');\n"),
        )
        .unwrap();
    }

    temp
}

fn extpack(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("extpack").unwrap();
    cmd.arg("--cwd")
        .arg(cwd)
        .arg("--no-color")
        .env("NO_COLOR", "1")
        .env_remove("EXTPACK_OUT_DIR")
        .env_remove("EXTPACK_PUBLIC_DIR")
        .env_remove("EXTPACK_ESBUILD")
        .env_remove("RUST_LOG");
    cmd
}

/// Names of the non-map files directly under `dir`.
fn top_level_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.ends_with(".map"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_missing_public_dir_fails_before_compiling() {
    let temp = create_extension_project();
    fs::remove_dir_all(temp.path().join("public")).unwrap();

    extpack(temp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Build failed"))
        .stderr(predicate::str::contains("public"));

    assert!(!temp.path().join("dist/background.js").exists());
}

#[test]
fn test_missing_entry_names_it() {
    let temp = create_extension_project();
    fs::remove_file(temp.path().join("src/popup.ts")).unwrap();

    extpack(temp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Build failed"))
        .stderr(predicate::str::contains("popup"));

    assert!(!temp.path().join("dist/popup.js").exists());
    // Staging already happened
    assert!(temp.path().join("dist/manifest.json").is_file());
}

#[test]
fn test_unknown_config_field_rejected() {
    let temp = create_extension_project();
    fs::write(
        temp.path().join("extpack.config.json"),
        r#"{ "outdir": "build" }"#,
    )
    .unwrap();

    extpack(temp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_missing_explicit_config_rejected() {
    let temp = create_extension_project();

    extpack(temp.path())
        .args(["--config", "nope.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    let temp = create_extension_project();

    extpack(temp.path())
        .args(["--verbose", "--quiet"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_missing_esbuild_reported() {
    let temp = create_extension_project();
    fs::write(
        temp.path().join("extpack.config.json"),
        r#"{ "esbuild": "tools/esbuild" }"#,
    )
    .unwrap();

    extpack(temp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Could not find the esbuild executable"));
}

#[cfg(unix)]
mod with_fake_esbuild {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::os::unix::fs::PermissionsExt;
    use std::process::Stdio;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    const FAKE_ESBUILD: &str = r#"#!/bin/sh
outdir=""
metafile=""
sourcemap=0
names=""
for arg in "$@"; do
  case "$arg" in
    --outdir=*) outdir="${arg#--outdir=}" ;;
    --metafile=*) metafile="${arg#--metafile=}" ;;
    --sourcemap) sourcemap=1 ;;
    --*) ;;
    *=*) names="$names ${arg%%=*}" ;;
  esac
done
mkdir -p "$outdir"
for name in $names; do
  echo "console.log('$name');" > "$outdir/$name.js"
  if [ "$sourcemap" = 1 ]; then
    echo '{"version":3,"sources":[],"mappings":""}' > "$outdir/$name.js.map"
  fi
done
echo '{"inputs":{},"outputs":{}}' > "$metafile"
"#;

    const FAILING_ESBUILD: &str = r#"#!/bin/sh
cat >&2 <<'LOG'
✘ [ERROR] Expected ";" but found "}"

    src/popup.ts:3:1:
      3 │ }
        ╵ ^

1 error
LOG
exit 1
"#;

    fn install_esbuild(root: &Path, script: &str) {
        let bin = root.join("node_modules/.bin");
        fs::create_dir_all(&bin).unwrap();
        let path = bin.join("esbuild");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_one_shot_build_writes_six_artifacts() {
        let temp = create_extension_project();
        install_esbuild(temp.path(), FAKE_ESBUILD);

        extpack(temp.path())
            .assert()
            .success()
            .stderr(predicate::str::contains("Build complete!"));

        let dist = temp.path().join("dist");
        assert_eq!(
            top_level_files(&dist),
            vec![
                "background.js",
                "content.js",
                "icon.png",
                "inpage.js",
                "manifest.json",
                "popup.js"
            ]
        );
        for entry in ENTRIES {
            assert!(dist.join(format!("{entry}.js.map")).is_file());
        }
        assert_eq!(
            fs::read(dist.join("icon.png")).unwrap(),
            vec![0x89, b'P', b'N', b'G']
        );
    }

    #[test]
    fn test_out_dir_from_environment() {
        let temp = create_extension_project();
        install_esbuild(temp.path(), FAKE_ESBUILD);

        extpack(temp.path())
            .env("EXTPACK_OUT_DIR", "build")
            .assert()
            .success();

        assert!(temp.path().join("build/popup.js").is_file());
        assert!(temp.path().join("build/manifest.json").is_file());
        assert!(!temp.path().join("dist").exists());
    }

    #[test]
    fn test_out_dir_flag_beats_environment() {
        let temp = create_extension_project();
        install_esbuild(temp.path(), FAKE_ESBUILD);

        extpack(temp.path())
            .env("EXTPACK_OUT_DIR", "build")
            .args(["--out-dir", "out"])
            .assert()
            .success();

        assert!(temp.path().join("out/popup.js").is_file());
        assert!(!temp.path().join("build").exists());
    }

    #[test]
    fn test_compile_error_reported_with_location() {
        let temp = create_extension_project();
        install_esbuild(temp.path(), FAILING_ESBUILD);

        extpack(temp.path())
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Build failed"))
            .stderr(predicate::str::contains("src/popup.ts:3:1"));
    }

    /// Start `extpack --watch` and wait for the watching notice.
    fn assert_stays_resident(root: &Path) {
        let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("extpack"))
            .arg("--watch")
            .arg("--cwd")
            .arg(root)
            .arg("--no-color")
            .env("NO_COLOR", "1")
            .env_remove("EXTPACK_OUT_DIR")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let stderr = child.stderr.take().unwrap();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let deadline = Instant::now() + Duration::from_secs(30);
        let mut seen = Vec::new();
        let watching = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(line) if line.contains("Watching for changes...") => break true,
                Ok(line) => seen.push(line),
                Err(_) => break false,
            }
        };

        if !watching {
            let _ = child.kill();
            panic!("watching notice not printed, stderr: {seen:#?}");
        }

        std::thread::sleep(Duration::from_millis(500));
        let status = child.try_wait().unwrap();
        let _ = child.kill();
        let _ = child.wait();
        assert!(status.is_none(), "watch mode exited: {status:?}");
    }

    #[test]
    fn test_watch_mode_stays_resident() {
        let temp = create_extension_project();
        install_esbuild(temp.path(), FAKE_ESBUILD);

        assert_stays_resident(temp.path());
        assert!(temp.path().join("dist/manifest.json").is_file());
    }

    #[test]
    fn test_watch_mode_survives_failing_build() {
        let temp = create_extension_project();
        install_esbuild(temp.path(), FAILING_ESBUILD);

        assert_stays_resident(temp.path());
    }
}
