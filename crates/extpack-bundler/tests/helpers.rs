//! Shared test utilities for extpack-bundler tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// The four surfaces of a browser extension.
pub const SURFACES: [&str; 4] = ["background", "content", "inpage", "popup"];

/// Create an extension project with a flat `public/` and one source per surface.
pub fn create_extension_project() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let public = dir.path().join("public");
    let src = dir.path().join("src");
    fs::create_dir_all(&public).expect("create public");
    fs::create_dir_all(&src).expect("create src");

    fs::write(
        public.join("manifest.json"),
        r#"{
  "manifest_version": 3,
  "name": "Fixture",
  "version": "1.0.0",
  "background": { "service_worker": "background.js", "type": "module" },
  "action": { "default_popup": "popup.html" }
}
"#,
    )
    .expect("write manifest");
    fs::write(public.join("icon.png"), [0x89u8, b'P', b'N', b'G', 0x0d, 0x0a]).expect("write icon");

    fs::write(
        src.join("shared.ts"),
        "export const greet = (who: string): string => `hello ${who}`;\n",
    )
    .expect("write shared");

    for surface in SURFACES {
        fs::write(
            src.join(format!("{surface}.ts")),
            format!(
                "import {{ greet }} from './shared';\nif (process.env.NODE_ENV !== 'production') {{ throw new Error('dev'); }}\nconsole.log(greet('{surface}'));\n"
            ),
        )
        .expect("write surface");
    }

    dir
}

/// Names of the regular files directly under `dir`, sorted.
pub fn top_level_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

/// Whether an esbuild executable is available to run real compiles.
pub fn esbuild_available() -> bool {
    which::which("esbuild").is_ok()
}
