use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SCRIPT: &str = r#"
const introDialogues = [
  'Привет, ты попал в симулятор',
  "Проживи этот день"
];

function showIntroScreen(text, nextFn) {
  intro.style.display = 'block';
  showIntro(text);
  onNextClick(nextFn);
}

function hideIntro() {
  intro.style.display = 'none';
}

/* ---------- scenario ---------- */
function scene1() {
  showIntroScreen('Утро. Офис.', scene2);
  setDialogue('Начинаем...');
  showChoicesHTML(`
    <button class="choice" onclick="a()">Пройдусь по всему</button>
    <button class="choice" onclick="b()">И так сойдёт</button>
  `);
}
"#;

/// A command isolated from the developer's own config file.
fn simtools(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("simtools");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("RUST_LOG", "off");
    cmd
}

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("game.js"), SCRIPT).unwrap();
    dir
}

#[test]
fn stats_prints_exactly_two_lines() {
    let dir = project();
    // screens: 2 array + 1 showIntroScreen + 1 setDialogue
    // words:   5 + 3 + 2 + 1 + 3 + 3
    simtools(dir.path())
        .arg("--root")
        .arg(dir.path())
        .arg("stats")
        .assert()
        .success()
        .stdout("SCREENS: 4\nWORDS: 17\n");
}

#[test]
fn stats_breakdown_lists_categories() {
    let dir = project();
    simtools(dir.path())
        .arg("--root")
        .arg(dir.path())
        .args(["stats", "--breakdown"])
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with("SCREENS: 4\nWORDS: 17\n")
                .and(predicate::str::contains("  intro-array: 2 units, 8 words"))
                .and(predicate::str::contains("  choice-button: 2 units, 6 words")),
        );
}

#[test]
fn stats_on_empty_script_reports_zero() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("empty.js");
    fs::write(&script, "console.log(1);\n").unwrap();

    simtools(dir.path())
        .arg("stats")
        .arg("--script")
        .arg(&script)
        .assert()
        .success()
        .stdout("SCREENS: 0\nWORDS: 0\n");
}

#[test]
fn stats_missing_script_fails() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("project");
    fs::create_dir(&root).unwrap();

    simtools(dir.path())
        .arg("--root")
        .arg(&root)
        .arg("stats")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("script not found"));
}

#[test]
fn obfuscate_writes_mapping_snippet() {
    let dir = project();
    let assets = dir.path().join("assets");
    fs::create_dir(&assets).unwrap();
    fs::write(assets.join("girl-default.png"), b"x").unwrap();
    fs::write(assets.join("texture.png"), b"x").unwrap();

    simtools(dir.path())
        .arg("--root")
        .arg(dir.path())
        .arg("obfuscate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 files to obfuscate"));

    let js = fs::read_to_string(dir.path().join("tools").join("asset_mapping.js")).unwrap();
    assert!(js.contains("\"assets/girl-default.png\": \"assets/"));
    assert!(!js.contains("texture"));
    assert!(assets.join("girl-default.png").exists());
}

#[test]
fn obfuscate_rename_moves_files() {
    let dir = project();
    let assets = dir.path().join("assets");
    fs::create_dir(&assets).unwrap();
    fs::write(assets.join("girl-default.png"), b"x").unwrap();

    simtools(dir.path())
        .arg("--root")
        .arg(dir.path())
        .args(["obfuscate", "--rename"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Renamed 1 files"));
    assert!(!assets.join("girl-default.png").exists());
}

#[test]
fn obfuscate_without_assets_fails() {
    let dir = project();
    simtools(dir.path())
        .arg("--root")
        .arg(dir.path())
        .arg("obfuscate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("assets directory not found"));
}

#[test]
fn optimize_builtin_writes_webp() {
    let dir = project();
    let assets = dir.path().join("assets");
    fs::create_dir(&assets).unwrap();
    let png = assets.join("background-home.png");
    fs::write(&png, tiny_png()).unwrap();

    simtools(dir.path())
        .arg("--root")
        .arg(dir.path())
        .args(["optimize", "--backend", "builtin"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Optimised 1/1 PNG files with builtin")
                .and(predicate::str::contains("Wrote 1 WebP files")),
        );
    assert!(assets.join("background-home.webp").exists());
}

#[test]
fn optimize_rejects_bad_quality_range() {
    let dir = project();
    fs::create_dir(dir.path().join("assets")).unwrap();
    simtools(dir.path())
        .arg("--root")
        .arg(dir.path())
        .args(["optimize", "--backend", "builtin", "--png-quality", "90-10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid PNG quality range"));
}

#[test]
fn config_prints_defaults_and_honours_file() {
    let dir = tempfile::tempdir().unwrap();
    simtools(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lookback\": 120"));

    let cfg = dir.path().join("simtools.json");
    fs::write(&cfg, r#"{ "lookback": 7, "script": "src/game.js" }"#).unwrap();
    simtools(dir.path())
        .arg("--config")
        .arg(&cfg)
        .arg("config")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"lookback\": 7")
                .and(predicate::str::contains("\"script\": \"src/game.js\"")),
        );
}

#[test]
fn config_save_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("out").join("simtools.json");
    simtools(dir.path())
        .arg("--config")
        .arg(&cfg)
        .args(["config", "--save"])
        .assert()
        .success();
    assert!(fs::read_to_string(cfg).unwrap().contains("\"assets_dir\": \"assets\""));
}

/// A 2x2 RGBA PNG.
fn tiny_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x08, 0x06, 0x00, 0x00, 0x00, 0x72,
        0xB6, 0x0D, 0x24, 0x00, 0x00, 0x00, 0x12, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8,
        0xCF, 0xC0, 0xF0, 0x1F, 0x84, 0x19, 0xA0, 0xF4, 0x7F, 0x00, 0x43, 0xCE, 0x07, 0xF9, 0xFA,
        0x81, 0x4A, 0xFD, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}
