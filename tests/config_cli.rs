use predicates::str::{contains, diff};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_config(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be available")
        .as_nanos();
    path.push(format!("raq-config-{}.{}", nanos, extension));
    fs::write(&path, contents).expect("config write should succeed");
    path
}

#[test]
fn config_file_toml_is_applied() {
    let config = r#"
[simulation]
rake_count = 1
rake_capacity = 150
seed = 5
strategy = "nearest-rake"

[simulation.generation]
enabled = false

[[simulation.stockyards]]
name = "North"
position = { x = 0.0, y = 0.0 }
materials = { "Coal" = 200 }
loading_capacity = 1
"#;
    let path = write_temp_config(config, "toml");

    let expected = concat!(
        "Strategy: nearest-rake\n",
        "Rakes: 1 x 150t at (50, 50)\n",
        "Seed: 5\n",
        "Generation: off\n",
        "Stockyards:\n",
        "- North at (0, 0), 1 slots: Coal 200t\n",
        "Destinations:\n",
        "- Bokaro Steel Plant at (80, 50)\n",
        "- Bhilai Steel Plant at (10, 80)\n",
        "- Rourkela Steel Plant at (90, 85)\n",
        "- Durgapur Steel Plant at (85, 15)\n",
    );
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("raq-sim");
    cmd.args(["show-config", "--config", path.to_str().unwrap()]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn cli_flags_override_config_file() {
    let config = r#"{
  "simulation": {
    "rake_count": 4,
    "seed": 1,
    "generation": { "enabled": false }
  }
}"#;
    let path = write_temp_config(config, "json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("raq-sim");
    cmd.args([
        "show-config",
        "--config",
        path.to_str().unwrap(),
        "--rakes",
        "2",
        "--seed",
        "8",
    ]);
    cmd.assert()
        .success()
        .stdout(contains("Rakes: 2 x 4000t at (50, 50)\nSeed: 8\nGeneration: off\n"));
}

#[test]
fn invalid_config_values_fail() {
    let config = r#"
[simulation.timing]
min_loading_ms = 9000
max_loading_ms = 3000
"#;
    let path = write_temp_config(config, "toml");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("raq-sim");
    cmd.env("RUST_LOG", "off");
    cmd.args(["run", "--config", path.to_str().unwrap()]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: invalid loading range: min 9000 > max 3000"));
}

#[test]
fn malformed_toml_fails() {
    let path = write_temp_config("[simulation\nrake_count = ", "toml");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("raq-sim");
    cmd.env("RUST_LOG", "off");
    cmd.args(["run", "--config", path.to_str().unwrap()]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: failed to parse TOML"));
}

#[test]
fn unsupported_extension_fails() {
    let path = write_temp_config("rake_count: 2", "yaml");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("raq-sim");
    cmd.args(["show-config", "--config", path.to_str().unwrap()]);
    cmd.assert()
        .failure()
        .stderr(diff("Error: unsupported config format 'yaml'\n"));
}
