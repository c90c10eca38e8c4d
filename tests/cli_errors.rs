use predicates::str::contains;

#[test]
fn zero_rakes_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("raq-sim");
    cmd.env("RUST_LOG", "off");
    cmd.args(["run", "--rakes", "0"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: rake pool must not be empty"));
}

#[test]
fn unknown_strategy_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("raq-sim");
    cmd.env("RUST_LOG", "off");
    cmd.args(["run", "--strategy", "round-robin"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: "))
        .stderr(contains("round-robin"));
}

#[test]
fn missing_config_file_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("raq-sim");
    cmd.env("RUST_LOG", "off");
    cmd.args(["run", "--config", "/nonexistent/raq-sim.toml"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: failed to read config '/nonexistent/raq-sim.toml'"));
}

#[test]
fn non_positive_live_speed_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("raq-sim");
    cmd.env("RUST_LOG", "off");
    cmd.args(["live", "--speed", "0", "--duration-secs", "1"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: speed must be > 0 (got 0)"));
}

#[test]
fn watch_rejects_http_url() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("raq-sim");
    cmd.env("RUST_LOG", "off");
    cmd.args(["watch", "--url", "http://localhost:8000/ws"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: socket url must start with ws:// or wss://"));
}

#[test]
fn watch_reports_unreachable_server() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("raq-sim");
    cmd.env("RUST_LOG", "off");
    cmd.args(["watch", "--url", "ws://127.0.0.1:9/ws", "--retry", "1"]);
    cmd.assert()
        .failure()
        .stderr(contains("Error: connection to 'ws://127.0.0.1:9/ws' failed"));
}
