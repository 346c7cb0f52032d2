// tests/cli_run.rs

#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::path::Path;

use clap::Parser;
use pipeflow::cli::CliArgs;
use pipeflow::run;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

const CONFIG: &str = r#"
[config]
poll_interval = "50ms"

[graph]
name = "greet"

[vertex.hello]
script = "echo hello {who}"
[vertex.hello.input.who]
type = "string"
default = "world"

[vertex.check]
script = "test {code} -eq 0"
after = ["hello"]
[vertex.check.input.code]
type = "int"
default = 0
"#;

fn args(dir: &TempDir, extra: &[&str]) -> CliArgs {
    args_with(dir, CONFIG, extra)
}

fn args_with(dir: &TempDir, config: &str, extra: &[&str]) -> CliArgs {
    let path = dir.path().join("Pipeflow.toml");
    fs::write(&path, config).expect("write config");
    let config = path.to_string_lossy().to_string();

    let mut argv = vec!["pipeflow", "--config", config.as_str()];
    argv.extend_from_slice(extra);
    CliArgs::try_parse_from(argv).expect("valid arguments")
}

#[tokio::test]
async fn successful_run_returns_ok() -> TestResult {
    let dir = TempDir::new()?;
    run(args(&dir, &["--name", "greet-1", "--view"])).await?;
    Ok(())
}

#[tokio::test]
async fn failed_pipeline_is_an_error() -> TestResult {
    let dir = TempDir::new()?;
    let err = run(args(&dir, &["--param", "check.code=1"]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("FAILED"), "error was {err}");
    Ok(())
}

/// A two-step graph whose first step creates `marker`.
fn touching_config(marker: &Path) -> String {
    format!(
        r#"
[config]
poll_interval = "50ms"

[graph]
name = "touch"

[vertex.touch]
script = "touch '{}'"

[vertex.done]
script = "echo done"
after = ["touch"]
"#,
        marker.display()
    )
}

#[tokio::test]
async fn dry_run_executes_nothing() -> TestResult {
    let dir = TempDir::new()?;
    let marker = dir.path().join("ran");
    let config = touching_config(&marker);

    run(args_with(&dir, &config, &["--dry-run"])).await?;
    assert!(!marker.exists(), "dry run executed a script");

    run(args_with(&dir, &config, &[])).await?;
    assert!(marker.exists(), "real run did not execute the script");
    Ok(())
}
