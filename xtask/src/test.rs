use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;

pub fn run(package: Option<&str>) -> Result<()> {
    println!("{}", "Running host tests...".cyan().bold());

    let mut cmd = Command::new("cargo");
    cmd.arg("test");
    match package {
        Some(p) => {
            cmd.arg("-p").arg(p);
        }
        None => {
            // The whole host-testable surface. Hardware bins are excluded by
            // their required-features; HIL tests run via probe-rs separately.
            cmd.arg("--workspace");
        }
    }

    let status = cmd.status().context("Failed to run cargo test")?;
    if !status.success() {
        anyhow::bail!("tests failed");
    }
    println!("{}", "All tests passed.".green().bold());
    Ok(())
}
