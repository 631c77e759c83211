use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;

/// Every (package, target, features) combination that must stay green.
const MATRIX: &[(&str, Option<&str>, Option<&str>)] = &[
    // Host: pure logic + simulators.
    ("platform", None, None),
    ("extflash", None, Some("sim")),
    ("bootloader", None, None),
    ("loader", None, None),
    ("firmware", None, None),
    // Hardware: the three shippable images.
    ("bootloader", Some("thumbv7em-none-eabihf"), Some("hardware")),
    ("loader", Some("thumbv7em-none-eabihf"), Some("hardware")),
    ("firmware", Some("thumbv7em-none-eabihf"), Some("hardware")),
];

pub fn run() -> Result<()> {
    for (package, target, features) in MATRIX {
        let label = format!(
            "{package} [{}]{}",
            target.unwrap_or("host"),
            features.map(|f| format!(" +{f}")).unwrap_or_default()
        );
        println!("{}", format!("Checking {label}...").cyan());

        let mut cmd = Command::new("cargo");
        cmd.arg("check").arg("-p").arg(package);
        if let Some(target) = target {
            cmd.arg("--target").arg(target);
        }
        if let Some(features) = features {
            cmd.arg("--features").arg(features);
        }

        let output = cmd.output().context("Failed to run cargo check")?;
        if !output.status.success() {
            eprintln!("{}", format!("check failed: {label}").red().bold());
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("cargo check failed");
        }
    }
    println!("{}", "All checks passed.".green().bold());
    Ok(())
}
