use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::Image;

pub fn run(image: Image, release: bool) -> Result<()> {
    let (package, needs_probe) = match image {
        Image::Bootloader => ("bootloader", true),
        Image::Firmware => ("firmware", false),
        Image::Loader => ("loader", false),
    };
    let mode = if release { "release" } else { "debug" };

    println!();
    println!(
        "{}",
        format!("Building {package} ({mode} mode)...").cyan().bold()
    );

    let build_start = Instant::now();
    let mut build_cmd = Command::new("cargo");
    build_cmd
        .arg("build")
        .arg("-p")
        .arg(package)
        .arg("--target")
        .arg("thumbv7em-none-eabihf")
        .arg("--features")
        .arg("hardware");
    if release {
        build_cmd.arg("--release");
    }

    let build_output = build_cmd.output().context("Failed to run cargo build")?;
    if !build_output.status.success() {
        eprintln!("{}", "Build failed".red().bold());
        eprintln!("{}", String::from_utf8_lossy(&build_output.stderr));
        anyhow::bail!("Build failed");
    }
    println!(
        "{}",
        format!(
            "Build successful in {:.2}s",
            build_start.elapsed().as_secs_f64()
        )
        .green()
    );

    let artifact = format!("target/thumbv7em-none-eabihf/{mode}/{package}");

    if needs_probe {
        // The bootloader lives in internal flash — probe-rs handles it
        // directly over SWD.
        println!("{}", "Flashing internal bootloader via probe-rs...".cyan().bold());
        let mut flash_cmd = Command::new("probe-rs");
        flash_cmd
            .arg("download")
            .arg("--chip")
            .arg("STM32H750VBTx")
            .arg(&artifact);
        let status = flash_cmd.status().context(
            "Failed to run probe-rs — is it installed and the board connected?",
        )?;
        if !status.success() {
            anyhow::bail!("probe-rs download failed");
        }
        println!("{}", "Bootloader flashed.".green().bold());
    } else {
        // External-flash images go through STM32CubeProgrammer with the
        // loader plugin; probe-rs has no flash algorithm for the W25Q256JV
        // behind this board's QUADSPI.
        println!("{}", "Built. Flash with STM32CubeProgrammer:".yellow());
        println!("  STM32_Programmer_CLI -c port=SWD \\");
        println!("    -el <loaders>/EMBER_W25Q256_STM32H750.stldr \\");
        println!("    -d {artifact} 0x90000000 -v");
    }
    Ok(())
}
