// Desktop/tooling crate — unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod flash;
mod test;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Ember H750 development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which firmware image a hardware task targets.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Image {
    /// Stage-1 bootloader (internal flash, 0x0800_0000).
    Bootloader,
    /// Application image (external QSPI flash, 0x9000_0000 — needs the
    /// external-loader plugin installed in STM32CubeProgrammer).
    Firmware,
    /// External-loader plugin staticlib (linked into a .stldr by the
    /// flashloader packaging step).
    Loader,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an image and flash it via probe-rs (bootloader) or print the
    /// CubeProgrammer invocation (firmware/loader)
    Flash {
        /// Which image to build and flash
        #[arg(value_enum, default_value_t = Image::Bootloader)]
        image: Image,
        /// Build and flash release version
        #[arg(short, long)]
        release: bool,
    },
    /// Check all crates build for both host and thumbv7em hardware targets
    Check,
    /// Run all host tests (unit + integration)
    Test {
        /// Run only one crate's tests
        #[arg(long)]
        package: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Flash { image, release } => flash::run(image, release),
        Commands::Check => check::run(),
        Commands::Test { package } => test::run(package.as_deref()),
    }
}
