// src/main.rs
//
// endcrypt command line: runs the process-image contract on local files.

use anyhow::Context;
use clap::{Parser, Subcommand};
use endcrypt::engine::{encode_png, read_source, test_pattern};
use endcrypt::{CipherEngine, EncryptionLevel, ProcessResponse};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// jemalloc is not supported on Windows/MSVC
#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Chaotic image encryption with entropy / PSNR / distribution metrics.
#[derive(Parser)]
#[command(name = "endcrypt")]
#[command(version)]
#[command(about = "Chaotic image encryption engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt, decrypt and measure an image; prints the JSON response
    Process {
        /// Input image path
        #[arg(short, long)]
        input: PathBuf,

        /// Encryption level: low, medium, high (or 1, 2, 3)
        #[arg(short, long, default_value = "medium")]
        level: String,

        /// Encryption key
        #[arg(short, long)]
        key: String,

        /// Write encrypted_image.png and decrypted_image.png here instead of
        /// embedding them in the JSON
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
    /// Encrypt an image to a PNG
    Encrypt {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, default_value = "medium")]
        level: EncryptionLevel,

        #[arg(short, long)]
        key: String,
    },
    /// Decrypt a PNG produced by `encrypt`
    Decrypt {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, default_value = "medium")]
        level: EncryptionLevel,

        #[arg(short, long)]
        key: String,
    },
    /// Write the 256x256 test pattern
    Pattern {
        #[arg(short, long, default_value = "test_pattern.png")]
        output: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "endcrypt=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Refuse lossy output formats: JPEG would destroy the ciphertext.
fn ensure_png_output(path: &Path) -> anyhow::Result<()> {
    match path.extension().map(|e| e.to_string_lossy().to_lowercase()) {
        Some(ext) if ext == "png" => Ok(()),
        Some(ext) => {
            anyhow::bail!("output must be a .png file (got .{ext}); other formats may be lossy")
        }
        None => anyhow::bail!("output file must have a .png extension"),
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote image");
    Ok(())
}

fn run_process(
    engine: &CipherEngine,
    input: &Path,
    level: &str,
    key: &str,
    out_dir: Option<&Path>,
) -> anyhow::Result<bool> {
    let bytes = read_source(input)?;
    if let Ok(meta) = endcrypt::inspect_header(&bytes) {
        tracing::debug!(
            width = meta.width,
            height = meta.height,
            format = ?meta.format,
            "input header"
        );
    }

    let Some(dir) = out_dir else {
        let response = engine.respond(&bytes, level, key);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(response.is_success());
    };

    let outcome = level
        .parse::<EncryptionLevel>()
        .and_then(|level| engine.process(&bytes, level, key));
    let output = match outcome {
        Ok(output) => output,
        Err(err) => {
            let response = ProcessResponse::failure(&err);
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(false);
        }
    };

    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    write_output(&dir.join("encrypted_image.png"), &output.encrypted_png)?;
    write_output(&dir.join("decrypted_image.png"), &output.decrypted_png)?;

    let mut json = serde_json::to_value(output.into_response())?;
    if let Some(obj) = json.as_object_mut() {
        for field in ["originalImage", "encryptedImage", "decryptedImage"] {
            obj.remove(field);
        }
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(true)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let engine = CipherEngine::from_env().context("invalid ENDCRYPT_* configuration")?;

    match cli.command {
        Commands::Process {
            input,
            level,
            key,
            out_dir,
        } => {
            if !run_process(&engine, &input, &level, &key, out_dir.as_deref())? {
                std::process::exit(1);
            }
        }
        Commands::Encrypt {
            input,
            output,
            level,
            key,
        } => {
            ensure_png_output(&output)?;
            let bytes = read_source(&input)?;
            let png = engine.encrypt_image(&bytes, level, &key)?;
            write_output(&output, &png)?;
        }
        Commands::Decrypt {
            input,
            output,
            level,
            key,
        } => {
            ensure_png_output(&output)?;
            let bytes = read_source(&input)?;
            let png = engine.decrypt_image(&bytes, level, &key)?;
            write_output(&output, &png)?;
        }
        Commands::Pattern { output } => {
            ensure_png_output(&output)?;
            let png = encode_png(&test_pattern()?, engine.config().optimize_png)?;
            write_output(&output, &png)?;
        }
    }
    Ok(())
}
