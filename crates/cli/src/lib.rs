use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use pagesmith_core::{codec, persistence, EditorConfig, ImportPolicy};
use pdf_engine::{export_document, read_manifest, DefaultAssetLoader, ExportOptions};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Parser)]
#[command(name = "pagesmith")]
#[command(about = "Pagesmith document tools")]
pub struct Cli {
    /// JSON configuration file; defaults come from PAGESMITH_* variables.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a checksummed document file from document JSON or an exported PDF.
    Save {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Check both checksums of a saved document and print the report.
    Verify {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Export a saved document to PDF.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Import the document even if its checksums do not verify.
        #[arg(long)]
        allow_mismatch: bool,
        #[arg(long)]
        title: Option<String>,
        /// Do not attach manifest.json.
        #[arg(long)]
        no_manifest: bool,
    },
    /// Print the manifest attached to an exported PDF.
    Manifest {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print CLI version.
    Version,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Save { input, output } => run_save(&input, &output),
        Commands::Verify { file } => run_verify(&file),
        Commands::Export { file, output, allow_mismatch, title, no_manifest } => {
            let mut options = export_options(&config);
            options.title = title;
            options.embed_manifest = !no_manifest;
            let policy =
                if allow_mismatch { ImportPolicy::AllowMismatch } else { config.import_policy() };
            run_export(&file, output.as_deref(), policy, &options)
        }
        Commands::Manifest { file } => run_manifest(&file),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    match path {
        Some(path) => EditorConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => EditorConfig::from_env().context("invalid PAGESMITH_* environment"),
    }
}

/// Export settings derived from the editor configuration.
pub fn export_options(config: &EditorConfig) -> ExportOptions {
    ExportOptions::default().with_page_size(config.page_size)
}

fn run_save(input: &Path, output: &Path) -> Result<()> {
    ensure_file_exists(input)?;
    let bytes = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;

    let document = if bytes.starts_with(PDF_MAGIC) {
        read_manifest(&bytes).context("failed to read manifest from PDF")?.into_document()
    } else {
        let text = String::from_utf8(bytes).context("input is not UTF-8 text")?;
        let decoded = codec::decode(&text).context("failed to parse document JSON")?;
        if decoded.skipped > 0 {
            let skipped = decoded.skipped;
            log::warn!("dropped {skipped} unreadable element(s) from {}", input.display());
        }
        decoded.document
    };

    let encoded = persistence::save_document(output, &document, Utc::now())
        .with_context(|| format!("failed to save {}", output.display()))?;
    println!("{}", encoded.checksum);
    Ok(())
}

fn run_verify(file: &Path) -> Result<()> {
    ensure_file_exists(file)?;
    let text =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;

    let report = codec::verify(&text);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(failure) = report.failure {
        anyhow::bail!("verification failed: {failure}");
    }
    Ok(())
}

fn run_export(
    file: &Path,
    output: Option<&Path>,
    policy: ImportPolicy,
    options: &ExportOptions,
) -> Result<()> {
    ensure_file_exists(file)?;
    let outcome = persistence::load_document(file, policy)
        .with_context(|| format!("failed to load {}", file.display()))?;

    let base_dir = file.parent().unwrap_or_else(|| Path::new("."));
    let loader = DefaultAssetLoader::with_base_dir(base_dir);
    let artifact = export_document(&outcome.decoded.document, options, &loader)
        .context("failed to export PDF")?;

    for warning in &artifact.warnings {
        eprintln!("warning: {warning}");
    }

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| file.with_extension("pdf"));
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, &artifact.bytes)
        .with_context(|| format!("failed to write PDF to {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

fn run_manifest(file: &Path) -> Result<()> {
    ensure_file_exists(file)?;
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let manifest = read_manifest(&bytes).context("failed to read manifest")?;

    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
