//! apkxml - decode a binary AndroidManifest.xml, or the one inside an APK, to text XML.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use apkxml::android::zip::{is_zip, ApkFile};
use apkxml::{DecodeOptions, Decoder, Document, StringDecoding};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Decode Android binary XML into readable XML
#[derive(Parser)]
#[command(name = "apkxml")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// An APK or a binary AndroidManifest.xml
    input: PathBuf,

    /// Treat the input as an APK even without a ZIP signature
    #[arg(long)]
    apk: bool,

    /// Write the result here instead of stdout
    #[arg(short, long, env = "APKXML_OUTPUT")]
    output: Option<PathBuf>,

    /// Decode pooled strings as UTF-16 instead of stripping zero bytes
    #[arg(long)]
    utf16: bool,

    /// XML-escape attribute values
    #[arg(long)]
    escape: bool,

    /// Dump the decoded structure as JSON instead of XML
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut options = DecodeOptions::default().with_escape_values(cli.escape);
    if cli.utf16 {
        options = options.with_string_decoding(StringDecoding::Utf16);
    }

    let data = fs::read(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let document = if cli.apk || is_zip(&data) {
        ApkFile::from_bytes(&data)
            .and_then(|mut apk| apk.decode_manifest(options))
            .with_context(|| format!("Failed to decode manifest in {}", cli.input.display()))?
    } else {
        Decoder::new(options)
            .decode(&data)
            .with_context(|| format!("Failed to decode {}", cli.input.display()))?
    };

    for diagnostic in document.diagnostics() {
        log::warn!("{:?}", diagnostic);
    }

    let rendered = render(&document, cli.json)?;
    match &cli.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => io::stdout().write_all(rendered.as_bytes())?,
    }
    Ok(())
}

fn render(document: &Document, json: bool) -> Result<String> {
    if json {
        let mut text = serde_json::to_string_pretty(document)?;
        text.push('\n');
        Ok(text)
    } else {
        Ok(document.xml().to_string())
    }
}
