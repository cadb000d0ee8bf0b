//! CLI for TreatViz - aesthetic treatment previews.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use treatviz::preview::DEFAULT_STRENGTH;
use treatviz::treatment::{
    intensity_tiers, DEFAULT_INTENSITY, DEFAULT_INTENSITY_DESCRIPTION, DEFAULT_TREATMENT,
};
use treatviz::{
    BeforeImage, FalImageModel, FalImageProvider, ImageProvider, Selection, Treatment,
    TreatmentPreview,
};

#[derive(Parser)]
#[command(name = "treatviz")]
#[command(about = "Preview aesthetic treatments on a portrait via image-to-image generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an after-treatment image from a before image
    Preview(PreviewArgs),

    /// Print the prompt a selection would produce
    Prompt(SelectionArgs),

    /// List treatments and intensity tiers
    Treatments,

    /// Check that the fal.ai provider is configured
    Check(ProviderArgs),
}

#[derive(Args)]
struct ProviderArgs {
    /// fal.ai model: fast-sdxl, lightning, flux-dev, or a full model ID
    #[arg(short, long, default_value = "fast-sdxl")]
    model: String,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 60)]
    request_timeout: u64,
}

impl ProviderArgs {
    fn provider(&self) -> treatviz::Result<FalImageProvider> {
        FalImageProvider::builder()
            .model(FalImageModel::parse(&self.model))
            .request_timeout(Duration::from_secs(self.request_timeout))
            .build()
    }
}

#[derive(Args)]
struct SelectionArgs {
    /// Treatment and intensity as ID=N (e.g. lip_filler=3); repeatable, order is kept
    #[arg(short, long = "treatment", value_name = "ID[=N]", value_parser = parse_selection_entry)]
    treatments: Vec<(String, i64)>,
}

impl SelectionArgs {
    fn selection(&self) -> Selection {
        if self.treatments.is_empty() {
            return Selection::new().with(DEFAULT_TREATMENT.id(), DEFAULT_INTENSITY);
        }
        self.treatments
            .iter()
            .fold(Selection::new(), |selection, (id, intensity)| {
                selection.with(id.as_str(), *intensity)
            })
    }
}

#[derive(Args)]
struct PreviewArgs {
    /// Before image (jpg, jpeg or png)
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the PNG download (defaults to after_treatment.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    selection: SelectionArgs,

    /// Transformation strength, 0.0 to 1.0
    #[arg(long, default_value_t = DEFAULT_STRENGTH)]
    strength: f32,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Retries on transient provider failures
    #[arg(long, default_value_t = 2)]
    retries: u32,
}

/// Parses `ID=N`, or a bare `ID` at the default intensity.
///
/// Identifiers are not checked against the catalog here; unknown ones are
/// skipped during prompt synthesis.
fn parse_selection_entry(raw: &str) -> Result<(String, i64), String> {
    match raw.split_once('=') {
        Some((id, intensity)) => {
            let intensity = intensity
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("invalid intensity in '{raw}': {e}"))?;
            Ok((id.trim().to_string(), intensity))
        }
        None => Ok((raw.trim().to_string(), DEFAULT_INTENSITY)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("treatviz=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Preview(args) => {
            run_preview(args, cli.json).await?;
        }
        Commands::Prompt(args) => {
            print_prompt(&args, cli.json)?;
        }
        Commands::Treatments => {
            list_treatments(cli.json)?;
        }
        Commands::Check(args) => {
            check_provider(&args, cli.json).await?;
        }
    }

    Ok(())
}

fn warn_unknown(selection: &Selection) {
    for id in selection.unknown_treatments() {
        tracing::warn!(treatment = %id, "unknown treatment will be skipped");
    }
}

async fn run_preview(args: PreviewArgs, json_output: bool) -> anyhow::Result<()> {
    let selection = args.selection.selection();
    warn_unknown(&selection);

    let before = BeforeImage::open(&args.input)?;

    let provider = args.provider.provider()?;
    let mut builder = TreatmentPreview::builder(provider)
        .strength(args.strength)
        .max_retries(args.retries);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    let preview = builder.build()?;

    let after = preview.render(&before, &selection).await?;

    let output = match args.output {
        Some(path) => {
            after.download.save(&path)?;
            path
        }
        None => after.download.save_in(".")?,
    };

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": output.display().to_string(),
            "file_name": after.download.file_name,
            "mime_type": after.download.mime_type,
            "size_bytes": after.download.data.len(),
            "prompt": after.prompt,
            "treatments": selection.entries(),
            "provider": after.image.provider.to_string(),
            "model": after.image.metadata.model,
            "seed": after.image.metadata.seed,
            "duration_ms": after.image.metadata.duration_ms,
            "safety_filtered": after.image.metadata.safety_filtered,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "After-treatment image: {} ({} bytes) via {} ({})",
            output.display(),
            after.download.data.len(),
            preview.provider().name(),
            preview.provider().model()
        );
        if let Some(duration) = after.image.metadata.duration_ms {
            println!("Duration: {}ms", duration);
        }
    }

    Ok(())
}

async fn check_provider(args: &ProviderArgs, json_output: bool) -> anyhow::Result<()> {
    let outcome = match args.provider() {
        Ok(provider) => provider
            .health_check()
            .await
            .map(|()| provider.model().to_string()),
        Err(e) => Err(e),
    };

    if json_output {
        let result = match &outcome {
            Ok(model) => serde_json::json!({ "ok": true, "provider": "fal.ai", "model": model }),
            Err(e) => serde_json::json!({ "ok": false, "provider": "fal.ai", "error": e.to_string() }),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        match &outcome {
            Ok(model) => println!("fal.ai: ok ({model})"),
            Err(e) => println!("fal.ai: {e}"),
        }
    }

    outcome.map(|_| ()).map_err(Into::into)
}

fn print_prompt(args: &SelectionArgs, json_output: bool) -> anyhow::Result<()> {
    let selection = args.selection();
    warn_unknown(&selection);
    let prompt = selection.prompt();

    if json_output {
        let result = serde_json::json!({
            "prompt": prompt,
            "treatments": selection.entries(),
            "skipped": selection.unknown_treatments(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{prompt}");
    }

    Ok(())
}

fn list_treatments(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct TreatmentInfo {
        id: &'static str,
        label: String,
        default: bool,
    }

    #[derive(serde::Serialize)]
    struct TierInfo {
        intensity: i64,
        description: &'static str,
        default: bool,
    }

    let treatments: Vec<_> = Treatment::ALL
        .iter()
        .map(|t| TreatmentInfo {
            id: t.id(),
            label: t.label(),
            default: *t == DEFAULT_TREATMENT,
        })
        .collect();
    let tiers: Vec<_> = intensity_tiers()
        .map(|(intensity, description)| TierInfo {
            intensity,
            description,
            default: intensity == DEFAULT_INTENSITY,
        })
        .collect();

    if json_output {
        let result = serde_json::json!({
            "treatments": treatments,
            "intensities": tiers,
            "fallback_description": DEFAULT_INTENSITY_DESCRIPTION,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("TREATMENTS:");
        for t in &treatments {
            let marker = if t.default { "*" } else { " " };
            println!("  {} {:<22} {}", marker, t.id, t.label);
        }
        println!("\nINTENSITIES:");
        for tier in &tiers {
            let marker = if tier.default { "*" } else { " " };
            println!("  {} {:>2}  {}", marker, tier.intensity, tier.description);
        }
        println!("\n  other: {}", DEFAULT_INTENSITY_DESCRIPTION);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_entry() {
        assert_eq!(
            parse_selection_entry("lip_filler=3").unwrap(),
            ("lip_filler".to_string(), 3)
        );
        assert_eq!(
            parse_selection_entry("nose_filler").unwrap(),
            ("nose_filler".to_string(), DEFAULT_INTENSITY)
        );
        assert_eq!(
            parse_selection_entry("chin=-5").unwrap(),
            ("chin".to_string(), -5)
        );
        assert!(parse_selection_entry("lip_filler=high").is_err());
    }

    #[test]
    fn test_empty_selection_uses_default_treatment() {
        let args = SelectionArgs {
            treatments: Vec::new(),
        };
        assert_eq!(
            args.selection().prompt(),
            Treatment::CheekFiller.fragment(DEFAULT_INTENSITY)
        );
    }

    #[test]
    fn test_cli_parses_repeated_treatments_in_order() {
        let cli = Cli::try_parse_from([
            "treatviz",
            "prompt",
            "-t",
            "nose_filler=8",
            "--treatment",
            "lip_filler=3",
        ])
        .unwrap();
        let Commands::Prompt(args) = cli.command else {
            panic!("expected prompt command");
        };
        let selection = args.selection();
        assert_eq!(selection.entries()[0].treatment, "nose_filler");
        assert_eq!(selection.entries()[1].intensity, 3);
    }

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from([
            "treatviz",
            "check",
            "--model",
            "flux-dev",
            "--request-timeout",
            "15",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        let Commands::Check(args) = cli.command else {
            panic!("expected check command");
        };
        assert_eq!(args.model, "flux-dev");
        assert_eq!(args.request_timeout, 15);

        let cli = Cli::try_parse_from(["treatviz", "check"]).unwrap();
        let Commands::Check(args) = cli.command else {
            panic!("expected check command");
        };
        assert_eq!(args.model, "fast-sdxl");
        assert_eq!(args.request_timeout, 60);
    }

    #[tokio::test]
    async fn test_check_provider_reports_configuration() {
        std::env::set_var("FAL_KEY", "test-key");
        let args = ProviderArgs {
            model: "lightning".into(),
            request_timeout: 5,
        };
        assert!(check_provider(&args, true).await.is_ok());

        let args = ProviderArgs {
            model: "lightning".into(),
            request_timeout: 0,
        };
        assert!(check_provider(&args, false).await.is_err());
    }
}
