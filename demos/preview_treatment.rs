//! Treatment preview example - generates an after image from a portrait.
//!
//! Run with: `cargo run --example preview_treatment -- <before.jpg>`
//!
//! Requires `FAL_KEY` environment variable.

use treatviz::{BeforeImage, FalImageProvider, Selection, TreatmentPreview};

#[tokio::main]
async fn main() -> treatviz::Result<()> {
    let Some(input_path) = std::env::args().nth(1) else {
        eprintln!("Usage: preview_treatment <before.jpg>");
        std::process::exit(2);
    };

    let before = BeforeImage::open(&input_path)?;

    let provider = FalImageProvider::builder().build()?;
    let preview = TreatmentPreview::builder(provider).seed(100).build()?;

    let selection = Selection::new()
        .with("cheek_filler", 5)
        .with("filler_under_eyes", 3);

    let after = preview.render(&before, &selection).await?;
    let path = after.download.save_in(".")?;
    println!(
        "Saved {} ({} bytes)\nPrompt: {}",
        path.display(),
        after.download.data.len(),
        after.prompt
    );

    Ok(())
}
