use poise::serenity_prelude as serenity;

use crate::util::{
    alias::{Context, Error},
    ollama::split_message,
};

const MAX_IMAGE_BYTES: u32 = 10 * 1024 * 1024;
const DEFAULT_PROMPT: &str = "Describe this image in detail.";

/// Checks content type and size before anything is downloaded.
fn validate(content_type: Option<&str>, size: u32) -> Result<(), &'static str> {
    if !content_type.is_some_and(|ct| ct.starts_with("image/")) {
        return Err("Please provide a valid image file!");
    }
    if size > MAX_IMAGE_BYTES {
        return Err("Image too large (max 10MB)");
    }
    Ok(())
}

/// Analyze an attached image
#[poise::command(slash_command, prefix_command)]
pub async fn analyze(
    ctx: Context<'_>,
    #[description = "Image to analyze"] image: Option<serenity::Attachment>,
    #[rest]
    #[description = "What to look for"]
    prompt: Option<String>,
) -> Result<(), Error> {
    let Some(image) = image else {
        ctx.say("Please attach an image to analyze!").await?;
        return Ok(());
    };
    if let Err(msg) = validate(image.content_type.as_deref(), image.size) {
        ctx.say(msg).await?;
        return Ok(());
    }

    ctx.defer().await?;
    ctx.say("Processing your image... This may take a minute.").await?;

    let prompt = prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

    let bytes = image.download().await?;
    // removed when `file` drops
    let file = tempfile::Builder::new().suffix(".jpg").tempfile()?;
    tokio::fs::write(file.path(), &bytes).await?;

    match ctx.data().inference.analyze_image(file.path(), &prompt).await {
        Ok(answer) => {
            for chunk in split_message(&answer, 2000) {
                ctx.say(chunk).await?;
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "image analysis failed");
            ctx.say(format!("Error processing image: {e}")).await?;
        }
    }
    Ok(())
}
