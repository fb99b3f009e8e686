//! Prompt templates for plot script generation.

use super::generator::PlotContext;

/// System prompt establishing the scripting contract.
pub fn system_prompt() -> String {
    "You are a plotting assistant for oceanographic sensor profiles. \
     You write complete, runnable Python matplotlib scripts that load the \
     gridded JSON artifacts produced by the processing pipeline. Depth is \
     always the vertical axis and increases downward. Respond with the \
     script only, no commentary."
        .to_string()
}

/// Build the user prompt for one plot request.
pub fn generation_prompt(request: &str, context: &PlotContext) -> String {
    let channel_list = if context.channels.is_empty() {
        "No channels available".to_string()
    } else {
        context
            .channels
            .iter()
            .map(|c| format!("  - \"{c}\""))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let current = match &context.current_script {
        Some(script) => format!(
            "\n## Current Script\nModify this script rather than starting over:\n```python\n{script}\n```\n"
        ),
        None => String::new(),
    };

    format!(
        r#"## Available Channels
{channel_list}
{current}
## Request
{request}

Write the full script. Use only channels from the list above."#
    )
}
