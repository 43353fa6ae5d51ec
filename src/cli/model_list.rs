//! Model listing functionality
//!
//! Shows the built-in catalog with the context threshold each model will
//! actually use once configuration overrides are applied.

use std::io::{self, Write};

use crate::api::models::{load_builtin_models, BuiltinModel};
use crate::api::ModelId;
use crate::core::config::Config;

pub fn list_models(config: &Config, cli_model: Option<&str>) {
    let models = load_builtin_models();
    let current = config.model_id(cli_model);
    let mut stdout = io::stdout();
    // stdout closing early (e.g. piped into `head`) is not worth an error.
    let _ = write_models(&mut stdout, config, &models, &current);
}

fn write_models<W: Write>(
    out: &mut W,
    config: &Config,
    models: &[BuiltinModel],
    current: &ModelId,
) -> io::Result<()> {
    writeln!(out, "🤖 Built-in models")?;
    writeln!(out, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
    writeln!(out)?;

    for model in models {
        let marker = if model.id.eq_ignore_ascii_case(current.as_str()) {
            "*"
        } else {
            " "
        };
        let threshold = config.context_threshold_for(&ModelId::from(model.id.as_str()));
        let overridden = if threshold != model.context_threshold {
            " (from config)"
        } else {
            ""
        };
        write!(
            out,
            "{marker} {:<16} {:<16} budget {threshold} tokens{overridden}",
            model.id, model.display_name
        )?;
        if let Some(cutoff) = &model.knowledge_cutoff {
            write!(out, ", knowledge to {cutoff}")?;
        }
        writeln!(out)?;
    }

    if !models
        .iter()
        .any(|model| model.id.eq_ignore_ascii_case(current.as_str()))
    {
        writeln!(out)?;
        writeln!(
            out,
            "* {current} (not in catalog) budget {} tokens",
            config.context_threshold_for(current)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn render(config: &Config, current: &str) -> String {
        let mut out = Vec::new();
        write_models(
            &mut out,
            config,
            &load_builtin_models(),
            &ModelId::from(current),
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn marks_the_current_model() {
        let output = render(&Config::default(), "gpt-4o");
        let line = output
            .lines()
            .find(|line| line.contains("gpt-4o "))
            .expect("gpt-4o listed");
        assert!(line.starts_with('*'));
        assert!(line.contains("budget 8192 tokens"));
        assert!(!output.contains("not in catalog"));
    }

    #[test]
    fn shows_config_overrides_and_unknown_models() {
        let mut thresholds = HashMap::new();
        thresholds.insert("gpt-4o".to_string(), 1000);
        let config = Config {
            context_thresholds: thresholds,
            default_context_threshold: Some(3000),
            ..Default::default()
        };

        let output = render(&config, "local-model");
        assert!(output.contains("budget 1000 tokens (from config)"));
        assert!(output.contains("* local-model (not in catalog) budget 3000 tokens"));
    }
}
