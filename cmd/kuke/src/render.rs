//! Result rendering (`spec.md` §6 "Result output"): `text`, `json`, or
//! `yaml`. JSON/YAML delegate straight to `serde`; `text` renders the
//! `"<Kind> %q: <action>"` line with per-field bullet details the spec
//! calls for.

use clap::ValueEnum;
use kukeon_core::{ApplyResult, ResourceAction};
use serde::Serialize;

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Renders anything serde-serializable in the selected format. Used for
/// `get` (a single entity) and the delete/purge/refresh reports.
pub fn render<T: Serialize>(format: OutputFormat, value: &T) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Text => serde_json::to_string_pretty(value)?,
    })
}

/// `apply`'s dedicated text renderer: one `"<Kind> %q: <action>"` line per
/// resource with bullet-pointed field changes on updates.
pub fn render_apply(format: OutputFormat, result: &ApplyResult) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(result)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for resource in &result.resources {
                out.push_str(&format!(
                    "{} {:?}: {}\n",
                    resource.kind,
                    resource.name,
                    resource.action.as_str()
                ));
                if resource.action == ResourceAction::Updated {
                    for change in &resource.changes {
                        out.push_str(&format!("  - {change}\n"));
                    }
                }
                if let Some(error) = &resource.error {
                    out.push_str(&format!("  ! {error}\n"));
                }
            }
            Ok(out)
        }
    }
}
