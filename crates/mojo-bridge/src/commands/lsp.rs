//! `lsp-command` and `format`.

use super::{print_json, Context};
use anyhow::bail;
use mojo_bridge_lsp::{Formatter, LanguageClientSupervisor, ServerLaunch, TokioServerSpawner};
use mojo_bridge_util::path::absolutize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LspCommandOutput {
    #[serde(flatten)]
    launch: ServerLaunch,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace_root: Option<PathBuf>,
}

pub async fn lsp_command(context: &Context, file: Option<PathBuf>) -> anyhow::Result<()> {
    let supervisor = LanguageClientSupervisor::new(
        context.resolver.clone(),
        Arc::new(TokioServerSpawner),
        context.settings.supervisor_options(),
    );
    let launch = supervisor.server_launch().await?;

    let workspace_root = match file {
        Some(file) => {
            let file = absolutize(&file, &context.cwd);
            if !launch.handles_file(&file) {
                bail!("{} is not a Mojo source file", file.display());
            }
            launch.find_workspace_root(&file)
        }
        None => None,
    };

    print_json(&LspCommandOutput {
        launch,
        workspace_root,
    })
}

#[derive(Serialize)]
struct FormatOutput<'a> {
    file: &'a Path,
    changed: bool,
}

pub async fn format(
    context: &Context,
    file: &Path,
    line_length: Option<u32>,
    check: bool,
) -> anyhow::Result<()> {
    let sdk = context.require_sdk().await?;
    let formatter = Formatter::from_sdk(&sdk, context.settings.telemetry())
        .with_line_length(line_length.unwrap_or_else(|| context.settings.line_length()));
    let file = absolutize(file, &context.cwd);

    let changed = if check {
        let source = tokio::fs::read_to_string(&file).await?;
        formatter.format_source(&source).await? != source
    } else {
        formatter.format_file(&file).await?
    };

    print_json(&FormatOutput {
        file: &file,
        changed,
    })?;
    if check && changed {
        std::process::exit(1);
    }
    Ok(())
}
