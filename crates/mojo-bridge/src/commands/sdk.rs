//! `resolve` and `env`.

use super::{print_json, Context};

pub async fn resolve(context: &Context) -> anyhow::Result<()> {
    let sdk = context.require_sdk().await?;
    print_json(sdk.as_ref())
}

pub async fn env(context: &Context) -> anyhow::Result<()> {
    let sdk = context.require_sdk().await?;
    print_json(&sdk.process_environment(context.settings.telemetry()))
}
