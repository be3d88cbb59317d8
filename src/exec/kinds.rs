// src/exec/kinds.rs

//! Bodies of the built-in task kinds.
//!
//! Each body reads its input from the [`TaskContext`], calls collaborators on
//! the blocking pool and maps the outcome onto a [`TaskResult`]. Errors never
//! escape a body; they become `Failure` (or `Retry` for server errors).

use tracing::{info, warn};

use crate::chain::{Data, TaskKind, TaskResult};
use crate::collab::{FetchError, TransformParams};
use crate::exec::context::TaskContext;
use crate::exec::keys;

/// Run the body selected by `kind`.
pub async fn execute(kind: TaskKind, ctx: TaskContext) -> TaskResult {
    match kind {
        TaskKind::Download => download(ctx).await,
        TaskKind::Blur => blur(ctx).await,
        TaskKind::ColorFilter => color_filter(ctx).await,
    }
}

/// Run blocking collaborator work off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| format!("internal fault: {e}"))
}

async fn download(ctx: TaskContext) -> TaskResult {
    let Some(source) = ctx.input().get_str(keys::SOURCE).map(str::to_string) else {
        return TaskResult::failure(format!("missing input '{}'", keys::SOURCE));
    };

    ctx.notify_foreground("Downloading...").await;

    let fetcher = ctx.collaborators().fetcher.clone();
    let fetch_source = source.clone();
    let bytes = match blocking(move || fetcher.fetch(&fetch_source)).await {
        Err(fault) => return TaskResult::Failure(fault),
        Ok(Err(FetchError::Server(status))) => {
            warn!(
                task = %ctx.id(),
                attempt = ctx.attempt(),
                %source,
                status,
                "server error; asking for retry"
            );
            return TaskResult::Retry;
        }
        Ok(Err(err)) => {
            warn!(
                task = %ctx.id(),
                attempt = ctx.attempt(),
                %source,
                error = %err,
                "download failed"
            );
            return TaskResult::failure(format!("Network Error: {err}"));
        }
        Ok(Ok(bytes)) => bytes,
    };

    if ctx.is_stopped() {
        return TaskResult::failure("stopped");
    }

    let store = ctx.collaborators().store.clone();
    match blocking(move || store.persist(&bytes)).await {
        Err(fault) => TaskResult::Failure(fault),
        Ok(Err(err)) => TaskResult::failure(format!("{err:#}")),
        Ok(Ok(locator)) => {
            info!(task = %ctx.id(), %locator, "download stored");
            TaskResult::Success(Data::new().with(keys::IMAGE_URI, locator))
        }
    }
}

async fn blur(ctx: TaskContext) -> TaskResult {
    ctx.notify_foreground("Blurring image").await;

    let Some(uri) = input_uri(&ctx) else {
        warn!(task = %ctx.id(), "Invalid input uri");
        return TaskResult::failure("Invalid input uri");
    };

    let radius = ctx
        .input()
        .get_i64(keys::RADIUS)
        .unwrap_or(keys::DEFAULT_RADIUS);
    let Ok(radius) = usize::try_from(radius) else {
        return TaskResult::failure(format!("invalid blur radius: {radius}"));
    };

    match transform_artifact(&ctx, uri, TransformParams::Blur { radius }).await {
        Ok(output) => {
            ctx.notify_foreground(format!("Output is {output}")).await;
            TaskResult::Success(Data::new().with(keys::IMAGE_URI, output))
        }
        Err(message) => {
            warn!(task = %ctx.id(), error = %message, "Error applying blur");
            TaskResult::Failure(message)
        }
    }
}

async fn color_filter(ctx: TaskContext) -> TaskResult {
    let Some(uri) = input_uri(&ctx) else {
        return TaskResult::failure("Invalid input uri");
    };

    let scale = ctx
        .input()
        .get_f64(keys::SCALE)
        .unwrap_or(keys::DEFAULT_SCALE);

    match transform_artifact(&ctx, uri, TransformParams::ColorFilter { scale }).await {
        Ok(output) => TaskResult::Success(Data::new().with(keys::FILTER_URI, output)),
        Err(message) => TaskResult::Failure(message),
    }
}

fn input_uri(ctx: &TaskContext) -> Option<String> {
    ctx.input()
        .get_str(keys::IMAGE_URI)
        .map(str::trim)
        .filter(|uri| !uri.is_empty())
        .map(str::to_string)
}

/// Load the artifact at `uri`, transform it and persist the result.
async fn transform_artifact(
    ctx: &TaskContext,
    uri: String,
    params: TransformParams,
) -> Result<String, String> {
    let collaborators = ctx.collaborators().clone();
    let stop_check = ctx.clone();

    blocking(move || -> anyhow::Result<Option<String>> {
        let bytes = collaborators.store.load(&uri)?;
        if stop_check.is_stopped() {
            return Ok(None);
        }
        let output = collaborators.transformer.transform(&bytes, params)?;
        collaborators.store.persist(&output).map(Some)
    })
    .await?
    .map_err(|e| format!("{e:#}"))?
    .ok_or_else(|| "stopped".to_string())
}
