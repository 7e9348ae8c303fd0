// ABOUTME: Status command implementation.
// ABOUTME: Shows the running image, the floating tags and any held run lock.

use hoku::adapters::{AdapterError, Adapters, ImageOps};
use hoku::config::Config;
use hoku::error::Result;
use hoku::output::Output;
use hoku::pipeline::LockInfo;
use hoku::tagging::FloatingTags;
use hoku::types::ImageRef;
use serde::Serialize;

#[derive(Serialize)]
struct Status {
    workload: String,
    target: String,
    running_image: Option<String>,
    latest: Option<String>,
    stable: Option<String>,
    lock: Option<LockInfo>,
}

pub async fn status(config: Config, output: Output) -> Result<i32> {
    let adapters = Adapters::from_config(&config)?;
    let target = config.target();

    let running_image = adapters.orchestrator.current_image(&target).await?;

    let tags = FloatingTags::new(&config.registry, &config.workload);
    let latest = describe(adapters.images.as_ref(), &tags.latest).await?;
    let stable = describe(adapters.images.as_ref(), &tags.stable).await?;

    let lock_path = LockInfo::lock_path(&config.state_dir()?, &config.workload);
    let lock = std::fs::read_to_string(&lock_path)
        .ok()
        .and_then(|contents| serde_json::from_str::<LockInfo>(&contents).ok());

    let status = Status {
        workload: config.workload.to_string(),
        target: target.to_string(),
        running_image,
        latest,
        stable,
        lock,
    };

    output.value(&status);
    output.progress(&format!("Workload: {}", status.workload));
    output.progress(&format!("Target:   {}", status.target));
    output.progress(&format!(
        "Running:  {}",
        status.running_image.as_deref().unwrap_or("-")
    ));
    output.progress(&format!("Latest:   {}", status.latest.as_deref().unwrap_or("-")));
    output.progress(&format!("Stable:   {}", status.stable.as_deref().unwrap_or("-")));
    if let Some(ref lock) = status.lock {
        output.progress(&format!(
            "Locked by {} (pid {}) since {}, lease ends {}",
            lock.holder, lock.pid, lock.started_at, lock.expires_at
        ));
    }
    Ok(0)
}

/// Local view of a tag. Never pulls, so status leaves the image store alone.
async fn describe(
    images: &dyn ImageOps,
    image: &ImageRef,
) -> std::result::Result<Option<String>, AdapterError> {
    Ok(images
        .inspect(image)
        .await?
        .map(|id| format!("{image} ({id})")))
}
