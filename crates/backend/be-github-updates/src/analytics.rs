use std::sync::atomic::{AtomicBool, Ordering};

use posthog_rs::Event;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Initialize the global PostHog client. Events are dropped until this succeeds.
pub async fn init(api_key: &str) {
    match posthog_rs::init_global(api_key).await {
        Ok(()) => {
            ENABLED.store(true, Ordering::Relaxed);
            tracing::info!("PostHog analytics initialized");
        }
        Err(e) => tracing::warn!("Failed to initialize PostHog: {}", e),
    }
}

fn capture_async(event: Event) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }
    tokio::spawn(async move {
        if let Err(e) = posthog_rs::capture(event).await {
            tracing::error!("Failed to capture posthog event: {}", e);
        }
    });
}

pub fn track_update_check(
    target: &str,
    arch: &str,
    current_version: &str,
    update_available: bool,
    latest_version: &str,
) {
    let mut event = Event::new_anon("update_check");
    event.insert_prop("target", target).ok();
    event.insert_prop("arch", arch).ok();
    event.insert_prop("current_version", current_version).ok();
    event.insert_prop("update_available", update_available).ok();
    event.insert_prop("latest_version", latest_version).ok();
    capture_async(event);
}

pub fn track_update_check_failed(target: &str, current_version: &str, error_kind: &str) {
    let mut event = Event::new_anon("update_check_failed");
    event.insert_prop("target", target).ok();
    event.insert_prop("current_version", current_version).ok();
    event.insert_prop("error_kind", error_kind).ok();
    capture_async(event);
}
