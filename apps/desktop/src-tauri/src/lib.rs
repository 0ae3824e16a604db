mod settings;
mod sound;
mod state;
mod tray;

use settings::Settings;
use sound::AfplayAlerter;
use spinespy::{CalibrationStore, FrameSource, Monitor, MonitorEvent, Pipeline};
use spinespy_types::{
    reqwest::Client,
    sync::{Mutex, mpsc::UnboundedReceiver},
};
use spinespy_vision::{
    OnnxObjectDetector, OnnxPoseDetector, StillFrameSource, WebcamFrameSource, ensure_asset,
    initialize_ort, request_camera_access,
};
use state::{TauriMonitorState, TauriSettingsState, TauriTrayState};
use std::{path::PathBuf, sync::Arc};
use tauri::AppHandle;
use tauri_plugin_notification::NotificationExt;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use tray::{TrayData, TrayRuntimeState};

const NOTIFICATION_TITLE: &str = "SpineSpy";

fn init_logging() {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    #[allow(unused_mut)]
    let mut filter = builder.from_env_lossy();

    #[cfg(debug_assertions)]
    for d in ["spinespy=debug", "spinespy_vision=debug", "app=debug"] {
        if let Ok(dir) = d.parse() {
            filter = filter.add_directive(dir);
        }
    }

    // Don't panic if a global subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

async fn ensure_models(settings: &Settings) -> anyhow::Result<(PathBuf, PathBuf)> {
    let client = Client::new();
    let policy = settings.download_policy();
    let pose = ensure_asset(&settings.pose_model, &settings.models_dir, &client, &policy).await?;
    let objects =
        ensure_asset(&settings.object_model, &settings.models_dir, &client, &policy).await?;
    Ok((pose, objects))
}

fn build_pipeline(settings: &Settings) -> anyhow::Result<Pipeline> {
    let (pose_path, object_path) = tauri::async_runtime::block_on(ensure_models(settings))?;

    let providers = initialize_ort();
    tracing::info!(
        providers = ?providers.active_providers,
        accelerated = providers.accelerated,
        "ONNX Runtime ready"
    );

    let pose = OnnxPoseDetector::load(&pose_path)?;
    let objects = OnnxObjectDetector::load(&object_path, settings.object_confidence)?;

    let source: Box<dyn FrameSource> = match &settings.still_image {
        Some(path) => {
            tracing::info!(path = %path.display(), "using still image instead of the webcam");
            Box::new(StillFrameSource::open(path, settings.camera_options())?)
        }
        None => {
            request_camera_access();
            Box::new(WebcamFrameSource::new(settings.camera_options()))
        }
    };

    Ok(Pipeline::new(
        source,
        Box::new(pose),
        Box::new(objects),
        settings.detection_policy(),
    ))
}

fn notify(app_handle: &AppHandle, subtitle: &str, message: &str) {
    let result = app_handle
        .notification()
        .builder()
        .title(NOTIFICATION_TITLE)
        .body(format!("{subtitle}\n{message}"))
        .show();
    if let Err(error) = result {
        tracing::warn!(%error, "failed to show notification");
    }
}

async fn persist_interval(app_handle: &AppHandle, interval: spinespy::CheckInterval) {
    let Ok(settings) = TauriSettingsState::construct(app_handle) else {
        return;
    };
    let mut settings = settings.lock().await;
    settings.interval = interval;
    if let Err(error) = settings.save() {
        tracing::warn!(%error, "failed to persist check interval");
    }
}

/// Render monitor events into the tray until the monitor stops
async fn pump_events(app_handle: AppHandle, mut events: UnboundedReceiver<MonitorEvent>) {
    while let Some(event) = events.recv().await {
        let refreshed = match event {
            MonitorEvent::StatusChanged { outcome, streak } => {
                tray::update_tray_data(&app_handle, move |data| {
                    data.outcome = Some(outcome);
                    data.streak = streak;
                })
                .await
            }
            MonitorEvent::MonitoringToggled { active } => {
                tray::update_tray_data(&app_handle, move |data| data.active = active).await
            }
            MonitorEvent::IntervalChanged(interval) => {
                persist_interval(&app_handle, interval).await;
                tray::update_tray_data(&app_handle, move |data| data.interval = interval).await
            }
            MonitorEvent::Calibrated {
                requested: true,
                result,
            } => {
                match result {
                    Ok(_) => notify(
                        &app_handle,
                        "Calibration complete",
                        "Your good posture has been saved as baseline.",
                    ),
                    Err(_) => notify(
                        &app_handle,
                        "Calibration failed",
                        "Make sure you're visible to the camera.",
                    ),
                }
                Ok(())
            }
            MonitorEvent::SnapshotSaved { path, outcome } => {
                let outcome = outcome.map(|o| o.to_string());
                tracing::info!(path = %path.display(), ?outcome, "snapshot ready");
                Ok(())
            }
            MonitorEvent::Stopped => {
                app_handle.exit(0);
                break;
            }
            MonitorEvent::Calibrated { .. }
            | MonitorEvent::CheckSkipped { .. }
            | MonitorEvent::AlertFired
            | MonitorEvent::AlertFailed { .. }
            | MonitorEvent::SnapshotFailed { .. } => Ok(()),
        };

        if let Err(error) = refreshed {
            tracing::warn!(%error, "failed to refresh tray");
        }
    }
}

#[allow(clippy::too_many_lines)]
pub fn run() {
    // Ensure panics are logged in release too.
    std::panic::set_hook(Box::new(|info| {
        if let Some(location) = info.location() {
            tracing::error!(
                target: "panic",
                message = %info,
                file = location.file(),
                line = location.line(),
                "Application panic"
            );
        } else {
            tracing::error!(target: "panic", message = %info, "Application panic (no location)");
        }
    }));
    init_logging();

    let settings = Settings::new();
    tracing::info!(config = %settings.config_path.display(), "settings loaded");

    let pipeline = match build_pipeline(&settings) {
        Ok(pipeline) => pipeline,
        Err(error) => {
            tracing::error!("startup failed: {error:#}");
            std::process::exit(1);
        }
    };

    let alerter = Arc::new(AfplayAlerter::new(settings.alert_sound.clone()));
    let (monitor, handle, events) = Monitor::new(
        pipeline,
        CalibrationStore::default(),
        alerter,
        settings.monitor_options(),
    );

    let tray_data = TrayData {
        interval: settings.interval,
        ..Default::default()
    };
    let tray_state = TrayRuntimeState {
        tray: None,
        data: tray_data.clone(),
    };

    let builder = tauri::Builder::default()
        .manage(TauriSettingsState(Arc::new(Mutex::new(settings))))
        .manage(TauriMonitorState(handle))
        .manage(TauriTrayState(Arc::new(Mutex::new(tray_state))))
        .plugin(tauri_plugin_notification::init())
        .setup(move |app| {
            #[cfg(target_os = "macos")]
            app.set_activation_policy(tauri::ActivationPolicy::Accessory);

            tray::init_tray(app.handle(), &tray_data)?;

            tauri::async_runtime::spawn(monitor.run());
            tauri::async_runtime::spawn(pump_events(app.handle().clone(), events));
            Ok(())
        });

    if let Err(error) = builder.run(tauri::generate_context!()) {
        tracing::error!(%error, "error while running tauri application");
        std::process::exit(1);
    }
}
