use serde::{Deserialize, Serialize};
use spinespy::{
    BAD_STREAK_LIMIT, CheckInterval, DetectionPolicy, MonitorOptions, PHONE_CLASS_ID,
    PostureThresholds,
};
use spinespy_vision::{CameraOptions, DownloadPolicy, ModelSource};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

const APP_DIR: &str = "spinespy";
const SETTINGS_FILE: &str = "settings.json";

fn app_config_dir() -> PathBuf {
    dirs_next::config_dir().unwrap_or_default().join(APP_DIR)
}

fn default_models_dir() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_default()
        .join(APP_DIR)
        .join("models")
}

fn default_snapshot_dir() -> PathBuf {
    dirs_next::picture_dir()
        .or_else(dirs_next::data_dir)
        .unwrap_or_default()
        .join("SpineSpy")
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub interval: CheckInterval,

    pub camera_index: u32,
    pub warmup_frames: u32,
    pub settle_delay_ms: u64,
    pub mirror: bool,
    /// Replay this image instead of opening the webcam
    pub still_image: Option<PathBuf>,

    pub slouch_threshold: f32,
    pub tilt_threshold: f32,
    pub bad_streak_limit: u32,
    pub phone_class_id: i32,
    pub object_confidence: f32,

    pub pose_model: ModelSource,
    pub object_model: ModelSource,
    pub models_dir: PathBuf,
    pub download_attempts: u32,

    pub snapshot_dir: PathBuf,
    pub alert_sound: PathBuf,
    pub calibrate_on_start: bool,
    pub lock_timeout_secs: u64,

    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let thresholds = PostureThresholds::default();
        let camera = CameraOptions::default();
        Self {
            interval: CheckInterval::default(),
            camera_index: camera.index,
            warmup_frames: camera.warmup_frames,
            settle_delay_ms: camera.settle_delay.as_millis() as u64,
            mirror: camera.mirror,
            still_image: None,
            slouch_threshold: thresholds.slouch,
            tilt_threshold: thresholds.tilt,
            bad_streak_limit: BAD_STREAK_LIMIT,
            phone_class_id: PHONE_CLASS_ID,
            object_confidence: 0.25,
            pose_model: ModelSource::default_pose(),
            object_model: ModelSource::new("yolo11n.onnx", None),
            models_dir: default_models_dir(),
            download_attempts: DownloadPolicy::default().attempts,
            snapshot_dir: default_snapshot_dir(),
            alert_sound: PathBuf::from("/System/Library/Sounds/Glass.aiff"),
            calibrate_on_start: true,
            lock_timeout_secs: 30,
            config_path: app_config_dir().join(SETTINGS_FILE),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::load(&app_config_dir().join(SETTINGS_FILE))
    }

    /// Read the settings file, falling back to defaults and writing them back when the
    /// file is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        let parsed = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                serde_json::from_slice::<Settings>(&bytes).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(mut settings) => {
                settings.config_path = path.to_path_buf();
                settings
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "using default settings");
                let settings = Settings {
                    config_path: path.to_path_buf(),
                    ..Default::default()
                };
                if let Err(error) = settings.save() {
                    tracing::warn!(%error, "failed to write default settings");
                }
                settings
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(&self.config_path, json)?;
        tracing::debug!(path = %self.config_path.display(), "settings saved");
        Ok(())
    }

    pub fn camera_options(&self) -> CameraOptions {
        CameraOptions {
            index: self.camera_index,
            warmup_frames: self.warmup_frames,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            mirror: self.mirror,
        }
    }

    pub fn detection_policy(&self) -> DetectionPolicy {
        DetectionPolicy {
            thresholds: PostureThresholds {
                slouch: self.slouch_threshold,
                tilt: self.tilt_threshold,
            },
            phone_class_id: self.phone_class_id,
        }
    }

    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            interval: self.interval,
            bad_streak_limit: self.bad_streak_limit,
            lock_timeout: Duration::from_secs(self.lock_timeout_secs),
            calibrate_on_start: self.calibrate_on_start,
            snapshot_dir: self.snapshot_dir.clone(),
        }
    }

    pub fn download_policy(&self) -> DownloadPolicy {
        DownloadPolicy {
            attempts: self.download_attempts,
            ..Default::default()
        }
    }
}
