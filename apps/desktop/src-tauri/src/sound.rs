use spinespy::{AlertError, Alerter};
use spinespy_types::async_trait;
use std::path::PathBuf;

/// Plays a sound file through `afplay`
pub struct AfplayAlerter {
    sound: PathBuf,
}

impl AfplayAlerter {
    pub fn new(sound: PathBuf) -> Self {
        Self { sound }
    }
}

#[async_trait]
impl Alerter for AfplayAlerter {
    async fn play(&self) -> Result<(), AlertError> {
        if !self.sound.exists() {
            return Err(AlertError::SoundMissing(self.sound.clone()));
        }

        let status = tokio::process::Command::new("afplay")
            .arg(&self.sound)
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(AlertError::Player(format!("afplay exited with {status}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_sound_is_reported() {
        let alerter = AfplayAlerter::new(PathBuf::from("/nonexistent/Glass.aiff"));
        let err = alerter.play().await.unwrap_err();
        assert!(matches!(err, AlertError::SoundMissing(_)));
    }
}
