use spinespy::{Command, MonitorHandle};
use spinespy_types::sync::Mutex;
use std::sync::Arc;
use tauri::{AppHandle, Manager};

use crate::settings::Settings;
use crate::tray::TrayRuntimeState;

pub struct TauriSettingsState(pub Arc<Mutex<Settings>>);
impl TauriSettingsState {
    #[inline]
    pub fn construct(app_handle: &AppHandle) -> anyhow::Result<Arc<Mutex<Settings>>> {
        app_handle
            .try_state::<TauriSettingsState>()
            .map(|state| state.0.clone())
            .ok_or_else(|| anyhow::anyhow!("Settings State not found"))
    }
}

pub struct TauriMonitorState(pub MonitorHandle);
impl TauriMonitorState {
    #[inline]
    pub fn send(app_handle: &AppHandle, command: Command) -> anyhow::Result<()> {
        let state = app_handle
            .try_state::<TauriMonitorState>()
            .ok_or_else(|| anyhow::anyhow!("Monitor State not found"))?;
        state.0.send(command)
    }
}

#[derive(Default)]
pub struct TauriTrayState(pub Arc<Mutex<TrayRuntimeState>>);
