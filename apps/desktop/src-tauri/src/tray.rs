use spinespy::{CheckInterval, Command, Outcome};
use tauri::menu::{
    CheckMenuItem, IsMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem, Submenu,
};
use tauri::tray::TrayIconBuilder;
use tauri::{AppHandle, Manager};

use crate::state::{TauriMonitorState, TauriTrayState};

const TRAY_ID: &str = "spinespy_tray";

const MENU_TOGGLE_MONITORING: &str = "tray_toggle_monitoring";
const MENU_INTERVAL_PREFIX: &str = "tray_interval_";
const MENU_CALIBRATE: &str = "tray_calibrate";
const MENU_SNAPSHOT: &str = "tray_snapshot";
const MENU_TEST_ALERT: &str = "tray_test_alert";
const MENU_QUIT: &str = "tray_quit";

const TITLE_GOOD: &str = "🦸";
const TITLE_BAD: &str = "🧟";

#[derive(Debug, Clone, PartialEq)]
pub struct TrayData {
    pub active: bool,
    pub interval: CheckInterval,
    /// Outcome of the last scheduled check, `None` until one finished
    pub outcome: Option<Outcome>,
    pub streak: u32,
}

impl Default for TrayData {
    fn default() -> Self {
        Self {
            active: true,
            interval: CheckInterval::default(),
            outcome: None,
            streak: 0,
        }
    }
}

impl TrayData {
    pub fn title(&self) -> &'static str {
        match &self.outcome {
            Some(outcome) if outcome.is_bad() => TITLE_BAD,
            _ => TITLE_GOOD,
        }
    }

    pub fn monitoring_label(&self) -> &'static str {
        if self.active {
            "✓ Monitoring"
        } else {
            "Monitoring (paused)"
        }
    }

    pub fn status_label(&self) -> String {
        match &self.outcome {
            None => "Status: waiting for first check".to_string(),
            Some(Outcome::Good) => format!("Status: {}", Outcome::Good),
            Some(outcome) => format!("Status: {outcome} ({} in a row)", self.streak),
        }
    }
}

#[derive(Default)]
pub struct TrayRuntimeState {
    pub tray: Option<tauri::tray::TrayIcon>,
    pub data: TrayData,
}

fn interval_menu_id(interval: CheckInterval) -> String {
    format!("{MENU_INTERVAL_PREFIX}{}", interval.label())
}

/// Map a menu item id to the command it stands for
pub fn command_for(id: &str) -> Option<Command> {
    match id {
        MENU_TOGGLE_MONITORING => Some(Command::ToggleMonitoring),
        MENU_CALIBRATE => Some(Command::Calibrate),
        MENU_SNAPSHOT => Some(Command::Snapshot),
        MENU_TEST_ALERT => Some(Command::TestAlert),
        MENU_QUIT => Some(Command::Quit),
        _ => id
            .strip_prefix(MENU_INTERVAL_PREFIX)
            .and_then(CheckInterval::from_label)
            .map(Command::SetInterval),
    }
}

pub fn init_tray(app_handle: &AppHandle, data: &TrayData) -> tauri::Result<()> {
    let menu = build_tray_menu(app_handle, data)?;
    let tray = TrayIconBuilder::with_id(TRAY_ID)
        .menu(&menu)
        .title(data.title())
        .tooltip("SpineSpy")
        .on_menu_event(|app: &AppHandle, event: MenuEvent| {
            handle_menu_event(app, event.id().as_ref());
        })
        .build(app_handle)?;

    if let Some(state) = app_handle.try_state::<TauriTrayState>() {
        let runtime = state.0.clone();
        tauri::async_runtime::spawn(async move {
            let mut guard = runtime.lock().await;
            guard.tray = Some(tray);
        });
    }

    Ok(())
}

pub async fn update_tray_data<F>(app_handle: &AppHandle, updater: F) -> tauri::Result<()>
where
    F: FnOnce(&mut TrayData) + Send + 'static,
{
    let Some(state) = app_handle.try_state::<TauriTrayState>() else {
        return Ok(());
    };

    let (changed, tray, data) = {
        let mut guard = state.0.lock().await;
        let old_data = guard.data.clone();
        updater(&mut guard.data);
        (old_data != guard.data, guard.tray.clone(), guard.data.clone())
    };

    let Some(tray) = tray else {
        return Ok(());
    };

    // The title follows every check, the menu only needs rebuilding on change
    tray.set_title(Some(data.title()))?;
    if changed {
        let menu = build_tray_menu(app_handle, &data)?;
        tray.set_menu(Some(menu))?;
    }

    Ok(())
}

fn build_tray_menu(app_handle: &AppHandle, data: &TrayData) -> tauri::Result<Menu<tauri::Wry>> {
    let status_item = MenuItem::new(app_handle, data.status_label(), false, None::<&str>)?;
    let toggle_item = MenuItem::with_id(
        app_handle,
        MENU_TOGGLE_MONITORING,
        data.monitoring_label(),
        true,
        None::<&str>,
    )?;
    let interval_submenu = build_interval_menu(app_handle, data)?;
    let calibrate_item = MenuItem::with_id(
        app_handle,
        MENU_CALIBRATE,
        "Calibrate",
        true,
        None::<&str>,
    )?;
    let snapshot_item = MenuItem::with_id(
        app_handle,
        MENU_SNAPSHOT,
        "Save Snapshot",
        true,
        None::<&str>,
    )?;
    let test_alert_item = MenuItem::with_id(
        app_handle,
        MENU_TEST_ALERT,
        "Test Alert",
        true,
        None::<&str>,
    )?;
    let quit_item = MenuItem::with_id(app_handle, MENU_QUIT, "Quit", true, None::<&str>)?;

    Menu::with_items(
        app_handle,
        &[
            &status_item,
            &PredefinedMenuItem::separator(app_handle)?,
            &toggle_item,
            &interval_submenu,
            &calibrate_item,
            &PredefinedMenuItem::separator(app_handle)?,
            &snapshot_item,
            &test_alert_item,
            &PredefinedMenuItem::separator(app_handle)?,
            &quit_item,
        ],
    )
}

fn build_interval_menu(
    app_handle: &AppHandle,
    data: &TrayData,
) -> tauri::Result<Submenu<tauri::Wry>> {
    let items = CheckInterval::ALL
        .into_iter()
        .map(|interval| {
            CheckMenuItem::with_id(
                app_handle,
                interval_menu_id(interval),
                interval.label(),
                true,
                interval == data.interval,
                None::<&str>,
            )
        })
        .collect::<tauri::Result<Vec<_>>>()?;

    let refs: Vec<&dyn IsMenuItem<tauri::Wry>> = items
        .iter()
        .map(|item| item as &dyn IsMenuItem<tauri::Wry>)
        .collect();
    Submenu::with_items(app_handle, "Interval", true, &refs)
}

fn handle_menu_event(app_handle: &AppHandle, id: &str) {
    let Some(command) = command_for(id) else {
        tracing::debug!(id, "unhandled tray menu item");
        return;
    };

    tracing::debug!(?command, "tray command");
    if let Err(error) = TauriMonitorState::send(app_handle, command) {
        tracing::error!(%error, ?command, "failed to reach monitor");
        if command == Command::Quit {
            app_handle.exit(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinespy::BadReason;

    #[test]
    fn menu_ids_map_to_commands() {
        assert_eq!(command_for(MENU_TOGGLE_MONITORING), Some(Command::ToggleMonitoring));
        assert_eq!(command_for(MENU_CALIBRATE), Some(Command::Calibrate));
        assert_eq!(command_for(MENU_SNAPSHOT), Some(Command::Snapshot));
        assert_eq!(command_for(MENU_TEST_ALERT), Some(Command::TestAlert));
        assert_eq!(command_for(MENU_QUIT), Some(Command::Quit));
        assert_eq!(command_for("tray_unknown"), None);
    }

    #[test]
    fn interval_items_round_trip() {
        for interval in CheckInterval::ALL {
            assert_eq!(
                command_for(&interval_menu_id(interval)),
                Some(Command::SetInterval(interval))
            );
        }
        assert_eq!(command_for("tray_interval_10m"), None);
    }

    #[test]
    fn title_follows_last_outcome() {
        let mut data = TrayData::default();
        assert_eq!(data.title(), TITLE_GOOD);

        data.outcome = Some(Outcome::Bad(BadReason::PhoneDetected));
        assert_eq!(data.title(), TITLE_BAD);

        data.outcome = Some(Outcome::Good);
        assert_eq!(data.title(), TITLE_GOOD);
    }

    #[test]
    fn monitoring_label_shows_pause() {
        let mut data = TrayData::default();
        assert_eq!(data.monitoring_label(), "✓ Monitoring");
        data.active = false;
        assert_eq!(data.monitoring_label(), "Monitoring (paused)");
    }

    #[test]
    fn status_label_mentions_streak_when_bad() {
        let data = TrayData {
            outcome: Some(Outcome::Bad(BadReason::Slouching)),
            streak: 3,
            ..Default::default()
        };
        assert_eq!(data.status_label(), "Status: Bad: Slouching (3 in a row)");
    }
}
