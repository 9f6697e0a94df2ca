use crate::health;
use crate::store::models::Settings;
use crate::store::Store;
use tauri::{AppHandle, State};
use tracing::info;

#[tauri::command]
pub fn get_settings(store: State<'_, Store>) -> Result<Settings, String> {
    Ok(store.settings())
}

/// Chunk size and overlap are forwarded for the backend's benefit only; no
/// local algorithm consumes them.
#[tauri::command]
pub fn update_settings(
    app: AppHandle,
    store: State<'_, Store>,
    settings: Settings,
) -> Result<(), String> {
    if store.update_settings(settings) {
        info!("backend URL changed, restarting health monitor");
        health::restart(&app);
    }
    Ok(())
}
