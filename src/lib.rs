mod backend;
mod commands;
mod doc_processor;
mod health;
mod llm;
mod store;

use health::HealthMonitor;
use store::Store;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // The Gemini credential may live in a .env next to the binary.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            app.manage(Store::new());
            app.manage(HealthMonitor::new());
            health::restart(app.handle());
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::chat::send_message,
            commands::chat::get_session,
            commands::documents::upload_documents,
            commands::documents::list_documents,
            commands::documents::get_document,
            commands::documents::remove_document,
            commands::settings::get_settings,
            commands::settings::update_settings,
            health::get_backend_status,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
