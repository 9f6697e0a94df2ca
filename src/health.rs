use crate::backend::{self, HealthReport};
use crate::store::Store;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tauri::{AppHandle, Emitter, Manager, State};

pub const POLL_INTERVAL: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Serialize, Default)]
pub struct BackendStatus {
    /// None until the first probe completes.
    pub online: Option<bool>,
    pub chunks_indexed: u64,
}

/// Last known backend state plus the handle of the polling task.
pub struct HealthMonitor {
    status: Mutex<BackendStatus>,
    task: Mutex<Option<tauri::async_runtime::JoinHandle<()>>>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(BackendStatus::default()),
            task: Mutex::new(None),
        }
    }

    pub fn status(&self) -> BackendStatus {
        self.status.lock().unwrap().clone()
    }

    pub fn is_online(&self) -> bool {
        self.status.lock().unwrap().online == Some(true)
    }

    fn record_online(&self, report: &HealthReport) -> BackendStatus {
        let mut status = self.status.lock().unwrap();
        if status.online != Some(true) {
            tracing::info!("indexing backend online");
        }
        status.online = Some(true);
        status.chunks_indexed = if report.vector_store_active {
            report.chunks_indexed
        } else {
            0
        };
        status.clone()
    }

    fn record_offline(&self) -> BackendStatus {
        let mut status = self.status.lock().unwrap();
        if status.online != Some(false) {
            tracing::warn!("indexing backend offline, answering from local documents");
        }
        status.online = Some(false);
        // The chunk count keeps its last good value.
        status.clone()
    }
}

/// (Re)start the polling loop. Called once at startup and again whenever the
/// backend URL setting changes, so the loop always probes the current URL.
pub fn restart(app: &AppHandle) {
    let monitor = app.state::<HealthMonitor>();
    let mut task = monitor.task.lock().unwrap();
    if let Some(handle) = task.take() {
        handle.abort();
    }
    *task = Some(tauri::async_runtime::spawn(poll_loop(app.clone())));
}

/// Probe immediately, then on a fixed cadence. Each result is pushed into
/// the monitor state and emitted to the frontend.
async fn poll_loop(app: AppHandle) {
    loop {
        let base_url = app.state::<Store>().settings().backend_url;
        let monitor = app.state::<HealthMonitor>();
        let status = match backend::check_health(&base_url).await {
            Ok(report) => monitor.record_online(&report),
            Err(err) => {
                tracing::debug!("backend health check failed: {err}");
                monitor.record_offline()
            }
        };
        let _ = app.emit("backend-status", status);
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[tauri::command]
pub fn get_backend_status(monitor: State<'_, HealthMonitor>) -> Result<BackendStatus, String> {
    Ok(monitor.status())
}
