use crate::backend;
use crate::doc_processor;
use crate::health::HealthMonitor;
use crate::store::models::{DocStatus, Document};
use crate::store::{now_millis, Store};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tauri::{AppHandle, Emitter, State};
use tracing::{debug, info};

/// Fixed pause for the offline path, so the stage indicator stays readable.
const OFFLINE_PREP_DELAY: Duration = Duration::from_millis(400);

pub(crate) const STAGE_EXTRACT: &str = "Extracting Text";
pub(crate) const STAGE_SYNC: &str = "Syncing with FAISS";
pub(crate) const STAGE_PREPARE: &str = "Preparing for local Q&A";

#[derive(Clone, Serialize)]
struct StageEvent {
    stage: Option<String>,
}

/// Process a batch of selected files sequentially, in selection order. Any
/// failure aborts the rest of the batch; documents already materialized stay
/// in the store.
pub(crate) async fn ingest_files(
    store: &Store,
    backend_online: bool,
    paths: &[PathBuf],
    on_stage: impl Fn(&str),
) -> Result<Vec<Document>, String> {
    let mut created = Vec::new();
    for path in paths {
        created.push(ingest_file(store, backend_online, path, &on_stage).await?);
    }
    Ok(created)
}

async fn ingest_file(
    store: &Store,
    backend_online: bool,
    path: &Path,
    on_stage: &impl Fn(&str),
) -> Result<Document, String> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    on_stage(STAGE_EXTRACT);
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    let size = bytes.len() as u64;
    let extracted = doc_processor::extract_text(path, &bytes)?;

    if backend_online {
        on_stage(STAGE_SYNC);
        let settings = store.settings();
        // The original, unmodified bytes go to the backend; extraction above
        // worked on a borrow for exactly this reason.
        let receipt = backend::upload_file(
            &settings.backend_url,
            &filename,
            &extracted.media_type,
            bytes,
        )
        .await
        .map_err(|e| format!("Backend sync failed: {}", e))?;
        info!(
            "backend indexed {}: {} chunks added, {} total",
            filename, receipt.chunks_added, receipt.total_chunks
        );
    } else {
        on_stage(STAGE_PREPARE);
        tokio::time::sleep(OFFLINE_PREP_DELAY).await;
    }

    let doc = Document {
        id: uuid::Uuid::new_v4().to_string(),
        name: filename,
        media_type: extracted.media_type,
        size,
        content: extracted.content,
        upload_date: now_millis(),
        status: DocStatus::Indexed,
    };
    store.add_document(doc.clone());
    Ok(doc)
}

#[tauri::command]
pub async fn upload_documents(
    app: AppHandle,
    store: State<'_, Store>,
    monitor: State<'_, HealthMonitor>,
    file_paths: Vec<String>,
) -> Result<Vec<Document>, String> {
    let paths: Vec<PathBuf> = file_paths.iter().map(PathBuf::from).collect();
    let backend_online = monitor.is_online();

    let result = ingest_files(&store, backend_online, &paths, |stage| {
        debug!("pipeline stage: {stage}");
        let _ = app.emit(
            "pipeline-stage",
            StageEvent {
                stage: Some(stage.to_string()),
            },
        );
    })
    .await;

    // The stage indicator is cleared on every exit path.
    let _ = app.emit("pipeline-stage", StageEvent { stage: None });
    result
}

#[tauri::command]
pub fn list_documents(store: State<'_, Store>) -> Result<Vec<Document>, String> {
    Ok(store.list_documents())
}

#[tauri::command]
pub fn get_document(store: State<'_, Store>, id: String) -> Result<Option<Document>, String> {
    Ok(store.get_document(&id))
}

#[tauri::command]
pub fn remove_document(store: State<'_, Store>, id: String) -> Result<(), String> {
    store.remove_document(&id);
    Ok(())
}
