use std::path::Path;

/// Extracted document text plus the media type inferred from the filename.
#[derive(Debug)]
pub struct ExtractedText {
    pub content: String,
    pub media_type: String,
}

/// Extract plain text from a document's raw bytes. The bytes are taken
/// separately from the path so the caller can forward the same bytes to the
/// indexing backend unmodified.
pub fn extract_text(path: &Path, bytes: &[u8]) -> Result<ExtractedText, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "txt" => Ok(ExtractedText {
            content: String::from_utf8_lossy(bytes).into_owned(),
            media_type: "text/plain".into(),
        }),
        "md" | "markdown" => Ok(ExtractedText {
            content: String::from_utf8_lossy(bytes).into_owned(),
            media_type: "text/markdown".into(),
        }),
        "pdf" => {
            let content = pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| format!("PDF read failed: {}", e))?;
            Ok(ExtractedText {
                content,
                media_type: "application/pdf".into(),
            })
        }
        _ => Err(format!("Unsupported file type: .{}", ext)),
    }
}
