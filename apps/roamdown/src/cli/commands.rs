//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::Settings;
use roamdown_core::{Graph, Post, PublishMarker, PublishReport, Publisher, RoamError};
use std::path::{Component, Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum snapshot size (512 MB).
///
/// Exports of large graphs are big, but the whole text is held in memory.
const MAX_SNAPSHOT_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), RoamError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| RoamError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(RoamError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input path.
///
/// Canonicalizes the path (resolving symlinks and "..") and ensures it is a
/// regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, RoamError> {
    let canonical = path.canonicalize().map_err(|e| {
        RoamError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(RoamError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate the output directory.
///
/// The directory must already exist; it is never created.
fn validate_output_dir(path: &Path) -> Result<PathBuf, RoamError> {
    let canonical = path.canonicalize().map_err(|e| {
        RoamError::IoError(format!(
            "Invalid output directory '{}': {}",
            path.display(),
            e
        ))
    })?;

    if !canonical.is_dir() {
        return Err(RoamError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// SNAPSHOT LOADING
// =============================================================================

/// Read and build the graph named by the settings.
pub fn load_graph(settings: &Settings) -> Result<Graph, RoamError> {
    let input = settings.input()?;
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_SNAPSHOT_FILE_SIZE)?;

    tracing::info!("Reading snapshot {}", validated_path.display());
    let text = std::fs::read_to_string(&validated_path)
        .map_err(|e| RoamError::IoError(format!("Read file: {}", e)))?;

    let graph = Graph::parse(&text)?;
    let stats = graph.resolve_stats();
    tracing::info!(
        entities = graph.entity_count(),
        blocks = graph.block_count(),
        pages = graph.page_count(),
        "Snapshot loaded"
    );
    if stats.dropped() > 0 {
        tracing::warn!(
            children = stats.children_dropped,
            refs = stats.refs_dropped,
            "Dropped edges to entities that are not blocks"
        );
    }

    Ok(graph)
}

/// Validate a post file name.
///
/// The name comes from a block uid and must be a single plain path
/// component, so the post lands directly in the output directory.
fn validate_post_file_name(name: &str) -> Result<(), RoamError> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single || name.contains(['/', '\\', '\0']) {
        return Err(RoamError::IoError(format!(
            "Post file name '{}' is not a plain file name",
            name.escape_debug()
        )));
    }
    Ok(())
}

/// Write one post into the output directory, returning its path.
pub fn write_post(output_dir: &Path, post: &Post) -> Result<PathBuf, RoamError> {
    let file_name = post.file_name();
    validate_post_file_name(&file_name)?;
    let path = output_dir.join(file_name);
    std::fs::write(&path, &post.markdown).map_err(|e| {
        RoamError::IoError(format!("Failed to write '{}': {}", path.display(), e))
    })?;
    Ok(path)
}

// =============================================================================
// PUBLISH COMMAND
// =============================================================================

/// Write every tagged post.
pub fn cmd_publish(settings: &Settings, json_mode: bool) -> Result<(), RoamError> {
    let output_dir = validate_output_dir(&settings.output_dir)?;
    let graph = load_graph(settings)?;
    let report = publish(&graph, settings)?;
    for post in &report.posts {
        validate_post_file_name(&post.file_name())?;
    }

    let mut written = Vec::with_capacity(report.posts.len());
    for post in &report.posts {
        let path = write_post(&output_dir, post)?;
        tracing::info!(uid = %post.uid, "Wrote {}", path.display());
        written.push(path);
    }

    if json_mode {
        let output = serde_json::json!({
            "publish_tag": settings.publish_tag,
            "output_dir": output_dir.to_string_lossy(),
            "written": written
                .iter()
                .map(|p| p.to_string_lossy())
                .collect::<Vec<_>>(),
            "unmarked": report.unmarked,
            "skipped": report
                .skipped
                .iter()
                .map(|s| serde_json::json!({ "uid": s.uid, "error": s.error.to_string() }))
                .collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Published {} post(s) to {}", written.len(), output_dir.display());
    if !report.unmarked.is_empty() {
        println!("Unmarked references: {}", report.unmarked.len());
    }
    if !report.skipped.is_empty() {
        println!("Skipped:");
        for skipped in &report.skipped {
            println!("  {}: {}", skipped.uid, skipped.error);
        }
    }

    Ok(())
}

/// Run the publisher, logging each candidate outcome.
fn publish(graph: &Graph, settings: &Settings) -> Result<PublishReport, RoamError> {
    let publisher = Publisher::new(graph, PublishMarker::new(settings.publish_tag.as_str()));
    let report = publisher.publish_all(settings.fail_fast)?;

    for uid in &report.unmarked {
        tracing::debug!(%uid, "Reference without publish marker");
    }
    for skipped in &report.skipped {
        tracing::warn!(uid = %skipped.uid, error = %skipped.error, "Skipped post");
    }

    Ok(report)
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show snapshot and graph statistics.
pub fn cmd_status(settings: &Settings, json_mode: bool) -> Result<(), RoamError> {
    let graph = load_graph(settings)?;
    let stats = graph.resolve_stats();
    let input = settings.input()?;

    let publish_page = graph
        .page_block(&settings.publish_tag)
        .ok()
        .map(|block| block.incoming_ref_entities().len());

    if json_mode {
        let output = serde_json::json!({
            "input": input.to_string_lossy(),
            "entity_count": graph.entity_count(),
            "block_count": graph.block_count(),
            "page_count": graph.page_count(),
            "schema_attributes": graph.schema().len(),
            "publish_tag": settings.publish_tag,
            "publish_references": publish_page,
            "edges": stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Roamdown Snapshot Status");
    println!("========================");
    println!("Input: {}", input.display());
    println!();
    println!("Entities:          {}", graph.entity_count());
    println!("Blocks:            {}", graph.block_count());
    println!("Pages:             {}", graph.page_count());
    println!("Schema Attributes: {}", graph.schema().len());
    println!();
    println!(
        "Child Edges:       {} attached, {} dropped",
        stats.children_attached, stats.children_dropped
    );
    println!(
        "Reference Edges:   {} attached, {} dropped",
        stats.refs_attached, stats.refs_dropped
    );
    match publish_page {
        Some(count) => println!(
            "Publish Page:      #{} ({} references)",
            settings.publish_tag, count
        ),
        None => println!("Publish Page:      #{} (not found)", settings.publish_tag),
    }

    Ok(())
}

// =============================================================================
// RENDER COMMAND
// =============================================================================

/// Print the document of one block.
pub fn cmd_render(settings: &Settings, uid: &str, json_mode: bool) -> Result<(), RoamError> {
    let graph = load_graph(settings)?;
    let publisher = Publisher::new(&graph, PublishMarker::new(settings.publish_tag.as_str()));
    let post = publisher.render_uid(uid)?;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&post).unwrap_or_default()
        );
        return Ok(());
    }

    print!("{}", post.markdown);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
