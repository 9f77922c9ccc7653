use std::path::PathBuf;
use std::sync::Arc;

use emotes_core::constants::{RENDITION_BOXES, TOTAL_PROCESSING_TASKS};
use emotes_core::{AppError, ProcessingUpdate, Rendition, RenditionBox, SourceKind};
use emotes_processing::{DecodedSource, ImageMetadata, ImageOptimizer, ImageResize};
use tokio::task::JoinError;

use super::Emote;

fn blocking_fault(err: JoinError) -> AppError {
    AppError::WorkerFault(format!("image task aborted: {}", err))
}

/// Renditions of one emote, produced lazily from the decoded original,
/// most detailed first. Each box is rendered exactly once.
pub struct ResizeSequence {
    source: Arc<DecodedSource>,
    metadata: ImageMetadata,
    dir: PathBuf,
    extension: &'static str,
    next_box: usize,
}

impl ResizeSequence {
    pub fn metadata(&self) -> ImageMetadata {
        self.metadata
    }

    pub fn remaining(&self) -> usize {
        RENDITION_BOXES.len() - self.next_box
    }

    pub async fn next(&mut self) -> Option<Result<Rendition, AppError>> {
        let target = *RENDITION_BOXES.get(self.next_box)?;
        self.next_box += 1;
        Some(self.render(target).await)
    }

    async fn render(&self, target: RenditionBox) -> Result<Rendition, AppError> {
        let (width, height) = ImageResize::fit_within(
            self.metadata.width,
            self.metadata.height,
            target.width,
            target.height,
        );

        let source = Arc::clone(&self.source);
        let encoded = tokio::task::spawn_blocking(move || source.render(width, height))
            .await
            .map_err(blocking_fault)??;

        let path = self
            .dir
            .join(Rendition::file_name(target.scope, self.extension));
        tokio::fs::write(&path, &encoded).await?;

        tracing::debug!(
            scope = target.scope,
            width,
            height,
            size_bytes = encoded.len(),
            "Rendition resized"
        );

        Ok(Rendition {
            scope: target.scope,
            extension: self.extension,
            path,
            width,
            height,
        })
    }
}

impl Emote {
    fn source_kind(&self) -> SourceKind {
        self.data.source_kind()
    }

    /// Read and decode the original, returning the rendition sequence
    pub async fn resize(&self) -> Result<ResizeSequence, AppError> {
        let original = tokio::fs::read(self.original_path()).await?;
        let kind = self.source_kind();

        let source = tokio::task::spawn_blocking(move || DecodedSource::decode(&original, kind))
            .await
            .map_err(blocking_fault)??;
        let metadata = source.metadata()?;

        tracing::debug!(
            emote_id = %self.id(),
            width = metadata.width,
            height = metadata.height,
            frames = metadata.frame_count,
            "Original decoded"
        );

        Ok(ResizeSequence {
            source: Arc::new(source),
            metadata,
            dir: self.filepath(),
            extension: kind.extension(),
            next_box: 0,
        })
    }

    /// Shrink a rendition file in place
    pub async fn optimize(&self, rendition: &Rendition) -> Result<(), AppError> {
        let data = tokio::fs::read(&rendition.path).await?;
        let kind = self.source_kind();

        let optimized = tokio::task::spawn_blocking(move || ImageOptimizer::optimize(&data, kind))
            .await
            .map_err(blocking_fault)??;

        tokio::fs::write(&rendition.path, optimized).await?;
        Ok(())
    }

    /// Publish a rendition and discard the local file, returning its URL
    pub async fn upload(&self, rendition: Rendition) -> Result<String, AppError> {
        let data = tokio::fs::read(&rendition.path).await?;
        let key = self.ctx().keys.rendition_key(self.id(), rendition.scope);

        let url = self
            .ctx()
            .storage
            .upload_with_key(&key, data, &self.data.mime)
            .await?;

        tokio::fs::remove_file(&rendition.path).await?;
        Ok(url)
    }

    /// Resize, optimize and upload every rendition, reporting each finished
    /// step. The last update reported has `done` set.
    #[tracing::instrument(skip(self, on_update), fields(emote_id = %self.id()))]
    pub async fn process<F>(&self, mut on_update: F) -> Result<(), AppError>
    where
        F: FnMut(ProcessingUpdate) + Send,
    {
        let id = self.id();
        let total = TOTAL_PROCESSING_TASKS;
        let mut completed = 0;

        let mut sequence = self.resize().await?;
        let mut renditions = Vec::with_capacity(sequence.remaining());
        while let Some(rendition) = sequence.next().await {
            let rendition = rendition?;
            completed += 1;
            on_update(ProcessingUpdate::progress(
                id,
                completed,
                total,
                format!("Resized {}x", rendition.scope),
            ));
            renditions.push(rendition);
        }

        // least detailed first from here on
        renditions.reverse();

        for rendition in &renditions {
            self.optimize(rendition).await?;
            completed += 1;
            on_update(ProcessingUpdate::progress(
                id,
                completed,
                total,
                format!("Optimized {}x", rendition.scope),
            ));
        }

        for rendition in renditions {
            let scope = rendition.scope;
            self.upload(rendition).await?;
            completed += 1;
            on_update(ProcessingUpdate::progress(
                id,
                completed,
                total,
                format!("Uploaded {}x", scope),
            ));
        }

        if let Err(e) = tokio::fs::remove_dir_all(self.filepath()).await {
            tracing::warn!(error = %e, "Failed to remove scratch directory");
        }

        on_update(ProcessingUpdate::completed(id, total, "Processing complete"));
        Ok(())
    }
}
