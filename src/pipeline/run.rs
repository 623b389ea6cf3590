//! MaskPipeline: one image's boxes mapped, cropped, segmented and composited.

use std::sync::Arc;

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::compositor::{Compositor, OverlayBuffer, PlacedMasks};
use crate::config::PipelineConfig;
use crate::error::MaskError;
use crate::extract::{auxiliary_crop, extract};
use crate::geometry::{DisplayTransform, Region};
use crate::oracle::{OracleAdapter, SegmentationOracle};
use crate::pipeline::{
    AuxCrop, ImageOutput, ImageReport, ImageStatus, PipelineBuilder, RegionOutcome, RegionState,
    RunState,
};
use crate::store::{AnnotationSet, AnnotationStore, ImageId, ImageSource};

/// Bundles a segmentation oracle with the mapping and compositing stages.
///
/// Cloning is cheap and clones share the oracle handle, including its
/// concurrency limit.
#[derive(Clone)]
pub struct MaskPipeline {
    oracle: OracleAdapter,
    compositor: Compositor,
    config: PipelineConfig,
}

impl MaskPipeline {
    /// Create a pipeline around `oracle`; fails if `config` is invalid.
    pub fn new(
        oracle: Arc<dyn SegmentationOracle>,
        config: PipelineConfig,
    ) -> Result<Self, MaskError> {
        config.validate()?;
        Ok(Self {
            oracle: OracleAdapter::new(oracle, &config.oracle),
            compositor: Compositor::new(config.placement, config.overlay.clone()),
            config,
        })
    }

    /// Create a pipeline with the default configuration.
    pub fn with_default_config(oracle: Arc<dyn SegmentationOracle>) -> Self {
        let config = PipelineConfig::default();
        Self {
            oracle: OracleAdapter::new(oracle, &config.oracle),
            compositor: Compositor::new(config.placement, config.overlay.clone()),
            config,
        }
    }

    pub fn builder(oracle: Arc<dyn SegmentationOracle>) -> PipelineBuilder {
        PipelineBuilder::new(oracle)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get a reference to the oracle adapter.
    pub fn oracle(&self) -> &OracleAdapter {
        &self.oracle
    }

    /// Load `id` from its collaborators and process it.
    ///
    /// Never fails: image-level errors end up in the report's status.
    pub async fn run(
        &self,
        id: &ImageId,
        images: &dyn ImageSource,
        store: &dyn AnnotationStore,
    ) -> ImageReport {
        let mut progress = Progress::new(id);

        let loaded = images
            .load(id)
            .and_then(|image| store.annotations(id).map(|set| (image, set)));
        let (image, annotations) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => return progress.fail(err.into()),
        };
        progress.advance(RunState::Loaded, None);

        match self.process(id, &image, &annotations, &mut progress).await {
            Ok(output) => progress.succeed(output),
            Err(failure) => progress.fail(failure),
        }
    }

    /// Process an already loaded image against its annotation set.
    ///
    /// Returns `Err` only for image-level failures; region failures are
    /// recorded in the output's region outcomes. Use [`MaskPipeline::run`]
    /// to keep the region outcomes of a failed image.
    pub async fn process_image(
        &self,
        id: &ImageId,
        image: &RgbImage,
        annotations: &AnnotationSet,
    ) -> Result<ImageOutput, MaskError> {
        let mut progress = Progress::new(id);
        progress.advance(RunState::Loaded, None);
        self.process(id, image, annotations, &mut progress)
            .await
            .map_err(|failure| failure.error)
    }

    async fn process(
        &self,
        id: &ImageId,
        image: &RgbImage,
        annotations: &AnnotationSet,
        progress: &mut Progress<'_>,
    ) -> Result<ImageOutput, Failure> {
        annotations.validate()?;
        let (width, height) = image.dimensions();
        let surface = annotations.surface_or(self.config.display);
        let transform = DisplayTransform::for_surface(&surface, width, height)?;

        info!(
            image = %id,
            boxes = annotations.boxes.len(),
            width,
            height,
            "processing image"
        );

        let mut overlay = OverlayBuffer::new(width, height);
        let mut regions = Vec::with_capacity(annotations.boxes.len());
        let mut aux_crops = Vec::new();
        let mut region_composites = Vec::new();
        let mut painted_so_far: Vec<Region> = Vec::new();

        for (index, bbox) in annotations.boxes.iter().enumerate() {
            let mapped = transform.map(bbox);

            progress.advance(RunState::Extracting, Some(index));
            let crop = match extract(image, index, &mapped, self.config.padding) {
                Ok(crop) => crop,
                Err(err) => {
                    warn!(image = %id, region = index, error = %err, "skipping region");
                    regions.push(RegionOutcome {
                        index,
                        mapped,
                        padded: None,
                        state: RegionState::Skipped(err),
                    });
                    continue;
                }
            };
            if let Some(size) = self.config.aux_crop_size {
                aux_crops.push(AuxCrop {
                    index,
                    image: auxiliary_crop(&crop, size),
                });
            }

            progress.advance(RunState::Segmenting, Some(index));
            let masks = match self.oracle.segment(&crop.pixels).await {
                Ok(masks) => masks,
                Err(source) => {
                    let err = MaskError::OracleFailure { index, source };
                    warn!(image = %id, region = index, error = %err, "skipping region");
                    regions.push(RegionOutcome {
                        index,
                        mapped,
                        padded: Some(crop.padded),
                        state: RegionState::Skipped(err),
                    });
                    continue;
                }
            };

            progress.advance(RunState::Compositing, Some(index));
            let placed = PlacedMasks {
                index,
                mapped: crop.mapped,
                padded: crop.padded,
                masks,
            };
            let target = placed.target(self.compositor.placement()).to_region();
            if painted_so_far
                .iter()
                .any(|prior| prior.intersection(&target).is_some())
            {
                debug!(image = %id, region = index, "region overlaps an earlier one; later masks win");
            }
            let painted = self.compositor.paint_region(&mut overlay, &placed);
            painted_so_far.push(target);

            if self.config.per_region_outputs {
                let single = self
                    .compositor
                    .composite(image, std::slice::from_ref(&placed));
                region_composites.push((index, single.image));
            }

            regions.push(RegionOutcome {
                index,
                mapped,
                padded: Some(crop.padded),
                state: RegionState::Composited {
                    masks: placed.masks.len(),
                    painted,
                },
            });
        }

        // An image whose every box failed in the oracle has nothing to show.
        let oracle_failed_everywhere = !regions.is_empty()
            && regions.iter().all(|r| {
                matches!(
                    r.state,
                    RegionState::Skipped(MaskError::OracleFailure { .. })
                )
            });
        if oracle_failed_everywhere {
            let error = regions
                .iter()
                .find_map(|r| match &r.state {
                    RegionState::Skipped(MaskError::OracleFailure { index, source }) => {
                        Some(MaskError::OracleFailure {
                            index: *index,
                            source: source.clone(),
                        })
                    }
                    _ => None,
                })
                .unwrap_or_else(|| {
                    MaskError::Aborted("oracle failed for every region".to_string())
                });
            return Err(Failure { error, regions });
        }

        let composite = self.compositor.blend(image, &overlay);
        progress.advance(RunState::Blended, None);

        let output = ImageOutput {
            composite,
            regions,
            aux_crops,
            region_composites,
        };
        info!(
            image = %id,
            composited = output.composited_regions(),
            skipped = output.skipped_regions().count(),
            covered = output.composite.covered_pixels,
            "image done"
        );
        Ok(output)
    }
}

/// Image-level error plus the region outcomes reached before it.
#[derive(Debug)]
struct Failure {
    error: MaskError,
    regions: Vec<RegionOutcome>,
}

impl From<MaskError> for Failure {
    fn from(error: MaskError) -> Self {
        Self {
            error,
            regions: Vec::new(),
        }
    }
}

/// Tracks and logs the state machine of one run.
struct Progress<'a> {
    id: &'a ImageId,
    state: RunState,
}

impl<'a> Progress<'a> {
    fn new(id: &'a ImageId) -> Self {
        Self {
            id,
            state: RunState::Idle,
        }
    }

    fn advance(&mut self, next: RunState, region: Option<usize>) {
        debug!(image = %self.id, ?region, from = ?self.state, to = ?next, "run state");
        self.state = next;
    }

    fn fail(self, failure: Failure) -> ImageReport {
        warn!(
            image = %self.id,
            state = ?self.state,
            error = %failure.error,
            regions = failure.regions.len(),
            "image failed"
        );
        ImageReport {
            id: self.id.clone(),
            status: ImageStatus::Failed {
                error: failure.error,
                regions: failure.regions,
            },
            reached: self.state,
        }
    }

    fn succeed(mut self, output: ImageOutput) -> ImageReport {
        self.advance(RunState::Done, None);
        ImageReport {
            id: self.id.clone(),
            status: ImageStatus::Succeeded(output),
            reached: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use crate::geometry::BoundingBox;
    use crate::oracle::RegionMask;
    use crate::store::{JsonAnnotationStore, MemoryImageSource};
    use image::Rgb;

    struct FullMask;

    impl SegmentationOracle for FullMask {
        fn predict(&self, crop: &RgbImage) -> Result<Vec<RegionMask>, OracleError> {
            Ok(vec![RegionMask::full(
                crop.height() as usize,
                crop.width() as usize,
            )])
        }
    }

    /// Fails for crops wider than `max_width`.
    struct Picky {
        max_width: u32,
    }

    impl SegmentationOracle for Picky {
        fn predict(&self, crop: &RgbImage) -> Result<Vec<RegionMask>, OracleError> {
            if crop.width() > self.max_width {
                return Err(OracleError::ResourceExhausted("crop too large".into()));
            }
            Ok(vec![RegionMask::full(
                crop.height() as usize,
                crop.width() as usize,
            )])
        }
    }

    fn gray(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([100, 100, 100]))
    }

    #[tokio::test]
    async fn test_process_image_single_box() {
        let pipeline = MaskPipeline::with_default_config(Arc::new(FullMask));
        let set = AnnotationSet::new(vec![BoundingBox::new(10.0, 10.0, 20.0, 20.0)]);
        let output = pipeline
            .process_image(&ImageId::from("a.png"), &gray(100, 100), &set)
            .await
            .unwrap();

        assert_eq!(output.composited_regions(), 1);
        assert_eq!(output.composite.covered_pixels, 400);
        assert_eq!(output.aux_crops.len(), 1);
        assert_eq!(output.aux_crops[0].image.dimensions(), (512, 512));
        assert_eq!(output.regions[0].padded.map(|p| p.width), Some(24));
    }

    #[tokio::test]
    async fn test_region_failures_do_not_abort() {
        let pipeline = MaskPipeline::builder(Arc::new(Picky { max_width: 30 }))
            .aux_crop_size(None)
            .build()
            .unwrap();
        let set = AnnotationSet::new(vec![
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(0.0, 0.0, 50.0, 10.0),
            BoundingBox::new(200.0, 200.0, 10.0, 10.0),
            BoundingBox::new(60.0, 60.0, 10.0, 10.0),
        ]);
        let output = pipeline
            .process_image(&ImageId::from("b.png"), &gray(100, 100), &set)
            .await
            .unwrap();

        assert_eq!(output.regions.len(), 4);
        assert_eq!(output.composited_regions(), 2);
        let skipped: Vec<usize> = output.skipped_regions().map(|(i, _)| i).collect();
        assert_eq!(skipped, vec![1, 2]);
        assert!(matches!(
            output.regions[1].state,
            RegionState::Skipped(MaskError::OracleFailure { index: 1, .. })
        ));
        assert!(matches!(
            output.regions[2].state,
            RegionState::Skipped(MaskError::EmptyRegion { index: 2, .. })
        ));
        assert!(output.aux_crops.is_empty());
    }

    #[tokio::test]
    async fn test_oracle_failing_every_region_fails_image() {
        let pipeline = MaskPipeline::with_default_config(Arc::new(Picky { max_width: 0 }));
        let set = AnnotationSet::new(vec![
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(20.0, 20.0, 10.0, 10.0),
        ]);
        let err = pipeline
            .process_image(&ImageId::from("e.png"), &gray(40, 40), &set)
            .await
            .unwrap_err();
        assert!(matches!(err, MaskError::OracleFailure { index: 0, .. }));
    }

    #[tokio::test]
    async fn test_zero_size_box_is_skipped() {
        let pipeline = MaskPipeline::with_default_config(Arc::new(FullMask));
        let set = AnnotationSet::new(vec![
            BoundingBox::new(10.0, 10.0, 20.0, 20.0),
            BoundingBox::new(50.0, 50.0, 0.0, 10.0),
        ]);
        let output = pipeline
            .process_image(&ImageId::from("z.png"), &gray(100, 100), &set)
            .await
            .unwrap();

        assert_eq!(output.composited_regions(), 1);
        assert_eq!(output.composite.covered_pixels, 400);
        assert!(matches!(
            output.regions[1].state,
            RegionState::Skipped(MaskError::EmptyRegion { index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_image_keeps_region_outcomes() {
        let pipeline = MaskPipeline::with_default_config(Arc::new(Picky { max_width: 0 }));
        let images = MemoryImageSource::new().with_image("g.png", gray(40, 40));
        let store = JsonAnnotationStore::from_json_str(
            r#"{"annotations": {"g.png": {"boundingBoxes": [
                {"minX": 0, "minY": 0, "width": 10, "height": 10},
                {"minX": 20, "minY": 20, "width": 10, "height": 10}
            ]}}}"#,
        )
        .unwrap();

        let report = pipeline.run(&ImageId::from("g.png"), &images, &store).await;

        assert!(matches!(
            report.error(),
            Some(MaskError::OracleFailure { index: 0, .. })
        ));
        assert_eq!(report.reached, RunState::Segmenting);
        let regions = report.regions();
        assert_eq!(regions.len(), 2);
        assert!(matches!(
            regions[1].state,
            RegionState::Skipped(MaskError::OracleFailure { index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_no_boxes_returns_source() {
        let pipeline = MaskPipeline::with_default_config(Arc::new(FullMask));
        let image = gray(12, 12);
        let output = pipeline
            .process_image(&ImageId::from("f.png"), &image, &AnnotationSet::default())
            .await
            .unwrap();
        assert!(output.regions.is_empty());
        assert_eq!(output.composite.image, image);
    }

    #[tokio::test]
    async fn test_invalid_surface_fails_image() {
        let pipeline = MaskPipeline::with_default_config(Arc::new(FullMask));
        let set = AnnotationSet::new(vec![BoundingBox::new(1.0, 1.0, 2.0, 2.0)])
            .with_surface(crate::geometry::DisplaySurface::FixedWidth { width: 0.0 });
        let err = pipeline
            .process_image(&ImageId::from("c.png"), &gray(10, 10), &set)
            .await
            .unwrap_err();
        assert!(matches!(err, MaskError::InvalidTransform(_)));
    }

    #[tokio::test]
    async fn test_per_region_outputs() {
        let pipeline = MaskPipeline::builder(Arc::new(FullMask))
            .per_region_outputs(true)
            .build()
            .unwrap();
        let set = AnnotationSet::new(vec![
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(20.0, 20.0, 10.0, 10.0),
        ]);
        let output = pipeline
            .process_image(&ImageId::from("d.png"), &gray(40, 40), &set)
            .await
            .unwrap();

        assert_eq!(output.region_composites.len(), 2);
        let (_, first) = &output.region_composites[0];
        assert_eq!(first.get_pixel(5, 5), &Rgb([255, 255, 255]));
        assert_eq!(first.get_pixel(25, 25), &Rgb([100, 100, 100]));
    }
}
