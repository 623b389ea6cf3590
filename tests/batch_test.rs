use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use boxmask_rs::{
    AnnotationStore, CancelToken, DirImageSource, DirOutputSink, ImageId, ImageStatus,
    JsonAnnotationStore, MaskError, MaskPipeline, MemoryImageSource, MemoryOutputSink,
    OracleError, OracleLimits, RegionMask, SegmentationOracle,
};
use image::{Rgb, RgbImage};

/// Fails on crops whose first pixel is pure red.
struct RedIsTooBig;

impl SegmentationOracle for RedIsTooBig {
    fn predict(&self, crop: &RgbImage) -> Result<Vec<RegionMask>, OracleError> {
        if crop.get_pixel(0, 0) == &Rgb([255, 0, 0]) {
            return Err(OracleError::ResourceExhausted("out of memory".into()));
        }
        Ok(vec![RegionMask::full(
            crop.height() as usize,
            crop.width() as usize,
        )])
    }
}

/// Records the highest number of simultaneous predictions.
#[derive(Default)]
struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl SegmentationOracle for Gauge {
    fn predict(&self, crop: &RgbImage) -> Result<Vec<RegionMask>, OracleError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![RegionMask::full(
            crop.height() as usize,
            crop.width() as usize,
        )])
    }
}

const THREE_IMAGES: &str = r#"{"annotations": {
    "/static/1.png": {"boundingBoxes": [{"minX": 4, "minY": 4, "width": 8, "height": 8}]},
    "/static/2.png": {"boundingBoxes": [{"minX": 4, "minY": 4, "width": 8, "height": 8}]},
    "/static/3.png": {"boundingBoxes": [{"minX": 4, "minY": 4, "width": 8, "height": 8}]}
}}"#;

fn three_images() -> MemoryImageSource {
    MemoryImageSource::new()
        .with_image("1.png", RgbImage::from_pixel(20, 20, Rgb([0, 0, 255])))
        .with_image("2.png", RgbImage::from_pixel(20, 20, Rgb([255, 0, 0])))
        .with_image("3.png", RgbImage::from_pixel(20, 20, Rgb([0, 255, 0])))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_one_failing_image_does_not_sink_batch() {
    let store = JsonAnnotationStore::from_json_str(THREE_IMAGES).unwrap();
    let pipeline = MaskPipeline::with_default_config(Arc::new(RedIsTooBig));

    let report = pipeline
        .run_store(Arc::new(three_images()), Arc::new(store), &CancelToken::new())
        .await;

    let ids: Vec<&str> = report.images.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1.png", "2.png", "3.png"]);
    assert_eq!(report.succeeded().count(), 2);

    let failed = report.get(&ImageId::from("2.png")).unwrap();
    assert!(matches!(
        failed.error(),
        Some(MaskError::OracleFailure {
            index: 0,
            source: OracleError::ResourceExhausted(_)
        })
    ));
    assert!(report.get(&ImageId::from("1.png")).unwrap().is_success());
    assert!(report.get(&ImageId::from("3.png")).unwrap().is_success());
}

#[tokio::test]
async fn test_cancelled_batch_reports_every_image() {
    let store = JsonAnnotationStore::from_json_str(THREE_IMAGES).unwrap();
    let pipeline = MaskPipeline::with_default_config(Arc::new(RedIsTooBig));
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = pipeline
        .run_store(Arc::new(three_images()), Arc::new(store), &cancel)
        .await;

    assert_eq!(report.images.len(), 3);
    assert_eq!(report.cancelled().count(), 3);
    assert!(report.images.iter().all(|r| r.output().is_none()));
}

#[tokio::test]
async fn test_missing_record_fails_only_that_image() {
    let store = JsonAnnotationStore::from_json_str(
        r#"{"annotations": {
            "1.png": {"boundingBoxes": [{"minX": 1, "minY": 1, "width": 5, "height": 5}]},
            "2.png": {"boundingBoxes": "nope"}
        }}"#,
    )
    .unwrap();
    let pipeline = MaskPipeline::with_default_config(Arc::new(RedIsTooBig));
    let ids = vec![
        ImageId::from("1.png"),
        ImageId::from("2.png"),
        ImageId::from("9.png"),
    ];

    let report = pipeline
        .run_batch(
            ids,
            Arc::new(three_images()),
            Arc::new(store),
            &CancelToken::new(),
        )
        .await;

    assert!(report.images[0].is_success());
    assert!(matches!(
        report.images[1].error(),
        Some(MaskError::MalformedAnnotations(_))
    ));
    assert!(matches!(
        report.images[2].error(),
        Some(MaskError::ImageUnreadable { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_oracle_concurrency_is_bounded() {
    let gauge = Arc::new(Gauge::default());
    let pipeline = MaskPipeline::builder(gauge.clone())
        .oracle_limits(OracleLimits {
            max_concurrent: 2,
            timeout_ms: 10_000,
            ..OracleLimits::default()
        })
        .max_parallel_images(6)
        .aux_crop_size(None)
        .build()
        .unwrap();

    let mut images = MemoryImageSource::new();
    let mut records = Vec::new();
    for i in 0..6 {
        let name = format!("{i}.png");
        images.insert(name.as_str(), RgbImage::from_pixel(30, 30, Rgb([9, 9, 9])));
        records.push(format!(
            r#""{name}": {{"boundingBoxes": [
                {{"minX": 1, "minY": 1, "width": 8, "height": 8}},
                {{"minX": 15, "minY": 15, "width": 8, "height": 8}}
            ]}}"#
        ));
    }
    let doc = format!(r#"{{"annotations": {{{}}}}}"#, records.join(","));
    let store = JsonAnnotationStore::from_json_str(&doc).unwrap();

    let report = pipeline
        .run_store(Arc::new(images), Arc::new(store), &CancelToken::new())
        .await;

    assert_eq!(report.succeeded().count(), 6);
    assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(pipeline.oracle().available_slots(), 2);
}

/// Healthy but slow: every call takes the same fixed time.
struct Slow(Duration);

impl SegmentationOracle for Slow {
    fn predict(&self, crop: &RgbImage) -> Result<Vec<RegionMask>, OracleError> {
        std::thread::sleep(self.0);
        Ok(vec![RegionMask::full(
            crop.height() as usize,
            crop.width() as usize,
        )])
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_busy_oracle_does_not_time_out_queued_images() {
    let pipeline = MaskPipeline::builder(Arc::new(Slow(Duration::from_millis(100))))
        .oracle_limits(OracleLimits {
            max_concurrent: 1,
            timeout_ms: 250,
            ..OracleLimits::default()
        })
        .max_parallel_images(4)
        .aux_crop_size(None)
        .build()
        .unwrap();

    let mut images = MemoryImageSource::new();
    let mut records = Vec::new();
    for i in 0..4 {
        let name = format!("{i}.png");
        images.insert(name.as_str(), RgbImage::from_pixel(20, 20, Rgb([40, 40, 40])));
        records.push(format!(
            r#""{name}": {{"boundingBoxes": [{{"minX": 2, "minY": 2, "width": 8, "height": 8}}]}}"#
        ));
    }
    let doc = format!(r#"{{"annotations": {{{}}}}}"#, records.join(","));
    let store = JsonAnnotationStore::from_json_str(&doc).unwrap();

    let report = pipeline
        .run_store(Arc::new(images), Arc::new(store), &CancelToken::new())
        .await;

    for image in &report.images {
        assert!(image.is_success(), "{} failed: {:?}", image.id, image.error());
    }
}

#[tokio::test]
async fn test_outputs_use_deterministic_names() {
    let store = JsonAnnotationStore::from_json_str(THREE_IMAGES).unwrap();
    let pipeline = MaskPipeline::with_default_config(Arc::new(RedIsTooBig));
    let sink = MemoryOutputSink::new();

    let report = pipeline
        .run_store(Arc::new(three_images()), Arc::new(store), &CancelToken::new())
        .await;
    let written = report.write_outputs(&sink).unwrap();

    assert_eq!(written, 4);
    assert_eq!(
        sink.names(),
        vec![
            "cropped_0_1.png",
            "cropped_0_3.png",
            "masked_1.png",
            "masked_3.png"
        ]
    );
    let masked = sink.get("masked_1.png").unwrap();
    assert_eq!(masked.get_pixel(5, 5), &Rgb([255, 255, 255]));
    assert_eq!(masked.get_pixel(0, 0), &Rgb([0, 0, 255]));
}

#[tokio::test]
async fn test_directory_round_trip() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    RgbImage::from_pixel(40, 30, Rgb([10, 20, 30]))
        .save(input.path().join("a.png"))
        .unwrap();
    std::fs::write(input.path().join("broken.png"), b"not a png").unwrap();
    let annotations = input.path().join("annotations.json");
    std::fs::write(
        &annotations,
        r#"{"annotations": {
            "/static/a.png": {"boundingBoxes": [{"minX": 5, "minY": 5, "width": 10, "height": 10}]},
            "/static/broken.png": {"boundingBoxes": [{"minX": 5, "minY": 5, "width": 10, "height": 10}]}
        }}"#,
    )
    .unwrap();

    let store = JsonAnnotationStore::from_file(&annotations).unwrap();
    assert_eq!(store.image_ids().len(), 2);
    let pipeline = MaskPipeline::with_default_config(Arc::new(RedIsTooBig));
    let report = pipeline
        .run_store(
            Arc::new(DirImageSource::new(input.path())),
            Arc::new(store),
            &CancelToken::new(),
        )
        .await;

    let broken = report.get(&ImageId::from("broken.png")).unwrap();
    assert!(matches!(
        broken.status,
        ImageStatus::Failed {
            error: MaskError::ImageUnreadable { .. },
            ..
        }
    ));

    let sink = DirOutputSink::create(output.path().join("out")).unwrap();
    assert_eq!(report.write_outputs(&sink).unwrap(), 2);

    let masked = image::open(output.path().join("out/masked_a.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(masked.dimensions(), (40, 30));
    assert_eq!(masked.get_pixel(10, 10), &Rgb([255, 255, 255]));
    assert_eq!(masked.get_pixel(30, 20), &Rgb([10, 20, 30]));

    let crop = image::open(output.path().join("out/cropped_0_a.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(crop.dimensions(), (512, 512));
}
