//! End-to-end pipeline scenarios with in-memory decoder, detector and
//! scorer doubles.

use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::RgbImage;
use tempfile::TempDir;
use truthlens_media::{
    AnalyzerConfig, BoundingBox, DeepfakeAnalyzer, DetectError, DetectResult, FaceClassifier,
    FaceDetection, FaceDetector, FrameSampler, ProbabilitySource, ScoringMode, Upload,
    VideoDecoder, VideoHandle,
};
use truthlens_models::{ScoringModeLabel, Verdict};

const MAGIC: &[u8] = b"SYNTHVID";

/// Decodes files starting with `MAGIC`; anything else is unreadable.
struct SyntheticDecoder {
    frames: u64,
    fps: f64,
}

struct SyntheticHandle {
    fps: f64,
    total: u64,
    next: u64,
}

impl VideoHandle for SyntheticHandle {
    fn native_fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.total)
    }

    fn dimensions(&self) -> (u32, u32) {
        (160, 120)
    }

    fn next_frame(&mut self) -> DetectResult<Option<RgbImage>> {
        if self.next >= self.total {
            return Ok(None);
        }
        self.next += 1;
        Ok(Some(RgbImage::new(160, 120)))
    }
}

impl VideoDecoder for SyntheticDecoder {
    fn open(&self, source: &Path) -> DetectResult<Box<dyn VideoHandle>> {
        let bytes = std::fs::read(source)
            .map_err(|e| DetectError::unreadable(format!("{}: {e}", source.display())))?;
        if !bytes.starts_with(MAGIC) {
            return Err(DetectError::unreadable("Unrecognized container"));
        }
        Ok(Box::new(SyntheticHandle {
            fps: self.fps,
            total: self.frames,
            next: 0,
        }))
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}

/// Decoder that parks inside `open` until released, then reports the
/// source as unreadable.
struct GatedDecoder {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl VideoDecoder for GatedDecoder {
    fn open(&self, _source: &Path) -> DetectResult<Box<dyn VideoHandle>> {
        let _ = self.entered.lock().unwrap().send(());
        let _ = self
            .release
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(10));
        Err(DetectError::unreadable("released"))
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

struct OneFace;

impl FaceDetector for OneFace {
    fn detect(&self, _frame: &RgbImage) -> DetectResult<Vec<FaceDetection>> {
        Ok(vec![FaceDetection::new(
            BoundingBox::new(40.0, 30.0, 60.0, 60.0),
            0.97,
        )])
    }

    fn name(&self) -> &'static str {
        "one-face"
    }
}

struct NoFaces;

impl FaceDetector for NoFaces {
    fn detect(&self, _frame: &RgbImage) -> DetectResult<Vec<FaceDetection>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "no-faces"
    }
}

struct Constant(f64);

impl ProbabilitySource for Constant {
    fn draw(&self) -> f64 {
        self.0
    }
}

/// Classifier that fails on every crop.
struct Malformed;

impl FaceClassifier for Malformed {
    fn predict(&self, _face: &RgbImage) -> DetectResult<f64> {
        Err(DetectError::scoring_failed("malformed tensor"))
    }

    fn name(&self) -> &str {
        "malformed"
    }
}

struct Fixed(f64);

impl FaceClassifier for Fixed {
    fn predict(&self, _face: &RgbImage) -> DetectResult<f64> {
        Ok(self.0)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn config(work_dir: &Path) -> AnalyzerConfig {
    AnalyzerConfig {
        work_dir: work_dir.to_path_buf(),
        ..Default::default()
    }
}

fn write_video(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, MAGIC).unwrap();
    path
}

fn is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

#[test]
fn scenario_a_ten_seconds_at_30fps_yields_50_frames() {
    let dir = TempDir::new().unwrap();
    let video = write_video(dir.path(), "a.mp4");
    let decoder = Arc::new(SyntheticDecoder {
        frames: 300,
        fps: 30.0,
    });

    let sampler = FrameSampler::new(decoder.clone(), 5.0);
    let frames = sampler.extract(&video).unwrap();
    assert_eq!(frames.stride(), 6);
    let indices: Vec<u64> = frames.map(|f| f.unwrap().index).collect();
    assert_eq!(indices.len(), 50);
    assert_eq!(indices[1], 6);
    assert_eq!(indices[49], 294);

    let analyzer = DeepfakeAnalyzer::from_config(
        &config(dir.path()),
        decoder,
        Arc::new(OneFace),
        ScoringMode::Placeholder,
    )
    .unwrap();
    let result = analyzer.analyze(&video).unwrap();
    assert_eq!(result.total_frames, 50);
    assert_eq!(result.frames_analyzed, 50);
    assert!(result.is_consistent());
}

#[test]
fn scenario_b_no_faces() {
    let dir = TempDir::new().unwrap();
    let video = write_video(dir.path(), "b.mp4");
    let analyzer = DeepfakeAnalyzer::from_config(
        &config(dir.path()),
        Arc::new(SyntheticDecoder {
            frames: 100,
            fps: 25.0,
        }),
        Arc::new(NoFaces),
        ScoringMode::Placeholder,
    )
    .unwrap();

    let result = analyzer.analyze(&video).unwrap();
    assert_eq!(result.verdict, Verdict::NoFaces);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.fake_probability, 0.0);
    assert_eq!(result.frames_analyzed, 0);
    assert_eq!(result.total_frames, 20);
}

#[tokio::test]
async fn scenario_c_unreadable_upload_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let work_dir = dir.path().join("work");
    let analyzer = Arc::new(
        DeepfakeAnalyzer::from_config(
            &config(&work_dir),
            Arc::new(SyntheticDecoder {
                frames: 10,
                fps: 30.0,
            }),
            Arc::new(OneFace),
            ScoringMode::Placeholder,
        )
        .unwrap(),
    );

    let err = analyzer
        .analyze_upload(Upload::new("corrupt.mp4", b"\x00\x01garbage".to_vec()))
        .await
        .unwrap_err();

    assert!(matches!(err, DetectError::UnreadableSource(_)));
    assert!(is_empty(&work_dir));
}

#[tokio::test]
async fn scenario_d_placeholder_constant_scores_are_fake() {
    let dir = TempDir::new().unwrap();
    let analyzer = Arc::new(
        DeepfakeAnalyzer::from_config(
            &config(dir.path()),
            // 20 frames at 10 fps, target 5 -> 10 sampled frames
            Arc::new(SyntheticDecoder {
                frames: 20,
                fps: 10.0,
            }),
            Arc::new(OneFace),
            ScoringMode::Placeholder,
        )
        .unwrap()
        .with_placeholder_source(Arc::new(Constant(0.9))),
    );

    let report = analyzer
        .analyze_upload(Upload::new("d.mp4", MAGIC.to_vec()))
        .await
        .unwrap();

    let result = report.result;
    assert_eq!(result.verdict, Verdict::Fake);
    assert!((result.confidence - 0.9).abs() < 1e-9);
    assert_eq!(result.confidence, result.fake_probability);
    assert_eq!(result.frames_analyzed, 10);
    assert_eq!(result.scoring_mode, ScoringModeLabel::Placeholder);
    assert_eq!(result.placeholder_scores, 10);
    assert_eq!(report.record.model_used, ScoringModeLabel::Placeholder);
    assert!(is_empty(dir.path()));
}

#[test]
fn model_scores_are_labeled_model() {
    let dir = TempDir::new().unwrap();
    let video = write_video(dir.path(), "m.mp4");
    let analyzer = DeepfakeAnalyzer::from_config(
        &config(dir.path()),
        Arc::new(SyntheticDecoder {
            frames: 10,
            fps: 5.0,
        }),
        Arc::new(OneFace),
        ScoringMode::Model(Arc::new(Fixed(0.05))),
    )
    .unwrap();

    let result = analyzer.analyze(&video).unwrap();
    assert_eq!(result.verdict, Verdict::Authentic);
    assert_eq!(result.scoring_mode, ScoringModeLabel::Model);
    assert_eq!(result.placeholder_scores, 0);
    assert_eq!(analyzer.model_info().classifier.as_deref(), Some("fixed"));
}

#[test]
fn scoring_failures_fall_back_and_relabel() {
    let dir = TempDir::new().unwrap();
    let video = write_video(dir.path(), "f.mp4");
    let analyzer = DeepfakeAnalyzer::from_config(
        &config(dir.path()),
        Arc::new(SyntheticDecoder {
            frames: 10,
            fps: 5.0,
        }),
        Arc::new(OneFace),
        ScoringMode::Model(Arc::new(Malformed)),
    )
    .unwrap()
    .with_placeholder_source(Arc::new(Constant(0.5)));

    let result = analyzer.analyze(&video).unwrap();
    assert_eq!(result.frames_analyzed, 10);
    assert_eq!(result.verdict, Verdict::Suspicious);
    assert_eq!(result.confidence, 0.5);
    assert_eq!(result.scoring_mode, ScoringModeLabel::Placeholder);
    assert_eq!(result.placeholder_scores, 10);
}

#[tokio::test]
async fn dropped_upload_future_still_removes_temp_file() {
    let dir = TempDir::new().unwrap();
    let work_dir = dir.path().join("work");
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let analyzer = Arc::new(
        DeepfakeAnalyzer::from_config(
            &config(&work_dir),
            Arc::new(GatedDecoder {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            }),
            Arc::new(OneFace),
            ScoringMode::Placeholder,
        )
        .unwrap(),
    );

    // The caller gives up while the pipeline is still decoding.
    let outcome = tokio::time::timeout(
        Duration::from_millis(100),
        analyzer.analyze_upload(Upload::new("slow.mp4", MAGIC.to_vec())),
    )
    .await;
    assert!(outcome.is_err());

    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(!is_empty(&work_dir));

    release_tx.send(()).unwrap();
    for _ in 0..100 {
        if is_empty(&work_dir) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(is_empty(&work_dir));
}
