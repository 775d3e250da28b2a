//! End-to-end batches through the public API with real files and the
//! `image`-crate backend.

use image::{ImageFormat, RgbImage};
use pixbatch::config::{self, PipelineConfig};
use pixbatch::process::{Orchestrator, ProcessEvent};
use pixbatch::source::{FileSource, ImageSource};
use pixbatch::types::JobStatus;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn write_image(dir: &Path, name: &str, width: u32, height: u32, format: ImageFormat) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
    .save_with_format(&path, format)
    .unwrap();
    path
}

fn file_sources(paths: &[PathBuf]) -> Vec<Arc<dyn ImageSource>> {
    paths
        .iter()
        .map(|p| Arc::new(FileSource::new(p)) as Arc<dyn ImageSource>)
        .collect()
}

fn small_config(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.storage.root = Some(root.to_path_buf());
    config.targets.medium = 96;
    config.targets.thumbnail = 24;
    config
}

fn dimensions(path: &Path) -> (u32, u32) {
    let img = image::open(path).unwrap();
    (img.width(), img.height())
}

#[test]
fn mixed_formats_produce_bounded_jpegs() {
    let tmp = TempDir::new().unwrap();
    let inputs = [
        write_image(tmp.path(), "wide.png", 300, 150, ImageFormat::Png),
        write_image(tmp.path(), "tall.jpg", 120, 240, ImageFormat::Jpeg),
        write_image(tmp.path(), "tiny.tiff", 20, 10, ImageFormat::Tiff),
    ];
    let out = tmp.path().join("out");
    let orchestrator = Orchestrator::new(small_config(&out)).unwrap();

    let report = orchestrator.process_batch(file_sources(&inputs));

    assert_eq!(report.succeeded(), 3, "{report:#?}");
    let expected = [((96, 48), (24, 12)), ((48, 96), (12, 24)), ((20, 10), (20, 10))];
    for (job, (medium, thumb)) in report.jobs.iter().zip(expected) {
        let JobStatus::Success(result) = &job.status else {
            panic!("{job:?}");
        };
        assert_eq!(dimensions(&result.medium), medium, "{}", job.label);
        assert_eq!(dimensions(&result.thumbnail), thumb, "{}", job.label);
        assert_eq!(
            image::guess_format(&fs::read(&result.thumbnail).unwrap()).unwrap(),
            ImageFormat::Jpeg
        );
    }
}

#[test]
fn original_is_copied_verbatim_even_when_not_jpeg() {
    let tmp = TempDir::new().unwrap();
    let input = write_image(tmp.path(), "source.png", 40, 40, ImageFormat::Png);
    let orchestrator = Orchestrator::new(small_config(&tmp.path().join("out"))).unwrap();

    let report = orchestrator.process_batch(file_sources(std::slice::from_ref(&input)));

    let JobStatus::Success(result) = &report.jobs[0].status else {
        panic!("{:?}", report.jobs[0]);
    };
    assert_eq!(fs::read(&result.original).unwrap(), fs::read(&input).unwrap());
}

#[test]
fn one_bad_file_does_not_stop_the_batch() {
    let tmp = TempDir::new().unwrap();
    let text = tmp.path().join("notes.jpg");
    fs::write(&text, "not-an-image").unwrap();
    let inputs = vec![
        write_image(tmp.path(), "a.png", 50, 50, ImageFormat::Png),
        write_image(tmp.path(), "b.png", 50, 50, ImageFormat::Png),
        text,
        tmp.path().join("missing.png"),
        write_image(tmp.path(), "e.png", 50, 50, ImageFormat::Png),
    ];
    let out = tmp.path().join("out");
    let orchestrator = Orchestrator::new(small_config(&out)).unwrap();

    let report = orchestrator.process_batch(file_sources(&inputs));

    let messages: Vec<Option<&str>> = report
        .jobs
        .iter()
        .map(|j| match &j.status {
            JobStatus::Failure(m) => Some(m.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        messages,
        vec![
            None,
            None,
            Some("Failed to decode the input image."),
            Some("Failed to decode the input image."),
            None,
        ]
    );
    assert_eq!(fs::read_dir(&out).unwrap().count(), 3);
}

#[test]
fn config_file_drives_the_pipeline() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("processed");
    fs::write(
        tmp.path().join(config::CONFIG_FILE),
        format!(
            r#"
[limits]
concurrency = 1
max_batch = 2

[targets]
medium = 32
thumbnail = 8

[storage]
root = "{}"
"#,
            out.display()
        ),
    )
    .unwrap();
    let config = config::load_config(tmp.path()).unwrap();
    let orchestrator = Orchestrator::new(config).unwrap();
    assert_eq!(orchestrator.limiter().limit(), 1);

    let inputs: Vec<PathBuf> = (0..3)
        .map(|i| write_image(tmp.path(), &format!("{i}.png"), 64, 64, ImageFormat::Png))
        .collect();
    let events = orchestrator.subscribe();
    let report = orchestrator.process_batch(file_sources(&inputs));

    assert_eq!(report.jobs.len(), 2);
    for job in &report.jobs {
        let JobStatus::Success(result) = &job.status else {
            panic!("{job:?}");
        };
        assert!(result.medium.starts_with(&out));
        assert_eq!(dimensions(&result.thumbnail), (8, 8));
    }
    assert!(events.try_iter().any(|e| matches!(
        e,
        ProcessEvent::BatchFinished {
            succeeded: 2,
            failed: 0,
            ..
        }
    )));
}

#[test]
fn report_serializes_to_json() {
    let tmp = TempDir::new().unwrap();
    let input = write_image(tmp.path(), "a.png", 16, 16, ImageFormat::Png);
    let orchestrator = Orchestrator::new(small_config(&tmp.path().join("out"))).unwrap();

    orchestrator.select(file_sources(&[input]));
    let report = orchestrator.start().unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["generation"], 1);
    assert_eq!(json["cancelled"], false);
    assert_eq!(json["jobs"][0]["label"], "a.png");
    assert_eq!(json["jobs"][0]["status"]["state"], "success");
    assert!(
        json["jobs"][0]["status"]["detail"]["thumbnail"]
            .as_str()
            .unwrap()
            .ends_with("thumb.jpg")
    );
}
