//! Whole-session scenarios against an in-process segmentation service.

use async_trait::async_trait;
use backdrop_core::compare::{HorizontalBounds, PointerSource, SliderInput};
use backdrop_core::error::{DECODE_FAILURE_NOTICE, SERVICE_FAILURE_NOTICE};
use backdrop_core::pipeline::{self, PipelineRunner};
use backdrop_core::{
    AppError, Backdrop, BackgroundSpec, Config, ImageAsset, PipelineEvent, PipelineEventKind,
    PipelineState, Result, Rgb, SegmentationService, Session,
};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage, codecs::png::PngEncoder};
use std::sync::Arc;

const SUBJECT: Rgba<u8> = Rgba([10, 20, 30, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

fn encode(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
        .unwrap();
    bytes
}

/// 4x4 cut-out: opaque subject on the left half, transparent on the right.
fn cutout() -> RgbaImage {
    RgbaImage::from_fn(4, 4, |x, _| if x < 2 { SUBJECT } else { CLEAR })
}

fn photo() -> ImageAsset {
    ImageAsset::from_bytes("cat.png", encode(&RgbaImage::from_pixel(4, 4, Rgba([90, 90, 90, 255]))))
}

/// Always answers with the same body.
struct FixedCutout(Vec<u8>);

#[async_trait]
impl SegmentationService for FixedCutout {
    async fn process_image(&self, _raw: &ImageAsset) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }
}

/// Behaves like a backend that is not running.
struct Offline;

#[async_trait]
impl SegmentationService for Offline {
    async fn process_image(&self, _raw: &ImageAsset) -> Result<Vec<u8>> {
        Err(AppError::network("connection refused"))
    }
}

async fn upload(session: &mut Session, service: &dyn SegmentationService, raw: ImageAsset) {
    let ticket = session.upload(raw.clone());
    assert!(session.is_loading());

    let mut events = Vec::new();
    pipeline::drive(service, ticket, raw, |event| events.push(event)).await;
    for event in events {
        session.apply(event);
    }
}

fn decode_export(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).unwrap().into_rgba8()
}

#[tokio::test]
async fn transparent_export_keeps_cutout() {
    let mut session = Session::new();
    upload(&mut session, &FixedCutout(encode(&cutout())), photo()).await;

    assert!(matches!(session.pipeline_state(), PipelineState::Ready(_)));
    assert!(!session.is_loading());
    assert!(session.notice().is_none());

    let export = session.export().await.unwrap();
    assert_eq!(export.file_name(), "final-image.png");
    assert_eq!((export.width, export.height), (4, 4));

    let result = decode_export(&export.bytes);
    assert_eq!(result.dimensions(), (4, 4));
    for (x, _, pixel) in result.enumerate_pixels() {
        if x < 2 {
            assert_eq!(*pixel, SUBJECT);
        } else {
            assert_eq!(pixel[3], 0);
        }
    }
}

#[tokio::test]
async fn solid_colour_fills_only_transparent_pixels() {
    let mut session = Session::new();
    upload(&mut session, &FixedCutout(encode(&cutout())), photo()).await;
    session.select_color("#ff0000".parse::<Rgb>().unwrap());

    let result = decode_export(&session.export().await.unwrap().bytes);
    for (x, _, pixel) in result.enumerate_pixels() {
        let expected = if x < 2 { SUBJECT } else { Rgba([255, 0, 0, 255]) };
        assert_eq!(*pixel, expected);
    }
}

#[tokio::test]
async fn background_image_is_stretched_under_cutout() {
    let mut session = Session::new();
    upload(&mut session, &FixedCutout(encode(&cutout())), photo()).await;

    let meadow = RgbaImage::from_pixel(2, 2, Rgba([0, 200, 0, 255]));
    session.select_background_image(ImageAsset::from_bytes("meadow.png", encode(&meadow)));

    let result = decode_export(&session.export().await.unwrap().bytes);
    assert_eq!(result.dimensions(), (4, 4));
    assert_eq!(*result.get_pixel(0, 0), SUBJECT);
    assert_eq!(*result.get_pixel(3, 3), Rgba([0, 200, 0, 255]));
}

#[tokio::test]
async fn export_is_deterministic() {
    let mut body = cutout();
    body.put_pixel(1, 1, Rgba([0, 0, 255, 128]));

    let mut session = Session::new();
    upload(&mut session, &FixedCutout(encode(&body)), photo()).await;
    session.select_color(Rgb::YELLOW);

    let first = session.export().await.unwrap();
    let second = session.export().await.unwrap();
    assert_eq!(first.bytes, second.bytes);
}

#[tokio::test]
async fn network_failure_raises_notice_and_blocks_export() {
    let mut session = Session::new();
    upload(&mut session, &Offline, photo()).await;

    assert!(matches!(session.pipeline_state(), PipelineState::Failed(_)));
    assert!(!session.is_loading());
    assert!(session.processed().is_none());
    assert_eq!(session.notice().unwrap().message, SERVICE_FAILURE_NOTICE);
    assert!(matches!(session.export().await, Err(AppError::NotReady)));

    session.dismiss_notice();
    assert!(session.notice().is_none());
}

#[tokio::test]
async fn truncated_cutout_never_becomes_ready() {
    let noisy = RgbaImage::from_fn(64, 64, |x, y| Rgba([(x * 5) as u8, (y * 3) as u8, 77, 255]));
    let mut body = encode(&noisy);
    body.truncate(body.len() / 2);

    let mut session = Session::new();
    upload(&mut session, &FixedCutout(body), photo()).await;

    assert!(matches!(session.pipeline_state(), PipelineState::Failed(_)));
    assert!(session.processed().is_none());
    assert_eq!(session.notice().unwrap().message, DECODE_FAILURE_NOTICE);
    assert!(matches!(session.export().await, Err(AppError::NotReady)));
}

#[tokio::test]
async fn late_result_of_superseded_upload_is_ignored() {
    let first_body = encode(&RgbaImage::from_pixel(2, 2, SUBJECT));
    let second_body = encode(&cutout());

    let mut session = Session::new();
    let first = session.upload(photo());
    let second = session.upload(photo());

    let mut first_events = Vec::new();
    pipeline::drive(&FixedCutout(first_body), first, photo(), |e| first_events.push(e)).await;
    let mut second_events = Vec::new();
    pipeline::drive(&FixedCutout(second_body), second, photo(), |e| second_events.push(e)).await;

    // The newer submission finishes first.
    for event in second_events {
        assert!(session.apply(event));
    }
    for event in first_events {
        assert!(!session.apply(event));
    }

    let (width, height) = session.processed().unwrap().dimensions().unwrap();
    assert_eq!((width, height), (4, 4));
}

#[test]
fn runner_delivers_events_from_worker_thread() {
    let runner = PipelineRunner::new(Arc::new(FixedCutout(encode(&cutout()))));
    let mut session = Session::new();
    let raw = photo();
    let ticket = session.upload(raw.clone());
    runner.submit(ticket, raw);

    let dispatched = runner.recv().unwrap();
    assert!(matches!(dispatched.kind, PipelineEventKind::Dispatched));
    session.apply(dispatched);
    assert!(matches!(session.pipeline_state(), PipelineState::AwaitingResult));

    let completed = runner.recv().unwrap();
    assert!(session.apply(completed));
    assert!(session.processed().is_some());
}

#[tokio::test]
async fn slider_at_zero_hides_before_pane() {
    let mut session = Session::new();
    upload(&mut session, &FixedCutout(encode(&cutout())), photo()).await;

    let bounds = HorizontalBounds::new(100.0, 400.0);
    let slider = session.slider_mut();
    assert_eq!(slider.position(), 50.0);
    assert_eq!(slider.layout().before_scale_percent, Some(200.0));

    slider.handle(SliderInput::Press, bounds);
    slider.handle(SliderInput::Move(PointerSource::Mouse { x: 20.0 }), bounds);
    slider.handle(SliderInput::Release, bounds);

    let layout = session.slider().layout();
    assert_eq!(session.slider().position(), 0.0);
    assert_eq!(layout.clip_width_percent, 0.0);
    assert!(!layout.shows_before());
    assert_eq!(layout.before_scale_percent, None);
}

#[tokio::test]
async fn start_over_returns_to_empty_session() {
    let mut session = Session::new();
    upload(&mut session, &FixedCutout(encode(&cutout())), photo()).await;
    session.select_color(Rgb::BLUE);
    session.slider_mut().set_position(80.0);

    session.start_over();

    assert!(session.original().is_none());
    assert!(session.processed().is_none());
    assert!(matches!(session.pipeline_state(), PipelineState::Idle));
    assert!(session.background().is_transparent());
    assert_eq!(session.slider().position(), 50.0);
    assert_eq!(session.live_assets().count(), 0);
}

#[tokio::test]
async fn headless_processing_writes_coloured_export() {
    let config = Config::builder().build().unwrap();
    let app = Backdrop::with_service(config, Arc::new(FixedCutout(encode(&cutout()))));

    let export = app
        .process(photo(), BackgroundSpec::SolidColor(Rgb::WHITE))
        .await
        .unwrap();
    let result = decode_export(&export.bytes);
    assert_eq!(*result.get_pixel(3, 0), Rgba([255, 255, 255, 255]));
    assert_eq!(*result.get_pixel(0, 0), SUBJECT);
}

#[tokio::test]
async fn headless_processing_reports_service_error() {
    let config = Config::builder().build().unwrap();
    let app = Backdrop::with_service(config, Arc::new(Offline));

    let err = app
        .process(photo(), BackgroundSpec::Transparent)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Network(_)));
    assert_eq!(err.user_message(), SERVICE_FAILURE_NOTICE);
}

#[test]
fn result_after_start_over_is_stale() {
    let mut session = Session::new();
    let ticket = session.upload(photo());
    session.start_over();

    let applied = session.apply(PipelineEvent {
        ticket,
        kind: PipelineEventKind::Completed(Err(AppError::network("late"))),
    });
    assert!(!applied);
    assert!(session.notice().is_none());
    assert!(matches!(session.pipeline_state(), PipelineState::Idle));
}
