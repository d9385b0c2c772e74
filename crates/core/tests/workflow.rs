//! End-to-end runs of the controller against a scripted image model.

use ai_styler_core::download;
use ai_styler_core::model::{ModelCandidate, ModelRequest, ModelResponse};
use ai_styler_core::prompt::{Portrait, Sticker, StickerBackground, StickerStyle, WatercolorVariant};
use ai_styler_core::{
    AppError, Controller, EncodedImage, GenerationPolicy, ImageModel, ImageProcessor,
    Orchestrator, Phase, Result,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;

/// Answers from a queue and keeps every prompt it was sent.
struct RecordingModel {
    replies: Mutex<VecDeque<Result<ModelResponse>>>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingModel {
    fn new(replies: Vec<Result<ModelResponse>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageModel for RecordingModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AppError::transport("no reply queued")))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn png_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, image::Rgb([0, 120, 255])));
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png).unwrap();
    buffer
}

fn generated() -> Result<ModelResponse> {
    let image = ImageProcessor::encode_bytes(&png_bytes()).unwrap();
    Ok(ModelResponse::with_image(image))
}

fn refused(reason: &str) -> Result<ModelResponse> {
    Ok(ModelResponse {
        candidates: vec![ModelCandidate {
            finish_reason: Some(reason.to_string()),
            ..Default::default()
        }],
        block_reason: None,
    })
}

#[tokio::test]
async fn sticker_generation_end_to_end() {
    let orchestrator = Orchestrator::new(RecordingModel::new(vec![
        generated(),
        refused("IMAGE_SAFETY"),
        generated(),
        generated(),
    ]));

    let mut controller = Controller::<Sticker>::new();
    assert!(controller.drop_bytes(&png_bytes()));
    controller.set_watercolor(WatercolorVariant::Vibrant);
    controller.set_background(StickerBackground::Transparent);
    controller.set_outline(4.0);
    assert_eq!(controller.style(), Some(StickerStyle::Watercolor));

    let ticket = controller.start_generation().unwrap();
    assert_eq!(controller.phase(), Phase::Generating);
    let outcome = orchestrator.run(&ticket).await;
    assert!(controller.complete(ticket.id, outcome));

    assert_eq!(controller.phase(), Phase::Ready);
    assert_eq!(controller.result().len(), 3);
    assert!(controller.error().is_none());
    assert!(!controller.can_generate());

    let prompts = orchestrator.model().prompts();
    assert_eq!(prompts.len(), 4);
    assert!(prompts.iter().all(|p| p == &prompts[0]));
    assert!(prompts[0].contains("### **Watercolor Variant**"));
    assert!(prompts[0].contains("### **Sticker Outline**"));

    assert!(controller.select_candidate(2));
    let dir = tempfile::tempdir().unwrap();
    let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let path = download::save_selected(controller.result(), dir.path(), now).unwrap();
    assert!(path.ends_with("generated-image-2025-01-02-03-04-05.png"));
}

#[tokio::test]
async fn upload_during_generation_discards_late_result() {
    let orchestrator = Orchestrator::new(RecordingModel::new(vec![generated()]))
        .with_policy(GenerationPolicy::fan_out(1));

    let mut controller = Controller::<Portrait>::new();
    controller.upload(ImageProcessor::encode_bytes(&png_bytes()).unwrap());
    let ticket = controller.start_generation().unwrap();

    let replacement = EncodedImage::new("bmV3", "image/png");
    controller.upload(replacement.clone());

    let outcome = orchestrator.run(&ticket).await;
    assert!(!controller.complete(ticket.id, outcome));
    assert!(controller.result().is_empty());
    assert!(controller.is_dirty());
    assert_eq!(controller.source(), Some(&replacement));
    assert!(controller.can_generate());
}

#[tokio::test]
async fn failure_keeps_source_and_allows_retry() {
    let orchestrator = Orchestrator::new(RecordingModel::new(vec![refused("SAFETY"), generated()]))
        .with_policy(GenerationPolicy::fan_out(1));

    let mut controller = Controller::<Portrait>::new();
    controller.upload(ImageProcessor::encode_bytes(&png_bytes()).unwrap());

    let ticket = controller.start_generation().unwrap();
    let outcome = orchestrator.run(&ticket).await;
    controller.complete(ticket.id, outcome);

    assert_eq!(
        controller.error(),
        Some("Generation failed: The model declined the request: SAFETY")
    );
    assert!(controller.source().is_some());
    assert!(controller.result().is_empty());

    let ticket = controller.start_generation().unwrap();
    let outcome = orchestrator.run(&ticket).await;
    assert!(controller.complete(ticket.id, outcome));
    assert_eq!(controller.result().len(), 1);
    assert!(controller.error().is_none());
}

#[tokio::test]
async fn auto_regenerate_hands_out_tickets() {
    let orchestrator = Orchestrator::new(RecordingModel::new(vec![generated(), generated()]))
        .with_policy(GenerationPolicy::fan_out(1));

    let mut controller = Controller::<Sticker>::new().with_auto_regenerate(true);
    controller.upload(ImageProcessor::encode_bytes(&png_bytes()).unwrap());

    let first = controller.set_style(StickerStyle::Pixar).unwrap();
    let second = controller.set_thickness(1.0).unwrap();

    let late = orchestrator.run(&first).await;
    assert!(!controller.complete(first.id, late));
    assert_eq!(controller.phase(), Phase::Generating);

    let outcome = orchestrator.run(&second).await;
    assert!(controller.complete(second.id, outcome));
    assert_eq!(controller.result().len(), 1);
    assert!(orchestrator.model().prompts()[1].contains("Use very thin, delicate hairlines."));
}
