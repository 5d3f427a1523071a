// src/preview.rs - Repeatable, discardable preview runs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::errors::Result;
use crate::image_io::ImageInput;
use crate::pipeline::{run_stages, AnalysisImage, AnalysisOptions};
use crate::validation::RawAnalysisConfig;

#[derive(Debug, Default)]
struct PreviewChannel {
    latest_issued: AtomicU64,
    published: Mutex<Option<(u64, AnalysisImage)>>,
}

/// Claim on the newest preview of one image.
///
/// A ticket becomes stale as soon as a newer one is issued for the same key.
#[derive(Debug, Clone)]
pub struct PreviewTicket {
    key: String,
    generation: u64,
    channel: Arc<PreviewChannel>,
}

impl PreviewTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.channel.latest_issued.load(Ordering::Acquire) == self.generation
    }
}

/// Outcome of one preview run
#[derive(Debug, Clone)]
pub enum PreviewOutcome {
    Completed(AnalysisImage),
    /// A newer preview for the same image was requested mid-flight
    Superseded,
}

/// Issues tickets per image key and keeps only the newest published preview.
#[derive(Debug, Default)]
pub struct PreviewScheduler {
    channels: Mutex<HashMap<String, Arc<PreviewChannel>>>,
}

impl PreviewScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new preview for `key`, superseding any preview still running.
    pub fn begin(&self, key: &str) -> PreviewTicket {
        let channel = {
            let mut channels = self.channels.lock();
            Arc::clone(channels.entry(key.to_string()).or_default())
        };
        let generation = channel.latest_issued.fetch_add(1, Ordering::AcqRel) + 1;

        PreviewTicket {
            key: key.to_string(),
            generation,
            channel,
        }
    }

    /// Store `image` unless a newer generation was already published.
    ///
    /// Returns whether the image was stored.
    pub fn publish(&self, ticket: &PreviewTicket, image: AnalysisImage) -> bool {
        let mut published = ticket.channel.published.lock();
        match published.as_ref() {
            Some((generation, _)) if *generation > ticket.generation => {
                debug!(
                    "Dropping stale preview {} for {} (have {})",
                    ticket.generation, ticket.key, generation
                );
                false
            }
            _ => {
                *published = Some((ticket.generation, image));
                true
            }
        }
    }

    /// Newest published preview for `key`
    pub fn latest(&self, key: &str) -> Option<AnalysisImage> {
        let channel = self.channels.lock().get(key).cloned()?;
        let published = channel.published.lock();
        published.as_ref().map(|(_, image)| image.clone())
    }

    /// Forget everything held for `key`.
    ///
    /// Channels are kept until discarded, each holding the newest published
    /// image with both overlays, so a long-lived caller should discard keys
    /// it no longer previews.
    pub fn discard(&self, key: &str) {
        self.channels.lock().remove(key);
    }
}

/// Preview analysis of one image.
///
/// Same result shape as a full analysis; nothing is persisted. The run is
/// abandoned between stages once `ticket` has been superseded.
pub fn run_preview(
    ticket: &PreviewTicket,
    input: &ImageInput,
    image_number: u32,
    raw: &RawAnalysisConfig,
    options: &AnalysisOptions,
) -> Result<PreviewOutcome> {
    let config = raw.validate()?;
    if !ticket.is_current() {
        return Ok(PreviewOutcome::Superseded);
    }

    let outcome = run_stages(input, image_number, &config, options, &|| ticket.is_current())?;

    Ok(match outcome {
        Some(image) if ticket.is_current() => PreviewOutcome::Completed(image),
        _ => {
            debug!("Preview {} for {} superseded", ticket.generation, ticket.key);
            PreviewOutcome::Superseded
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_io::encode_png;
    use crate::validation::RawValue;
    use image::{Rgb, RgbImage};

    fn raw(sigma: f64) -> RawAnalysisConfig {
        RawAnalysisConfig {
            scale_um_per_pixel: Some(RawValue::Number(1.0)),
            line_length_um_horizontal: Some(RawValue::Number(50.0)),
            line_length_um_vertical: Some(RawValue::Number(50.0)),
            n_lines_horizontal: Some(RawValue::Number(2.0)),
            n_lines_vertical: Some(RawValue::Number(2.0)),
            sigma_denoise: Some(RawValue::Number(sigma)),
            min_area: Some(RawValue::Number(0.0)),
            magnification: Some("4x".to_string()),
        }
    }

    fn input() -> ImageInput {
        let image = RgbImage::from_fn(60, 60, |x, _| {
            if x % 12 < 6 {
                Rgb([30, 30, 30])
            } else {
                Rgb([220, 220, 220])
            }
        });
        ImageInput::new("img", "img.png", encode_png(&image).unwrap())
    }

    #[test]
    fn newer_ticket_supersedes_older() {
        let scheduler = PreviewScheduler::new();
        let first = scheduler.begin("img");
        let second = scheduler.begin("img");
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.generation() > first.generation());

        let other = scheduler.begin("other");
        assert!(other.is_current());
        assert!(second.is_current());
    }

    #[test]
    fn stale_ticket_run_is_superseded() {
        let scheduler = PreviewScheduler::new();
        let stale = scheduler.begin("img");
        let _fresh = scheduler.begin("img");
        let outcome = run_preview(&stale, &input(), 1, &raw(0.0), &AnalysisOptions::default())
            .unwrap();
        assert!(matches!(outcome, PreviewOutcome::Superseded));
    }

    #[test]
    fn stale_result_never_overwrites_newer() {
        let scheduler = PreviewScheduler::new();
        let old = scheduler.begin("img");
        let new = scheduler.begin("img");

        let PreviewOutcome::Completed(fresh) =
            run_preview(&new, &input(), 1, &raw(0.0), &AnalysisOptions::default()).unwrap()
        else {
            panic!("current ticket should complete");
        };
        assert!(scheduler.publish(&new, fresh.clone()));

        let mut stale = fresh;
        stale.average_mli_um = Some(-1.0);
        assert!(!scheduler.publish(&old, stale));
        assert_ne!(scheduler.latest("img").unwrap().average_mli_um, Some(-1.0));
    }

    #[test]
    fn repeated_previews_are_identical() {
        let scheduler = PreviewScheduler::new();
        let options = AnalysisOptions::default();
        let mut runs = Vec::new();
        for _ in 0..2 {
            let ticket = scheduler.begin("img");
            match run_preview(&ticket, &input(), 1, &raw(1.0), &options).unwrap() {
                PreviewOutcome::Completed(image) => runs.push(image),
                PreviewOutcome::Superseded => panic!("nothing newer was requested"),
            }
        }
        assert_eq!(runs[0].lines, runs[1].lines);
        assert_eq!(runs[0].overlays, runs[1].overlays);
    }

    #[test]
    fn discard_forgets_published_preview() {
        let scheduler = PreviewScheduler::new();
        let ticket = scheduler.begin("img");
        if let PreviewOutcome::Completed(image) =
            run_preview(&ticket, &input(), 1, &raw(0.0), &AnalysisOptions::default()).unwrap()
        {
            scheduler.publish(&ticket, image);
        }
        assert!(scheduler.latest("img").is_some());
        scheduler.discard("img");
        assert!(scheduler.latest("img").is_none());
    }
}
