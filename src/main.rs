use anyhow::Result;
use crscraper::{
    config::Config,
    history::History,
    normalize::NormalizePlan,
    ocr::TesseractSource,
    pipeline::Processor,
    store::RecordStore,
};
use std::{env, fs, path::PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) configure paths ──────────────────────────────────────────
    let rules_path = env_or("CRS_RULES", "rules.yaml");
    let store_path = env_or("CRS_STORE", "crs.csv");
    let img_dir = env_or("CRS_IMG_DIR", "img");
    let done_dir = env_or("CRS_DONE_DIR", "img_done");
    let history_dir = env_or("CRS_HISTORY_DIR", "history");
    fs::create_dir_all(&done_dir)?;

    // ─── 3) load config, store, history ──────────────────────────────
    let config = Config::load(&rules_path)?;
    let plan = NormalizePlan::from_config(&config)?;
    let mut store = RecordStore::load(&store_path)?;
    let history = History::new(&history_dir)?;
    let processed = history.load_processed()?;
    info!("{} images already done", processed.len());

    // ─── 4) discover new page images ─────────────────────────────────
    let pattern = format!("{}/**/*.png", img_dir.display());
    let mut images: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|entry| entry.ok())
        .filter(|path| {
            image_key(&img_dir, path)
                .map(|key| !processed.contains(&key))
                .unwrap_or(false)
        })
        .collect();
    // Stable order: the date carry-forward rule makes row order part of
    // the result.
    images.sort();

    if images.is_empty() {
        info!("no new images; exit");
        return Ok(());
    }
    info!("{} images to process", images.len());

    // ─── 5) process images strictly one at a time ────────────────────
    let source = TesseractSource::new();
    if !source.available() {
        warn!("tesseract binary not found on PATH; every page will fail OCR");
    }
    let processor = Processor::new(&config, &source)?;

    let mut done: Vec<PathBuf> = Vec::new();
    for image in &images {
        match processor.process_image(image) {
            Ok(Some(record)) => {
                store.append(&record);
                done.push(image.clone());
            }
            Ok(None) => {
                // collaborator failure, already logged; leave the image
                // in place for the next run
            }
            Err(err) => error!("processing {} failed: {err:#}", image.display()),
        }
    }

    // ─── 6) one normalize + dedupe + persist pass per run ────────────
    if done.is_empty() {
        info!("nothing extracted; store left untouched");
        return Ok(());
    }
    store.commit(&plan)?;

    // ─── 7) record history and move processed images aside ───────────
    for image in &done {
        // Key on the path relative to the image dir: per-document
        // subfolders all contain a page_1.png, so bare file names collide.
        let key = match image_key(&img_dir, image) {
            Some(key) => key,
            None => continue,
        };
        history.record_processed(&key)?;
        let target = done_dir.join(&key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        if let Err(err) = fs::rename(image, &target) {
            error!("failed to move {}: {}", image.display(), err);
        } else {
            info!("moved {} → {}", image.display(), target.display());
        }
    }

    info!("all done");
    Ok(())
}

fn env_or(key: &str, default: &str) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

/// History/done-dir key for a page image: its path relative to the image
/// dir, so identically named pages from different source documents stay
/// distinct.
fn image_key(img_dir: &std::path::Path, image: &std::path::Path) -> Option<String> {
    let rel = image.strip_prefix(img_dir).unwrap_or(image);
    let key = rel.to_str()?;
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
