// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Vulnerability Driver
 * Executes the filtered template set against each target and streams
 * normalized findings to the observer. Two modes: sequential (fresh
 * engine per target) and thread-safe (shared engine, bounded width)
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::engine::{EngineOptions, EngineProvider, ResultEvent};
use super::template_filter::filter_templates;
use crate::observer::{EventSink, ProgressKind};
use crate::types::{CancelFlag, VulnerabilityInfo};

/// Findings never carry more response body than this.
const MAX_RESPONSE_SIZE: usize = 1024 * 512;

/// The template engine holds per-run state large enough that running
/// more than this concurrently exhausts memory on big template sets.
const THREAD_SAFE_WIDTH: usize = 5;

/// Per-target driver input.
#[derive(Debug, Clone, Default)]
pub struct NucleiOption {
    pub url: String,
    /// Tags detected for this target (fingerprint product names).
    pub tags: Vec<String>,
    /// User-supplied tags overriding the detected ones.
    pub custom_tags: Vec<String>,
    /// Explicit template files; when non-empty, tags are ignored.
    pub template_files: Vec<PathBuf>,
    pub template_dirs: Vec<PathBuf>,
    /// "Key: Value" lines, one per line.
    pub custom_headers: String,
    pub proxy: String,
    /// Skip targets whose tag set is empty instead of running the full set.
    pub skip_without_tags: bool,
}

/// Build engine options for one target, resolving the template set.
fn build_engine_options(option: &NucleiOption) -> EngineOptions {
    let mut engine_options = EngineOptions::default().disable_update_check();
    if !option.custom_headers.is_empty() {
        let headers = crate::config::parse_custom_headers(&option.custom_headers);
        engine_options = engine_options.with_headers(crate::config::headers_to_lines(&headers));
    }
    engine_options = engine_options.with_templates_or_workflows(filter_templates(
        &option.tags,
        &option.custom_tags,
        &option.template_files,
        &option.template_dirs,
    ));
    if !option.proxy.is_empty() {
        engine_options = engine_options.with_proxy(vec![option.proxy.clone()], false);
    }
    engine_options
}

/// Sequential mode: one fresh engine per target.
pub async fn run_sequential(
    provider: &dyn EngineProvider,
    task_id: &str,
    options: Vec<NucleiOption>,
    sink: Arc<dyn EventSink>,
    cancel: &CancelFlag,
) {
    let total = options.len();
    for (index, option) in options.into_iter().enumerate() {
        if cancel.is_cancelled() {
            warn!("User exits vulnerability scanning");
            return;
        }
        info!("vulnerability scanning {}/{}", index + 1, total);

        if option.skip_without_tags && option.tags.is_empty() {
            info!("[nuclei] {} does not have tags, scan skipped", option.url);
            sink.progress(ProgressKind::NucleiProgress, index + 1, total);
            continue;
        }

        let mut engine = match provider.new_engine(build_engine_options(&option)) {
            Ok(engine) => engine,
            Err(err) => {
                sink.error(format!("[nuclei] init engine err: {}", err));
                return;
            }
        };

        info!("[nuclei] check vuln: {}", option.url);
        engine.load_targets(vec![option.url.clone()], false);

        let callback = finding_callback(task_id, sink.clone());
        if let Err(err) = engine.execute_with_callback(callback).await {
            error!("[nuclei] execute callback err: {}", err);
        }
        sink.progress(ProgressKind::NucleiProgress, index + 1, total);
    }
}

/// Thread-safe mode: a single shared engine behind a bounded semaphore.
/// Worker panics are recovered and logged; the session keeps going.
pub async fn run_thread_safe(
    provider: &dyn EngineProvider,
    task_id: &str,
    options: Vec<NucleiOption>,
    sink: Arc<dyn EventSink>,
    cancel: &CancelFlag,
) {
    let engine = match provider.new_thread_safe_engine() {
        Ok(engine) => engine,
        Err(err) => {
            sink.error(format!("[nuclei] init engine err: {}", err));
            return;
        }
    };

    let total = options.len();
    info!("[nuclei] loading {} targets to scan", total);
    engine.global_result_callback(finding_callback(task_id, sink.clone()));

    let semaphore = Arc::new(Semaphore::new(THREAD_SAFE_WIDTH));
    let progress = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();

    for option in options {
        if cancel.is_cancelled() {
            warn!("User exits vulnerability scanning");
            break;
        }
        // Web targets are skippable by flag; non-http targets without
        // tags have no template set worth running either way.
        if option.skip_without_tags && option.tags.is_empty() {
            info!("[nuclei] {} does not have tags, scan skipped", option.url);
            tick(&progress, total, &sink);
            continue;
        }
        if !option.url.starts_with("http") && option.tags.is_empty() {
            info!(
                "[nuclei] {} is not web and does not have tags, scan skipped",
                option.url
            );
            tick(&progress, total, &sink);
            continue;
        }

        let engine = engine.clone();
        let semaphore = semaphore.clone();
        let progress = progress.clone();
        let sink_task = sink.clone();
        let engine_options = build_engine_options(&option);
        let url = option.url.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.unwrap();
            info!("[nuclei] check vuln: {}", url);
            if let Err(err) = engine.execute_with_opts(vec![url], engine_options).await {
                error!("[nuclei] execute callback err: {}", err);
            }
            tick(&progress, total, &sink_task);
        }));
    }

    for handle in handles {
        if let Err(err) = handle.await {
            if err.is_panic() {
                error!("[nuclei] panic caught in worker: {:?}", err);
            }
        }
    }
}

fn tick(progress: &AtomicUsize, total: usize, sink: &Arc<dyn EventSink>) {
    let done = progress.fetch_add(1, Ordering::SeqCst) + 1;
    sink.progress(ProgressKind::NucleiProgress, done, total);
    info!("vulnerability scanning {}/{}", done, total);
}

fn finding_callback(
    task_id: &str,
    sink: Arc<dyn EventSink>,
) -> super::engine::ResultCallback {
    let task_id = task_id.to_string();
    Arc::new(move |event: ResultEvent| {
        info!(
            "[{}] [{}] {}",
            event.template_id, event.severity, event.matched
        );
        sink.finding(normalize_event(&task_id, event));
    })
}

/// Map a raw engine event onto the published finding shape.
fn normalize_event(task_id: &str, event: ResultEvent) -> VulnerabilityInfo {
    VulnerabilityInfo {
        task_id: task_id.to_string(),
        id: event.template_id,
        name: event.name,
        description: event.description,
        reference: event.reference.join(","),
        url: show_matched(&event.matched, &event.url),
        request: show_request(&event.request, &event.interaction_raw_request),
        response: show_response(&event.response, &event.interaction_raw_response),
        response_time: limit_decimal_places(&event.response_time),
        extract: event.extracted_results.join(" | "),
        kind: event.kind.to_uppercase(),
        severity: event.severity.to_uppercase(),
    }
}

fn show_matched(matched: &str, url: &str) -> String {
    if matched.is_empty() {
        url.to_string()
    } else {
        matched.to_string()
    }
}

fn show_request(request: &str, interaction_raw: &str) -> String {
    if request.is_empty() {
        interaction_raw.to_string()
    } else {
        request.to_string()
    }
}

fn show_response(response: &str, interaction_raw: &str) -> String {
    if response.is_empty() {
        interaction_raw.to_string()
    } else {
        limit_response(response, MAX_RESPONSE_SIZE)
    }
}

/// Truncate to `max` bytes, backing off to the nearest char boundary.
fn limit_response(response: &str, max: usize) -> String {
    if response.len() <= max {
        return response.to_string();
    }
    let mut end = max;
    while end > 0 && !response.is_char_boundary(end) {
        end -= 1;
    }
    response[..end].to_string()
}

/// Truncate the fractional part of a duration string to two digits.
/// "1.2345" -> "1.23", "5" -> "5", "5.1" -> "5.1".
fn limit_decimal_places(value: &str) -> String {
    match value.split_once('.') {
        Some((whole, frac)) if frac.len() > 2 => format!("{}.{}", whole, &frac[..2]),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_decimal_places() {
        assert_eq!(limit_decimal_places("1.2345"), "1.23");
        assert_eq!(limit_decimal_places("5"), "5");
        assert_eq!(limit_decimal_places("5.1"), "5.1");
        assert_eq!(limit_decimal_places("5.12"), "5.12");
        assert_eq!(limit_decimal_places(""), "");
    }

    #[test]
    fn test_limit_response_exact_boundary() {
        let body = "a".repeat(MAX_RESPONSE_SIZE + 100);
        assert_eq!(limit_response(&body, MAX_RESPONSE_SIZE).len(), MAX_RESPONSE_SIZE);
        let short = "short body";
        assert_eq!(limit_response(short, MAX_RESPONSE_SIZE), short);
    }

    #[test]
    fn test_limit_response_respects_char_boundary() {
        // 3-byte chars; a cut at 4 must back off to 3.
        let body = "语言测试";
        assert_eq!(limit_response(body, 4), "语");
    }

    #[test]
    fn test_normalize_prefers_matched_and_interaction_fallbacks() {
        let event = ResultEvent {
            template_id: "t".into(),
            matched: String::new(),
            url: "http://x".into(),
            request: String::new(),
            interaction_raw_request: "raw-req".into(),
            response: String::new(),
            interaction_raw_response: "raw-resp".into(),
            extracted_results: vec!["a".into(), "b".into()],
            kind: "http".into(),
            severity: "high".into(),
            response_time: "2.7182".into(),
            ..ResultEvent::default()
        };
        let info = normalize_event("task", event);
        assert_eq!(info.url, "http://x");
        assert_eq!(info.request, "raw-req");
        assert_eq!(info.response, "raw-resp");
        assert_eq!(info.extract, "a | b");
        assert_eq!(info.kind, "HTTP");
        assert_eq!(info.severity, "HIGH");
        assert_eq!(info.response_time, "2.71");
    }

    #[test]
    fn test_normalize_joins_references() {
        let event = ResultEvent {
            reference: vec!["https://a".into(), "https://b".into()],
            ..ResultEvent::default()
        };
        let info = normalize_event("task", event);
        assert_eq!(info.reference, "https://a,https://b");
    }
}
