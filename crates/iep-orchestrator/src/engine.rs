// The durable workflow engine (C8): drives a single document through
// S1-S10. Grounded on `otlp2parquet-batch::BatchManager`'s shape of an
// in-process async state holder wrapped behind a small set of methods, but
// here the "batch" is a single execution run to completion rather than a
// time-windowed accumulation.
//
// Each step is wrapped in `run_step`, which applies the configured timeout
// and retry budget uniformly; steps differ only in what they do inside the
// closure, not in how failure/retry/timeout are handled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use iep_agents::OcrPageText;
use iep_core::content::{ParsedResult, PayloadKind};
use iep_core::{ContentBlob, MissingInfoItem};
use iep_persistence::OcrDataKind;
use tracing::{info, info_span, Instrument};

use crate::context::StepContext;
use crate::error::OrchestratorError;
use crate::retry::with_retry;

/// The ingress-adapter-derived input to a single execution.
#[derive(Debug, Clone)]
pub struct ExecutionInput {
    pub iep_id: String,
    pub child_id: String,
    pub user_id: String,
    pub bucket: String,
    pub source_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Processed,
    Failed { step: String, message: String },
}

async fn run_step<T, F, Fut>(
    ctx: &StepContext,
    step_name: &'static str,
    f: F,
) -> Result<T, OrchestratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OrchestratorError>>,
{
    let timeout = Duration::from_secs(ctx.config.step_timeout_secs);
    let attempt = with_retry(step_name, ctx.config.max_retries, ctx.config.backoff_base_ms, f);
    match tokio::time::timeout(timeout, attempt).await {
        Ok(result) => result,
        Err(_) => Err(OrchestratorError::Timeout(step_name)),
    }
}

/// Runs a document through the full pipeline, recording progress and
/// failures as it goes. Returns `Ok` with the terminal outcome even when
/// the pipeline itself failed — only a bug in the engine's own bookkeeping
/// (e.g. the metadata store rejecting the failure write) surfaces as `Err`.
pub async fn run(ctx: &StepContext, input: ExecutionInput) -> Result<ExecutionOutcome, OrchestratorError> {
    let span = info_span!("iep_execution", iep_id = %input.iep_id, child_id = %input.child_id);
    run_inner(ctx, input).instrument(span).await
}

async fn run_inner(ctx: &StepContext, input: ExecutionInput) -> Result<ExecutionOutcome, OrchestratorError> {
    match run_pipeline(ctx, &input).await {
        Ok(()) => Ok(ExecutionOutcome::Processed),
        Err((step, err)) => {
            let message = err.to_string();
            ctx.persistence
                .record_failure(&input.iep_id, &input.child_id, &input.user_id, &message, Some(step))
                .await?;
            info!(step, error = %message, "execution failed");
            Ok(ExecutionOutcome::Failed {
                step: step.to_string(),
                message,
            })
        }
    }
}

/// The S1-S10 state graph. Each step's error is tagged with the step name
/// so the caller can record it as `failed_step`.
async fn run_pipeline(ctx: &StepContext, input: &ExecutionInput) -> Result<(), (&'static str, OrchestratorError)> {
    // S1: record the execution has started.
    run_step(ctx, "s1_start", || async {
        ctx.persistence
            .update_progress(&input.iep_id, &input.child_id, &input.user_id, iep_core::RecordStatus::Processing, "start", 5, None, None)
            .await
            .map_err(OrchestratorError::from)
    })
    .await
    .map_err(|e| ("s1_start", e))?;

    // S2: OCR the source document.
    let ocr_result = run_step(ctx, "s2_ocr", || async {
        ctx.ocr
            .process_document(&input.bucket, &input.source_key)
            .await
            .map_err(OrchestratorError::from)
    })
    .await
    .map_err(|e| ("s2_ocr", e))?;

    // S3: persist the raw OCR result before anything touches it.
    run_step(ctx, "s3_save_ocr", || async {
        let value = serde_json::to_value(&ocr_result).map_err(|e| {
            OrchestratorError::RetriesExhausted("s3_save_ocr", format!("ocr result serialization: {}", e))
        })?;
        ctx.persistence
            .save_ocr_data(&input.iep_id, &input.child_id, &input.user_id, value, OcrDataKind::OcrResult)
            .await
            .map_err(OrchestratorError::from)
    })
    .await
    .map_err(|e| ("s3_save_ocr", e))?;

    ctx.persistence
        .update_progress(&input.iep_id, &input.child_id, &input.user_id, iep_core::RecordStatus::Processing, "ocr_done", 15, None, None)
        .await
        .map_err(|e| ("s3_save_ocr", OrchestratorError::from(e)))?;

    // S4: redact PII from every page before any LLM sees the text.
    let page_texts: Vec<String> = ocr_result.pages.iter().map(|p| p.content.clone()).collect();
    let (redacted_texts, stats) = run_step(ctx, "s4_redact", || {
        let pages = page_texts.clone();
        async move {
            ctx.pii
                .redact_pages(pages, "en")
                .await
                .map_err(OrchestratorError::from)
        }
    })
    .await
    .map_err(|e| ("s4_redact", e))?;

    let redacted_pages: Vec<OcrPageText> = ocr_result
        .pages
        .iter()
        .zip(redacted_texts.iter())
        .map(|(page, text)| OcrPageText {
            index: page.index,
            content: text.clone(),
        })
        .collect();

    // S5: persist the redacted OCR result, then drop the original upload —
    // only the redacted text and the structured output survive downstream.
    run_step(ctx, "s5_save_redacted", || {
        let redacted_pages = redacted_pages.clone();
        let stats = stats.clone();
        async move {
            let value = serde_json::json!({
                "pages": redacted_pages.iter().map(|p| serde_json::json!({"index": p.index, "content": p.content})).collect::<Vec<_>>(),
                "stats": stats,
            });
            ctx.persistence
                .save_ocr_data(&input.iep_id, &input.child_id, &input.user_id, value, OcrDataKind::RedactedOcrResult)
                .await
                .map_err(OrchestratorError::from)
        }
    })
    .await
    .map_err(|e| ("s5_save_redacted", e))?;

    run_step(ctx, "s5_delete_original", || async {
        ctx.source_store
            .delete(&input.source_key)
            .await
            .map_err(OrchestratorError::from)
    })
    .await
    .map_err(|e| ("s5_delete_original", e))?;

    ctx.persistence
        .update_progress(&input.iep_id, &input.child_id, &input.user_id, iep_core::RecordStatus::Processing, "redacted", 25, None, None)
        .await
        .map_err(|e| ("s5_save_redacted", OrchestratorError::from(e)))?;

    // S6: decide which additional languages this user wants, if any.
    let prefs = run_step(ctx, "s6_check_prefs", || async {
        ctx.persistence
            .get_user_prefs(&input.user_id)
            .await
            .map_err(OrchestratorError::from)
    })
    .await
    .map_err(|e| ("s6_check_prefs", e))?;
    let extra_languages: Vec<String> = prefs.languages.into_iter().filter(|l| l != "en").collect();

    // S7: ExtractStructured, ExtractMeetingNotes, and ReviewMissingInfo run
    // concurrently, each under its own timeout/retry budget so a failure is
    // attributed to the step that actually failed. Extraction and
    // meeting-notes failures are fatal; a missing-info failure or an empty
    // result is not (spec.md §4.8's "non-retryable missing-info" rule).
    let ocr_tool_pages = redacted_pages.clone();
    let full_text = redacted_pages
        .iter()
        .map(|p| format!("Page {}:\n{}", p.index, p.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let extract_structured = run_step(ctx, "extract_structured", || {
        let pages = ocr_tool_pages.clone();
        async move {
            iep_agents::extract(ctx.llm.as_ref(), &ctx.extractor_model, ctx.config.extractor_max_tool_turns, pages)
                .await
                .map_err(OrchestratorError::from)
        }
    });
    let extract_meeting_notes = run_step(ctx, "extract_meeting_notes", || {
        let full_text = full_text.clone();
        async move {
            iep_agents::extract_meeting_notes(ctx.llm.as_ref(), &ctx.meeting_notes_model, &full_text)
                .await
                .map_err(OrchestratorError::from)
        }
    });
    let review_missing_info = run_step(ctx, "review_missing_info", || {
        let full_text = full_text.clone();
        async move {
            iep_agents::review_missing_info(ctx.llm.as_ref(), &ctx.missing_info_model, &full_text)
                .await
                .map_err(OrchestratorError::from)
        }
    });

    let (extracted, meeting_notes, missing_info) = tokio::join!(extract_structured, extract_meeting_notes, review_missing_info);
    let extracted = extracted.map_err(|e| ("extract_structured", e))?;
    let meeting_notes = meeting_notes.map_err(|e| ("extract_meeting_notes", e))?;
    // A missing-info failure degrades to an empty list rather than failing
    // the whole join (spec.md §4.8's non-retryable missing-info rule).
    let missing_info = missing_info.unwrap_or_default();

    let mut content = ContentBlob::default();
    content.summaries.insert("en".to_string(), extracted.summary.clone());
    content.sections.insert("en".to_string(), extracted.sections.clone());
    content.document_index.insert("en".to_string(), extracted.document_index.clone());
    content.abbreviations.insert("en".to_string(), extracted.abbreviations.clone());
    if !meeting_notes.trim().is_empty() {
        content.meeting_notes.insert("en".to_string(), meeting_notes);
    }
    content.ensure_english_sections_complete();

    run_step(ctx, "save_english_parsed", || {
        let content = content.clone();
        async move {
            ctx.persistence
                .save_content_to_s3(&input.iep_id, &input.child_id, &input.user_id, &content)
                .await
                .map_err(OrchestratorError::from)
        }
    })
    .await
    .map_err(|e| ("save_english_parsed", e))?;

    run_step(ctx, "save_missing_info_en", || {
        let missing_info = missing_info.clone();
        async move {
            ctx.persistence
                .save_missing_info(&input.iep_id, &input.child_id, &input.user_id, missing_info)
                .await
                .map_err(OrchestratorError::from)
        }
    })
    .await
    .map_err(|e| ("save_missing_info_en", e))?;

    // S8: mark English complete; if no other languages are wanted, finish.
    let status = if extra_languages.is_empty() {
        iep_core::RecordStatus::Processing
    } else {
        iep_core::RecordStatus::ProcessingTranslations
    };
    ctx.persistence
        .update_progress(&input.iep_id, &input.child_id, &input.user_id, status, "english_saved", 70, None, None)
        .await
        .map_err(|e| ("english_saved", OrchestratorError::from(e)))?;

    if !extra_languages.is_empty() {
        run_translations(ctx, input, &extracted, &content.meeting_notes.get("en").cloned().unwrap_or_default(), &missing_info, &extra_languages)
            .await
            .map_err(|e| ("translate", e))?;
    }

    ctx.persistence
        .update_progress(&input.iep_id, &input.child_id, &input.user_id, iep_core::RecordStatus::Processing, "translations_done", 95, None, None)
        .await
        .map_err(|e| ("translations_done", OrchestratorError::from(e)))?;

    // S10: finalize.
    ctx.persistence
        .update_progress(&input.iep_id, &input.child_id, &input.user_id, iep_core::RecordStatus::Processed, "done", 100, None, None)
        .await
        .map_err(|e| ("s10_finalize", OrchestratorError::from(e)))?;

    Ok(())
}

/// S9: fan out translation for each extra language concurrently, then do
/// one serialized read-modify-write merge of the content blob across all
/// of them. The content blob is rewritten wholly on every save, so two
/// concurrent save_content_to_s3 calls against the same record would race;
/// translating concurrently but merging once avoids that without giving up
/// the parallel LLM calls (spec.md §5's "logically disjoint slices" framing
/// describes what gets written, not when).
async fn run_translations(
    ctx: &StepContext,
    input: &ExecutionInput,
    extracted: &ParsedResult,
    english_meeting_notes: &str,
    missing_info: &[MissingInfoItem],
    languages: &[String],
) -> Result<(), OrchestratorError> {
    let parsed_value = serde_json::to_value(extracted)
        .map_err(|e| OrchestratorError::RetriesExhausted("s9_translate", format!("parsed result serialization: {}", e)))?;
    let meeting_notes_value = serde_json::Value::String(english_meeting_notes.to_string());
    let missing_info_value = serde_json::to_value(missing_info)
        .map_err(|e| OrchestratorError::RetriesExhausted("s9_translate", format!("missing info serialization: {}", e)))?;

    let translator_turns = ctx.config.translator_max_tool_turns;
    let model = ctx.translator_model.clone();
    let llm = Arc::clone(&ctx.llm);

    let mut tasks = Vec::with_capacity(languages.len());
    for lang in languages {
        let lang = lang.clone();
        let llm = Arc::clone(&llm);
        let model = model.clone();
        let parsed_value = parsed_value.clone();
        let meeting_notes_value = meeting_notes_value.clone();
        let missing_info_value = missing_info_value.clone();
        let has_meeting_notes = !english_meeting_notes.trim().is_empty();
        let has_missing_info = !missing_info.is_empty();

        tasks.push(tokio::spawn(async move {
            let translated_parsed =
                iep_agents::translate(llm.as_ref(), &model, translator_turns, PayloadKind::Parsed, &lang, &parsed_value).await;
            let translated_meeting_notes = if has_meeting_notes {
                Some(iep_agents::translate(llm.as_ref(), &model, translator_turns, PayloadKind::MeetingNotes, &lang, &meeting_notes_value).await)
            } else {
                None
            };
            let translated_missing_info = if has_missing_info {
                Some(iep_agents::translate(llm.as_ref(), &model, translator_turns, PayloadKind::MissingInfo, &lang, &missing_info_value).await)
            } else {
                None
            };
            (lang, translated_parsed, translated_meeting_notes, translated_missing_info)
        }));
    }

    let mut per_language = Vec::with_capacity(tasks.len());
    for task in tasks {
        per_language.push(
            task.await
                .map_err(|e| OrchestratorError::RetriesExhausted("s9_translate", format!("translation task panicked: {}", e)))?,
        );
    }

    // One read-modify-write cycle, after all the expensive LLM calls for
    // every language have already completed.
    let document = ctx
        .persistence
        .get_document_with_content(&input.iep_id, &input.child_id, &input.user_id)
        .await?;
    let mut content = document.content;

    let mut missing_info_translations = serde_json::Map::new();
    for (lang, translated_parsed, translated_meeting_notes, translated_missing_info) in per_language {
        let parsed = iep_agents::coerce_parsed_translation(&translated_parsed, extracted);
        content.summaries.insert(lang.clone(), parsed.summary);
        content.sections.insert(lang.clone(), parsed.sections);
        content.document_index.insert(lang.clone(), parsed.document_index);
        content.abbreviations.insert(lang.clone(), parsed.abbreviations);
        if let Some(translated) = translated_meeting_notes {
            if let Some(text) = translated.as_str() {
                content.meeting_notes.insert(lang.clone(), text.to_string());
            }
        }
        if let Some(translated) = translated_missing_info {
            missing_info_translations.insert(lang, translated);
        }
    }

    ctx.persistence
        .save_content_to_s3(&input.iep_id, &input.child_id, &input.user_id, &content)
        .await?;

    if !missing_info_translations.is_empty() {
        let mut updates = serde_json::Map::new();
        updates.insert(
            "missingInfoTranslations".to_string(),
            serde_json::Value::Object(missing_info_translations),
        );
        ctx.persistence
            .save_api_fields(&input.iep_id, &input.child_id, &input.user_id, updates)
            .await?;
    }

    Ok(())
}
