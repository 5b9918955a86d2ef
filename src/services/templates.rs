//! Prompt templates.
//!
//! Markdown templates with `{placeholder}` substitution, selectable by
//! language code. Built-in English defaults ship with the binary; user
//! overrides live in the template table and win over the defaults. A
//! missing language falls back to the default language.

use std::sync::Arc;

use crate::domain::errors::CoreResult;
use crate::domain::models::PipelineStep;
use crate::domain::ports::TemplateRepository;

const DEFAULT_LANGUAGE: &str = "en";

/// Substitute `{placeholder}` occurrences. Unknown placeholders are left
/// in place so template typos stay visible in the logs.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

#[derive(Clone)]
pub struct TemplateStore {
    repo: Arc<dyn TemplateRepository>,
}

impl TemplateStore {
    pub fn new(repo: Arc<dyn TemplateRepository>) -> Self {
        Self { repo }
    }

    /// Analysis template for a step.
    pub async fn analysis(&self, step: PipelineStep, language: &str) -> CoreResult<String> {
        self.resolve(step.as_str(), language, builtin_analysis(step)).await
    }

    /// Confirmation template for a step.
    pub async fn confirm(&self, step: PipelineStep, language: &str) -> CoreResult<String> {
        let key = format!("{}.confirm", step.as_str());
        self.resolve(&key, language, builtin_confirm(step)).await
    }

    async fn resolve(&self, key: &str, language: &str, builtin: &str) -> CoreResult<String> {
        if let Some(content) = self.repo.get(key, language).await? {
            return Ok(content);
        }
        if language != DEFAULT_LANGUAGE {
            if let Some(content) = self.repo.get(key, DEFAULT_LANGUAGE).await? {
                return Ok(content);
            }
        }
        Ok(builtin.to_string())
    }

    pub async fn set_override(
        &self,
        key: &str,
        language: &str,
        content: &str,
    ) -> CoreResult<()> {
        self.repo.set(key, language, content).await
    }

    pub async fn remove_override(&self, key: &str, language: &str) -> CoreResult<()> {
        self.repo.remove(key, language).await
    }

    pub async fn list_overrides(&self) -> CoreResult<Vec<(String, String)>> {
        self.repo.list().await
    }
}

fn builtin_analysis(step: PipelineStep) -> &'static str {
    match step {
        PipelineStep::Ocr => OCR_ANALYSIS,
        PipelineStep::Summary => SUMMARY_ANALYSIS,
        PipelineStep::Title => TITLE_ANALYSIS,
        PipelineStep::Correspondent => CORRESPONDENT_ANALYSIS,
        PipelineStep::DocumentType => DOCUMENT_TYPE_ANALYSIS,
        PipelineStep::Tags => TAGS_ANALYSIS,
        PipelineStep::CustomFields => CUSTOM_FIELDS_ANALYSIS,
    }
}

fn builtin_confirm(step: PipelineStep) -> &'static str {
    match step {
        PipelineStep::Title => TITLE_CONFIRM,
        PipelineStep::Correspondent => CORRESPONDENT_CONFIRM,
        PipelineStep::DocumentType => DOCUMENT_TYPE_CONFIRM,
        PipelineStep::Tags => TAGS_CONFIRM,
        PipelineStep::CustomFields => CUSTOM_FIELDS_CONFIRM,
        PipelineStep::Summary => SUMMARY_CONFIRM,
        PipelineStep::Ocr => GENERIC_CONFIRM,
    }
}

const OCR_ANALYSIS: &str = "\
Extract all text from the attached document image. Preserve reading order \
and output only the extracted text.";

const SUMMARY_ANALYSIS: &str = "\
Write a short abstract (2-4 sentences) of the following document.

## Document
{document_content}";

const SUMMARY_CONFIRM: &str = "\
Check whether this summary accurately reflects the document excerpt.

## Excerpt
{document_excerpt}

## Summary
{analysis_result}";

const TITLE_ANALYSIS: &str = "\
Suggest a precise, searchable title for the following document. A good \
title names the sender or merchant, the subject, and the period or date \
when one is present.

## Titles of similar documents
{similar_titles}

## Document
{document_content}";

const TITLE_CONFIRM: &str = "\
You are reviewing a title suggestion for a scanned document. Confirm only \
if the title is specific, matches the document content, and follows the \
conventions visible in the similar titles.

## Document excerpt
{document_excerpt}

## Suggested title and reasoning
{analysis_result}";

const CORRESPONDENT_ANALYSIS: &str = "\
Identify the correspondent (sender or institution) of the following \
document. Prefer an existing correspondent; only propose a new one when \
none fits.

## Existing correspondents
{existing_correspondents}

## Similar documents
{similar_docs}

## Document
{document_content}";

const CORRESPONDENT_CONFIRM: &str = "\
Verify this correspondent assignment against the document excerpt. Reject \
it when the name does not appear in or clearly follow from the document.

## Document excerpt
{document_excerpt}

## Suggestion
{analysis_result}";

const DOCUMENT_TYPE_ANALYSIS: &str = "\
Classify the following document into one of the existing document types, \
or propose a new type when none fits.

## Existing document types
{existing_types}

## Similar documents
{similar_docs}

## Document
{document_content}";

const DOCUMENT_TYPE_CONFIRM: &str = "\
Verify this document-type classification against the excerpt.

## Document excerpt
{document_excerpt}

## Suggestion
{analysis_result}";

const TAGS_ANALYSIS: &str = "\
Propose content tags for the following document. Use existing tags where \
they fit and mark genuinely new topics as new. Never propose a tag that \
duplicates a document type ({document_type} is this document's type), and \
never touch workflow tags. Also list currently assigned tags that clearly \
do not fit.

## Existing tags
{existing_tags}

## Currently assigned
{current_tags}

## Similar documents
{similar_docs}

## Document
{document_content}";

const TAGS_CONFIRM: &str = "\
Review these tag proposals against the document excerpt. Reject when a \
proposed tag is not supported by the content or duplicates an existing \
concept under a different name.

## Document excerpt
{document_excerpt}

## Proposals
{analysis_result}";

const CUSTOM_FIELDS_ANALYSIS: &str = "\
Fill the custom fields below from the document content. Only propose \
values that are explicitly present in the document.

## Custom fields
{custom_fields}

## Document
{document_content}";

const CUSTOM_FIELDS_CONFIRM: &str = "\
Verify these custom-field values against the excerpt. Reject any value \
not literally supported by the document.

## Document excerpt
{document_excerpt}

## Suggested fields
{suggested_fields}

## Reasoning
{reasoning}";

const GENERIC_CONFIRM: &str = "\
Verify the following analysis against the document excerpt.

## Document excerpt
{document_excerpt}

## Analysis
{analysis_result}";
