//! # Shared Extraction Prompts
//!
//! The output contract appended to every domain prompt, and the short user-side
//! instruction sent alongside an image.

/// Describes the JSON object every extraction call must return.
///
/// Placeholders: `{domain}`, `{statuses}`, `{categories}`
pub const RECORD_OUTPUT_CONTRACT: &str = r#"# Output Format
Respond with a single JSON object and nothing else. Do not wrap it in markdown.
The object has exactly these fields:
- "type": always "{domain}".
- "title": a short title for the document, or null.
- "category": one of {categories}. Pick the closest match.
- "date": the date the document refers to, formatted as YYYY-MM-DD. Use the report, statement or invoice date, not today's date.
- "summary": a single number that sums up the document (for example a total amount), or null when there is none.
- "items": an array of metric objects, in the order they appear in the document.

Each metric object has these fields:
- "key": a short snake_case identifier for the metric (for example "wbc" or "rent").
- "name": the human-readable label as written in the document.
- "value": the numeric value. Use a plain number without units or thousands separators.
- "unit": the unit as written, or null.
- "status": one of {statuses}.
- "reference": the reference range or expected value as written, or null.
- "notes": any remark attached to the metric, or null.
- "displayOrder": the 1-based position of the metric in the document.
- "categoryTag": the section, panel or group heading the metric belongs to, or null.
- "parentKey": the "key" of the enclosing line item when the metric is a sub-item, or null."#;

/// The user-side instruction sent with an image.
///
/// Placeholders: `{domain}`
pub const IMAGE_USER_INSTRUCTION: &str = "Extract all {domain} metrics from this image strictly following the instructions. Only report values that are visible in the image.";
