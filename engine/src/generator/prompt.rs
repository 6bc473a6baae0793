//! Prompt construction for round 1 and round 2

use sdk::Attachment;

const DATA_PREVIEW_CHARS: usize = 300;
const URL_PREVIEW_CHARS: usize = 100;

/// One line per attachment, joined with newlines. Empty when there are none.
///
/// Data URIs are summarised without decoding: base64 payloads report their
/// MIME type and encoded length, other payloads a short prefix.
pub fn summarize_attachments(attachments: &[Attachment]) -> String {
    attachments
        .iter()
        .map(|attachment| format!("{} - {}", attachment.name, preview(&attachment.url)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview(url: &str) -> String {
    let data_uri = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','));

    match data_uri {
        Some((header, data)) => {
            let mime = header.split(';').next().filter(|m| !m.is_empty()).unwrap_or("unknown");
            if header.split(';').any(|param| param.eq_ignore_ascii_case("base64")) {
                format!("(base64 {}, length {} chars)", mime, data.chars().count())
            } else {
                truncate_chars(data, DATA_PREVIEW_CHARS)
            }
        }
        None => truncate_chars(url, URL_PREVIEW_CHARS),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn attachments_block(attachments: &[Attachment]) -> String {
    let summary = summarize_attachments(attachments);
    if summary.is_empty() {
        "(none)".to_string()
    } else {
        summary
    }
}

/// Prompt for a brand new application
pub fn initial_prompt(brief: &str, checks: &[String], attachments: &[Attachment]) -> String {
    format!(
        "You are an expert web developer. Build a COMPLETE single-file HTML application.

BRIEF:
{brief}

REQUIREMENTS (every one must be satisfied):
{checks}

ATTACHMENTS:
{attachments}

RULES:
1. Reply with ONE complete HTML file that starts with <!DOCTYPE html>
2. Load Bootstrap 5 CSS from https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css
3. Load Bootstrap Icons from https://cdn.jsdelivr.net/npm/bootstrap-icons@1.10.0/font/bootstrap-icons.css
4. Put all CSS inline in <style> tags
5. Put all JavaScript inline in <script> tags
6. The page must be fully functional with no placeholders
7. Use a clean, modern design
8. Handle the attachments if any are listed (decode base64, parse CSV or JSON)
9. Make sure every requirement above can pass",
        brief = brief,
        checks = bullet_list(checks),
        attachments = attachments_block(attachments),
    )
}

/// Prompt for amending an existing application
pub fn update_prompt(
    prior_brief: &str,
    prior_checks: &[String],
    brief: &str,
    checks: &[String],
    attachments: &[Attachment],
) -> String {
    format!(
        "You are updating an existing web application. Everything that works today must keep working.

ORIGINAL BRIEF:
{prior_brief}

ORIGINAL CHECKS (must still pass):
{prior_checks}

NEW REQUIREMENTS:
{brief}

NEW CHECKS (must also pass):
{checks}

NEW ATTACHMENTS:
{attachments}

RULES:
1. Reply with ONE complete updated HTML file that starts with <!DOCTYPE html>
2. Keep all original functionality
3. Add the new functionality
4. Use Bootstrap 5 and Bootstrap Icons from the jsDelivr CDN
5. All CSS inline in <style>, all JavaScript inline in <script>
6. The page must be fully functional with no placeholders
7. Every check, old and new, must pass",
        prior_brief = prior_brief,
        prior_checks = bullet_list(prior_checks),
        brief = brief,
        checks = bullet_list(checks),
        attachments = attachments_block(attachments),
    )
}
