use pagesmith_engine::generator::template::{render_index, TemplateKind};
use pagesmith_engine::generator::{extract_html, is_acceptable_html};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

proptest! {
    // Anything without the doctype prefix is rejected
    #[test]
    fn test_text_without_doctype_is_rejected(body in "[a-zA-Z0-9 <>/]{0,200}") {
        prop_assume!(!body.trim_start().to_ascii_lowercase().starts_with("<!doctype"));
        prop_assert!(!is_acceptable_html(&body));
    }

    #[test]
    fn test_text_without_closing_tag_is_rejected(body in "[a-zA-Z0-9 ]{0,200}") {
        let doc = format!("<!DOCTYPE html><html><body>{}</body>", body);
        prop_assert!(!is_acceptable_html(&doc));
    }

    #[test]
    fn test_html_fence_wins_over_other_fences(
        before in "[a-z ]{0,40}",
        css in "[a-z{}:; ]{0,40}",
        inner in "[a-zA-Z0-9 ]{0,80}",
    ) {
        let doc = format!("<!DOCTYPE html><html>{}</html>", inner);
        let text = format!("{}\n```css\n{}\n```\n```html\n{}\n```\n", before, css, doc);
        prop_assert_eq!(extract_html(&text).trim(), doc.as_str());
    }

    // Fallback output depends only on its inputs
    #[test]
    fn test_template_is_deterministic(
        brief in "[a-zA-Z ]{1,120}",
        checks in proptest::collection::vec("[a-zA-Z#<>& ]{1,40}", 0..5),
        secs in 0i64..2_000_000_000,
    ) {
        let at = Utc.timestamp_opt(secs, 0).unwrap();
        let first = render_index(&brief, &checks, at);
        let second = render_index(&brief, &checks, at);
        prop_assert_eq!(&first, &second);
        prop_assert!(is_acceptable_html(&first));
        prop_assert!(first.contains("id=\"hello\""));
    }

    #[test]
    fn test_checks_are_escaped(check in "[a-z]{1,10}") {
        let hostile = format!("<script>{}</script>", check);
        let html = render_index("Hello", &[hostile.clone()], Utc::now());
        let expected = format!("&lt;script&gt;{}&lt;/script&gt;", check);
        prop_assert!(html.contains(&expected));
    }

    #[test]
    fn test_classifier_is_case_insensitive(upper in proptest::bool::ANY) {
        let brief = if upper { "Render MARKDOWN notes" } else { "render markdown notes" };
        prop_assert_eq!(TemplateKind::classify(brief), TemplateKind::MarkdownPreview);
    }
}
