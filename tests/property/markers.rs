//! Markers split at arbitrary byte boundaries are detected exactly once and
//! never leak into displayed text.

use folio::generation::{
    clean, display_text, extract_handoff_context, extract_name, NameDetector,
};
use proptest::prelude::*;

/// Split `text` at the given cut points (clamped to char boundaries).
fn split_at_points(text: &str, mut cuts: Vec<usize>) -> Vec<String> {
    cuts.iter_mut().for_each(|c| *c %= text.len() + 1);
    cuts.sort_unstable();
    cuts.dedup();
    let mut pieces = Vec::new();
    let mut start = 0;
    for cut in cuts {
        if cut > start && text.is_char_boundary(cut) {
            pieces.push(text[start..cut].to_string());
            start = cut;
        }
    }
    pieces.push(text[start..].to_string());
    pieces
}

proptest! {
    #[test]
    fn clean_is_idempotent(text in "(\\[\\[|\\]\\]|NAME|name|CONTEXT_FOR_NEXT|:| |a|\n){0,40}") {
        let once = clean(&text);
        prop_assert_eq!(clean(&once), once);
    }

    #[test]
    fn split_name_marker_is_detected_once_without_residue(
        prefix in "[a-zA-Z .,\n]{0,30}",
        name in "[A-Za-z][A-Za-z ]{0,15}",
        suffix in "[a-zA-Z .,\n]{0,30}",
        cuts in proptest::collection::vec(any::<usize>(), 0..8),
    ) {
        let full = format!("{}[[NAME: {}]]{}", prefix, name, suffix);
        let mut detector = NameDetector::new();
        let mut buffer = String::new();
        let mut detections = Vec::new();

        for piece in split_at_points(&full, cuts) {
            buffer.push_str(&piece);
            if let Some(found) = detector.scan(&buffer) {
                detections.push(found);
            }
            let shown = display_text(&buffer);
            prop_assert!(!shown.contains("[[NAME"), "leaked marker: {:?}", shown);
        }

        prop_assert_eq!(detections, vec![name.trim().to_string()]);
        let expected = format!("{}{}", prefix, suffix);
        prop_assert_eq!(display_text(&full), expected.trim());
        prop_assert_eq!(clean(&full), expected.trim());
    }

    #[test]
    fn handoff_marker_is_extracted_from_accumulated_text(
        body in "[a-zA-Z .,\n]{0,40}",
        summary in "[a-zA-Z][a-zA-Z ,.\n]{0,40}",
        cuts in proptest::collection::vec(any::<usize>(), 0..8),
    ) {
        let full = format!("{}\n[[CONTEXT_FOR_NEXT: {}]]", body, summary);
        let accumulated: String = split_at_points(&full, cuts).concat();
        prop_assert_eq!(extract_handoff_context(&accumulated), Some(summary.trim().to_string()));
        prop_assert!(!clean(&accumulated).contains("CONTEXT_FOR_NEXT"));
    }

    #[test]
    fn unclosed_name_marker_keeps_body_and_handoff(
        name in "[A-Za-z][A-Za-z ]{0,15}",
        body in "[a-zA-Z][a-zA-Z .,\n]{0,40}",
        summary in "[a-zA-Z][a-zA-Z ,.\n]{0,40}",
    ) {
        let full = format!("[[NAME: {}]\n{}\n[[CONTEXT_FOR_NEXT: {}]]", name, body, summary);
        prop_assert_eq!(extract_name(&full), None);
        prop_assert_eq!(extract_handoff_context(&full), Some(summary.trim().to_string()));
        let cleaned = clean(&full);
        prop_assert!(cleaned.contains(body.trim()), "lost body: {:?}", cleaned);
        prop_assert!(!cleaned.contains("CONTEXT_FOR_NEXT"));
    }
}
