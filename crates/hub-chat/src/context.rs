//! Builds the `<<REF>>…<<END>>` reference block the chat model is grounded
//! on (spec.md §4.8 step 3).

use hub_search::SearchHit;

pub const CONTEXT_TOP_K: usize = 5;
pub const CONTEXT_TEXT_TRUNCATE_CHARS: usize = 300;

pub fn build_reference_block(hits: &[SearchHit], no_references_line: &str) -> String {
    if hits.is_empty() {
        return format!("<<REF>>\n{no_references_line}\n<<END>>");
    }

    let mut body = String::new();
    for (i, hit) in hits.iter().take(CONTEXT_TOP_K).enumerate() {
        let truncated: String = hit.text.chars().take(CONTEXT_TEXT_TRUNCATE_CHARS).collect();
        body.push_str(&format!("[{}] ({}) {}\n", i + 1, hit.filename, truncated));
    }
    format!("<<REF>>\n{body}<<END>>")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(filename: &str, text: &str) -> SearchHit {
        SearchHit {
            fingerprint: "fp".into(),
            filename: filename.into(),
            chunk_id: 1,
            text: text.into(),
            score: 1.0,
        }
    }

    #[test]
    fn matches_the_documented_single_hit_shape() {
        let block = build_reference_block(&[hit("a.pdf", "Alpha beta.")], "No references available.");
        assert_eq!(block, "<<REF>>\n[1] (a.pdf) Alpha beta.\n<<END>>");
    }

    #[test]
    fn empty_hits_use_the_configured_no_references_line() {
        let block = build_reference_block(&[], "No references available.");
        assert_eq!(block, "<<REF>>\nNo references available.\n<<END>>");
    }

    #[test]
    fn truncates_long_passages_to_300_chars() {
        let long_text = "x".repeat(400);
        let block = build_reference_block(&[hit("a.pdf", &long_text)], "none");
        let expected_body = "x".repeat(300);
        assert_eq!(block, format!("<<REF>>\n[1] (a.pdf) {expected_body}\n<<END>>"));
    }

    #[test]
    fn only_the_top_5_hits_are_rendered() {
        let hits: Vec<SearchHit> = (0..8).map(|i| hit(&format!("f{i}.pdf"), "text")).collect();
        let block = build_reference_block(&hits, "none");
        assert_eq!(block.matches("] (f").count(), 5);
    }
}
