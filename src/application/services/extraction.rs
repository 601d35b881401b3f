//! Delimited-block extraction from free-form model responses
//!
//! The generative model is asked to wrap machine-readable payloads in
//! `<TAG>...</TAG>` pairs (and sometimes emits fenced code blocks instead).
//! Every helper here is total: any input, including an empty string or an
//! unclosed tag, yields an empty result rather than an error.

/// Extract every non-greedy `<tag>...</tag>` occurrence, trimmed, in order.
/// Tags are case-sensitive; an opening tag without a closing one is ignored.
pub fn extract_blocks(text: &str, tag: &str) -> Vec<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(&open) {
        let after_open = &rest[start + open.len()..];
        match after_open.find(&close) {
            Some(end) => {
                blocks.push(after_open[..end].trim().to_string());
                rest = &after_open[end + close.len()..];
            }
            None => break,
        }
    }
    blocks
}

/// First `<tag>...</tag>` occurrence, when present
pub fn extract_block(text: &str, tag: &str) -> Option<String> {
    extract_blocks(text, tag).into_iter().next()
}

/// Extract the `<DOMAIN_PDDL>` and `<PROBLEM_PDDL>` payloads; either side
/// is `None` when its delimiters are absent
pub fn extract_pddl_blocks(text: &str) -> (Option<String>, Option<String>) {
    (
        extract_block(text, "DOMAIN_PDDL"),
        extract_block(text, "PROBLEM_PDDL"),
    )
}

/// Extract fenced code blocks: ```json fences first, generic ``` fences as
/// a fallback when no json-tagged fence exists
pub fn extract_fenced_json(text: &str) -> Vec<String> {
    let tagged = fenced_blocks(text, "```json");
    if !tagged.is_empty() {
        return tagged;
    }
    fenced_blocks(text, "```")
}

fn fenced_blocks(text: &str, fence: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(fence) {
        let after_open = &rest[start + fence.len()..];
        match after_open.find("```") {
            Some(end) => {
                let body = after_open[..end].trim();
                if !body.is_empty() {
                    blocks.push(body.to_string());
                }
                rest = &after_open[end + 3..];
            }
            None => break,
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_blocks_finds_all_occurrences_in_order() {
        let text = "<LORE>first</LORE> noise <LORE>second</LORE>";
        assert_eq!(extract_blocks(text, "LORE"), vec!["first", "second"]);
        assert_eq!(extract_block(text, "LORE").unwrap(), "first");
    }

    #[test]
    fn test_extract_blocks_is_total_on_degenerate_input() {
        assert!(extract_blocks("", "LORE").is_empty());
        assert!(extract_blocks("no tags at all", "LORE").is_empty());
        // Opening tag with no close
        assert!(extract_blocks("<LORE>dangling forever", "LORE").is_empty());
        // Close before open
        assert!(extract_blocks("</LORE>backwards<LORE>", "LORE").is_empty());
    }

    #[test]
    fn test_extract_blocks_is_non_greedy() {
        let text = "<STORY_JSON>{\"a\":1}</STORY_JSON><STORY_JSON>{\"b\":2}</STORY_JSON>";
        let blocks = extract_blocks(text, "STORY_JSON");
        assert_eq!(blocks[0], "{\"a\":1}");
        assert_eq!(blocks[1], "{\"b\":2}");
    }

    #[test]
    fn test_extract_blocks_is_case_sensitive() {
        assert!(extract_blocks("<lore>x</lore>", "LORE").is_empty());
    }

    #[test]
    fn test_extract_pddl_blocks() {
        let text = "intro\n<DOMAIN_PDDL>\n(define (domain d))\n</DOMAIN_PDDL>\n\
                    <PROBLEM_PDDL>\n(define (problem p))\n</PROBLEM_PDDL>\ntrailer";
        let (domain, problem) = extract_pddl_blocks(text);
        assert_eq!(domain.unwrap(), "(define (domain d))");
        assert_eq!(problem.unwrap(), "(define (problem p))");
    }

    #[test]
    fn test_extract_pddl_blocks_missing_sides_are_none() {
        let (domain, problem) = extract_pddl_blocks("<DOMAIN_PDDL>(define)</DOMAIN_PDDL>");
        assert!(domain.is_some());
        assert!(problem.is_none());

        let (domain, problem) = extract_pddl_blocks("");
        assert!(domain.is_none());
        assert!(problem.is_none());
    }

    #[test]
    fn test_extract_fenced_json_prefers_tagged_fences() {
        let text = "```\nplain\n```\n```json\n{\"x\": 1}\n```";
        assert_eq!(extract_fenced_json(text), vec!["{\"x\": 1}"]);
    }

    #[test]
    fn test_extract_fenced_json_falls_back_to_plain_fences() {
        let text = "Here you go:\n```\n{\"y\": 2}\n```";
        assert_eq!(extract_fenced_json(text), vec!["{\"y\": 2}"]);
        assert!(extract_fenced_json("nothing fenced").is_empty());
    }
}
