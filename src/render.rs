use crate::pipeline::Answer;

const DIVIDER: &str = "----------------------------------";

/// Terminal layout: websites in search order, the reasoning trace, then the
/// final answer, separated by dividers.
pub fn format_answer(answer: &Answer, show_draft: bool) -> String {
    let mut output = String::from("Websites searched:\n");

    if answer.results.is_empty() {
        output.push_str("\n(no results found)\n");
    }
    for result in &answer.results {
        output.push_str(&format!("\nWebsite: {}\n", result.url));
        output.push_str(&format!("Content snippet: {}\n", result.content.trim()));
    }
    output.push_str(DIVIDER);

    output.push_str("\n\nReasoning:\n\n");
    if answer.reasoning.trim().is_empty() {
        output.push_str("(no explicit reasoning trace)");
    } else {
        output.push_str(answer.reasoning.trim());
    }
    output.push('\n');
    output.push_str(DIVIDER);

    if show_draft {
        output.push_str("\n\nDraft answer (reasoning model):\n\n");
        output.push_str(answer.draft.trim());
        output.push('\n');
        output.push_str(DIVIDER);
    }

    output.push_str("\n\nAnswer:\n\n");
    output.push_str(&answer.answer);
    output.push('\n');
    output
}
