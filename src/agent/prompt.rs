//! Proposal prompt template.

/// Placeholder draft for the first turn.
pub const EMPTY_DRAFT: &str = "Starting new proposal...";

/// Values substituted into the proposal prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptContext<'a> {
    pub user_input: &'a str,
    pub draft: &'a str,
    pub timeline: &'a str,
    pub budget: &'a str,
    pub requirements: &'a [String],
}

/// Render the proposal prompt sent to the model.
pub fn proposal_prompt(ctx: &PromptContext<'_>) -> String {
    let draft = if ctx.draft.trim().is_empty() { EMPTY_DRAFT } else { ctx.draft };
    let timeline_note = note("Timeline", ctx.timeline);
    let budget_note = note("Budget", ctx.budget);
    let requirements_note = if ctx.requirements.is_empty() {
        String::new()
    } else {
        format!("Requirements: {}", ctx.requirements.join(", "))
    };

    format!(
        r#"
You're helping write a comprehensive web development proposal.
The user said: "{user_input}"

Please provide detailed, professional content that can be included in a proposal. Structure it with these sections:

1. Project Overview - A compelling overview of the project that demonstrates understanding and value proposition
2. Scope of Work - Detailed deliverables and what's included
3. Technical Approach - Technologies and methodologies to be used
4. Timeline Estimates - Project phases and milestones{timeline_note}
5. Budget Estimates - Detailed cost breakdown{budget_note}
6. Next Steps - What happens after proposal acceptance

{requirements_note}

IMPORTANT FORMATTING RULES:
- Use bullet points in each section data except project overview
- Section headers should be exactly: "Project Overview", "Scope of Work", "Technical Approach", "Timeline Estimates", "Budget Estimates", "Next Steps" and bold
- Make the Project Overview compelling and business-focused
- At last must be a signature section for acceptance
- Keep content professional and detailed

Current draft so far: {draft}
"#,
        user_input = ctx.user_input,
    )
}

fn note(label: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        String::new()
    } else {
        format!(" ({label}: {value})")
    }
}
