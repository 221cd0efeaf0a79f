//! Prompt templates for the model-backed pipeline stages.

/// Clean a prompt before it is sent to the model.
pub fn format_prompt(prompt: &str) -> String {
    prompt.trim().replace("\n\n", "\n")
}

/// Asks the model for alternative retrieval queries, one per line.
pub fn generate_queries(question: &str) -> String {
    format!(
        r#"You are helping a financial analyst search a collection of company filings.

Rewrite the question below into up to three short search queries that would retrieve the tables and passages needed to answer it. Keep company names, years, and metric names exactly as written.

Write one query per line with no numbering, bullets, or commentary.

Question: {question}"#
    )
}

/// Asks the model to condense retrieved evidence and cite its sources.
pub fn filter_context(question: &str, documents: &str) -> String {
    format!(
        r#"You are given a financial question and a set of retrieved document passages.

Copy only the facts, table rows, and figures that are needed to answer the question. Do not answer the question and do not compute anything.

Wrap your output in <OUTPUT> tags. After the extracted facts, add a line "Sources:" followed by the passages you used, one per line, each starting with "- ".

Question: {question}

Documents:
{documents}"#
    )
}

/// Asks the model to reason over the evidence and tag the final answer.
pub fn reason_and_answer(question: &str, context_table: &str, context_narrative: &str) -> String {
    format!(
        r#"You are a financial analyst answering a question from company filings.

Use the table and the narrative text below. Think step by step: identify the relevant values, state the formula, and compute the result. Percentages should be written with a % sign and rounded to one decimal place unless the question asks otherwise.

Table:
{context_table}

Narrative:
{context_narrative}

Question: {question}

End your response with the final answer only, wrapped in <ANSWER></ANSWER> tags."#
    )
}

/// Asks the model to pull the final answer out of free-form reasoning.
pub fn extract_answer(question: &str, generation: &str) -> String {
    format!(
        r#"Below is a question and a response that reasons towards its answer.

Reply with the final answer only: a single number, percentage, or short phrase. Do not include any explanation.

Question: {question}

Response:
{generation}"#
    )
}
