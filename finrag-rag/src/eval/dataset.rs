//! Labeled evaluation dataset loaded from CSV.
//!
//! The reader handles quoted fields, doubled quotes, and line breaks inside
//! quotes, which question and answer text routinely contain.

use crate::error::RagError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// One labeled example: the question, its answer, and the source document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalExample {
    /// Base id of the document that answers the question.
    pub id: String,
    pub question: String,
    pub expected_answer: String,
}

const ID_COLUMNS: &[&str] = &["id", "identity"];
const QUESTION_COLUMNS: &[&str] = &["question"];
const ANSWER_COLUMNS: &[&str] = &["answer", "expected_answer"];

/// Split CSV text into records of fields.
///
/// Fully blank lines are skipped. An unterminated quoted field is an error.
pub fn parse_csv(content: &str) -> Result<Vec<Vec<String>>, RagError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut line = 1usize;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                field_started = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                if field_started || !field.is_empty() {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                field_started = false;
                line += 1;
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    if in_quotes {
        return Err(RagError::dataset(format!(
            "unterminated quoted field at line {}",
            line
        )));
    }
    if field_started || !field.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

fn find_column(header: &[String], names: &[&str]) -> Result<usize, RagError> {
    header
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        .ok_or_else(|| {
            RagError::dataset(format!(
                "missing column '{}' (found: {})",
                names.join("' or '"),
                header.join(", ")
            ))
        })
}

fn field(record: &[String], col: usize) -> String {
    record.get(col).map(|s| s.trim()).unwrap_or_default().to_string()
}

/// Build examples from CSV text, skipping rows with a blank question.
///
/// `limit` caps the number of examples returned.
pub fn parse_examples(content: &str, limit: Option<usize>) -> Result<Vec<EvalExample>, RagError> {
    let mut records = parse_csv(content)?.into_iter();
    let header = records
        .next()
        .ok_or_else(|| RagError::dataset("empty CSV file"))?;
    let id_col = find_column(&header, ID_COLUMNS)?;
    let question_col = find_column(&header, QUESTION_COLUMNS)?;
    let answer_col = find_column(&header, ANSWER_COLUMNS)?;

    let mut examples = Vec::new();
    let mut skipped = 0usize;
    for record in records {
        if limit.is_some_and(|max| examples.len() >= max) {
            break;
        }
        let question = field(&record, question_col);
        if question.is_empty() {
            skipped += 1;
            continue;
        }
        examples.push(EvalExample {
            id: field(&record, id_col),
            question,
            expected_answer: field(&record, answer_col),
        });
    }
    if skipped > 0 {
        debug!(skipped, "Skipped rows with a blank question");
    }
    Ok(examples)
}

/// Read and parse the dataset file.
pub async fn load_dataset(path: &Path, limit: Option<usize>) -> Result<Vec<EvalExample>, RagError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        RagError::dataset(format!("failed to read {}: {}", path.display(), e))
    })?;
    let examples = parse_examples(&content, limit)?;
    info!(path = %path.display(), examples = examples.len(), "Loaded evaluation dataset");
    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_csv_quotes_and_newlines() {
        let records = parse_csv("a,b,c\n\"x, y\",\"he said \"\"hi\"\"\",\"line1\nline2\"\r\n").unwrap();
        assert_eq!(
            records,
            vec![
                vec!["a", "b", "c"],
                vec!["x, y", "he said \"hi\"", "line1\nline2"],
            ]
        );
    }

    #[test]
    fn test_parse_csv_empty_fields_and_blank_lines() {
        let records = parse_csv("a,b\n\n,\n1,\n").unwrap();
        assert_eq!(records, vec![vec!["a", "b"], vec!["", ""], vec!["1", ""]]);
    }

    #[test]
    fn test_parse_csv_no_trailing_newline() {
        assert_eq!(parse_csv("a,b\n1,2").unwrap(), vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_parse_csv_unterminated_quote() {
        assert!(matches!(
            parse_csv("a\n\"open").unwrap_err(),
            RagError::Dataset(_)
        ));
    }

    #[test]
    fn test_parse_examples_columns_and_blank_questions() {
        let csv = "id,question,answer,extra\n\
                   AAPL/2019/p1,What was revenue?,260,x\n\
                   AAPL/2019/p2,  ,1,x\n\
                   MSFT/2018/p3,\"Change, in %?\",12.5%,x\n";
        let examples = parse_examples(csv, None).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[1].id, "MSFT/2018/p3");
        assert_eq!(examples[1].question, "Change, in %?");
        assert_eq!(examples[1].expected_answer, "12.5%");
    }

    #[test]
    fn test_parse_examples_alternate_headers_and_limit() {
        let csv = "identity,question,expected_answer\na,q1,1\nb,q2,2\nc,q3,3\n";
        let examples = parse_examples(csv, Some(2)).unwrap();
        assert_eq!(
            examples.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_parse_examples_missing_column() {
        let err = parse_examples("id,answer\na,1\n", None).unwrap_err();
        assert!(err.to_string().contains("question"));
        assert!(parse_examples("", None).is_err());
    }

    #[tokio::test]
    async fn test_load_dataset_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "id,question,answer\nd1,q,5\n").unwrap();
        let examples = load_dataset(&path, Some(500)).await.unwrap();
        assert_eq!(examples.len(), 1);

        let missing = load_dataset(&dir.path().join("nope.csv"), None).await;
        assert!(matches!(missing.unwrap_err(), RagError::Dataset(_)));
    }
}
