//! Property-based tests for pipeline parsing and evaluation scoring.

use proptest::prelude::*;

use finrag_core::search::MockSearch;
use finrag_core::types::Evidence;
use finrag_rag::eval::{
    EvaluationResult, compute_accuracy, compute_precision, compute_recall, parse_csv,
    relative_score, results_to_csv,
};
use finrag_rag::pipeline::query::parse_queries;
use finrag_rag::pipeline::{Retriever, filter_by_years, parse_tagged_answer, split_evidence};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn identity() -> impl Strategy<Value = String> {
    ("[A-D]", 2016u32..2021, 0u32..3).prop_map(|(co, year, row)| format!("{}/{}/p::row_{}", co, year, row))
}

// --- Query expansion ---

proptest! {
    #[test]
    fn queries_unique_and_include_question(
        lines in prop::collection::vec("[a-c ]{0,4}", 0..10),
        question in "[a-z?]{1,12}",
    ) {
        let queries = parse_queries(&lines.join("\n"), &question);
        let unique: HashSet<&String> = queries.iter().collect();
        prop_assert_eq!(unique.len(), queries.len());
        prop_assert!(queries.contains(&question));
        prop_assert!(queries.iter().all(|q| !q.trim().is_empty()));
    }
}

// --- Retrieval ---

proptest! {
    #[test]
    fn year_filter_never_empties_input(
        ids in prop::collection::vec(identity(), 1..12),
        years in prop::collection::vec(2014u32..2023, 0..3),
    ) {
        let docs: Vec<Evidence> = ids.iter().map(|id| Evidence::new(id.clone(), "passage: t")).collect();
        let years: Vec<String> = years.iter().map(|y| y.to_string()).collect();
        let kept = filter_by_years(docs.clone(), &years);
        prop_assert!(!kept.is_empty());
        prop_assert!(kept.iter().all(|d| docs.contains(d)));
    }

    #[test]
    fn retrieval_dedups_regardless_of_completion_order(
        batches in prop::collection::vec(
            (prop::collection::vec(identity(), 0..6), 0u64..5),
            1..5,
        ),
    ) {
        let mut search = MockSearch::new();
        let mut queries = Vec::new();
        let mut expected = HashSet::new();
        for (i, (ids, delay)) in batches.iter().enumerate() {
            let query = format!("q{}", i);
            let docs: Vec<Evidence> = ids.iter().map(|id| Evidence::new(id.clone(), "passage: t")).collect();
            expected.extend(ids.iter().cloned());
            search = search
                .with_results(&query, docs)
                .with_delay(&query, Duration::from_millis(*delay));
            queries.push(query);
        }
        let retriever = Retriever::new(Arc::new(search), 10);
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let docs = runtime.block_on(retriever.retrieve(&queries, "no year")).unwrap();

        let ids: Vec<String> = docs.into_iter().map(|d| d.identity).collect();
        let unique: HashSet<String> = ids.iter().cloned().collect();
        prop_assert_eq!(unique.len(), ids.len());
        prop_assert_eq!(unique, expected);
    }
}

// --- Parsing model output ---

proptest! {
    #[test]
    fn evidence_split_parts_are_trimmed(content in "(passage: )?[a-z| \n]{0,30}") {
        let (table, narrative) = split_evidence(&content);
        prop_assert_eq!(table.trim(), table.as_str());
        prop_assert_eq!(narrative.trim(), narrative.as_str());
    }

    #[test]
    fn tagged_answer_is_recovered(answer in "[a-z0-9.%$ ]{0,12}", prefix in "[a-z ]{0,20}") {
        let generation = format!("{}<ANSWER>{}</ANSWER>", prefix, answer);
        prop_assert_eq!(parse_tagged_answer(&generation), Some(answer.trim().to_string()));
    }
}

// --- Scoring ---

proptest! {
    #[test]
    fn accuracy_is_within_unit_interval(predicted in ".{0,12}", expected in ".{0,12}") {
        let score = compute_accuracy(&predicted, &expected);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn relative_score_is_within_unit_interval(a in -1e12f64..1e12, b in -1e12f64..1e12) {
        let score = relative_score(a, b);
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert_eq!(relative_score(a, a), 1.0);
    }

    #[test]
    fn precision_never_exceeds_recall(
        ids in prop::collection::vec(identity(), 0..8),
        expected in "[A-D]/20(16|17|18|19|20)/p",
    ) {
        let precision = compute_precision(&ids, &expected);
        let recall = compute_recall(&ids, &expected);
        prop_assert!(precision <= recall);
        if recall == 1.0 {
            prop_assert_eq!(precision, 1.0 / ids.len() as f64);
        }
    }
}

// --- Result table ---

proptest! {
    #[test]
    fn result_table_text_survives_csv(question in "[a-z,\"\n ]{1,20}", answer in "[0-9.,$%]{0,8}") {
        let mut row = EvaluationResult::failed(
            &finrag_rag::EvalExample {
                id: "DOC/2019/p1".to_string(),
                question: question.clone(),
                expected_answer: answer.clone(),
            },
            0.5,
            &finrag_rag::RagError::evaluation("x"),
        );
        row.error = None;
        let records = parse_csv(&results_to_csv(&[row])).unwrap();
        prop_assert_eq!(records.len(), 2);
        prop_assert_eq!(&records[1][1], &question);
        prop_assert_eq!(&records[1][2], &answer);
    }
}
