//! Matchers must agree with each other
//!
//! Random content models over a small alphabet are compiled twice, once into
//! a transition table and once into the position-set form, and both are run
//! against every child sequence up to a bounded length. Models with numeric
//! ranges are checked the same way against a copy in which every range is
//! written out as repeated and optional copies of its body.

use proptest::prelude::*;

use xmlcontent::namespaces::{NamespaceContext, QName};
use xmlcontent::notation::compile;
use xmlcontent::validators::{ContentValidator, Representation};
use xmlcontent::CompileOptions;

const ALPHABET: [&str; 4] = ["a", "b", "c", "d"];
const MAX_LENGTH: usize = 5;

fn deterministic() -> CompileOptions {
    CompileOptions {
        enforce_upa: false,
        prefer_deterministic: true,
        ..CompileOptions::default()
    }
}

fn non_deterministic() -> CompileOptions {
    CompileOptions {
        enforce_upa: false,
        prefer_deterministic: false,
        ..CompileOptions::default()
    }
}

/// Models over a, b and c; "d" never occurs so rejection paths are covered
fn model_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![Just("a"), Just("b"), Just("c")].prop_map(String::from);
    leaf.prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            (prop::collection::vec(inner.clone(), 1..4), any::<bool>()).prop_map(
                |(items, choice)| {
                    let separator = if choice { " | " } else { ", " };
                    format!("({})", items.join(separator))
                }
            ),
            (inner, prop_oneof![Just("?"), Just("*"), Just("+")])
                .prop_map(|(item, quantifier)| format!("({}){}", item, quantifier)),
        ]
    })
}

/// Content model term that can be written with or without numeric ranges
#[derive(Debug, Clone)]
enum Term {
    Name(&'static str),
    Group(Vec<Term>, bool),
    Closure(Box<Term>, &'static str),
    Range(Box<Term>, u32, Option<u32>),
}

impl Term {
    /// Notation for the term; with `expand`, `x{m,n}` becomes `m` copies of
    /// `x` followed by `n - m` optional copies, or by `x*` when unbounded
    fn render(&self, expand: bool) -> String {
        match self {
            Term::Name(name) => name.to_string(),
            Term::Group(items, choice) => {
                let separator = if *choice { " | " } else { ", " };
                let items: Vec<String> = items.iter().map(|item| item.render(expand)).collect();
                format!("({})", items.join(separator))
            }
            Term::Closure(body, quantifier) => format!("({}){}", body.render(expand), quantifier),
            Term::Range(body, min, max) => {
                let body = body.render(expand);
                if !expand {
                    let max = max.map_or_else(|| "unbounded".to_string(), |max| max.to_string());
                    return format!("({}){{{},{}}}", body, min, max);
                }
                let mut copies = vec![format!("({})", body); *min as usize];
                match max {
                    Some(max) => copies.extend(
                        std::iter::repeat(format!("({})?", body)).take((max - min) as usize),
                    ),
                    None => copies.push(format!("({})*", body)),
                }
                format!("({})", copies.join(", "))
            }
        }
    }
}

/// Range bounds with a non-zero maximum: `(min, max)`, `None` for unbounded
fn bounds_strategy() -> impl Strategy<Value = (u32, Option<u32>)> {
    (0u32..3, prop::option::of(0u32..3))
        .prop_map(|(min, extra)| (min, extra.map(|extra| (min + extra).max(1))))
}

/// Models with at least one range, nested ranges and ranges over the shared
/// particle `a#1` included
fn range_model_strategy() -> impl Strategy<Value = Term> {
    let leaf = prop_oneof![Just("a"), Just("b"), Just("c"), Just("a#1")].prop_map(Term::Name);
    let term = leaf.prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            (prop::collection::vec(inner.clone(), 1..3), any::<bool>())
                .prop_map(|(items, choice)| Term::Group(items, choice)),
            (inner.clone(), prop_oneof![Just("?"), Just("*"), Just("+")])
                .prop_map(|(body, quantifier)| Term::Closure(Box::new(body), quantifier)),
            (inner, bounds_strategy())
                .prop_map(|(body, (min, max))| Term::Range(Box::new(body), min, max)),
        ]
    });
    (term, bounds_strategy()).prop_map(|(body, (min, max))| Term::Range(Box::new(body), min, max))
}

fn accepts(validator: &ContentValidator, children: &[usize]) -> bool {
    let mut run = validator.new_run();
    children.iter().all(|&c| {
        validator
            .validate_element(&mut run, &QName::local(ALPHABET[c]))
            .is_ok()
    }) && validator.complete_validation(&run)
}

/// Every sequence over the alphabet of length `0..=max_length`
fn all_sequences(max_length: usize) -> Vec<Vec<usize>> {
    let mut sequences = vec![Vec::new()];
    let mut frontier = vec![Vec::new()];
    for _ in 0..max_length {
        let mut next = Vec::new();
        for prefix in &frontier {
            for symbol in 0..ALPHABET.len() {
                let mut sequence: Vec<usize> = prefix.clone();
                sequence.push(symbol);
                next.push(sequence);
            }
        }
        sequences.extend(next.iter().cloned());
        frontier = next;
    }
    sequences
}

fn assert_equivalent(model: &str) -> Result<(), TestCaseError> {
    let namespaces = NamespaceContext::new();
    let dfa = compile(model, &namespaces, &deterministic())
        .map_err(|e| TestCaseError::fail(format!("{}: {}", model, e)))?;
    let nfa = compile(model, &namespaces, &non_deterministic())
        .map_err(|e| TestCaseError::fail(format!("{}: {}", model, e)))?;

    prop_assume!(matches!(
        dfa.representation(),
        Representation::Deterministic { .. }
    ));
    prop_assert_eq!(nfa.representation(), Representation::NonDeterministic);
    prop_assert_eq!(dfa.is_emptiable(), nfa.is_emptiable());

    for sequence in all_sequences(MAX_LENGTH) {
        let names: Vec<&str> = sequence.iter().map(|&c| ALPHABET[c]).collect();
        prop_assert_eq!(
            accepts(&dfa, &sequence),
            accepts(&nfa, &sequence),
            "{} disagrees on {:?}",
            model,
            names
        );
    }
    Ok(())
}

fn assert_ranges_match_expansion(term: &Term) -> Result<(), TestCaseError> {
    let namespaces = NamespaceContext::new();
    let model = term.render(false);
    let expanded = term.render(true);
    let counting = compile(&model, &namespaces, &deterministic())
        .map_err(|e| TestCaseError::fail(format!("{}: {}", model, e)))?;
    let reference = compile(&expanded, &namespaces, &non_deterministic())
        .map_err(|e| TestCaseError::fail(format!("{}: {}", expanded, e)))?;

    prop_assert_eq!(reference.representation(), Representation::NonDeterministic);
    prop_assert_eq!(counting.is_emptiable(), reference.is_emptiable(), "{}", model);

    for sequence in all_sequences(MAX_LENGTH) {
        let names: Vec<&str> = sequence.iter().map(|&c| ALPHABET[c]).collect();
        prop_assert_eq!(
            accepts(&counting, &sequence),
            accepts(&reference, &sequence),
            "{} disagrees with {} on {:?}",
            model,
            expanded,
            names
        );
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_dfa_and_nfa_accept_the_same_sequences(model in model_strategy()) {
        assert_equivalent(&model)?;
    }

    #[test]
    fn test_ranges_accept_their_expansion(term in range_model_strategy()) {
        assert_ranges_match_expansion(&term)?;
    }
}

#[test]
fn test_known_models_are_equivalent() {
    for model in [
        "(a, b*)",
        "((a | b)*, c)",
        "((a, b) | (a, c))",
        "((a)?, (a)+)",
        "(((a | b)+, c)*)",
    ] {
        assert_equivalent(model).unwrap();
    }
}

#[test]
fn test_known_range_models_match_expansion() {
    let a = || Box::new(Term::Name("a"));
    let shared = || Box::new(Term::Name("a#1"));
    let cases = [
        // (a{1,2}){2,2}
        Term::Range(Box::new(Term::Range(a(), 1, Some(2))), 2, Some(2)),
        // (a{2,3}){2,2}
        Term::Range(Box::new(Term::Range(a(), 2, Some(3))), 2, Some(2)),
        // (a#1{1,2}, a#1)
        Term::Group(vec![Term::Range(shared(), 1, Some(2)), Term::Name("a#1")], false),
        // ((a+){2,3}, b*){1,unbounded}
        Term::Range(
            Box::new(Term::Group(
                vec![
                    Term::Range(Box::new(Term::Closure(a(), "+")), 2, Some(3)),
                    Term::Closure(Box::new(Term::Name("b")), "*"),
                ],
                false,
            )),
            1,
            None,
        ),
        // ((a | b?){2,3})*
        Term::Closure(
            Box::new(Term::Range(
                Box::new(Term::Group(
                    vec![Term::Name("a"), Term::Closure(Box::new(Term::Name("b")), "?")],
                    true,
                )),
                2,
                Some(3),
            )),
            "*",
        ),
    ];
    for term in &cases {
        assert_ranges_match_expansion(term).unwrap();
    }
}

#[test]
fn test_budget_overflow_keeps_matching() {
    let options = CompileOptions {
        limits: xmlcontent::Limits {
            dfa_state_budget: 1,
            ..Default::default()
        },
        ..deterministic()
    };
    let small = compile("((a | b)*, c)", &NamespaceContext::new(), &options).unwrap();
    assert_eq!(small.representation(), Representation::NonDeterministic);

    let full = compile("((a | b)*, c)", &NamespaceContext::new(), &deterministic()).unwrap();
    for sequence in all_sequences(4) {
        assert_eq!(accepts(&small, &sequence), accepts(&full, &sequence));
    }
}
