use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use xmlcontent::namespaces::{NamespaceContext, QName};
use xmlcontent::notation::compile;
use xmlcontent::validators::ContentValidator;
use xmlcontent::CompileOptions;

static MODELS: [(&str, &str); 4] = [
    ("sequence", "(title, author+, (isbn | issn)?, note*)"),
    ("nested_choice", "((a | b | c)*, (d, (e | f)+)*, g?)"),
    ("range", "(head, item{2,50}, tail?)"),
    ("all_group", "all(a, b?, c, d?, e)"),
];

fn children(model: &str) -> Vec<QName> {
    let names: &[&str] = match model {
        "sequence" => &["title", "author", "author", "author", "isbn", "note", "note"],
        "nested_choice" => &["a", "b", "c", "a", "d", "e", "f", "d", "f", "g"],
        "range" => &["head", "item", "item", "item", "item", "item", "item", "tail"],
        _ => &["e", "c", "a", "d", "b"],
    };
    names.iter().map(|name| QName::local(*name)).collect()
}

fn matches(validator: &ContentValidator, children: &[QName]) -> bool {
    let mut run = validator.new_run();
    for child in children {
        if validator.validate_element(&mut run, child).is_err() {
            return false;
        }
    }
    validator.complete_validation(&run)
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let namespaces = NamespaceContext::new();

    for (name, model) in MODELS {
        group.bench_with_input(name, &model, |b, &m| {
            b.iter(|| compile(black_box(m), &namespaces, &CompileOptions::default()))
        });
    }

    let nfa = CompileOptions {
        enforce_upa: false,
        prefer_deterministic: false,
        ..CompileOptions::default()
    };
    group.bench_function("nested_choice_without_table", |b| {
        b.iter(|| compile(black_box(MODELS[1].1), &namespaces, &nfa))
    });
}

fn bench_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("match");
    let namespaces = NamespaceContext::new();

    for (name, model) in MODELS {
        let validator = match compile(model, &namespaces, &CompileOptions::default()) {
            Ok(validator) => validator,
            Err(e) => panic!("{} does not compile: {}", model, e),
        };
        let input = children(name);
        group.throughput(Throughput::Elements(input.len() as u64));
        group.bench_with_input(name, &input, |b, input| {
            b.iter(|| matches(&validator, black_box(input)))
        });
    }
}

criterion_group!(benches, bench_compile, bench_match);
criterion_main!(benches);
