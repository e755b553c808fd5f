use criterion::{Criterion, criterion_group, criterion_main};
use easyfl::{Library, decoder::decode_with_arity, evaluate};
use std::hint::black_box;

const GUARD: &str = "and(
    require(greaterOrEqualThan($0, $1), 0x6c6f77),
    equal(blake3(concat($0, $1)), $2),
    or(isEmpty($3), lessThan(tail($3, 1), 0x0000000000000064))
)";

fn bench_pipeline(c: &mut Criterion) {
    let lib = Library::base().unwrap();
    let source = easyfl::parser::strip_whitespace(GUARD);
    let bytecode = lib.compile(&source).unwrap().bytecode;

    let amount = 500u64.to_be_bytes().to_vec();
    let minimum = 100u64.to_be_bytes().to_vec();
    let digest = blake3::hash(&[amount.clone(), minimum.clone()].concat())
        .as_bytes()
        .to_vec();
    let args = vec![amount, minimum, digest, vec![0; 9]];

    c.bench_function("compile guard", |b| {
        b.iter(|| lib.compile(black_box(&source)).unwrap())
    });
    c.bench_function("decode guard", |b| {
        b.iter(|| decode_with_arity(&lib, black_box(&bytecode), 4).unwrap())
    });

    let formula = decode_with_arity(&lib, &bytecode, 4).unwrap();
    c.bench_function("evaluate guard", |b| {
        b.iter(|| evaluate(&lib, &(), black_box(&formula), &args).unwrap())
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
