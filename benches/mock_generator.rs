use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use vitrine::adapters::mock_generator::MockGenerator;
use vitrine::domain::SchemaNode;

fn pokemon_node() -> SchemaNode {
    SchemaNode::object([
        ("name", SchemaNode::String),
        ("level", SchemaNode::Number),
        ("shiny", SchemaNode::optional(SchemaNode::Boolean)),
        (
            "types",
            SchemaNode::array(SchemaNode::enumeration([json!("fire"), json!("water"), json!("grass")])),
        ),
        (
            "moves",
            SchemaNode::array(SchemaNode::object([
                ("name", SchemaNode::String),
                ("power", SchemaNode::nullable(SchemaNode::Number)),
            ])),
        ),
    ])
}

fn benchmark_schema_node(c: &mut Criterion) {
    let generator = MockGenerator::default();
    let schema = pokemon_node();
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("generate_schema_node", |b| {
        b.iter(|| generator.generate_with_rng(black_box(&schema), &mut rng))
    });
}

fn benchmark_json_schema(c: &mut Criterion) {
    let generator = MockGenerator::default();
    let schema = json!({
        "type": "object",
        "required": ["name", "level", "types"],
        "properties": {
            "name": { "type": "string" },
            "level": { "type": "integer" },
            "types": { "type": "array", "items": { "enum": ["fire", "water", "grass"] } }
        }
    });
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("generate_json_schema", |b| {
        b.iter(|| generator.generate_with_rng(black_box(&schema), &mut rng))
    });
}

fn benchmark_nesting_depth(c: &mut Criterion) {
    let generator = MockGenerator::default();
    let mut group = c.benchmark_group("nesting_depth");

    for depth in [1usize, 4, 8] {
        let schema = (0..depth).fold(SchemaNode::String, |inner, _| {
            SchemaNode::object([("child", inner)])
        });
        let mut rng = StdRng::seed_from_u64(depth as u64);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &schema, |b, schema| {
            b.iter(|| generator.generate_with_rng(schema, &mut rng))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_schema_node,
    benchmark_json_schema,
    benchmark_nesting_depth
);
criterion_main!(benches);
