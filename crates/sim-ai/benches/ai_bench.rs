use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_core::{GoodTag, GoodsLedger, Projects, RecipeCatalog};
use sim_econ::{estimate_best_cost, EstimationContext, Skills};

fn bench_plan(c: &mut Criterion) {
    let catalog = RecipeCatalog::standard().unwrap();
    let skill = Skills::new();
    let projects = Projects::new();
    let assets = GoodsLedger::new();
    let ctx = EstimationContext {
        catalog: &catalog,
        skill: &skill,
        projects: &projects,
        assets: &assets,
        market: None,
    };

    c.bench_function("estimate house", |b| {
        let node = catalog.requirements(GoodTag::House).expect("house recipe");
        b.iter(|| black_box(estimate_best_cost(node, &ctx)))
    });
    c.bench_function("load cloth tree", |b| {
        b.iter(|| black_box(sim_ai::TaskTree::load(GoodTag::Cloth, &ctx).map(|t| t.len())))
    });
    c.bench_function("load house tree", |b| {
        b.iter(|| black_box(sim_ai::TaskTree::load(GoodTag::House, &ctx).map(|t| t.len())))
    });
}

criterion_group!(benches, bench_plan);
criterion_main!(benches);
