#![deny(warnings)]

//! Headless CLI: runs the agent economy from a scenario file, or prints the
//! acquisition plan for a single good.

use anyhow::{Context, Result};
use sim_ai::{eval_best_task, TaskTree};
use sim_core::{GoodTag, GoodsLedger, Projects, RecipeCatalog, RequirementTreeNode, SimConfig};
use sim_econ::{
    estimate_baseline_production_cost, estimate_best_cost, eval_best_action,
    EstimationContext, Skills,
};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    scenario: Option<String>,
    months: Option<u32>,
    agents: Option<u32>,
    seed: Option<u64>,
    market: bool,
    json: bool,
    plan: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next(),
            "--months" => args.months = it.next().and_then(|s| s.parse().ok()),
            "--agents" => args.agents = it.next().and_then(|s| s.parse().ok()),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--market" => args.market = true,
            "--json" => args.json = true,
            "--plan" => args.plan = it.next(),
            _ => {}
        }
    }
    args
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut cfg = match &args.scenario {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading scenario {path}"))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing scenario {path}"))?
        }
        None => SimConfig::default(),
    };
    if let Some(agents) = args.agents {
        cfg.agents = agents;
    }
    if let Some(seed) = args.seed {
        cfg.rng_seed = seed;
    }
    cfg.with_market |= args.market;
    cfg.validate()?;
    Ok(cfg)
}

/// Print how an agent with empty hands would acquire one `tag`.
fn print_plan(catalog: &RecipeCatalog, tag: GoodTag) -> Result<()> {
    let skill = Skills::new();
    let projects = Projects::new();
    let assets = GoodsLedger::new();
    let ctx = EstimationContext {
        catalog,
        skill: &skill,
        projects: &projects,
        assets: &assets,
        market: None,
    };
    let root = catalog
        .requirements(tag)
        .with_context(|| format!("no recipe for {tag}"))?;

    println!("Plan | {tag}");
    root.walk(&mut |node: &RequirementTreeNode, depth: usize| {
        let best = estimate_best_cost(node, &ctx)
            .map_or_else(|| "-".to_string(), |h| h.to_string());
        println!(
            "{:indent$}{} | best: {}h | baseline: {}h | action: {:?}",
            "",
            node.good(),
            best,
            estimate_baseline_production_cost(node, catalog),
            eval_best_action(node, &ctx),
            indent = depth * 2
        );
    });
    let next = eval_best_task(root, &ctx)?;
    let tree = TaskTree::load(tag, &ctx)?;
    println!("Next task: {:?}", next.good());
    println!("Task tree: {} nodes", tree.len());
    Ok(())
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(scenario = ?args.scenario, months = ?args.months, "starting CLI");

    let cfg = load_config(&args)?;
    let catalog = cfg.catalog()?;

    if let Some(tag) = &args.plan {
        return print_plan(&catalog, tag.parse()?);
    }

    println!(
        "World OK | agents: {} | recipes: {} | sources: {} | market: {}",
        cfg.agents,
        catalog.recipes().count(),
        cfg.sources.len(),
        cfg.with_market
    );

    let months = args.months.unwrap_or(1);
    let snap = sim_runtime::run_months(cfg, months)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snap)?);
        return Ok(());
    }

    println!(
        "KPI | months: {} | living: {} | dead: {} | removed: {} | goods: {} | houses: {} | meals: {} | errors: {}",
        snap.months_run,
        snap.living,
        snap.dead,
        snap.removed,
        snap.total_goods(),
        snap.goods.get(&GoodTag::House).copied().unwrap_or(0),
        snap.goods.get(&GoodTag::Meal).copied().unwrap_or(0),
        snap.scheduler_errors
    );
    for (tag, price) in &snap.prices {
        println!("Price | {tag}: {price}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_scenarios_parse_and_validate() {
        for text in [
            include_str!("../../../scenarios/market.yaml"),
            include_str!("../../../scenarios/famine.yaml"),
        ] {
            let cfg: SimConfig = serde_yaml::from_str(text).unwrap();
            cfg.validate().unwrap();
            cfg.catalog().unwrap();
        }
    }

    #[test]
    fn market_scenario_overrides_defaults() {
        let cfg: SimConfig =
            serde_yaml::from_str(include_str!("../../../scenarios/market.yaml")).unwrap();
        assert_eq!(cfg.agents, 5);
        assert!(cfg.with_market);
        assert_eq!(cfg.sources.len(), 3);
        assert_eq!(cfg.hours_per_day, 24);
    }

    #[test]
    fn plan_for_every_standard_good() {
        let catalog = RecipeCatalog::standard().unwrap();
        for tag in GoodTag::ALL {
            print_plan(&catalog, tag).unwrap();
        }
    }
}
