//! AisleSim Headless Simulation Harness
//!
//! Loads a layout and an order catalogue, generates a seeded order batch,
//! routes it, scores it, optimizes the layout and refines it with the
//! stochastic search. Every stage is checked; any failed check exits 1.
//!
//! Usage:
//!   cargo run -p aislesim-simtest
//!   cargo run -p aislesim-simtest -- --verbose
//!   cargo run -p aislesim-simtest -- --layout floor.json --orders 500 --seed 7 --json
//!   cargo run -p aislesim-simtest -- --config data/engine_config.json
//!
//! Flags:
//!   --layout <path>          layout JSON (default: bundled sample)
//!   --catalogue <path>       order-frequency JSON (default: bundled sample)
//!   --config <path>          engine tunables JSON; omitted fields keep defaults
//!   --orders <n>             orders to generate (default 200)
//!   --seed <n>               seed for order generation and search (default:
//!                            the config's search seed, 42)
//!   --policy first|nearest   entry/exit selection (default: the config's, first)
//!   --json                   print a machine-readable report instead of text
//!   --verbose                show passing checks too

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use aislesim_logic::config::{EndpointPolicy, EngineConfig};
use aislesim_logic::grid::{categories, occupied_cells, Layout, Position};
use aislesim_logic::metrics::{summarize, summarize_batch, MetricsSummary};
use aislesim_logic::optimizer::{compare_layouts, ComparisonReport};
use aislesim_logic::orders::{generate_orders, Order, OrderCatalogue};
use aislesim_logic::pathfinding::{shortest_distance, shortest_path};
use aislesim_logic::routing::{route, route_batch};
use aislesim_logic::search::{search_layout, SearchOutcome};
use aislesim_logic::validation::validate_layout;
use env_logger::Env;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

// ── Bundled data (overridable by path) ──────────────────────────────────
const LAYOUT_JSON: &str = include_str!("../../../data/sample_layout.json");
const CATALOGUE_JSON: &str = include_str!("../../../data/orders.json");

// ── Command line ────────────────────────────────────────────────────────

struct Args {
    layout: Option<PathBuf>,
    catalogue: Option<PathBuf>,
    config: Option<PathBuf>,
    orders: usize,
    seed: Option<u64>,
    policy: Option<EndpointPolicy>,
    json: bool,
    verbose: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            layout: None,
            catalogue: None,
            config: None,
            orders: 200,
            seed: None,
            policy: None,
            json: false,
            verbose: false,
        }
    }
}

fn parse_args(mut argv: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut args = Args::default();
    while let Some(flag) = argv.next() {
        let mut value = |name: &str| {
            argv.next()
                .ok_or_else(|| format!("{} needs a value", name))
        };
        match flag.as_str() {
            "--layout" => args.layout = Some(PathBuf::from(value("--layout")?)),
            "--catalogue" => args.catalogue = Some(PathBuf::from(value("--catalogue")?)),
            "--config" => args.config = Some(PathBuf::from(value("--config")?)),
            "--orders" => {
                let v = value("--orders")?;
                args.orders = v.parse().map_err(|_| format!("invalid order count '{}'", v))?;
            }
            "--seed" => {
                let v = value("--seed")?;
                args.seed = Some(v.parse().map_err(|_| format!("invalid seed '{}'", v))?);
            }
            "--policy" => {
                let v = value("--policy")?;
                args.policy = Some(
                    EndpointPolicy::parse(&v).ok_or_else(|| format!("unknown policy '{}'", v))?,
                );
            }
            "--json" => args.json = true,
            "--verbose" => args.verbose = true,
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(args)
}

fn read_input(path: &Option<PathBuf>, bundled: &'static str) -> Result<String, String> {
    match path {
        Some(p) => std::fs::read_to_string(p).map_err(|e| format!("{}: {}", p.display(), e)),
        None => Ok(bundled.to_string()),
    }
}

/// Engine config from `--config`, with `--policy` and `--seed` applied on top.
fn load_config(args: &Args) -> Result<EngineConfig, String> {
    let mut config = match &args.config {
        Some(p) => {
            let text =
                std::fs::read_to_string(p).map_err(|e| format!("{}: {}", p.display(), e))?;
            EngineConfig::from_json(&text).map_err(|e| format!("{}: {}", p.display(), e))?
        }
        None => EngineConfig::default(),
    };
    if let Some(policy) = args.policy {
        config.routing.endpoint_policy = policy;
    }
    if let Some(seed) = args.seed {
        config.search.seed = seed;
    }
    Ok(config)
}

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

/// Everything `--json` prints.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    seed: u64,
    orders: usize,
    policy: EndpointPolicy,
    metrics: Option<MetricsSummary>,
    comparison: Option<ComparisonReport>,
    search: Option<SearchOutcome>,
    results: Vec<TestResult>,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!(
                "usage: aislesim-simtest [--layout <path>] [--catalogue <path>] \
                 [--config <path>] [--orders <n>] [--seed <n>] [--policy first|nearest] \
                 [--json] [--verbose]"
            );
            std::process::exit(2);
        }
    };
    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: could not load config: {}", e);
            std::process::exit(2);
        }
    };
    let text = !args.json;
    if text {
        println!("=== AisleSim Simulation Harness ===\n");
    }

    let mut report = Report {
        seed: config.search.seed,
        orders: args.orders,
        policy: config.routing.endpoint_policy,
        metrics: None,
        comparison: None,
        search: None,
        results: Vec::new(),
    };

    // 1. Inputs and configuration
    let inputs = load_inputs(&args, &config, &mut report.results, text);

    if let Some((layout, catalogue)) = inputs {
        // 2. Grid and path finder self-checks
        report.results.extend(validate_pathfinding(text));

        // 3. Order generation
        let orders = validate_order_generation(
            args.orders,
            config.search.seed,
            &layout,
            &catalogue,
            &mut report.results,
            text,
        );

        // 4. Routing and metrics
        report.metrics = Some(validate_routing(
            &layout,
            &orders,
            &config,
            &mut report.results,
            text,
        ));

        // 5. Zone optimizer
        report.comparison =
            validate_optimizer(&layout, &catalogue, &orders, &config, &mut report.results, text);

        // 6. Stochastic search
        let start = report
            .comparison
            .as_ref()
            .map_or(&layout, |c| &c.optimized_layout);
        report.search = validate_search(start, &catalogue, &config, &mut report.results, text);
    }

    // ── Summary ──
    let passed = report.results.iter().filter(|r| r.passed).count();
    let failed = report.results.len() - passed;

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("error: could not serialize report: {}", e);
                std::process::exit(2);
            }
        }
    } else {
        println!();
        for r in &report.results {
            let icon = if r.passed { "✓" } else { "✗" };
            if !r.passed || args.verbose {
                println!("  {} {}: {}", icon, r.name, r.detail);
            }
        }
        if let Some(c) = &report.comparison {
            println!(
                "\n  score {} -> {} ({:+}), distance {:.1}% shorter, time {:.1}% shorter",
                c.original_metrics.efficiency_score,
                c.optimized_metrics.efficiency_score,
                c.improvement.score_delta,
                c.improvement.distance_reduction_pct,
                c.improvement.time_reduction_pct
            );
            if c.kept_original {
                println!("  zone layout scored worse; original layout kept");
            }
        }
        println!(
            "\n=== RESULT: {}/{} passed, {} failed ===",
            passed,
            report.results.len(),
            failed
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Inputs ───────────────────────────────────────────────────────────

fn load_inputs(
    args: &Args,
    config: &EngineConfig,
    results: &mut Vec<TestResult>,
    text: bool,
) -> Option<(Layout, OrderCatalogue)> {
    if text {
        println!("--- Inputs ---");
    }

    let config_errors = config.validate();
    results.push(check(
        "config_valid",
        config_errors.is_empty(),
        if config_errors.is_empty() {
            "all tunables in range".to_string()
        } else {
            config_errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    ));

    log::info!(
        "Layout: {}, catalogue: {}",
        args.layout
            .as_ref()
            .map_or("bundled sample".to_string(), |p| p.display().to_string()),
        args.catalogue
            .as_ref()
            .map_or("bundled sample".to_string(), |p| p.display().to_string())
    );

    let layout = match read_input(&args.layout, LAYOUT_JSON)
        .and_then(|s| Layout::from_json(&s).map_err(|e| e.to_string()))
    {
        Ok(l) => l,
        Err(e) => {
            results.push(check("layout_parse", false, e));
            return None;
        }
    };
    results.push(check(
        "layout_parse",
        true,
        format!(
            "{}×{} grid, {} shelves, {} categories",
            layout.grid_size,
            layout.grid_size,
            layout.shelves.len(),
            categories(&layout).len()
        ),
    ));

    let warnings = validate_layout(&layout);
    results.push(check(
        "layout_routable",
        warnings.is_empty(),
        if warnings.is_empty() {
            "no findings".to_string()
        } else {
            format!("{} findings, first: {}", warnings.len(), warnings[0])
        },
    ));

    let catalogue = match read_input(&args.catalogue, CATALOGUE_JSON)
        .and_then(|s| OrderCatalogue::from_json(&s).map_err(|e| e.to_string()))
    {
        Ok(c) => c,
        Err(e) => {
            results.push(check("catalogue_parse", false, e));
            return None;
        }
    };
    let shares: f64 = catalogue.category_frequencies().values().sum();
    results.push(check(
        "catalogue_shares",
        catalogue.order_frequency.is_empty() || (shares - 100.0).abs() < 1e-6,
        format!(
            "{} categories, shares sum to {:.2}%",
            catalogue.order_frequency.len(),
            shares
        ),
    ));

    Some((layout, catalogue))
}

// ── 2. Path finder ──────────────────────────────────────────────────────

fn validate_pathfinding(text: bool) -> Vec<TestResult> {
    if text {
        println!("--- Path Finder ---");
    }
    let mut results = Vec::new();

    let size = 12;
    let pairs = [
        (Position::new(0, 0), Position::new(11, 11)),
        (Position::new(5, 5), Position::new(5, 5)),
        (Position::new(11, 0), Position::new(0, 7)),
        (Position::new(3, 9), Position::new(8, 2)),
    ];
    let mut mismatches = Vec::new();
    for (a, b) in pairs {
        match shortest_path(a, b, size) {
            Ok(path) if path.len() as u32 == shortest_distance(a, b) + 1 => {}
            Ok(path) => mismatches.push(format!("{}→{}: {} cells", a, b, path.len())),
            Err(e) => mismatches.push(format!("{}→{}: {}", a, b, e)),
        }
    }
    results.push(check(
        "path_length_is_manhattan",
        mismatches.is_empty(),
        if mismatches.is_empty() {
            format!("{} pairs match", pairs.len())
        } else {
            mismatches.join(", ")
        },
    ));

    let outside = shortest_path(Position::new(0, 0), Position::new(size, 0), size);
    results.push(check(
        "path_rejects_out_of_bounds",
        outside.is_err(),
        "goal outside the grid is rejected",
    ));

    // Reference route: 6 + 4 + 8 cells, 18 / 2.0 + 1.5 + 2.0 seconds.
    let reference = Layout::new(10)
        .with_entry(0, 0)
        .with_shelf(3, 3, "X")
        .with_packing(5, 5)
        .with_exit(9, 9);
    let routed = route(&Order::new(1, "X", "sample"), &reference, &Default::default());
    let ok = matches!(
        &routed,
        Ok(p) if p.total_distance == 18 && (p.estimated_time - 12.5).abs() < 1e-9
    );
    results.push(check(
        "reference_route",
        ok,
        match routed {
            Ok(p) => format!("distance {}, time {:.2}s", p.total_distance, p.estimated_time),
            Err(e) => e.to_string(),
        },
    ));

    results
}

// ── 3. Order generation ─────────────────────────────────────────────────

fn validate_order_generation(
    count: usize,
    seed: u64,
    layout: &Layout,
    catalogue: &OrderCatalogue,
    results: &mut Vec<TestResult>,
    text: bool,
) -> Vec<Order> {
    if text {
        println!("--- Order Generation ---");
    }
    let available = categories(layout);

    let generate = || {
        let mut rng = StdRng::seed_from_u64(seed);
        generate_orders(count, &available, catalogue, &mut rng)
    };
    let orders = generate();

    results.push(check(
        "orders_count",
        orders.len() == count || available.is_empty(),
        format!("{} orders over {} categories", orders.len(), available.len()),
    ));

    let sequential = orders
        .iter()
        .enumerate()
        .all(|(i, o)| o.id as usize == i + 1);
    results.push(check("orders_sequential_ids", sequential, "ids run 1..=n"));

    results.push(check(
        "orders_deterministic",
        generate() == orders,
        format!("seed {} reproduces the batch", seed),
    ));

    let mut mix: BTreeMap<&str, usize> = BTreeMap::new();
    for o in &orders {
        *mix.entry(o.category.as_str()).or_default() += 1;
    }
    let top = mix.iter().max_by_key(|(_, n)| **n);
    results.push(check(
        "orders_within_layout",
        orders.iter().all(|o| available.contains(&o.category.as_str())),
        match top {
            Some((cat, n)) => format!("most ordered: {} ({})", cat, n),
            None => "no orders".to_string(),
        },
    ));

    orders
}

// ── 4. Routing and metrics ──────────────────────────────────────────────

fn validate_routing(
    layout: &Layout,
    orders: &[Order],
    config: &EngineConfig,
    results: &mut Vec<TestResult>,
    text: bool,
) -> MetricsSummary {
    if text {
        println!("--- Routing & Metrics ---");
    }

    let batch = route_batch(orders, layout, &config.routing);
    results.push(check(
        "routing_accounts_for_every_order",
        batch.routed() + batch.skipped() == orders.len(),
        format!("{} routed, {} skipped", batch.routed(), batch.skipped()),
    ));

    let bad_sums: Vec<u32> = batch
        .paths()
        .filter(|p| {
            p.total_distance
                != shortest_distance(p.entry, p.shelf)
                    + shortest_distance(p.shelf, p.packing)
                    + shortest_distance(p.packing, p.exit)
        })
        .map(|p| p.order_id)
        .collect();
    results.push(check(
        "routing_distance_is_leg_sum",
        bad_sums.is_empty(),
        if bad_sums.is_empty() {
            "every path adds up".to_string()
        } else {
            format!("orders {:?} do not add up", bad_sums)
        },
    ));

    let again = route_batch(orders, layout, &config.routing);
    results.push(check(
        "routing_deterministic",
        again == batch,
        "second run is identical",
    ));

    let summary = summarize_batch(&batch, layout, &config.metrics);
    results.push(check(
        "metrics_score_in_range",
        summary.efficiency_score <= 100 && summary.avg_distance.is_finite(),
        format!(
            "score {}, avg distance {:.2}, avg time {:.2}s",
            summary.efficiency_score, summary.avg_distance, summary.avg_time
        ),
    ));

    let empty = summarize(&[], layout, &config.metrics);
    results.push(check(
        "metrics_empty_baseline",
        empty.efficiency_score == config.metrics.empty_batch_score.min(100),
        format!("empty batch scores {}", empty.efficiency_score),
    ));

    summary
}

// ── 5. Zone optimizer ───────────────────────────────────────────────────

fn shelf_counts(layout: &Layout) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for s in &layout.shelves {
        *counts.entry(s.category.clone()).or_insert(0) += 1;
    }
    counts
}

fn validate_optimizer(
    layout: &Layout,
    catalogue: &OrderCatalogue,
    orders: &[Order],
    config: &EngineConfig,
    results: &mut Vec<TestResult>,
    text: bool,
) -> Option<ComparisonReport> {
    if text {
        println!("--- Zone Optimizer ---");
    }

    let weights = catalogue.demand_weights();
    let report = match compare_layouts(layout, &weights, orders, config) {
        Ok(r) => r,
        Err(e) => {
            results.push(check("optimizer_runs", false, e.to_string()));
            return None;
        }
    };
    let optimized = &report.optimized_layout;

    results.push(check(
        "optimizer_keeps_inventory",
        shelf_counts(layout) == shelf_counts(optimized),
        format!(
            "{} shelves in {} categories",
            optimized.shelves.len(),
            shelf_counts(optimized).len()
        ),
    ));

    let cells = occupied_cells(optimized).len();
    results.push(check(
        "optimizer_cells_exclusive",
        cells == optimized.element_count(),
        format!("{} elements on {} cells", optimized.element_count(), cells),
    ));

    let findings: Vec<_> = validate_layout(optimized)
        .into_iter()
        .filter(|f| f.is_error())
        .collect();
    results.push(check(
        "optimizer_output_valid",
        findings.is_empty(),
        format!("{} errors", findings.len()),
    ));

    results.push(check(
        "optimizer_routes_same_orders",
        report.optimized_metrics.routed == report.original_metrics.routed,
        format!(
            "{} / {} orders routed",
            report.optimized_metrics.routed, report.original_metrics.routed
        ),
    ));

    Some(report)
}

// ── 6. Stochastic search ────────────────────────────────────────────────

fn validate_search(
    start: &Layout,
    catalogue: &OrderCatalogue,
    config: &EngineConfig,
    results: &mut Vec<TestResult>,
    text: bool,
) -> Option<SearchOutcome> {
    if text {
        println!("--- Stochastic Search ---");
    }

    let weights = catalogue.demand_weights();
    let run = || search_layout(start, &weights, &config.routing, &config.search);
    let outcome = match run() {
        Ok(o) => o,
        Err(e) => {
            results.push(check("search_runs", false, e.to_string()));
            return None;
        }
    };

    let not_worse = match (outcome.initial_cost, outcome.best_cost) {
        (Some(before), Some(after)) => after <= before,
        (None, _) => true,
        (Some(_), None) => false,
    };
    results.push(check(
        "search_not_worse",
        not_worse,
        format!(
            "expected travel {:?} -> {:?} after {} improvements",
            outcome.initial_cost, outcome.best_cost, outcome.improvements
        ),
    ));

    results.push(check(
        "search_keeps_inventory",
        shelf_counts(start) == shelf_counts(&outcome.layout),
        format!("{} shelves", outcome.layout.shelves.len()),
    ));

    results.push(check(
        "search_deterministic",
        run().ok().as_ref() == Some(&outcome),
        format!("seed {} reproduces the result", config.search.seed),
    ));

    Some(outcome)
}
