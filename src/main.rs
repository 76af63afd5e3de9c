// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::fs;
use std::process;

use anyhow::{Context, Result};
use the_buildchain::chain::{Chain, ChainBuilder};
use the_buildchain::config::consts::DEFAULT_LOG_LEVEL;
use the_buildchain::config::{load_and_validate_config, EngineConfig, RuntimeBuilder};
use the_buildchain::engine::InitialItems;
use the_buildchain::item::{Item, ItemFlags, ItemRegistry, MultiItem, SimpleItem};
use the_buildchain::observability::init_tracing;
use the_buildchain::step::{StepContext, StepDeclaration, StepError};

/// Text handed in on the command line.
struct InputText(String);
impl Item for InputText {}
impl SimpleItem for InputText {}

struct Words(Vec<String>);
impl Item for Words {}
impl SimpleItem for Words {}

/// One line of the final report, contributed by any number of analyzers.
struct Statistic {
    name: &'static str,
    value: usize,
}
impl Item for Statistic {}
impl MultiItem for Statistic {}

struct Banner(String);
impl Item for Banner {}
impl SimpleItem for Banner {}

struct Report(String);
impl Item for Report {}
impl SimpleItem for Report {}

struct Args {
    describe: bool,
    config: Option<String>,
    input: String,
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [--describe] [config.yaml|config.toml] <input_text>", program);
    eprintln!("Example: {} configs/local.yaml \"hello build chain\"", program);
    process::exit(1);
}

fn parse_args() -> Args {
    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let describe = match args.iter().position(|a| a == "--describe") {
        Some(position) => {
            args.remove(position);
            true
        }
        None => false,
    };

    match args.len() {
        1 => Args {
            describe,
            config: None,
            input: args.remove(0),
        },
        2 => {
            let input = args.remove(1);
            Args {
                describe,
                config: Some(args.remove(0)),
                input,
            }
        }
        _ => usage(&program),
    }
}

/// Tokenize, analyze in parallel, then summarize. The banner step is an
/// overridable default; the analyzers meet again at the report.
fn demo_chain() -> Result<Chain> {
    let mut registry = ItemRegistry::new();
    registry
        .register::<Report>(ItemFlags::FINAL)
        .register::<Banner>(ItemFlags::WEAK);

    let mut builder = ChainBuilder::new(registry);
    builder.add_initial::<InputText>().add_steps([
        StepDeclaration::new("tokenize", |ctx: &mut StepContext| -> Result<(), StepError> {
            let text = ctx.get::<InputText>()?;
            let words = text.0.split_whitespace().map(str::to_string).collect();
            ctx.publish(Words(words))?;
            Ok(())
        })
        .origin("demo")
        .consumes::<InputText>()
        .produces::<Words>(),
        StepDeclaration::new("count_words", |ctx: &mut StepContext| -> Result<(), StepError> {
            let words = ctx.get::<Words>()?;
            ctx.contribute(Statistic {
                name: "words",
                value: words.0.len(),
            })?;
            Ok(())
        })
        .origin("demo")
        .consumes::<Words>()
        .produces_multi::<Statistic>(),
        StepDeclaration::new("count_chars", |ctx: &mut StepContext| -> Result<(), StepError> {
            let words = ctx.get::<Words>()?;
            ctx.contribute(Statistic {
                name: "characters",
                value: words.0.iter().map(|w| w.chars().count()).sum(),
            })?;
            Ok(())
        })
        .origin("demo")
        .consumes::<Words>()
        .produces_multi::<Statistic>(),
        StepDeclaration::new("default_banner", |ctx: &mut StepContext| -> Result<(), StepError> {
            ctx.publish(Banner("buildchain report".to_string()))?;
            Ok(())
        })
        .origin("demo")
        .produces_overridable::<Banner>(),
        StepDeclaration::new("report", |ctx: &mut StepContext| -> Result<(), StepError> {
            let banner = ctx
                .get_optional::<Banner>()?
                .map(|b| b.0.clone())
                .unwrap_or_default();
            let mut stats = ctx.get_all::<Statistic>()?;
            stats.sort_by_key(|s| s.name);
            let lines: Vec<String> = stats
                .iter()
                .map(|s| format!("  {}: {}", s.name, s.value))
                .collect();
            ctx.publish(Report(format!("{}\n{}", banner, lines.join("\n"))))?;
            Ok(())
        })
        .origin("demo")
        .consumes_optional::<Banner>()
        .consumes_multi::<Statistic>()
        .produces::<Report>(),
    ]);
    builder.build().context("failed to assemble demo chain")
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_LOG_LEVEL);
    let args = parse_args();

    let config = match &args.config {
        Some(path) => load_and_validate_config(path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => EngineConfig::default(),
    };

    let chain = demo_chain()?;

    if args.describe {
        let description = serde_json::to_string_pretty(&chain.describe())
            .context("failed to serialize chain description")?;
        println!("{}", description);
    }

    if let Some(path) = &config.graph_output {
        fs::write(path, chain.to_dot())
            .with_context(|| format!("failed to write graph to {}", path.display()))?;
        println!("Graph written to {}", path.display());
    }

    let executor = RuntimeBuilder::from_config(&config);
    println!(
        "Running {} step(s) in {} wave(s), max concurrency {}",
        chain.len(),
        chain.waves().len(),
        executor.max_concurrency()
    );

    let result = executor
        .run(&chain, InitialItems::new().with(InputText(args.input)))
        .await
        .context("build failed")?;

    if let Some(report) = result.get::<Report>() {
        println!("{}", report.0);
    }
    println!("Completed in {:?}", result.duration());
    Ok(())
}
