//! Demo driver for the B-tree and B+-tree indexes.
//!
//! Usage:
//!   btree_cli btree [options]   - Insert 1..=count into a B-tree, then search and remove 6
//!   btree_cli bplus [options]   - Same for a B+-tree, then drain it in ascending order
//!   btree_cli demo [options]    - Run both
//!
//! Options:
//!   --count <n>      Number of keys to insert (default 100)
//!   --degree <t>     Minimum degree (default 10 for the B-tree, 4 for the B+-tree)
//!   --config <path>  JSON tree config, e.g. {"minDegree": 4}
//!   --json           Print the final tree as JSON instead of traversals

use btree_index::types::{DEMO_BPLUS_DEGREE, DEMO_BTREE_DEGREE};
use btree_index::{BPlusTree, BTree, Removal, Result, TreeConfig, TreeNode};
use std::env;
use std::process::exit;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Key searched for and removed after the inserts
const PROBE_KEY: i64 = 6;

const SEPARATOR: &str = "-------------------";

/// Parsed command-line options
#[derive(Debug)]
struct Options {
    count: i64,
    degree: Option<usize>,
    config: Option<String>,
    json: bool,
}

impl Options {
    fn parse(args: &[String]) -> std::result::Result<Self, String> {
        let mut options = Options {
            count: 100,
            degree: None,
            config: None,
            json: false,
        };

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--count" => {
                    let value = iter.next().ok_or("--count needs a value")?;
                    options.count = value
                        .parse()
                        .map_err(|_| format!("Invalid count: {}", value))?;
                }
                "--degree" => {
                    let value = iter.next().ok_or("--degree needs a value")?;
                    let degree = value
                        .parse()
                        .map_err(|_| format!("Invalid degree: {}", value))?;
                    options.degree = Some(degree);
                }
                "--config" => {
                    let value = iter.next().ok_or("--config needs a path")?;
                    options.config = Some(value.clone());
                }
                "--json" => options.json = true,
                other => return Err(format!("Unknown option: {}", other)),
            }
        }
        Ok(options)
    }

    /// `--degree` wins over `--config`, which wins over the demo default
    fn tree_config(&self, demo_degree: usize) -> Result<TreeConfig> {
        let config = match &self.config {
            Some(path) => TreeConfig::from_json_file(path)?,
            None => TreeConfig::new(demo_degree),
        };
        let config = match self.degree {
            Some(degree) => config.min_degree(degree),
            None => config,
        };
        config.validate()?;
        Ok(config)
    }
}

fn print_usage() {
    eprintln!("Usage: btree_cli <command> [options]");
    eprintln!("Commands:");
    eprintln!("  btree   - Insert keys into a B-tree, search and remove {}", PROBE_KEY);
    eprintln!("  bplus   - Same for a B+-tree, then remove every key in order");
    eprintln!("  demo    - Run both");
    eprintln!("Options:");
    eprintln!("  --count <n>      Number of keys to insert (default 100)");
    eprintln!("  --degree <t>     Minimum degree");
    eprintln!("  --config <path>  JSON tree config");
    eprintln!("  --json           Print the final tree as JSON");
}

fn print_json(snapshot: Option<TreeNode<i64>>) -> Result<()> {
    match snapshot {
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        None => println!("null"),
    }
    Ok(())
}

fn report_search(found: bool, key: i64) {
    if found {
        println!("Found key {} in a node.", key);
    } else {
        println!("Key {} not found.", key);
    }
}

fn report_removal(removal: Removal, key: i64) {
    match removal {
        Removal::Removed => {}
        Removal::KeyNotFound => println!("Key {} does not exist in the tree", key),
        Removal::EmptyTree => println!("Empty tree"),
    }
}

fn print_btree(tree: &BTree<i64>) {
    if tree.is_empty() {
        println!("Empty tree");
    }
    for line in tree.traverse() {
        println!("{}", line);
    }
}

fn print_bplus(tree: &BPlusTree<i64>) {
    if tree.is_empty() {
        println!("Empty tree");
    }
    for line in tree.traverse() {
        println!("{}", line);
    }
}

fn print_leaf_chain(tree: &BPlusTree<i64>) {
    if tree.is_empty() {
        println!("Empty B+ tree");
        return;
    }
    let mut chain = String::new();
    for leaf in tree.leaves() {
        let keys: Vec<String> = leaf.iter().map(|key| key.to_string()).collect();
        chain.push_str(&format!("[{}] -> ", keys.join(", ")));
    }
    println!("{}NULL", chain);
}

fn run_btree(options: &Options) -> Result<()> {
    let config = options.tree_config(DEMO_BTREE_DEGREE)?;
    let mut tree = BTree::with_config(config)?;
    tracing::info!(min_degree = config.min_degree, count = options.count, "running b-tree demo");

    for key in 1..=options.count {
        tree.insert(key);
        if !options.json {
            println!("Insert {}:", key);
            print_btree(&tree);
            println!("{}", SEPARATOR);
        }
    }

    let found = tree.contains(&PROBE_KEY);
    let removal = tree.remove(&PROBE_KEY);
    tree.check_invariants()?;

    if options.json {
        return print_json(tree.snapshot());
    }
    report_search(found, PROBE_KEY);
    report_removal(removal, PROBE_KEY);
    println!("After removing {}:", PROBE_KEY);
    print_btree(&tree);
    Ok(())
}

fn run_bplus(options: &Options) -> Result<()> {
    let config = options.tree_config(DEMO_BPLUS_DEGREE)?;
    let mut tree = BPlusTree::with_config(config)?;
    tracing::info!(min_degree = config.min_degree, count = options.count, "running b+ tree demo");

    for key in 1..=options.count {
        tree.insert(key);
        if !options.json {
            println!("Insert {}:", key);
            print_bplus(&tree);
            println!("{}", SEPARATOR);
        }
    }

    let found = tree.contains(&PROBE_KEY);
    let removal = tree.remove(&PROBE_KEY);
    tree.check_invariants()?;

    if options.json {
        return print_json(tree.snapshot());
    }
    report_search(found, PROBE_KEY);
    report_removal(removal, PROBE_KEY);
    println!("After removing {}:", PROBE_KEY);
    print_bplus(&tree);
    println!("{}", SEPARATOR);

    for key in 1..=options.count {
        report_search(tree.contains(&key), key);
        report_removal(tree.remove(&key), key);
        println!("After removing {}:", key);
        print_bplus(&tree);
        print_leaf_chain(&tree);
        println!("---------");
    }
    tree.check_invariants()?;

    tracing::info!(remaining = tree.len(), "b+ tree drained");
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "btree_index=info,btree_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        exit(1);
    }

    let command = &args[1];
    let options = match Options::parse(&args[2..]) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            print_usage();
            exit(1);
        }
    };

    let result = match command.as_str() {
        "btree" => run_btree(&options),
        "bplus" => run_bplus(&options),
        "demo" => run_btree(&options).and_then(|()| run_bplus(&options)),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            exit(1);
        }
    };

    if let Err(e) = result {
        tracing::error!("demo failed: {e}");
        eprintln!("ERROR: {}", e);
        exit(1);
    }
}
