use cardmatch::{cli, config, error, output, pipeline, registry, scanner};
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use config::AppConfig;
use error::Result;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_snapshot(snapshot: &registry::RegistrySnapshot) {
    println!(
        "✔ {} registry entities, {} records skipped, {} duplicate identifiers\n",
        snapshot.entities.len(),
        snapshot.skipped.len(),
        snapshot.duplicate_identifiers
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Match { registry, cards, output, card_suffix, threshold, no_fuzzy_sku } => {
            println!("cardmatch - match cards to registry\n");

            let mut matching = config.matching.clone();
            if let Some(threshold) = threshold {
                matching.name_similarity_threshold = threshold;
            }
            if no_fuzzy_sku {
                matching.fuzzy_sku_enabled = false;
            }
            let suffix = card_suffix.unwrap_or_else(|| config.card_suffix.clone());

            // 1. Registry
            println!("[1/3] Loading registry snapshot...");
            let snapshot = registry::load_registry(&registry)?;
            print_snapshot(&snapshot);

            // 2. Cards
            println!("[2/3] Scanning cards...");
            let collection = scanner::scan_cards(&cards, &suffix)?;
            if collection.cards.is_empty() {
                return Err(error::CardMatchError::NoCardsFound(cards.display().to_string()));
            }
            println!(
                "✔ {} cards parsed, {} skipped\n",
                collection.cards.len(),
                collection.skipped.len()
            );

            // 3. Cascade
            println!("[3/3] Matching...");
            let run = pipeline::match_cards(&snapshot.entities, &collection, matching, !cli.verbose)?;
            let stats = run.stats.clone();
            println!(
                "✔ matched {}, unmatched {}, ambiguous {}\n",
                stats.matched, stats.unmatched, stats.ambiguous
            );

            let path = config.output_path(output, "matches.json");
            output::write_json(
                &path,
                &output::MatchOutput {
                    generated_at: Utc::now(),
                    retailer: config.retailer.clone(),
                    stats,
                    skipped: collection.skipped,
                    matches: run.records,
                },
            )?;
            println!("✅ Saved: {}", path.display());
        }

        Commands::Materials { registry, cards, supplier, output, card_suffix } => {
            println!("cardmatch - match material cards\n");
            let suffix = card_suffix.unwrap_or_else(|| config.card_suffix.clone());

            println!("[1/3] Loading registry snapshot...");
            let snapshot = registry::load_registry(&registry)?;
            print_snapshot(&snapshot);

            println!("[2/3] Scanning material cards...");
            let collection = scanner::scan_material_cards(&cards, &suffix)?;
            if collection.cards.is_empty() {
                return Err(error::CardMatchError::NoCardsFound(cards.display().to_string()));
            }
            println!(
                "✔ {} cards parsed, {} skipped\n",
                collection.cards.len(),
                collection.skipped.len()
            );

            println!("[3/3] Matching...");
            let report = pipeline::material_pass(&snapshot.entities, &collection.cards, supplier.as_deref());
            println!(
                "✔ matched {} ({}%), unmatched {}",
                report.stats.matched, report.stats.match_rate, report.stats.unmatched
            );
            for (method, count) in &report.stats.by_method {
                println!("  {}: {}", method, count);
            }

            let path = config.output_path(output, "materials.json");
            output::write_json(
                &path,
                &output::MaterialOutput {
                    generated_at: Utc::now(),
                    retailer: config.retailer.clone(),
                    skipped: collection.skipped,
                    report,
                },
            )?;
            println!("\n✅ Saved: {}", path.display());
        }

        Commands::Reverse { registry, cards, matches, materials, output, card_suffix } => {
            println!("cardmatch - reverse match\n");
            let suffix = card_suffix.unwrap_or_else(|| config.card_suffix.clone());

            println!("[1/3] Loading inputs...");
            let snapshot = registry::load_registry(&registry)?;
            print_snapshot(&snapshot);
            let records = output::load_matches(&matches)?;
            let material_matches = match materials {
                Some(path) => output::load_material_matches(&path)?,
                None => Vec::new(),
            };
            println!(
                "✔ {} match records, {} material matches\n",
                records.len(),
                material_matches.len()
            );

            println!("[2/3] Scanning cards...");
            let collection = scanner::scan_cards(&cards, &suffix)?;
            println!("✔ {} cards\n", collection.cards.len());

            println!("[3/3] Resolving unclaimed entities...");
            let report =
                pipeline::reverse_pass(&snapshot.entities, &collection.cards, &records, &material_matches);
            println!(
                "✔ claimed {}, reverse matched {}, orphaned {}",
                report.claimed,
                report.reverse_matches.len(),
                report.orphaned.len()
            );
            for (category, count) in &report.orphaned_by_category {
                println!("  {}: {}", category, count);
            }

            let path = config.output_path(output, "reverse.json");
            output::write_json(
                &path,
                &output::ReverseOutput {
                    generated_at: Utc::now(),
                    retailer: config.retailer.clone(),
                    registry_skipped: snapshot.skipped,
                    duplicate_identifiers: snapshot.duplicate_identifiers,
                    report,
                },
            )?;
            println!("\n✅ Saved: {}", path.display());
        }

        Commands::Styles { registry, cards, sources, output, card_suffix } => {
            println!("cardmatch - style product references\n");
            let suffix = card_suffix.unwrap_or_else(|| config.card_suffix.clone());

            println!("[1/3] Loading inputs...");
            let snapshot = registry::load_registry(&registry)?;
            let collection = scanner::scan_cards(&cards, &suffix)?;
            println!(
                "✔ {} registry entities, {} cards\n",
                snapshot.entities.len(),
                collection.cards.len()
            );

            println!("[2/3] Loading style sources...");
            let style_sources = scanner::load_style_sources(&sources)?;
            println!(
                "✔ {} style documents, {} skipped\n",
                style_sources.documents.len(),
                style_sources.skipped.len()
            );

            println!("[3/3] Resolving product references...");
            let report = pipeline::style_pass(&snapshot.entities, &collection.cards, &style_sources.documents);
            let summary = &report.summary;
            println!(
                "✔ {} references: {} to cards, {} to registry, {} unmatched",
                summary.total_product_refs, summary.matched_to_cards, summary.matched_to_mb, summary.unmatched
            );

            let path = config.output_path(output, "styles.json");
            let style_overlap = report.style_overlap(20);
            output::write_json(
                &path,
                &output::StyleOutput {
                    generated_at: Utc::now(),
                    retailer: config.retailer.clone(),
                    skipped_sources: style_sources.skipped,
                    report,
                    style_overlap,
                },
            )?;
            println!("\n✅ Saved: {}", path.display());
        }

        Commands::Scenes { cards, scenes, registry, output, card_suffix } => {
            println!("cardmatch - scene folder styles\n");
            let suffix = card_suffix.unwrap_or_else(|| config.card_suffix.clone());

            println!("[1/3] Loading inputs...");
            let entities = match registry {
                Some(path) => registry::load_registry(&path)?.entities,
                None => Vec::new(),
            };
            let collection = scanner::scan_cards(&cards, &suffix)?;
            println!("✔ {} cards\n", collection.cards.len());

            println!("[2/3] Scanning scene folders...");
            let folders = scanner::scan_scene_folders(&scenes)?;
            println!("✔ {} style folders\n", folders.len());

            println!("[3/3] Matching scene SKUs...");
            let report = pipeline::scene_pass(&entities, &collection.cards, &folders);
            println!(
                "✔ {} styles, {} with products, {} cards staged",
                report.summary.total_styles,
                report.summary.styles_with_products,
                report.summary.products_with_styles
            );

            let path = config.output_path(output, "scenes.json");
            output::write_json(
                &path,
                &output::SceneOutput {
                    generated_at: Utc::now(),
                    retailer: config.retailer.clone(),
                    report,
                },
            )?;
            println!("\n✅ Saved: {}", path.display());
        }

        Commands::Analyze { matches, previous, styles } => {
            let records = output::load_matches(&matches)?;
            let previous = previous.map(|p| output::load_matches(&p)).transpose()?;
            let styles = styles.map(|p| output::load_style_report(&p)).transpose()?;

            let result = pipeline::analyze(&records, previous.as_deref(), styles.as_ref());
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Config { show, set_threshold } => {
            let mut config = config;

            if let Some(threshold) = set_threshold {
                config.set_threshold(threshold)?;
                config.save()?;
                println!("✔ Name similarity threshold set to {}", threshold);
            }

            if show {
                println!("Config ({}):", AppConfig::config_path()?.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}
