use anyhow::Context;
use clap::Parser;
use docdesk::{api, cli, config, error, output, scanner, tag, upload};
use docdesk_common::{AnnotationPayload, Notifier, OffsetTagger};
use api::ApiClient;
use cli::{Cli, Commands};
use config::Config;
use output::ConsoleNotifier;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load()?;
    if let Some(server) = &cli.server {
        config.set_server(server.clone())?;
    }

    match cli.command {
        Commands::Upload { paths, document_type, recursive, report } => {
            println!("📤 docdesk - batch upload\n");

            println!("[1/2] Pregled odabranih dokumenata...");
            let items = scanner::collect_files(&paths, recursive)?;
            if items.is_empty() {
                return Err(error::DocDeskError::NoFilesFound(
                    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "),
                )
                .into());
            }
            for item in &items {
                println!("  - {}", item.display_label());
            }
            println!("✔ {} dokumenata\n", items.len());

            let document_type = document_type
                .or_else(|| config.default_document_type.clone())
                .unwrap_or_default();

            println!("[2/2] Upload ({}) -> {}", document_type, config.server_url);
            let client = ApiClient::new(&config.server_url, config.timeout())?;
            let batch = upload::run_batch(items, &document_type, &client, ConsoleNotifier, true).await?;

            println!();
            for line in output::format_report(&batch) {
                println!("{}", line);
            }

            if let Some(path) = report {
                upload::save_report(&batch, &document_type, &path)
                    .with_context(|| format!("write {}", path.display()))?;
                println!("✔ Izvještaj spremljen: {}", path.display());
            }
        }

        Commands::Tag { document_id, text, add, find, remove, fresh, save, document_type, json } => {
            let client = ApiClient::new(&config.server_url, config.timeout())?;

            let source_text = match &text {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("read {}", path.display()))?,
                None => client.fetch_document(document_id).await?.text().to_string(),
            };

            let (initial_tags, stored_type) = if fresh {
                (Vec::new(), None)
            } else {
                match client.fetch_annotations(document_id).await {
                    Ok(stored) => {
                        let stored_type = stored.document_type().map(str::to_string);
                        (stored.into_tags(&source_text), stored_type)
                    }
                    Err(e) if text.is_some() => {
                        tracing::warn!("annotations unavailable: {}", e);
                        (Vec::new(), None)
                    }
                    Err(e) => return Err(e.into()),
                }
            };

            let mut tagger = OffsetTagger::new(source_text, initial_tags, ConsoleNotifier);
            let edits = tag::TagEdits { remove, add, find };
            if !edits.is_empty() {
                tag::apply_edits(&mut tagger, &edits);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(tagger.tags())?);
            } else {
                println!("{}\n", output::render_segments(tagger.highlights(), console::colors_enabled()));
                println!("Trenutne oznake:");
                for line in output::format_tag_list(tagger.tags()) {
                    println!("{}", line);
                }
            }

            if save {
                let Some(tags) = tagger.save(|tags| tags.to_vec()) else {
                    tagger.notifier().warn("Nema oznaka za spremanje");
                    return Ok(());
                };

                client.save_annotations(document_id, &tags).await?;
                println!("✔ Oznake su spremljene!");

                let mut payload = AnnotationPayload::from_tags(&tags);
                if let Some(kind) = document_type.or(stored_type) {
                    payload = payload.with_document_type(kind);
                }
                match client.update_document(document_id, &payload).await {
                    Ok(()) => println!("✔ Dokument je ažuriran"),
                    Err(e) => tracing::warn!("document update failed: {}", e),
                }
            }
        }

        Commands::Config { set_server, set_timeout, set_document_type, show } => {
            let mut stored = Config::load_from(&Config::config_path()?)?;
            let mut changed = false;

            if let Some(url) = set_server {
                stored.set_server(url)?;
                changed = true;
            }
            if let Some(seconds) = set_timeout {
                stored.timeout_seconds = seconds;
                changed = true;
            }
            if let Some(kind) = set_document_type {
                stored.default_document_type = Some(kind);
                changed = true;
            }
            if changed {
                stored.save()?;
                println!("✔ Postavke su spremljene");

                config = Config::load()?;
                if let Some(server) = &cli.server {
                    config.set_server(server.clone())?;
                }
            }

            if show || !changed {
                for line in output::format_config(&stored, &config) {
                    println!("{}", line);
                }
            }
        }
    }

    Ok(())
}
