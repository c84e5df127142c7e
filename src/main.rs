use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use skilladm::api::{ApiClient, Record};
use skilladm::browse::{self, Browser};
use skilladm::cache::{MutationAction, MutationError, PagedResourceCache};
use skilladm::config::Config;
use skilladm::list::{ListOptions, ListQuery};
use skilladm::{notify, resources, table};

type ResourceCache = PagedResourceCache<ApiClient, Record>;

#[derive(Parser, Debug)]
#[command(name = "skilladm")]
#[command(about = "Admin console for skills, levels, careers and other taxonomy resources")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/skilladm/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
  /// Resource name or alias (see `skilladm resources`)
  resource: String,

  /// Search text sent to the collection endpoint
  #[arg(short, long, default_value = "")]
  search: String,

  /// Page to show, starting at 1
  #[arg(short, long, default_value_t = 1)]
  page: u32,

  /// Rows per page (default: cache.per_page)
  #[arg(long)]
  per_page: Option<u32>,

  /// Pages fetched up front (default: cache.prefetch_pages)
  #[arg(long)]
  prefetch: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show one page of a resource
  List(ListArgs),
  /// Page through a resource interactively
  Browse(ListArgs),
  /// Show a single entity
  Get { resource: String, id: String },
  /// Create an entity from a JSON object
  Create { resource: String, data: String },
  /// Update an entity from a JSON object
  Update {
    resource: String,
    id: String,
    data: String,
  },
  /// Delete an entity
  Delete { resource: String, id: String },
  /// List known resources, optionally matching a prefix
  Resources { prefix: Option<String> },
}

fn init_logging() -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("skilladm");
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&log_dir, "skilladm.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_env("SKILLADM_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();
  Ok(guard)
}

fn resolve_resource(input: &str) -> Result<String> {
  resources::resolve(input).ok_or_else(|| {
    let names: Vec<&str> = resources::get_suggestions(input)
      .iter()
      .map(|r| r.name)
      .collect();
    eyre!("Unknown resource '{}'. Did you mean: {}", input, names.join(", "))
  })
}

fn parse_json(data: &str) -> Result<Value> {
  let value: Value = serde_json::from_str(data).map_err(|e| eyre!("Invalid JSON: {}", e))?;
  if !value.is_object() {
    return Err(eyre!("Expected a JSON object, got: {}", value));
  }
  Ok(value)
}

fn list_options(config: &Config, args: &ListArgs) -> ListOptions {
  ListOptions {
    search: args.search.clone(),
    page: args.page,
    per_page: args.per_page.unwrap_or(config.cache.per_page),
    initial_prefetch_pages: args.prefetch.unwrap_or(config.cache.prefetch_pages),
  }
}

/// Print a mutation outcome; failures become the command's error.
fn report<T>(action: MutationAction, resource: &str, result: Result<T, MutationError>) -> Result<T> {
  let (value, notification) = notify::mutation_outcome(action, resource, result)?;
  println!("{}", notification);
  Ok(value)
}

fn print_record(record: &Record) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(record)?);
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  if let Command::Resources { prefix } = &args.command {
    for res in resources::get_suggestions(prefix.as_deref().unwrap_or("")) {
      println!("{:<12} {:<24} {}", res.name, res.aliases.join(","), res.description);
    }
    return Ok(());
  }

  let config = Config::load(args.config.as_deref())?;
  let _guard = init_logging()?;

  let client = ApiClient::new(&config.api.url, Config::get_api_token().as_deref())
    .map_err(|e| eyre!("Failed to create API client: {}", e))?;
  let client = Arc::new(client);
  let open = |resource: &str| -> Result<Arc<ResourceCache>> {
    let resource = resolve_resource(resource)?;
    info!(%resource, url = %config.api.url, "opening resource");
    Ok(Arc::new(PagedResourceCache::new(
      client.clone(),
      resource,
      config.cache_settings(),
    )))
  };

  match &args.command {
    Command::List(list) => {
      let cache = open(&list.resource)?;
      let mut query = ListQuery::new(cache, list_options(&config, list));
      let page = query.options().page;
      let resolved = query.settle().await.clone();
      if let (None, Some(error)) = (&resolved.data, &resolved.error) {
        return Err(eyre!("Failed to load page {}: {}", page, error));
      }
      print!("{}", table::render(resolved.rows()));
      println!("{}", browse::status_line(&resolved, page, query.page_count()));
    }
    Command::Browse(list) => {
      let cache = open(&list.resource)?;
      let query = ListQuery::new(cache, list_options(&config, list));
      println!("{}", browse::HELP);
      let stdin = tokio::io::BufReader::new(tokio::io::stdin());
      Browser::new(query).run(stdin, &mut std::io::stdout()).await?;
    }
    Command::Get { resource, id } => {
      let cache = open(resource)?;
      let record = cache
        .fetch_item(Some(id))
        .await
        .map_err(|e| eyre!("Failed to get {} {}: {}", cache.resource(), id, e))?;
      print_record(&record)?;
    }
    Command::Create { resource, data } => {
      let cache = open(resource)?;
      let created = report(MutationAction::Create, cache.resource(), cache.create(parse_json(data)?).await)?;
      print_record(&created)?;
    }
    Command::Update { resource, id, data } => {
      let cache = open(resource)?;
      let updated = report(
        MutationAction::Update,
        cache.resource(),
        cache.update(id, parse_json(data)?).await,
      )?;
      print_record(&updated)?;
    }
    Command::Delete { resource, id } => {
      let cache = open(resource)?;
      report(MutationAction::Delete, cache.resource(), cache.delete(id).await)?;
    }
    Command::Resources { .. } => {}
  }

  Ok(())
}
