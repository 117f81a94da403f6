use anyhow::{bail, Context, Result};
use insid::db::{self, configure_connection, establish_pool, run_migrations, DbPool};
use insid::settings::settings;
use insid::utils::{self, log_dam_selected, log_db_ready, log_error, log_init, log_seed_done};
use insid::{catalog, scoring};
use std::env;
use std::process;
use tracing::subscriber::set_global_default;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn print_usage() {
    eprintln!("Usage: insid <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  seed                        run migrations and seed the default vocabularies");
    eprintln!("  dams                        list registered dams");
    eprintln!("  catalog                     list the reference vocabularies and failure modes");
    eprintln!("  select <user-id> <dam-id>   set the dam under analysis for a user");
    eprintln!("  observations <dam-id>       list the observed anomalies of a dam");
    eprintln!("  analyze <user-id> [--json]  rank failure modes for the user's dam under analysis");
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("insid=info".parse()?))
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        );
    set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        print_usage();
        process::exit(1);
    };

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| settings().database.url.clone());
    log_init(&database_url);
    let pool = establish_pool(&database_url, settings().database.pool_size);

    {
        let mut conn = pool.get().context("failed to get initial connection")?;
        configure_connection(&mut conn)?;
        run_migrations(&mut conn)?;
    }
    log_db_ready();

    match command.as_str() {
        "seed" => cmd_seed(&pool),
        "dams" => cmd_dams(&pool),
        "catalog" => cmd_catalog(&pool),
        "select" => cmd_select(&pool, &args[2..]),
        "observations" => cmd_observations(&pool, &args[2..]),
        "analyze" => cmd_analyze(&pool, &args[2..]),
        other => {
            log_error(&format!("unknown command: {other}"));
            print_usage();
            process::exit(1);
        }
    }
}

fn cmd_seed(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;
    catalog::seed_defaults(&mut conn)?;
    log_seed_done();
    Ok(())
}

fn cmd_dams(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;
    let dams = db::list_dams(&mut conn)?;
    if dams.is_empty() {
        println!("no dams registered yet.");
        return Ok(());
    }
    for (dam, dam_type) in dams {
        println!(
            "{:>4}  {}  ({}{})",
            dam.id,
            dam.name,
            dam_type.name,
            dam.location
                .as_deref()
                .map(|l| format!(", {l}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn cmd_catalog(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;

    println!("dam types:");
    for dam_type in db::list_dam_types(&mut conn)? {
        println!("  {:>4}  {}", dam_type.id, dam_type.name);
    }

    println!("zones:");
    for zone in db::list_zones(&mut conn)? {
        println!("  {:>4}  {}", zone.id, zone.name);
    }

    println!("material types:");
    for material in db::list_material_types(&mut conn)? {
        println!("  {:>4}  {}", material.id, material.name);
    }

    println!("anomaly types:");
    for anomaly_type in db::list_anomaly_types(&mut conn)? {
        println!("  {:>4}  {}", anomaly_type.id, anomaly_type.name);
    }

    println!("failure modes:");
    for (mode, category) in db::list_failure_modes(&mut conn)? {
        println!("  {:>4}  {}  [{}]", mode.id, mode.name, category.name);
        for (anomaly, type_name) in db::system_anomalies_for_mode(&mut conn, mode.id)? {
            println!("          expects {} (weight {:.1})", type_name, anomaly.weight);
        }
    }

    Ok(())
}

fn cmd_select(pool: &DbPool, args: &[String]) -> Result<()> {
    let (user_id, dam_id) = match args {
        [user, dam] => (parse_id(user, "user-id")?, parse_id(dam, "dam-id")?),
        _ => {
            print_usage();
            process::exit(1);
        }
    };

    let mut conn = pool.get()?;
    let Some((dam, _)) = db::get_dam_with_type(&mut conn, dam_id)? else {
        bail!("dam {dam_id} not found");
    };
    db::select_dam_for_analysis(&mut conn, user_id, dam_id)?;
    log_dam_selected(user_id, &dam.name);
    Ok(())
}

fn cmd_observations(pool: &DbPool, args: &[String]) -> Result<()> {
    let [dam] = args else {
        print_usage();
        process::exit(1);
    };
    let dam_id = parse_id(dam, "dam-id")?;

    let mut conn = pool.get()?;
    let Some((dam, _)) = db::get_dam_with_type(&mut conn, dam_id)? else {
        bail!("dam {dam_id} not found");
    };
    let rows = db::observed_anomalies_with_names(&mut conn, dam_id)?;
    utils::print_observations(&dam.name, &rows);
    Ok(())
}

fn cmd_analyze(pool: &DbPool, args: &[String]) -> Result<()> {
    let as_json = args.iter().any(|a| a == "--json");
    let ids: Vec<&String> = args.iter().filter(|a| *a != "--json").collect();
    let [user] = ids.as_slice() else {
        print_usage();
        process::exit(1);
    };
    let user_id = parse_id(user, "user-id")?;

    let mut conn = pool.get()?;
    let Some(dam_id) = db::dam_under_analysis(&mut conn, user_id)? else {
        bail!("no dam under analysis for user {user_id}; run `insid select {user_id} <dam-id>` first");
    };

    let report = scoring::run_analysis(&mut conn, dam_id)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        utils::print_report(&report);
    }
    Ok(())
}

fn parse_id(raw: &str, label: &str) -> Result<i32> {
    raw.parse()
        .with_context(|| format!("{label} must be an integer, got '{raw}'"))
}
