use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use commercial_funnel_analytics::filters::{
    self, ClosingFilters, ProspectingFilters, RevenueFilters,
};
use commercial_funnel_analytics::{db, options, report, view};

#[derive(Parser)]
#[command(name = "funnel-analytics")]
#[command(about = "Commercial funnel analytics over the shared sales backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Domain {
    Prospecting,
    Closing,
    Revenue,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import end-of-day prospecting logs from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print global KPIs for one domain
    Kpis {
        #[arg(long, value_enum)]
        domain: Domain,
        /// Filters as a query string, e.g. "channels=Ads,Cold Calling&year=2025"
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print the distinct filter options for one domain
    Options {
        #[arg(long, value_enum)]
        domain: Domain,
        #[arg(long)]
        json: bool,
    },
    /// Print the deduplicated weekly roll-up across both activity domains
    Weekly {
        /// Only include rows on or after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        json: bool,
        /// Also write the roll-up as a markdown report
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report for one domain
    Report {
        #[arg(long, value_enum)]
        domain: Domain,
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn scope_label(raw_query: &str) -> &str {
    if raw_query.is_empty() {
        "all records"
    } else {
        raw_query
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the analytics Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_prospecting_csv(&pool, &csv).await?;
            println!("Inserted {inserted} prospecting rows from {}.", csv.display());
        }
        Commands::Kpis {
            domain,
            query,
            json,
        } => {
            let raw = query.unwrap_or_default();
            let map = filters::parse_query_string(&raw);
            match domain {
                Domain::Prospecting => {
                    let f = ProspectingFilters::decode(&map);
                    let v = view::load_prospecting_view(&pool, &f).await;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&v)?);
                    } else {
                        println!("Prospecting KPIs ({}):", scope_label(&raw));
                        println!(
                            "- calls: {} made, {} answered (answer rate {:.1}%)",
                            v.kpis.totals.calls_made,
                            v.kpis.totals.calls_answered,
                            v.kpis.answer_rate
                        );
                        println!(
                            "- meetings: {} booked, {} showed up (show-up rate {:.1}%)",
                            v.kpis.totals.meetings_booked,
                            v.kpis.totals.leads_showed,
                            v.kpis.show_up_rate
                        );
                        println!(
                            "- submissions: {} (conversion to booking {:.1}%)",
                            v.kpis.totals.submissions, v.kpis.conversion_rate
                        );
                        println!(
                            "- avg response time {:.1} min, avg days to discovery {:.1}",
                            v.kpis.avg_response_time, v.kpis.avg_days_to_discovery
                        );
                    }
                }
                Domain::Closing => {
                    let f = ClosingFilters::decode(&map);
                    let v = view::load_closing_view(&pool, &f).await;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&v)?);
                    } else {
                        println!("Closing KPIs ({}):", scope_label(&raw));
                        println!(
                            "- discoveries: {} held (show-up rate {:.1}%)",
                            v.kpis.totals.discoveries_held, v.kpis.discovery_show_up_rate
                        );
                        println!(
                            "- follow-ups: {} held (show-up rate {:.1}%)",
                            v.kpis.totals.follow_ups_held, v.kpis.follow_up_show_up_rate
                        );
                        println!(
                            "- Q&As: {} held (show-up rate {:.1}%)",
                            v.kpis.totals.qas_held, v.kpis.qa_show_up_rate
                        );
                        println!(
                            "- {} MQLs -> {} SQLs ({:.1}%) -> {} verbal agreements ({:.1}%)",
                            v.kpis.totals.mqls,
                            v.kpis.totals.sqls,
                            v.kpis.mql_to_sql_rate,
                            v.kpis.totals.verbal_agreements,
                            v.kpis.sql_to_verbal_rate
                        );
                    }
                }
                Domain::Revenue => {
                    let f = RevenueFilters::decode(&map);
                    let v = view::load_revenue_view(&pool, &f).await;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&v)?);
                    } else {
                        println!("Revenue KPIs ({}):", scope_label(&raw));
                        println!(
                            "- {} projects, {:.2} revenue, {:.2} avg deal value",
                            v.kpis.projects, v.kpis.revenue, v.kpis.avg_deal_value
                        );
                        for slice in v.by_market.iter() {
                            println!(
                                "- {}: {} projects, {:.2} revenue",
                                slice.label, slice.projects, slice.revenue
                            );
                        }
                    }
                }
            }
        }
        Commands::Options { domain, json } => match domain {
            Domain::Prospecting => {
                let dims = db::fetch_prospecting_dims(&pool).await;
                let opts = options::prospecting_options(&dims);
                if json {
                    println!("{}", serde_json::to_string_pretty(&opts)?);
                } else {
                    println!("agents: {}", opts.agents.join(", "));
                    println!("channels: {}", opts.channels.join(", "));
                    println!("offers: {}", opts.offers.join(", "));
                    println!("years: {}", join_years(&opts.years));
                    println!("quarters: {}", opts.quarters.join(", "));
                    println!("months: {}", opts.months.join(", "));
                }
            }
            Domain::Closing => {
                let dims = db::fetch_closing_dims(&pool).await;
                let opts = options::closing_options(&dims);
                if json {
                    println!("{}", serde_json::to_string_pretty(&opts)?);
                } else {
                    println!("closers: {}", opts.closers.join(", "));
                    println!("offers: {}", opts.offers.join(", "));
                    println!("origin agents: {}", opts.origin_agents.join(", "));
                    println!("origin channels: {}", opts.origin_channels.join(", "));
                    println!("years: {}", join_years(&opts.years));
                    println!("quarters: {}", opts.quarters.join(", "));
                    println!("months: {}", opts.months.join(", "));
                }
            }
            Domain::Revenue => {
                let dims = db::fetch_revenue_dims(&pool).await;
                let opts = options::revenue_options(&dims);
                if json {
                    println!("{}", serde_json::to_string_pretty(&opts)?);
                } else {
                    println!("executives: {}", opts.executives.join(", "));
                    println!("offers: {}", opts.offers.join(", "));
                    println!("markets: {}", opts.markets.join(", "));
                    println!("closers: {}", opts.closers.join(", "));
                    println!("consultants: {}", opts.consultants.join(", "));
                    println!("channels: {}", opts.channels.join(", "));
                    println!("years: {}", join_years(&opts.years));
                    println!("quarters: {}", opts.quarters.join(", "));
                    println!("months: {}", opts.months.join(", "));
                }
            }
        },
        Commands::Weekly { since, json, out } => {
            let rollup = view::load_weekly_rollup(&pool, since.as_deref()).await;
            if let Some(out) = out {
                std::fs::write(&out, report::build_weekly_report(&rollup))?;
                println!("Report written to {}.", out.display());
            } else if json {
                println!("{}", serde_json::to_string_pretty(&rollup)?);
            } else if rollup.is_empty() {
                println!("No rows in this window.");
            } else {
                for week in &rollup {
                    println!(
                        "{}: {} bookings, {} discoveries ({} attended), {} MQLs -> {} SQLs -> {} verbal",
                        week.week,
                        week.bookings,
                        week.discoveries_held,
                        week.discovery_attended,
                        week.mqls,
                        week.sqls,
                        week.verbal_agreements
                    );
                }
            }
        }
        Commands::Report { domain, query, out } => {
            let raw = query.unwrap_or_default();
            let map = filters::parse_query_string(&raw);
            let scope = scope_label(&raw);
            let contents = match domain {
                Domain::Prospecting => {
                    let f = ProspectingFilters::decode(&map);
                    let v = view::load_prospecting_view(&pool, &f).await;
                    report::build_prospecting_report(scope, &v)
                }
                Domain::Closing => {
                    let f = ClosingFilters::decode(&map);
                    let v = view::load_closing_view(&pool, &f).await;
                    report::build_closing_report(scope, &v)
                }
                Domain::Revenue => {
                    let f = RevenueFilters::decode(&map);
                    let v = view::load_revenue_view(&pool, &f).await;
                    report::build_revenue_report(scope, &v)
                }
            };
            std::fs::write(&out, contents)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn join_years(years: &[i32]) -> String {
    years
        .iter()
        .map(|y| y.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
