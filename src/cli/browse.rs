//! Hierarchy browsing commands
//!
//! Print one level of the catalog as `id<TAB>name` lines.

use crate::config::Config;
use crate::error::Result;
use crate::hierarchy::{Catalog, CatalogClient, Named};
use clap::Args;

#[derive(Args)]
pub struct RegionsArgs {
    /// Country id
    pub country_id: i64,
}

#[derive(Args)]
pub struct CommunitiesArgs {
    /// Region id
    pub region_id: i64,
}

#[derive(Args)]
pub struct SettlementsArgs {
    /// Community id
    pub community_id: i64,

    /// Only settlements whose name matches this text
    #[arg(long, short = 's')]
    pub search: Option<String>,
}

fn client() -> Result<CatalogClient> {
    let config = Config::load()?;
    CatalogClient::new(&config.api)
}

fn print_all<T: Named>(items: &[T]) {
    if items.is_empty() {
        eprintln!("(none)");
    }
    for item in items {
        println!("{}\t{}", item.id(), item.name());
    }
}

pub async fn countries() -> Result<()> {
    let countries = client()?.countries().await?;
    for country in &countries {
        println!("{}\t{}\t{}", country.id, country.iso_code, country.name);
    }
    Ok(())
}

pub async fn regions(args: RegionsArgs) -> Result<()> {
    print_all(&client()?.regions(args.country_id).await?);
    Ok(())
}

pub async fn communities(args: CommunitiesArgs) -> Result<()> {
    print_all(&client()?.communities(args.region_id).await?);
    Ok(())
}

pub async fn settlements(args: SettlementsArgs) -> Result<()> {
    let client = client()?;
    let settlements = match args.search.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => {
            client.search_settlements(args.community_id, query).await?
        }
        _ => client.settlements(args.community_id).await?,
    };
    print_all(&settlements);
    Ok(())
}
