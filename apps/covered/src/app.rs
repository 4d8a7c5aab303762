//! Command handlers: wire the library crates together per command.

use std::sync::Arc;

use anyhow::{Context, ensure};
use covered_catalog::{CatalogStore, Game, GameWithPlaytime, JsonCatalogStore, User};
use covered_export::{AssetDownloader, ExportBuilder};
use covered_library::{GameLibrary, unresolved_count};
use covered_steam::AppNameCache;
use covered_sync::{CoverSync, TickReport};
use tokio_util::sync::CancellationToken;

use crate::cli::{Command, UsersCommand};
use crate::config::Config;

/// Runs one command to completion.
pub async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    let store: Arc<dyn CatalogStore> = Arc::new(
        JsonCatalogStore::open(config.catalog_path.clone())
            .with_context(|| format!("opening catalog {}", config.catalog_path.display()))?,
    );

    match command {
        Command::Run => run_services(&config, store).await,
        Command::SyncOnce => {
            let report = cover_sync(&config, store)?.run_tick().await?;
            print_report(&report);
            Ok(())
        }
        Command::Import { user, family_token } => {
            let client = steam_client(&config)?;
            let names = loaded_names(&client).await;
            let library = game_library(store, client, names);
            let steam_id = library.resolve_steam_user(&user).await?;
            let games = match family_token {
                Some(token) => library.games_for_family(steam_id, &token).await?,
                None => library.games_for_player(steam_id).await?,
            };
            print_library(&games);
            Ok(())
        }
        Command::LoadGame {
            app_id,
            name,
            capsule,
        } => {
            let client = steam_client(&config)?;
            let names = if name.trim().is_empty() && store.find_game_by_steam_id(app_id)?.is_none() {
                loaded_names(&client).await
            } else {
                Arc::new(AppNameCache::new())
            };
            let game = game_library(store, client, names).load_game(app_id, &name, &capsule)?;
            print_game(&game);
            Ok(())
        }
        Command::Games { search } => {
            for game in store.list_games(search.as_deref())? {
                print_game(&game);
            }
            Ok(())
        }
        Command::Covers { game } => {
            ensure!(store.find_game_by_id(&game)?.is_some(), "no game with id {game}");
            for cover in store.covers_for_game(&game)? {
                println!(
                    "{}  {}x{}  {:<10} {}",
                    cover.id, cover.width, cover.height, cover.style, cover.url
                );
            }
            Ok(())
        }
        Command::Export { out, cover_ids } => {
            let downloader = AssetDownloader::new(&config.downloader_config())?;
            let builder = ExportBuilder::new(store, Arc::new(downloader), config.export_config());
            let archive = builder.build_archive(&cover_ids).await;
            std::fs::write(&out, &archive)
                .with_context(|| format!("writing {}", out.display()))?;
            println!("wrote {} ({} bytes)", out.display(), archive.len());
            Ok(())
        }
        Command::Users { action } => run_users(&config, store, action).await,
    }
}

async fn run_users(
    config: &Config,
    store: Arc<dyn CatalogStore>,
    action: UsersCommand,
) -> anyhow::Result<()> {
    match action {
        UsersCommand::Add { user, name } => {
            let client = steam_client(config)?;
            let names = loaded_names(&client).await;
            let library = game_library(store, client, names);
            let steam_id = library.resolve_steam_user(&user).await?;
            let user = library.add_user(steam_id, &name).await?;
            print_user(&user);
        }
        UsersCommand::List => {
            for user in store.list_users()? {
                print_user(&user);
            }
        }
        UsersCommand::Show { id } => {
            let user = store
                .find_user_by_id(&id)?
                .with_context(|| format!("no user with id {id}"))?;
            print_user(&user);
            for game_id in &user.game_ids {
                if let Some(game) = store.find_game_by_id(game_id)? {
                    print_game(&game);
                }
            }
        }
        UsersCommand::Rm { id } => {
            ensure!(store.delete_user(&id)?, "no user with id {id}");
            println!("deleted user {id}");
        }
    }
    Ok(())
}

/// Runs the sync loop and the app name refresh loop until Ctrl-C.
///
/// Every app list refresh also names games still stored as unknown.
async fn run_services(config: &Config, store: Arc<dyn CatalogStore>) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let sync = cover_sync(config, Arc::clone(&store))?;

    let client = steam_client(config)?;
    let names = Arc::new(AppNameCache::new());
    let library = Arc::new(game_library(store, client.clone(), Arc::clone(&names)));
    let refresh = tokio::spawn(Arc::clone(&names).run_refresh_loop(
        client,
        config.app_list_refresh(),
        cancel.clone(),
        move |_| {
            let library = Arc::clone(&library);
            tokio::task::spawn_blocking(move || {
                if let Err(e) = library.backfill_unknown_names() {
                    tracing::warn!(error = %e, "failed to name unknown games");
                }
            });
        },
    ));

    let sync_cancel = cancel.clone();
    let sync_task = tokio::spawn(async move { sync.run(sync_cancel).await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    cancel.cancel();

    sync_task.await?;
    refresh.await?;
    Ok(())
}

fn cover_sync(config: &Config, store: Arc<dyn CatalogStore>) -> anyhow::Result<CoverSync> {
    ensure!(
        !config.steamgriddb_api_key.trim().is_empty(),
        "steamgriddb_api_key is not set in the configuration"
    );
    let client =
        covered_steamgriddb::Client::new(&config.steamgriddb_api_key, config.response_timeout())?;
    Ok(CoverSync::new(store, Arc::new(client), config.sync_config()))
}

fn steam_client(config: &Config) -> anyhow::Result<covered_steam::Client> {
    ensure!(
        !config.steam_api_key.trim().is_empty(),
        "steam_api_key is not set in the configuration"
    );
    Ok(covered_steam::Client::new(
        &config.steam_api_key,
        config.response_timeout(),
    )?)
}

/// Loads the Steam app list once. A failure leaves the table empty.
async fn loaded_names(client: &covered_steam::Client) -> Arc<AppNameCache> {
    let names = Arc::new(AppNameCache::new());
    if let Err(e) = names.refresh(client).await {
        tracing::warn!(error = %e, "could not load Steam app names");
    }
    names
}

fn game_library(
    store: Arc<dyn CatalogStore>,
    client: covered_steam::Client,
    names: Arc<AppNameCache>,
) -> GameLibrary {
    GameLibrary::new(store, Arc::new(client), names)
}

fn print_report(report: &TickReport) {
    println!(
        "games: {}  synced: {}  missing: {}  failed: {}  covers saved: {}",
        report.games, report.synced, report.missing, report.failed, report.covers_saved
    );
}

fn print_library(games: &[GameWithPlaytime]) {
    for entry in games {
        print_game(&entry.game);
    }
    println!(
        "{} games, {} waiting for covers",
        games.len(),
        unresolved_count(games.iter().map(|entry| &entry.game))
    );
}

fn print_user(user: &User) {
    println!(
        "{}  {:>17}  {:<18} {} games",
        user.id,
        user.steam_id,
        user.username,
        user.game_ids.len()
    );
}

fn print_game(game: &Game) {
    let status = if game.cover_provider_missing {
        "missing".to_string()
    } else {
        match game
            .last_cover_fetch
            .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        {
            Some(at) => format!("synced {}", at.format("%Y-%m-%d %H:%M")),
            None => "pending".to_string(),
        }
    };
    let app_id = game
        .steam_app_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".into());
    println!("{}  {:>8}  {:<18} {}", game.id, app_id, status, game.name);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            catalog_path: dir.join("catalog.json"),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn listing_commands_work_offline() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());

        let store = JsonCatalogStore::open(config.catalog_path.clone()).unwrap();
        let game = store
            .save_game(Game {
                name: "Dota 2".into(),
                steam_app_id: Some(570),
                ..Default::default()
            })
            .unwrap();
        drop(store);

        run(Command::Games { search: Some("dota".into()) }, config.clone())
            .await
            .unwrap();
        run(Command::Covers { game: game.id }, config.clone())
            .await
            .unwrap();
        assert!(
            run(Command::Covers { game: "nope".into() }, config)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn sync_requires_api_key() {
        let tmp = tempfile::tempdir().unwrap();
        let err = run(Command::SyncOnce, config_in(tmp.path()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("steamgriddb_api_key"));
    }

    #[tokio::test]
    async fn export_of_unknown_ids_writes_empty_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("covers.zip");

        run(
            Command::Export {
                out: out.clone(),
                cover_ids: vec!["missing".into()],
            },
            config_in(tmp.path()),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), covered_export::empty_archive());
    }

    #[tokio::test]
    async fn user_commands_work_offline() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());

        let store = JsonCatalogStore::open(config.catalog_path.clone()).unwrap();
        let game = store
            .save_game(Game {
                name: "Dota 2".into(),
                steam_app_id: Some(570),
                ..Default::default()
            })
            .unwrap();
        let user = store
            .save_user(User {
                username: "gaben".into(),
                steam_id: 76561197960287930,
                game_ids: vec![game.id],
                ..Default::default()
            })
            .unwrap();

        let users = |action| run(Command::Users { action }, config.clone());
        users(UsersCommand::List).await.unwrap();
        users(UsersCommand::Show { id: user.id.clone() }).await.unwrap();
        users(UsersCommand::Rm { id: user.id.clone() }).await.unwrap();

        assert!(store.list_users().unwrap().is_empty());
        assert_eq!(store.list_games(None).unwrap().len(), 1);
        assert!(users(UsersCommand::Show { id: user.id.clone() }).await.is_err());
        assert!(users(UsersCommand::Rm { id: user.id }).await.is_err());
    }

    #[tokio::test]
    async fn import_requires_steam_key() {
        let tmp = tempfile::tempdir().unwrap();
        let err = run(
            Command::Import {
                user: "gaben".into(),
                family_token: None,
            },
            config_in(tmp.path()),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("steam_api_key"));
    }
}
