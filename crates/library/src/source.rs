//! Where library listings come from.

use std::future::Future;
use std::pin::Pin;

use covered_steam::{Error, OwnedGame, SharedApp};

/// Boxed future returned by [`LibrarySource`] methods.
pub type LibraryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

/// Steam ownership queries used by the library service.
pub trait LibrarySource: Send + Sync {
    fn owned_games(&self, steam_user_id: u64) -> LibraryFuture<'_, Vec<OwnedGame>>;

    fn family_group_for_user<'a>(
        &'a self,
        steam_user_id: u64,
        access_token: &'a str,
    ) -> LibraryFuture<'a, Option<u64>>;

    fn shared_library_apps<'a>(
        &'a self,
        family_group_id: u64,
        access_token: &'a str,
    ) -> LibraryFuture<'a, Vec<SharedApp>>;

    /// Resolves a profile vanity name to a Steam id.
    fn resolve_vanity_url<'a>(&'a self, vanity: &'a str) -> LibraryFuture<'a, Option<u64>>;
}

impl LibrarySource for covered_steam::Client {
    fn owned_games(&self, steam_user_id: u64) -> LibraryFuture<'_, Vec<OwnedGame>> {
        Box::pin(covered_steam::Client::owned_games(self, steam_user_id))
    }

    fn family_group_for_user<'a>(
        &'a self,
        steam_user_id: u64,
        access_token: &'a str,
    ) -> LibraryFuture<'a, Option<u64>> {
        Box::pin(covered_steam::Client::family_group_for_user(
            self,
            steam_user_id,
            access_token,
        ))
    }

    fn shared_library_apps<'a>(
        &'a self,
        family_group_id: u64,
        access_token: &'a str,
    ) -> LibraryFuture<'a, Vec<SharedApp>> {
        Box::pin(covered_steam::Client::shared_library_apps(
            self,
            family_group_id,
            access_token,
        ))
    }

    fn resolve_vanity_url<'a>(&'a self, vanity: &'a str) -> LibraryFuture<'a, Option<u64>> {
        Box::pin(covered_steam::Client::resolve_vanity_url(self, vanity))
    }
}
