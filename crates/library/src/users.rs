//! Steam user references as typed on the command line.

/// A Steam user named by id or by profile vanity name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SteamUserRef {
    Id(u64),
    Vanity(String),
}

/// Parses a Steam id, a vanity name, or a community profile URL
/// (`.../profiles/<id>` or `.../id/<vanity>`).
pub fn parse_steam_user(input: &str) -> Option<SteamUserRef> {
    let input = input.trim().trim_end_matches('/');

    if let Some((_, rest)) = input.split_once("/profiles/") {
        return first_segment(rest).parse().ok().map(SteamUserRef::Id);
    }
    if let Some((_, rest)) = input.split_once("/id/") {
        return vanity(first_segment(rest));
    }
    if let Ok(id) = input.parse::<u64>() {
        return Some(SteamUserRef::Id(id));
    }
    vanity(input)
}

fn first_segment(path: &str) -> &str {
    path.split(['/', '?', '#']).next().unwrap_or_default()
}

fn vanity(name: &str) -> Option<SteamUserRef> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then(|| SteamUserRef::Vanity(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_input_is_an_id() {
        assert_eq!(
            parse_steam_user(" 76561197960287930 "),
            Some(SteamUserRef::Id(76561197960287930))
        );
    }

    #[test]
    fn profile_urls() {
        assert_eq!(
            parse_steam_user("https://steamcommunity.com/profiles/76561197960287930/"),
            Some(SteamUserRef::Id(76561197960287930))
        );
        assert_eq!(
            parse_steam_user("https://steamcommunity.com/id/gabelogannewell/games?tab=all"),
            Some(SteamUserRef::Vanity("gabelogannewell".into()))
        );
        assert_eq!(parse_steam_user("https://steamcommunity.com/profiles/abc"), None);
    }

    #[test]
    fn bare_vanity_name() {
        assert_eq!(
            parse_steam_user("robin_walker"),
            Some(SteamUserRef::Vanity("robin_walker".into()))
        );
        assert_eq!(parse_steam_user(""), None);
        assert_eq!(parse_steam_user("not a name"), None);
    }
}
