/// API route handlers, one module per resource
///
/// - `health`: health check
/// - `auth`: registration, login, token refresh
/// - `users`: account administration and team membership
/// - `teams`, `bugs`, `resolutions`, `messages`, `media`: tracker resources

pub mod auth;
pub mod bugs;
pub mod health;
pub mod media;
pub mod messages;
pub mod resolutions;
pub mod teams;
pub mod users;

use bugimprints_shared::services::Page;
use serde::{Deserialize, Deserializer};

/// `?limit=&offset=` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Page::new(query.limit, query.offset)
    }
}

/// Tells an explicit `null` apart from an absent field
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`: absent gives
/// `None`, `null` gives `Some(None)`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        description: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_field() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.description, None);

        let cleared: Patch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: Patch = serde_json::from_str(r#"{"description": "steps"}"#).unwrap();
        assert_eq!(set.description, Some(Some("steps".to_string())));
    }

    #[test]
    fn test_page_query_is_clamped() {
        let page: Page = PageQuery {
            limit: Some(10_000),
            offset: Some(-5),
        }
        .into();
        assert_eq!(page.limit, bugimprints_shared::services::MAX_PAGE_SIZE);
        assert_eq!(page.offset, 0);
    }
}
