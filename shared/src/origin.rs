use std::str::FromStr;

use url::Url;

use crate::WidgetError;

/// Origin the widget is served from during local development.
pub const DEV_ORIGIN: &str = "http://localhost:3000";

/// How sender origins gate the host controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OriginCheck {
    /// One check gates every state change and every dispatched action.
    #[default]
    Strict,
    /// Presence (open/closed/maximized) follows every message from any
    /// sender; only named actions are origin-checked. Unknown types read
    /// as "closed". Kept for hosts that depend on that behaviour.
    Legacy,
}

impl FromStr for OriginCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(OriginCheck::Strict),
            "legacy" => Ok(OriginCheck::Legacy),
            other => Err(format!("unknown origin check {other:?}")),
        }
    }
}

/// Origins allowed to drive the host controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPolicy {
    trusted: Vec<String>,
}

impl OriginPolicy {
    /// Trusts the https origin of `base_url` (whatever scheme it was
    /// written with) plus [`DEV_ORIGIN`].
    pub fn for_base_url(base_url: &str) -> Result<Self, WidgetError> {
        let with_scheme = if base_url.contains("://") {
            base_url.to_string()
        } else {
            format!("https://{base_url}")
        };
        let mut url = Url::parse(&with_scheme).map_err(|source| WidgetError::BaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if url.scheme() != "https" && url.set_scheme("https").is_err() {
            // Non-special schemes cannot be switched; rebuild from the host.
            let host = url.host_str().unwrap_or_default().to_string();
            url = Url::parse(&format!("https://{host}")).map_err(|source| {
                WidgetError::BaseUrl {
                    url: base_url.to_string(),
                    source,
                }
            })?;
        }
        let origin = url.origin().ascii_serialization();
        Ok(Self::new([origin, DEV_ORIGIN.to_string()]))
    }

    pub fn new(trusted: impl IntoIterator<Item = String>) -> Self {
        let mut list: Vec<String> = Vec::new();
        for origin in trusted {
            if !list.contains(&origin) {
                list.push(origin);
            }
        }
        Self { trusted: list }
    }

    pub fn is_trusted(&self, origin: &str) -> bool {
        self.trusted.iter().any(|o| o == origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_base_is_upgraded_to_https() {
        let policy = OriginPolicy::for_base_url("http://chat.example.com").unwrap();
        assert!(policy.is_trusted("https://chat.example.com"));
        assert!(!policy.is_trusted("http://chat.example.com"));
    }

    #[test]
    fn path_and_port_are_handled() {
        let policy = OriginPolicy::for_base_url("https://chat.example.com:8443/static").unwrap();
        assert!(policy.is_trusted("https://chat.example.com:8443"));
        assert!(!policy.is_trusted("https://chat.example.com"));
    }

    #[test]
    fn dev_origin_is_always_trusted() {
        let policy = OriginPolicy::for_base_url("https://chat.example.com").unwrap();
        assert!(policy.is_trusted(DEV_ORIGIN));
        assert!(!policy.is_trusted("https://evil.example"));
        assert!(!policy.is_trusted("null"));
    }

    #[test]
    fn schemeless_base_is_accepted() {
        let policy = OriginPolicy::for_base_url("chat.example.com").unwrap();
        assert!(policy.is_trusted("https://chat.example.com"));
    }

    #[test]
    fn garbage_base_is_an_error() {
        assert!(matches!(
            OriginPolicy::for_base_url("https://"),
            Err(WidgetError::BaseUrl { .. })
        ));
    }

    #[test]
    fn origin_check_parses_case_insensitively() {
        assert_eq!("LEGACY".parse::<OriginCheck>(), Ok(OriginCheck::Legacy));
        assert_eq!("strict".parse::<OriginCheck>(), Ok(OriginCheck::Strict));
        assert!("loose".parse::<OriginCheck>().is_err());
    }
}
