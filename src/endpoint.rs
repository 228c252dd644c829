//! Where to connect and how to identify ourselves.

use std::{env, fmt, time::Duration};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// The websocket sub-protocol every connection negotiates.
pub const SUBPROTOCOL: &str = "graphql-transport-ws";

/// Which deployment of the backend to talk to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    /// railway.com
    #[default]
    Production,
    /// railway-staging.com
    Staging,
    /// railway-develop.com
    Develop,
}

impl Environment {
    /// Reads `RAILWAY_ENV`, falling back to production for anything unknown.
    pub fn from_env() -> Self {
        Self::parse(env::var("RAILWAY_ENV").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("staging") => Environment::Staging,
            Some("dev" | "develop") => Environment::Develop,
            _ => Environment::Production,
        }
    }

    /// The root host name of this environment
    pub fn host(self) -> &'static str {
        match self {
            Environment::Production => "railway.com",
            Environment::Staging => "railway-staging.com",
            Environment::Develop => "railway-develop.com",
        }
    }
}

/// Credentials sent with the upgrade request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A project scoped token, sent as `project-access-token`
    ProjectToken(String),
    /// An account token, sent as `authorization: Bearer <token>`
    ApiToken(String),
}

impl Credentials {
    /// Looks for `RAILWAY_TOKEN` then `RAILWAY_API_TOKEN`.
    ///
    /// Empty variables are treated as missing.
    pub fn from_env() -> Option<Self> {
        Self::pick(
            env::var("RAILWAY_TOKEN").ok(),
            env::var("RAILWAY_API_TOKEN").ok(),
        )
    }

    fn pick(project_token: Option<String>, api_token: Option<String>) -> Option<Self> {
        let present = |token: &String| !token.is_empty();
        project_token
            .filter(present)
            .map(Credentials::ProjectToken)
            .or_else(|| api_token.filter(present).map(Credentials::ApiToken))
    }

    fn header(&self) -> (String, String) {
        match self {
            Credentials::ProjectToken(token) => ("project-access-token".into(), token.clone()),
            Credentials::ApiToken(token) => ("authorization".into(), format!("Bearer {token}")),
        }
    }
}

// Keep tokens out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ProjectToken(_) => f.write_str("ProjectToken(..)"),
            Credentials::ApiToken(_) => f.write_str("ApiToken(..)"),
        }
    }
}

/// The websocket endpoint a subscription connects to.
///
/// ```rust
/// use std::time::Duration;
/// use backboard_subscriptions::{Credentials, Endpoint, Environment};
///
/// let endpoint = Endpoint::for_environment(Environment::Staging)
///     .credentials(Credentials::ApiToken("secret".into()))
///     .connect_timeout(Duration::from_secs(5));
///
/// assert_eq!(endpoint.url(), "wss://backboard.railway-staging.com/graphql/v2");
/// ```
#[derive(Clone, Debug)]
pub struct Endpoint {
    url: String,
    credentials: Option<Credentials>,
    client_identifier: String,
    extra_headers: Vec<(String, String)>,
    connect_timeout: Duration,
    proxy: Option<String>,
}

impl Endpoint {
    /// An endpoint at an explicit `ws://` or `wss://` url.
    pub fn new(url: impl Into<String>) -> Self {
        Endpoint {
            url: url.into(),
            credentials: None,
            client_identifier: default_client_identifier(),
            extra_headers: Vec::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            proxy: None,
        }
    }

    /// The GraphQL endpoint of the given environment.
    pub fn for_environment(environment: Environment) -> Self {
        Self::new(format!("wss://backboard.{}/graphql/v2", environment.host()))
    }

    /// Environment, credentials & proxy taken from the process environment.
    ///
    /// The proxy comes from `HTTPS_PROXY`, unless `NO_PROXY` covers the host.
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        let mut endpoint = Self::for_environment(environment);
        if let Some(credentials) = Credentials::from_env() {
            endpoint = endpoint.credentials(credentials);
        }

        let proxy = pick_proxy(
            env_var(&["HTTPS_PROXY", "https_proxy"]),
            env_var(&["NO_PROXY", "no_proxy"]).as_deref(),
            &format!("backboard.{}", environment.host()),
        );
        match proxy {
            Some(proxy) => endpoint.proxy(proxy),
            None => endpoint,
        }
    }

    /// Sets the credentials used to authenticate.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the value of the `x-source` & `user-agent` headers.
    pub fn client_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.client_identifier = identifier.into();
        self
    }

    /// Adds an extra header to the upgrade request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Bounds how long opening the socket may take, including the HTTP upgrade.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Tunnels the connection through an HTTP proxy with `CONNECT`.
    ///
    /// Takes `http://host:port`, or just `host:port`.
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }

    /// The HTTP proxy to tunnel through, if any
    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// The url to connect to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// How long opening the socket may take
    pub fn timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Every header sent with the upgrade request, except the sub-protocol.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(self.extra_headers.len() + 3);
        headers.extend(self.credentials.as_ref().map(Credentials::header));
        headers.push(("x-source".into(), self.client_identifier.clone()));
        headers.push(("user-agent".into(), self.client_identifier.clone()));
        headers.extend(self.extra_headers.iter().cloned());
        headers
    }
}

fn env_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.is_empty())
}

fn pick_proxy(proxy: Option<String>, no_proxy: Option<&str>, host: &str) -> Option<String> {
    let bypassed = no_proxy.is_some_and(|no_proxy| {
        no_proxy
            .split(',')
            .map(|entry| entry.trim().trim_start_matches('.'))
            .filter(|entry| !entry.is_empty())
            .any(|entry| {
                entry == "*"
                    || host == entry
                    || host
                        .strip_suffix(entry)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            })
    });

    if bypassed {
        None
    } else {
        proxy
    }
}

fn default_client_identifier() -> String {
    format!("railway-cli/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_names() {
        assert_eq!(Environment::parse(None), Environment::Production);
        assert_eq!(Environment::parse(Some("production")), Environment::Production);
        assert_eq!(Environment::parse(Some("staging")), Environment::Staging);
        assert_eq!(Environment::parse(Some("dev")), Environment::Develop);
        assert_eq!(Environment::parse(Some("develop")), Environment::Develop);
        assert_eq!(Environment::parse(Some("qa")), Environment::Production);
    }

    #[test]
    fn project_token_wins_over_api_token() {
        assert_eq!(
            Credentials::pick(Some("project".into()), Some("api".into())),
            Some(Credentials::ProjectToken("project".into()))
        );
        assert_eq!(
            Credentials::pick(Some(String::new()), Some("api".into())),
            Some(Credentials::ApiToken("api".into()))
        );
        assert_eq!(Credentials::pick(None, Some(String::new())), None);
    }

    #[test]
    fn headers_carry_auth_and_identification() {
        let endpoint = Endpoint::for_environment(Environment::Production)
            .credentials(Credentials::ApiToken("abc".into()))
            .client_identifier("railway-cli/4.6.1")
            .header("x-request-id", "1");

        assert_eq!(endpoint.url(), "wss://backboard.railway.com/graphql/v2");
        insta::assert_debug_snapshot!(endpoint.headers(), @r#"
        [
            (
                "authorization",
                "Bearer abc",
            ),
            (
                "x-source",
                "railway-cli/4.6.1",
            ),
            (
                "user-agent",
                "railway-cli/4.6.1",
            ),
            (
                "x-request-id",
                "1",
            ),
        ]
        "#);
    }

    #[test]
    fn project_tokens_use_their_own_header() {
        let headers = Endpoint::new("ws://localhost:4000/graphql")
            .credentials(Credentials::ProjectToken("p".into()))
            .headers();

        assert_eq!(headers[0], ("project-access-token".into(), "p".into()));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn proxy_honours_no_proxy() {
        let proxy = || Some("http://proxy:3128".to_owned());
        let host = "backboard.railway.com";

        assert_eq!(pick_proxy(proxy(), None, host).as_deref(), Some("http://proxy:3128"));
        assert_eq!(pick_proxy(None, None, host), None);
        assert_eq!(pick_proxy(proxy(), Some("*"), host), None);
        assert_eq!(pick_proxy(proxy(), Some("localhost, .railway.com"), host), None);
        assert_eq!(pick_proxy(proxy(), Some("backboard.railway.com"), host), None);
        assert_eq!(
            pick_proxy(proxy(), Some("way.com,example.com"), host).as_deref(),
            Some("http://proxy:3128")
        );
    }

    #[test]
    fn credentials_debug_hides_tokens() {
        let rendered = format!("{:?}", Credentials::ApiToken("secret".into()));
        assert!(!rendered.contains("secret"));
    }
}
