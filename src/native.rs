#[cfg(feature = "tungstenite")]
mod tungstenite_0_27;

#[cfg(feature = "connect")]
pub use self::connect::{connect, WebsocketStream};

#[cfg(feature = "connect")]
mod connect {
    use futures_lite::future;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
    };
    use tungstenite::{
        client::IntoClientRequest,
        http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderName, HeaderValue, Request, Uri},
    };

    use crate::{endpoint::SUBPROTOCOL, logging::debug, Cancellation, Endpoint, Error};

    /// The websocket returned by [`connect`].
    pub type WebsocketStream =
        async_tungstenite::WebSocketStream<async_tungstenite::tokio::ConnectStream>;

    /// Opens a websocket to the endpoint, negotiating the graphql-transport-ws sub-protocol.
    ///
    /// When the endpoint has a [proxy](Endpoint::proxy) the socket is tunnelled
    /// through it with HTTP `CONNECT`.
    ///
    /// Fails with [`Error::Connect`] if the socket can't be opened within the
    /// endpoint's connect timeout, or [`Error::Cancelled`] if the cancellation
    /// fires first.  Must be called from within a tokio runtime.
    #[cfg_attr(docsrs, doc(cfg(feature = "connect")))]
    pub async fn connect(
        endpoint: &Endpoint,
        cancellation: &Cancellation,
    ) -> Result<WebsocketStream, Error> {
        if cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let request = upgrade_request(endpoint)?;
        let timeout = endpoint.timeout();

        debug!("connecting to {}", endpoint.url());

        let connecting = async {
            let (stream, _response) = match endpoint.proxy_url() {
                Some(proxy) => {
                    let tunnel = tunnel(proxy, request.uri()).await?;
                    async_tungstenite::tokio::client_async_tls(request, tunnel).await
                }
                None => async_tungstenite::tokio::connect_async(request).await,
            }
            .map_err(|error| Error::Connect(error.to_string()))?;
            Ok::<_, Error>(stream)
        };
        let timed_out = async {
            futures_timer::Delay::new(timeout).await;
            Err(Error::Connect(format!("timed out after {timeout:?}")))
        };
        let cancelled = async {
            cancellation.cancelled().await;
            Err(Error::Cancelled)
        };

        future::or(connecting, future::or(cancelled, timed_out)).await
    }

    fn upgrade_request(endpoint: &Endpoint) -> Result<Request<()>, Error> {
        let mut request = endpoint
            .url()
            .into_client_request()
            .map_err(|error| Error::Connect(error.to_string()))?;

        let headers = request.headers_mut();
        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));

        for (name, value) in endpoint.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|error| Error::Connect(format!("invalid header name {name}: {error}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|error| Error::Connect(format!("invalid value for {name}: {error}")))?;
            headers.insert(name, value);
        }

        Ok(request)
    }

    /// Largest proxy response head we're willing to read
    const MAX_PROXY_RESPONSE: usize = 8 * 1024;

    /// Opens a TCP tunnel to the target through an HTTP proxy.
    async fn tunnel(proxy: &str, target: &Uri) -> Result<TcpStream, Error> {
        let proxy_address = proxy_address(proxy)?;
        let target_address = target_address(target)?;

        debug!("tunnelling to {target_address} through {proxy_address}");

        let mut stream = TcpStream::connect(proxy_address.as_str())
            .await
            .map_err(|error| Error::Connect(format!("proxy {proxy_address}: {error}")))?;

        let connect = format!("CONNECT {target_address} HTTP/1.1\r\nHost: {target_address}\r\n\r\n");
        stream
            .write_all(connect.as_bytes())
            .await
            .map_err(|error| Error::Connect(format!("proxy {proxy_address}: {error}")))?;

        // Read a byte at a time so nothing past the response head is consumed
        let mut head = Vec::new();
        while !head.ends_with(b"\r\n\r\n") {
            if head.len() >= MAX_PROXY_RESPONSE {
                return Err(Error::Connect("proxy response too large".into()));
            }
            let byte = stream
                .read_u8()
                .await
                .map_err(|error| Error::Connect(format!("proxy {proxy_address}: {error}")))?;
            head.push(byte);
        }

        let head = String::from_utf8_lossy(&head);
        let status_line = head.lines().next().unwrap_or_default();
        match status_line.split_whitespace().nth(1) {
            Some(status) if status.starts_with('2') => Ok(stream),
            _ => Err(Error::Connect(format!("proxy refused CONNECT: {status_line}"))),
        }
    }

    fn proxy_address(proxy: &str) -> Result<String, Error> {
        let url = if proxy.contains("://") {
            proxy.to_owned()
        } else {
            format!("http://{proxy}")
        };
        let uri: Uri = url
            .parse()
            .map_err(|error| Error::Connect(format!("invalid proxy {proxy}: {error}")))?;

        if uri.scheme_str() != Some("http") {
            return Err(Error::Connect(format!("unsupported proxy scheme in {proxy}")));
        }
        let host = uri
            .host()
            .ok_or_else(|| Error::Connect(format!("proxy {proxy} has no host")))?;

        Ok(format!("{host}:{}", uri.port_u16().unwrap_or(80)))
    }

    fn target_address(target: &Uri) -> Result<String, Error> {
        let host = target
            .host()
            .ok_or_else(|| Error::Connect(format!("{target} has no host")))?;
        let default_port = match target.scheme_str() {
            Some("wss") => 443,
            _ => 80,
        };

        Ok(format!("{host}:{}", target.port_u16().unwrap_or(default_port)))
    }

}
