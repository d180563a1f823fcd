//! # Session server demo
//!
//! Wires the gatehouse wares into a small hyper application backed by the
//! in-memory session store:
//!
//! - `POST /login`   decode credentials, bind an identity, persist the session
//! - `GET  /profile` authenticated profile lookup
//! - `POST /logout`  CSRF-checked session deletion
//!
//! Log in, capture the `sessionid` cookie, then replay it:
//!
//! ```text
//! curl -i -X POST -d '{"name": "ada"}' http://127.0.0.1:8080/login
//! curl -i -b 'sessionid=<id>' http://127.0.0.1:8080/profile
//! curl -i -b 'sessionid=<id>' -X POST -d '{"sessionid": "<id>"}' http://127.0.0.1:8080/logout
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use gatehouse_wares::{
    AppConfig, Authenticate, BodyParser, BoxError, Csrf, Disposition, ErrorWare,
    InMemorySessionStore, Populate, RequestContext, SessionDel, SessionGet, SessionSet, Ware,
    WareResponse, WareStack,
};

/// Login credentials decoded by the body parser.
#[derive(Default, Deserialize)]
struct LoginBody {
    name: String,
}

impl Populate for LoginBody {
    fn populate(&mut self, body: &[u8]) -> Result<(), BoxError> {
        *self = serde_json::from_slice(body)?;
        Ok(())
    }
}

/// Registers the login decode destination ahead of the body parser.
struct RegisterLoginBody;

#[async_trait]
impl Ware for RegisterLoginBody {
    async fn call(&self, ctx: &mut RequestContext) -> Disposition {
        ctx.set_decode_destination(Box::new(LoginBody::default()));
        Disposition::Continue
    }
}

/// Accepts any non-empty name and binds it as the session identity. A real
/// application would verify credentials here.
struct Login;

#[async_trait]
impl Ware for Login {
    async fn call(&self, ctx: &mut RequestContext) -> Disposition {
        let name = ctx
            .decode_destination()
            .and_then(|destination| destination.downcast_ref::<LoginBody>())
            .map(|body| body.name.clone())
            .unwrap_or_default();
        if name.is_empty() {
            return Disposition::halt(StatusCode::BAD_REQUEST, "name must not be empty");
        }
        ctx.set_session_user_id(name.clone());
        ctx.set_session_payload(json!({"id": name}));
        Disposition::Continue
    }
}

/// Terminal ware reporting the authenticated identity.
struct Profile;

#[async_trait]
impl Ware for Profile {
    async fn call(&self, ctx: &mut RequestContext) -> Disposition {
        Disposition::respond(Some(json!({
            "user": ctx.session_user_id(),
            "session": ctx.session_id(),
        })))
    }
}

/// Terminal ware for chains whose work happened upstream.
struct Done;

#[async_trait]
impl Ware for Done {
    async fn call(&self, _ctx: &mut RequestContext) -> Disposition {
        Disposition::respond(None)
    }
}

/// The method/path dispatch table; stacks are built once at startup.
struct Routes {
    login: WareStack,
    profile: WareStack,
    logout: WareStack,
    not_found: WareStack,
    method_not_allowed: WareStack,
}

impl Routes {
    fn new(config: Arc<AppConfig>, store: Arc<InMemorySessionStore>) -> Self {
        let mut login = WareStack::new();
        login.push(Arc::new(SessionGet::new(config.clone(), store.clone())));
        login.push(Arc::new(RegisterLoginBody));
        login.push(Arc::new(BodyParser::new(config.clone())));
        login.push(Arc::new(Login));
        login.push(Arc::new(SessionSet::new(config.clone(), store.clone())));
        login.push(Arc::new(Done));

        let mut profile = WareStack::new();
        profile.push(Arc::new(SessionGet::new(config.clone(), store.clone())));
        profile.push(Arc::new(Authenticate::new()));
        profile.push(Arc::new(Profile));

        let mut logout = WareStack::new();
        logout.push(Arc::new(SessionGet::new(config.clone(), store.clone())));
        logout.push(Arc::new(Authenticate::new()));
        logout.push(Arc::new(Csrf::new()));
        logout.push(Arc::new(SessionDel::new(config.clone(), store.clone())));
        logout.push(Arc::new(Done));

        let mut not_found = WareStack::new();
        not_found.push(Arc::new(ErrorWare::not_found(config.clone())));

        let mut method_not_allowed = WareStack::new();
        method_not_allowed.push(Arc::new(ErrorWare::method_not_allowed(config.clone())));

        Self {
            login,
            profile,
            logout,
            not_found,
            method_not_allowed,
        }
    }

    fn select(&self, method: &Method, path: &str) -> &WareStack {
        match (method, path) {
            (&Method::POST, "/login") => &self.login,
            (&Method::GET, "/profile") => &self.profile,
            (&Method::POST, "/logout") => &self.logout,
            (_, "/login") | (_, "/profile") | (_, "/logout") => &self.method_not_allowed,
            _ => &self.not_found,
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    routes: Arc<Routes>,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => Some(collected.to_bytes()),
        Err(err) => {
            debug!(error = %err, "failed to read request body");
            let ctx = RequestContext::new();
            let response = WareResponse::failure(StatusCode::BAD_REQUEST, "could not read body");
            return Ok(response.into_http(&ctx));
        }
    };
    let stack = routes.select(&parts.method, parts.uri.path());
    Ok(stack.handle(&parts.headers, body).await)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Arc::new(AppConfig::default());
    let store = Arc::new(InMemorySessionStore::new());
    let routes = Arc::new(Routes::new(config, store.clone()));

    // Periodic maintenance alongside the lazy expiry on read.
    let maintenance_store = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            maintenance_store.purge_expired().await;
        }
    });

    let addr: SocketAddr = "127.0.0.1:8080".parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("session server listening on {addr}");

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        debug!("new connection from {peer_addr}");

        let routes = routes.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| handle_request(req, routes.clone()));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!(error = %err, "error serving connection");
            }
        });
    }
}
