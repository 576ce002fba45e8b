//! Asynchronous Hack The Box client implementation.

use std::sync::Arc;

use htb_core::config::HtbClientConfig;
use htb_core::paths::{
    ApiPath, MACHINE_PAGE_SIZE, QUERY_KEY_KEYWORD, QUERY_KEY_PER_PAGE, QUERY_KEY_PRODUCT,
};
use htb_core::{
    DataEnvelope, Error, HttpTransport, InfoEnvelope, QueryParams, RequestContext, RequestSpec,
    RequestSpecBuilder, ResponseInterpreter,
};
use reqwest::Method;
use secrecy::SecretString;
use tracing::debug;

use crate::models::{
    Machine, MachineAction, MachinesList, Product, VpnServer, VpnServersData, VpnServersList,
};
use crate::Result;

const USER_AGENT: &str = concat!("htb-client/", env!("CARGO_PKG_VERSION"));

/// Builder for [`HtbClient`].
#[derive(Clone, Default)]
pub struct HtbClientBuilder {
    config: HtbClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    context: RequestContext,
}

impl HtbClientBuilder {
    /// Create a builder targeting the platform host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(config: HtbClientConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Configure the app token sent as a bearer credential.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.config = self.config.with_auth_token(token);
        self
    }

    /// Override the API origin.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Use a caller-supplied transport instead of building a `reqwest::Client`.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Bind every operation to `context` by default.
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<HtbClient> {
        let config = self.config.validated()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(config.http_config().build_http_client(USER_AGENT)?),
        };

        Ok(HtbClient {
            host: config.host().to_string(),
            auth_token: config.auth_token,
            interpreter: ResponseInterpreter::new(transport, self.context),
        })
    }
}

/// Asynchronous Hack The Box client.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct HtbClient {
    host: String,
    auth_token: Option<SecretString>,
    interpreter: ResponseInterpreter,
}

impl HtbClient {
    /// Create a client for the platform host authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        HtbClientBuilder::new().with_token(token).build()
    }

    /// Start a builder.
    #[must_use]
    pub fn builder() -> HtbClientBuilder {
        HtbClientBuilder::new()
    }

    /// Host requests are sent to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Context operations are bound to.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        self.interpreter.context()
    }

    /// A client sharing this one's transport and credentials, bound to `context`.
    #[must_use]
    pub fn with_context(&self, context: RequestContext) -> Self {
        Self {
            host: self.host.clone(),
            auth_token: self.auth_token.clone(),
            interpreter: self.interpreter.with_context(context),
        }
    }

    /// Find the single active machine whose name matches `name`.
    ///
    /// The platform filters by substring, so more than one match is an error
    /// rather than a guess.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MachineNotFound`] for zero matches and
    /// [`Error::MultipleMachinesFound`] for more than one.
    pub async fn find_active_machine_by_name(&self, name: &str) -> Result<Machine> {
        let machines = self.list_machines(ApiPath::ListActiveMachines, Some(name)).await?;
        single_match(machines, name)
    }

    /// Find the single retired machine whose name matches `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MachineNotFound`] for zero matches and
    /// [`Error::MultipleMachinesFound`] for more than one.
    pub async fn find_retired_machine_by_name(&self, name: &str) -> Result<Machine> {
        let machines = self.list_machines(ApiPath::ListRetiredMachines, Some(name)).await?;
        single_match(machines, name)
    }

    /// First page of active machines, optionally filtered by `keyword`.
    pub async fn list_active_machines(&self, keyword: Option<&str>) -> Result<MachinesList> {
        self.list_machines(ApiPath::ListActiveMachines, keyword).await
    }

    /// First page of retired machines, optionally filtered by `keyword`.
    pub async fn list_retired_machines(&self, keyword: Option<&str>) -> Result<MachinesList> {
        self.list_machines(ApiPath::ListRetiredMachines, keyword).await
    }

    /// The machine currently running for the account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveLabMachine`] when nothing is running.
    pub async fn get_active_machine(&self) -> Result<Machine> {
        let request = self.request(ApiPath::ActiveMachine).build().build(&self.host)?;
        self.interpreter
            .fetch::<InfoEnvelope<Machine>>(request)
            .await?
            .ok_or(Error::NoActiveLabMachine)
    }

    /// The VPN server assigned to the account for `product`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAssignedVpnServer`] when none is assigned.
    pub async fn get_assigned_vpn_server(&self, product: Product) -> Result<VpnServer> {
        self.vpn_servers(product)
            .await?
            .and_then(|data| data.assigned)
            .ok_or(Error::NoAssignedVpnServer)
    }

    /// Every VPN server offered for `product`, flattened into one list.
    pub async fn list_vpn_servers(&self, product: Product) -> Result<VpnServersList> {
        let servers = self
            .vpn_servers(product)
            .await?
            .map(VpnServersData::into_servers)
            .unwrap_or_default();
        debug!(%product, count = servers.len(), "HTB VPN servers listed");
        Ok(servers)
    }

    /// Spawn the machine with `id`.
    pub async fn spawn_machine(&self, id: u64) -> Result<()> {
        self.machine_action(ApiPath::SpawnMachine, id).await
    }

    /// Terminate the machine with `id`.
    pub async fn terminate_machine(&self, id: u64) -> Result<()> {
        self.machine_action(ApiPath::TerminateMachine, id).await
    }

    fn request(&self, path: ApiPath) -> RequestSpecBuilder {
        let builder = RequestSpec::builder(path);
        match &self.auth_token {
            Some(token) => builder.with_auth_token(token.clone()),
            None => builder,
        }
    }

    async fn list_machines(&self, path: ApiPath, keyword: Option<&str>) -> Result<MachinesList> {
        let mut query = QueryParams::new().with(QUERY_KEY_PER_PAGE, MACHINE_PAGE_SIZE);
        query.push_opt(QUERY_KEY_KEYWORD, keyword);

        let request = self.request(path).with_query(query).build().build(&self.host)?;
        let machines = self
            .interpreter
            .fetch::<DataEnvelope<MachinesList>>(request)
            .await?
            .unwrap_or_default();
        debug!(%path, count = machines.len(), "HTB machines listed");
        Ok(machines)
    }

    async fn vpn_servers(&self, product: Product) -> Result<Option<VpnServersData>> {
        let query = QueryParams::new().with(QUERY_KEY_PRODUCT, product);
        let request = self
            .request(ApiPath::VpnServers)
            .with_query(query)
            .build()
            .build(&self.host)?;
        self.interpreter
            .fetch::<DataEnvelope<VpnServersData>>(request)
            .await
    }

    async fn machine_action(&self, path: ApiPath, id: u64) -> Result<()> {
        let request = self
            .request(path)
            .with_method(Method::POST)
            .with_json_body(&MachineAction { machine_id: id })?
            .build()
            .build(&self.host)?;
        self.interpreter.execute(request).await
    }
}

impl std::fmt::Debug for HtbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtbClient")
            .field("host", &self.host)
            .field("authenticated", &self.auth_token.is_some())
            .finish_non_exhaustive()
    }
}

fn single_match(mut machines: MachinesList, name: &str) -> Result<Machine> {
    match machines.len() {
        0 => Err(Error::MachineNotFound {
            name: name.to_string(),
        }),
        1 => Ok(machines.remove(0)),
        _ => Err(Error::MultipleMachinesFound {
            name: name.to_string(),
        }),
    }
}
