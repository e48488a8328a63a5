//! Startup orchestration: the table of proxy instances and their listeners.

use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::config::{InstanceConfig, ProxyConfig, VerbosityHandle};
use crate::http::{ProxyError, ProxyInstance};
use crate::lifecycle::Shutdown;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Every proxy instance of the process, built from the instance table.
pub struct ProxyRegistry {
    instances: Vec<ProxyInstance>,
    bind_host: String,
    ansi: bool,
}

impl ProxyRegistry {
    pub fn from_config(
        config: &ProxyConfig,
        verbosity: VerbosityHandle,
    ) -> Result<Self, ProxyError> {
        let instances = config
            .instances
            .iter()
            .map(|instance| ProxyInstance::new(instance.clone(), config, verbosity.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            instances,
            bind_host: config.listener.bind_host.clone(),
            ansi: config.observability.ansi,
        })
    }

    pub fn instances(&self) -> &[ProxyInstance] {
        &self.instances
    }

    /// Bind every public port, print the banner, and serve until shutdown.
    ///
    /// All ports are bound before any instance starts serving. The first
    /// instance to fail stops the others and its error is returned.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), ProxyError> {
        let configs: Vec<InstanceConfig> = self
            .instances
            .iter()
            .map(|i| i.config().clone())
            .collect();

        let mut bound = Vec::with_capacity(self.instances.len());
        for instance in self.instances {
            let addr = format!("{}:{}", self.bind_host, instance.config().listen_port);
            let listener = TcpListener::bind(&addr)
                .await
                .map_err(|source| ProxyError::Bind { addr, source })?;
            bound.push((instance, listener));
        }

        println!("{}", format_banner(&configs, self.ansi));

        let mut tasks = JoinSet::new();
        for (instance, listener) in bound {
            tasks.spawn(instance.serve(listener, shutdown.subscribe()));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "Proxy instance task failed");
                    continue;
                }
            };
            if let Err(e) = result {
                tracing::error!(error = %e, "Proxy instance stopped with error");
                shutdown.trigger();
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

/// The startup banner, one public URL per instance.
pub fn format_banner(instances: &[InstanceConfig], ansi: bool) -> String {
    let mut banner = String::from("\n");
    for instance in instances {
        let url = format!("http://127.0.0.1:{}", instance.listen_port);
        let url = if ansi {
            format!("{BOLD}{url}{RESET}")
        } else {
            url
        };
        banner.push_str(&format!(" {} listening on {}\n", instance.label(), url));
    }
    banner
}
