use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use kube_leader_election::{LeaseLock, LeaseLockParams};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use connector_operator::health::{HealthState, run_health_server};
use connector_operator::{OperatorConfig, run_controller};

const LEASE_NAME: &str = "connector-operator-leader";
const LEASE_TTL: Duration = Duration::from_secs(15);
const LEASE_RENEW_INTERVAL: Duration = Duration::from_secs(5);

/// Time given to in-flight passes after SIGTERM
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    install_crypto_provider()?;
    init_tracing()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting connector-operator");

    let config = OperatorConfig::from_env()?;
    let scaler_config = config.load_scaler_config().map_err(|e| {
        error!("Failed to load scaler config: {}", e);
        e
    })?;
    if scaler_config.is_empty() {
        warn!("Scaler config is empty, every secret-backed trigger will be rejected");
    }
    let scaler_config = Arc::new(scaler_config);

    let client = Client::try_default().await?;
    let health_state = Arc::new(HealthState::new());

    // Health checks answer while this replica is still a follower
    let health_handle = {
        let state = health_state.clone();
        let addr = config.health_addr;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(state, addr).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let lease_params = || LeaseLockParams {
        holder_id: config.pod_name.clone(),
        lease_name: LEASE_NAME.to_string(),
        lease_ttl: LEASE_TTL,
    };
    info!(
        holder_id = %config.pod_name,
        namespace = %config.pod_namespace,
        lease = LEASE_NAME,
        "Joining leader election"
    );
    acquire_leadership(&LeaseLock::new(
        client.clone(),
        &config.pod_namespace,
        lease_params(),
    ))
    .await;
    let renewal_handle = spawn_lease_renewal(LeaseLock::new(
        client.clone(),
        &config.pod_namespace,
        lease_params(),
    ));

    let controller_handle = {
        let state = health_state.clone();
        let config = config.clone();
        tokio::spawn(async move {
            run_controller(client, &config, scaler_config, Some(state)).await;
        })
    };

    tokio::select! {
        result = controller_handle => {
            if let Err(e) = result {
                error!("Controller task failed: {}", e);
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task failed: {}", e);
            }
        }
        Err(e) = renewal_handle => {
            error!("Lease renewal task failed: {}", e);
        }
        _ = shutdown_signal() => {
            info!("Shutdown requested");
            health_state.set_ready(false).await;
            info!(grace = ?SHUTDOWN_GRACE_PERIOD, "Draining in-flight reconciliations");
            tokio::time::sleep(SHUTDOWN_GRACE_PERIOD).await;
        }
    }

    info!("connector-operator stopped");
    Ok(())
}

fn install_crypto_provider() -> Result<(), Box<dyn std::error::Error>> {
    let installed = rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_ok();
    if !installed && rustls::crypto::CryptoProvider::get_default().is_none() {
        return Err("no rustls crypto provider available".into());
    }
    Ok(())
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("connector_operator=info".parse()?)
        .add_directive("kube=info".parse()?)
        .add_directive("kube_leader_election=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Block until this replica holds the lease
async fn acquire_leadership(lock: &LeaseLock) {
    loop {
        match lock.try_acquire_or_renew().await {
            Ok(result) if result.acquired_lease => {
                info!("Acquired leadership");
                return;
            }
            Ok(_) => info!("Lease held by another replica"),
            Err(e) => warn!("Lease acquisition failed: {}", e),
        }
        tokio::time::sleep(LEASE_RENEW_INTERVAL).await;
    }
}

/// Keep renewing the lease; losing it terminates the process so the pod
/// restarts as a follower
fn spawn_lease_renewal(lock: LeaseLock) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(LEASE_RENEW_INTERVAL).await;
            match lock.try_acquire_or_renew().await {
                Ok(result) if result.acquired_lease => {}
                Ok(_) => {
                    error!("Leadership lost, exiting");
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Lease renewal failed, exiting: {}", e);
                    std::process::exit(1);
                }
            }
        }
    })
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Cannot install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
